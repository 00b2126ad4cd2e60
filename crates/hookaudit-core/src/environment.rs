use std::fmt;
use std::str::FromStr;

use crate::error::HookAuditError;

/// Deployment environment whose webhook endpoint a run reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Dev,
    Qa,
    Stage,
    Prod,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Qa => "qa",
            Self::Stage => "stage",
            Self::Prod => "prod",
        }
    }

    /// URL the organization webhook is configured to deliver to.
    #[must_use]
    pub const fn webhook_url(self) -> &'static str {
        match self {
            Self::Dev => "https://dev-developer.fiserv.com/api/git-webhook",
            Self::Qa => "https://qa-developer.fiserv.com/api/git-webhook",
            Self::Stage => "https://stage-developer.fiserv.com/api/git-webhook",
            Self::Prod => "https://developer.fiserv.com/api/git-webhook",
        }
    }

    /// Branch whose timed-out deliveries are relevant to this environment.
    #[must_use]
    pub const fn monitored_branch(self) -> &'static str {
        match self {
            Self::Dev | Self::Qa => "develop",
            Self::Stage => "stage",
            Self::Prod => "main",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = HookAuditError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "qa" => Ok(Self::Qa),
            "stage" => Ok(Self::Stage),
            "prod" => Ok(Self::Prod),
            other => Err(HookAuditError::InvalidEnvironment(other.to_string())),
        }
    }
}
