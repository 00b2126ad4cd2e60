use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use hookaudit_core::Environment;

#[derive(Debug, Parser)]
#[command(name = "hookaudit")]
#[command(about = "Reconcile webhook delivery history against the security policy", version)]
pub struct Cli {
    /// Environment whose webhook endpoint to reconcile.
    #[arg(value_enum)]
    pub environment: EnvironmentArg,

    /// Directory holding the watermark, ignore list, and disposition files.
    #[arg(long, default_value = "persistence")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvironmentArg {
    Dev,
    Qa,
    Stage,
    Prod,
}

impl From<EnvironmentArg> for Environment {
    fn from(arg: EnvironmentArg) -> Self {
        match arg {
            EnvironmentArg::Dev => Self::Dev,
            EnvironmentArg::Qa => Self::Qa,
            EnvironmentArg::Stage => Self::Stage,
            EnvironmentArg::Prod => Self::Prod,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parses_environment_and_default_root() {
        let cli = Cli::try_parse_from(["hookaudit", "qa"]).expect("parse");
        assert_eq!(cli.environment, EnvironmentArg::Qa);
        assert_eq!(cli.root, PathBuf::from("persistence"));
    }

    #[test]
    fn accepts_an_explicit_root() {
        let cli =
            Cli::try_parse_from(["hookaudit", "prod", "--root", "/var/lib/hookaudit"])
                .expect("parse");
        assert_eq!(cli.environment, EnvironmentArg::Prod);
        assert_eq!(cli.root, PathBuf::from("/var/lib/hookaudit"));
    }

    #[test]
    fn rejects_missing_or_unknown_environment() {
        assert!(Cli::try_parse_from(["hookaudit"]).is_err());
        assert!(Cli::try_parse_from(["hookaudit", "staging"]).is_err());
    }

    #[test]
    fn environment_arg_maps_onto_core_environments() {
        assert_eq!(Environment::from(EnvironmentArg::Dev), Environment::Dev);
        assert_eq!(Environment::from(EnvironmentArg::Stage), Environment::Stage);
    }
}
