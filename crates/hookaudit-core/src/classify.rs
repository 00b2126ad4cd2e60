use std::sync::LazyLock;

use regex::Regex;

use crate::ignore::IgnoreSet;
use crate::models::{EnrichedDelivery, Watermark};

/// What the engine does with one delivery. First-match-wins over the rules
/// in [`classify`]; later rules are never consulted once one applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Repository is on the ignore list; skipped entirely.
    Ignored,
    /// Timestamp at or before the watermark; a previous run covered it.
    AlreadyProcessed,
    /// No response at all, on the branch this environment monitors.
    TimedOut,
    /// No response at all, but on a branch this environment does not
    /// monitor; logged and dropped without persistence.
    TimedOutOtherBranch,
    /// HTTP 200 recorded upstream: accepted by the proxy yet blocked
    /// before reaching the endpoint. Any other status is `Normal`.
    Blocked,
    /// Nothing actionable; still advances the watermark.
    Normal,
}

pub fn classify(
    delivery: &EnrichedDelivery,
    watermark: &Watermark,
    ignores: &IgnoreSet,
    monitored_branch: &str,
) -> Disposition {
    if let Some(repository) = delivery.detail.repository_name()
        && ignores.contains(repository)
    {
        return Disposition::Ignored;
    }

    if delivery.timestamp <= watermark.timestamp {
        return Disposition::AlreadyProcessed;
    }

    if delivery.detail.response.is_absent() {
        return if delivery.detail.branch() == Some(monitored_branch) {
            Disposition::TimedOut
        } else {
            Disposition::TimedOutOtherBranch
        };
    }

    if delivery.summary.status_code == Some(200) {
        return Disposition::Blocked;
    }

    Disposition::Normal
}

/// Diagnostic markers the upstream proxy injects into the response body of
/// a blocked request. Each is optional; a missing marker is reported as
/// absent, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockedDiagnostics {
    pub transid: Option<String>,
    pub clientip: Option<String>,
    pub clientport: Option<String>,
}

static TRANSID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_event_transid='([^']+)'").expect("invalid transid pattern"));
static CLIENTIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_event_clientip='([^']+)'").expect("invalid clientip pattern"));
static CLIENTPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_event_clientport='([^']+)'").expect("invalid clientport pattern")
});

#[must_use]
pub fn extract_diagnostics(response_payload: &str) -> BlockedDiagnostics {
    BlockedDiagnostics {
        transid: capture(&TRANSID, response_payload),
        clientip: capture(&CLIENTIP, response_payload),
        clientport: capture(&CLIENTPORT, response_payload),
    }
}

fn capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|captures| captures.get(1))
        .map(|group| group.as_str().to_string())
}
