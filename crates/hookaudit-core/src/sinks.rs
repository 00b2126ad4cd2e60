//! Disposition sinks and the activity log. The sinks are append-only and
//! deduplicated by delivery id; the activity log mirrors every line to
//! stdout and never fails its caller.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::classify::BlockedDiagnostics;
use crate::error::Result;
use crate::models::{EnrichedDelivery, TimedOutRecord, local_datetime_string};

/// Line-oriented run log for one (day, environment). Logging is an
/// operability concern, not a correctness one, so append failures are
/// swallowed rather than surfaced.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&self, message: &str) {
        println!("{message}");
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{message}");
        }
    }
}

/// Per-day list of timed-out deliveries, deduplicated by delivery id.
#[derive(Debug, Clone)]
pub struct TimedOutSink {
    path: PathBuf,
}

impl TimedOutSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Appends the record unless an entry with the same delivery id is
    /// already present. Returns whether the list changed. A malformed or
    /// missing list file is treated as empty.
    pub fn record(&self, record: &TimedOutRecord, log: &ActivityLog) -> Result<bool> {
        let mut entries = self.read_entries(log);
        if entries
            .iter()
            .any(|existing| existing.delivery_id == record.delivery_id)
        {
            log.line(&format!(
                "Delivery {} already present in {}, skipping.",
                record.delivery_id,
                self.path.display()
            ));
            return Ok(false);
        }

        entries.push(record.clone());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(true)
    }

    fn read_entries(&self, log: &ActivityLog) -> Vec<TimedOutRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str::<Vec<TimedOutRecord>>(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                log.line(&format!(
                    "Invalid JSON in {}, starting a fresh list: {err}",
                    self.path.display()
                ));
                Vec::new()
            }
        }
    }
}

/// One plain-text report file per blocked delivery, write-once: a report
/// that already exists for a delivery id is never overwritten.
#[derive(Debug, Clone)]
pub struct BlockedSink {
    webhook_url: String,
}

impl BlockedSink {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
        }
    }

    pub fn record(
        &self,
        path: &Path,
        delivery: &EnrichedDelivery,
        diagnostics: &BlockedDiagnostics,
        log: &ActivityLog,
    ) -> Result<bool> {
        if path.exists() {
            log.line(&format!(
                "Blocked report already exists for delivery {}, skipping.",
                delivery.delivery_id()
            ));
            return Ok(false);
        }

        let payload = serde_json::to_string_pretty(&delivery.detail.request.payload)?;
        let report = format!(
            "************** Blocked webhook request **************\n\
             webhook: {}\n\
             GitHub delivery Id: {}\n\
             Timestamp: {} ({})\n\
             transid: {}\n\
             clientip: {}\n\
             clientport: {}\n\
             request payload: {}\n\
             *****************************************************\n",
            self.webhook_url,
            delivery.delivery_id(),
            delivery.timestamp,
            local_datetime_string(delivery.timestamp),
            diagnostics.transid.as_deref().unwrap_or("None"),
            diagnostics.clientip.as_deref().unwrap_or("None"),
            diagnostics.clientport.as_deref().unwrap_or("None"),
            payload,
        );

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, report)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{DeliveryDetail, DeliverySummary};

    fn sample_delivery(id: &str, timestamp: i64) -> EnrichedDelivery {
        let detail = serde_json::from_value::<DeliveryDetail>(json!({
            "request": {
                "headers": {"X-GitHub-Delivery": id},
                "payload": {"repository": {"name": "docs-repo"}}
            },
            "response": {"payload": "blocked"}
        }))
        .expect("detail");
        EnrichedDelivery {
            summary: DeliverySummary {
                id: 1,
                status_code: Some(200),
            },
            detail,
            timestamp,
        }
    }

    fn record(id: &str) -> TimedOutRecord {
        TimedOutRecord {
            delivery_id: id.to_string(),
            payload: json!({"ref": "refs/heads/develop"}),
            timestamp: 1600,
        }
    }

    #[test]
    fn timed_out_sink_appends_and_deduplicates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ActivityLog::new(dir.path().join("activity.log"));
        let sink = TimedOutSink::new(dir.path().join("timed_out.json"));

        assert!(sink.record(&record("d-1"), &log).expect("first"));
        assert!(sink.record(&record("d-2"), &log).expect("second"));
        assert!(!sink.record(&record("d-1"), &log).expect("duplicate"));

        let raw = fs::read_to_string(dir.path().join("timed_out.json")).expect("read");
        let entries = serde_json::from_str::<Vec<TimedOutRecord>>(&raw).expect("entries");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn timed_out_sink_recovers_from_malformed_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("timed_out.json");
        fs::write(&path, "{not json").expect("write");

        let log = ActivityLog::new(dir.path().join("activity.log"));
        let sink = TimedOutSink::new(&path);
        assert!(sink.record(&record("d-1"), &log).expect("record"));

        let raw = fs::read_to_string(&path).expect("read");
        let entries = serde_json::from_str::<Vec<TimedOutRecord>>(&raw).expect("entries");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn blocked_sink_is_write_once_per_delivery() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ActivityLog::new(dir.path().join("activity.log"));
        let sink = BlockedSink::new("https://qa-developer.fiserv.com/api/git-webhook");
        let path = dir.path().join("blocked_d-7.log");

        let delivery = sample_delivery("d-7", 1500);
        let diagnostics = BlockedDiagnostics {
            transid: Some("abc123".to_string()),
            clientip: None,
            clientport: None,
        };

        assert!(sink.record(&path, &delivery, &diagnostics, &log).expect("first"));
        let first = fs::read_to_string(&path).expect("read");
        assert!(first.contains("transid: abc123"));
        assert!(first.contains("clientip: None"));
        assert!(first.contains("GitHub delivery Id: d-7"));

        assert!(!sink.record(&path, &delivery, &diagnostics, &log).expect("second"));
        assert_eq!(fs::read_to_string(&path).expect("read"), first);
    }

    #[test]
    fn activity_log_appends_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("activity.log");
        let log = ActivityLog::new(&path);
        log.line("first");
        log.line("second");

        let raw = fs::read_to_string(&path).expect("read");
        assert_eq!(raw, "first\nsecond\n");
    }
}
