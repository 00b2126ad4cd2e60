use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{Watermark, local_datetime_string};
use crate::sinks::ActivityLog;

/// Filesystem-backed store for the single resumable cursor of one
/// environment. Monotonicity is the caller's responsibility; the store
/// only reads and overwrites.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or malformed watermark file is a zero watermark, never an
    /// error: the run then reprocesses from the beginning, which the
    /// per-delivery dedup in the sinks makes safe.
    pub fn read(&self, log: &ActivityLog) -> Watermark {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => {
                log.line(&format!(
                    "No watermark file at {}, starting from epoch 0",
                    self.path.display()
                ));
                return Watermark::default();
            }
        };
        match serde_json::from_str::<Watermark>(&raw) {
            Ok(watermark) => watermark,
            Err(err) => {
                log.line(&format!(
                    "Invalid watermark file {}, starting from epoch 0: {err}",
                    self.path.display()
                ));
                Watermark::default()
            }
        }
    }

    /// Overwrites the watermark atomically (temp file + rename) so a kill
    /// mid-write never leaves a truncated cursor behind.
    pub fn write(&self, watermark: &Watermark) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let tmp_name = format!(
            ".{}.tmp.{}",
            self.path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("watermark"),
            uuid::Uuid::new_v4().simple()
        );
        let tmp_path = parent.join(tmp_name);
        fs::write(&tmp_path, serde_json::to_string_pretty(watermark)?)?;
        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        Ok(())
    }
}

/// Builds the watermark value for a delivery that just finished processing.
#[must_use]
pub fn watermark_for(delivery_id: &str, timestamp: i64) -> Watermark {
    Watermark {
        delivery_id: Some(delivery_id.to_string()),
        delivery_datetime: Some(local_datetime_string(timestamp)),
        timestamp,
    }
}
