//! Persistence file layout. All run state lives under one root directory;
//! everything except the watermark and the ignore list is day-stamped so
//! operators can line files up with the day's cron output.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::environment::Environment;

pub const IGNORE_LIST_FILENAME: &str = ".repoIgnore";

/// `MM-DD-YYYY` stamp for today's files, in local time.
#[must_use]
pub fn today_stamp() -> String {
    Local::now().format("%m-%d-%Y").to_string()
}

#[must_use]
pub fn watermark_path(root: &Path, env: Environment) -> PathBuf {
    root.join(format!("most_recently_processed_{env}.json"))
}

#[must_use]
pub fn timed_out_path(root: &Path, day: &str, env: Environment) -> PathBuf {
    root.join(format!("timed_out_deliveries_{day}_{env}.json"))
}

#[must_use]
pub fn blocked_path(root: &Path, day: &str, env: Environment, delivery_id: &str) -> PathBuf {
    root.join(format!("blocked_delivery_{day}_{env}_{delivery_id}.log"))
}

#[must_use]
pub fn activity_log_path(root: &Path, day: &str, env: Environment) -> PathBuf {
    root.join(format!("activity_log_{day}_{env}.log"))
}

#[must_use]
pub fn ignore_list_path(root: &Path) -> PathBuf {
    root.join(IGNORE_LIST_FILENAME)
}
