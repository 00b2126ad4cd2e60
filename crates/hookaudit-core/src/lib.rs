//! Incremental reconciliation of webhook delivery history.
//!
//! One run paginates the upstream delivery log for a single environment's
//! webhook, classifies each delivery (ignored, already processed, timed
//! out, blocked, normal), persists blocked and timed-out dispositions
//! exactly once, and advances a resumable watermark so the next run picks
//! up where this one left off.

pub mod catalog;
pub mod classify;
pub mod engine;
pub mod environment;
pub mod error;
pub mod github;
pub mod ignore;
pub mod models;
pub mod sinks;
pub mod watermark;

pub use classify::{BlockedDiagnostics, Disposition, classify, extract_diagnostics};
pub use engine::{DeliverySource, EngineConfig, run_reconciliation};
pub use environment::Environment;
pub use error::{HookAuditError, Result};
pub use github::{DeliveryApi, DeliveryApiConfig, UpstreamDeliverySource};
pub use ignore::IgnoreSet;
pub use models::{EnrichedDelivery, RunSummary, Watermark};
pub use sinks::ActivityLog;
