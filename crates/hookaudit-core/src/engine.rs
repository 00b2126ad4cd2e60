//! The reconciliation loop: fetch, classify, persist, advance the
//! watermark. This is the only stateful part of the crate; everything it
//! composes is a leaf.

use std::path::PathBuf;

use uuid::Uuid;

use crate::catalog;
use crate::classify::{Disposition, classify, extract_diagnostics};
use crate::environment::Environment;
use crate::error::Result;
use crate::ignore::IgnoreSet;
use crate::models::{EnrichedDelivery, RunSummary, TimedOutRecord, local_datetime_string};
use crate::sinks::{ActivityLog, BlockedSink, TimedOutSink};
use crate::watermark::{WatermarkStore, watermark_for};

/// Seam over the upstream client so the loop can be exercised against an
/// in-memory delivery set.
pub trait DeliverySource {
    fn fetch_all_deliveries(&self, log: &ActivityLog) -> Result<Vec<EnrichedDelivery>>;
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub environment: Environment,
    /// Directory holding the watermark, sinks, and ignore list.
    pub root: PathBuf,
    /// Day stamp baked into sink file names, `MM-DD-YYYY`.
    pub day: String,
    /// Endpoint the audited webhook delivers to; recorded in blocked reports.
    pub webhook_url: String,
}

/// Runs one reconciliation pass to completion.
///
/// The watermark is read once up front and every delivery is classified
/// against that snapshot; advancement tracks a separate running maximum
/// that is persisted the moment it moves, so a killed run resumes from the
/// last delivery whose watermark write completed.
pub fn run_reconciliation(
    config: &EngineConfig,
    source: &dyn DeliverySource,
    log: &ActivityLog,
) -> Result<RunSummary> {
    let run_id = Uuid::new_v4().to_string();
    log.line(&format!(
        "Starting reconciliation run {run_id} for {} ({})",
        config.environment, config.webhook_url
    ));

    let ignores = IgnoreSet::load(&catalog::ignore_list_path(&config.root));
    if !ignores.is_empty() {
        log.line(&format!("Loaded {} ignored repositories", ignores.len()));
    }

    let store = WatermarkStore::new(catalog::watermark_path(&config.root, config.environment));
    let watermark = store.read(log);
    let timed_out_sink = TimedOutSink::new(catalog::timed_out_path(
        &config.root,
        &config.day,
        config.environment,
    ));
    let blocked_sink = BlockedSink::new(&config.webhook_url);
    let monitored_branch = config.environment.monitored_branch();

    let deliveries = source.fetch_all_deliveries(log)?;
    log.line(&format!("Total deliveries to process: {}", deliveries.len()));

    let mut running = watermark.clone();
    let mut processed = 0u64;
    let mut blocked = 0u64;
    let mut timed_out = 0u64;

    for delivery in &deliveries {
        let delivery_id = delivery.delivery_id();
        log.line(&format!("Processing delivery id: {delivery_id}"));

        match classify(delivery, &watermark, &ignores, monitored_branch) {
            Disposition::Ignored => {
                log.line(&format!(
                    "Ignoring delivery {delivery_id} based on repository ignore list"
                ));
                continue;
            }
            Disposition::AlreadyProcessed => {
                log.line(&format!(
                    "Delivery {delivery_id} does not need processing (timestamp: {} <= watermark: {})",
                    delivery.timestamp, watermark.timestamp
                ));
                continue;
            }
            Disposition::TimedOutOtherBranch => {
                log.line(&format!(
                    "Skipping timed-out delivery {delivery_id} for branch {:?} not matching environment branch '{monitored_branch}'",
                    delivery.detail.branch()
                ));
                continue;
            }
            Disposition::TimedOut => {
                log.line(&format!("Delivery {delivery_id} timed out"));
                let record = TimedOutRecord {
                    delivery_id: delivery_id.to_string(),
                    payload: delivery.detail.request.payload.clone(),
                    timestamp: delivery.timestamp,
                };
                timed_out_sink.record(&record, log)?;
                timed_out += 1;
                // A timeout never advances the watermark: the next run must
                // see this delivery again if nothing newer completes.
                continue;
            }
            Disposition::Blocked => {
                let body = delivery.detail.response.payload.as_deref().unwrap_or("");
                let diagnostics = extract_diagnostics(body);
                let path = catalog::blocked_path(
                    &config.root,
                    &config.day,
                    config.environment,
                    delivery_id,
                );
                blocked_sink.record(&path, delivery, &diagnostics, log)?;
                blocked += 1;
            }
            Disposition::Normal => {}
        }

        if delivery.timestamp > running.timestamp {
            running = watermark_for(delivery_id, delivery.timestamp);
            store.write(&running)?;
            log.line(&format!(
                "Most recent processed delivery set to -- id: {delivery_id}, date-time: {}, timestamp: {}",
                local_datetime_string(delivery.timestamp),
                delivery.timestamp
            ));
        }
        processed += 1;
    }

    log.line(&format!("Total number of deliveries processed: {processed}"));
    log.line(&format!("Total number of blocked webhooks: {blocked}"));
    log.line(&format!("Total number of timed_out webhooks: {timed_out}"));
    if processed > 0 {
        log.line(&format!(
            "Most recent processed delivery -- id: {:?}, date-time: {:?}, timestamp: {}",
            running.delivery_id, running.delivery_datetime, running.timestamp
        ));
    }

    Ok(RunSummary {
        environment: config.environment.to_string(),
        run_id,
        processed,
        blocked,
        timed_out,
        watermark: running,
    })
}
