use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hookaudit_core::catalog;
use hookaudit_core::engine::EngineConfig;
use hookaudit_core::{
    ActivityLog, DeliveryApi, DeliveryApiConfig, Environment, UpstreamDeliverySource,
    run_reconciliation,
};

pub(crate) fn run(environment: Environment, root: &Path) -> Result<()> {
    fs::create_dir_all(root)
        .with_context(|| format!("failed to create persistence root {}", root.display()))?;

    let day = catalog::today_stamp();
    let log = ActivityLog::new(catalog::activity_log_path(root, &day, environment));

    let api = DeliveryApi::new(DeliveryApiConfig::from_env()?)?;
    let target_url = environment.webhook_url();
    let deliveries_url = match api.deliveries_endpoint(target_url) {
        Ok(url) => url,
        Err(err) => {
            log.line(&format!("No webhook found for URL: {target_url}"));
            return Err(err.into());
        }
    };
    log.line(&format!(
        "Found webhook deliveries endpoint for {target_url}: {deliveries_url}"
    ));

    let source = UpstreamDeliverySource::new(api, deliveries_url);
    let config = EngineConfig {
        environment,
        root: root.to_path_buf(),
        day,
        webhook_url: target_url.to_string(),
    };

    let summary = run_reconciliation(&config, &source, &log)?;
    print_json(&summary)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
