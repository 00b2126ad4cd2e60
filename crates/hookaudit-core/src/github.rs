//! Upstream audit API client: webhook registration discovery plus the
//! paginated delivery listing with per-delivery detail enrichment. Pure
//! I/O boundary; classification never happens here.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK};
use serde::Deserialize;

use crate::engine::DeliverySource;
use crate::error::{HookAuditError, Result};
use crate::models::{DeliveryDetail, DeliverySummary, EnrichedDelivery, local_datetime_string};
use crate::sinks::ActivityLog;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_ORG: &str = "Fiserv";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Upstream maximum page size.
const PER_PAGE: u32 = 100;

#[derive(Debug, Clone)]
pub struct DeliveryApiConfig {
    pub base_url: String,
    pub org: String,
    pub token: String,
    pub timeout_ms: u64,
}

impl DeliveryApiConfig {
    /// Reads the API configuration from the environment. The token is
    /// required; `HOOKAUDIT_GITHUB_TOKEN` is preferred and the variable
    /// name used by earlier revisions of this tool is still accepted.
    pub fn from_env() -> Result<Self> {
        let token = read_non_empty_env("HOOKAUDIT_GITHUB_TOKEN")
            .or_else(|| read_non_empty_env("GITHUB_TENANT_REPO_AUTH_TOKEN"))
            .ok_or_else(|| {
                HookAuditError::Configuration(
                    "HOOKAUDIT_GITHUB_TOKEN (or GITHUB_TENANT_REPO_AUTH_TOKEN) is not set"
                        .to_string(),
                )
            })?;
        let base_url = read_non_empty_env("HOOKAUDIT_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let org =
            read_non_empty_env("HOOKAUDIT_GITHUB_ORG").unwrap_or_else(|| DEFAULT_ORG.to_string());
        let timeout_ms = read_env_u64("HOOKAUDIT_HTTP_TIMEOUT_MS").unwrap_or(DEFAULT_TIMEOUT_MS);

        Ok(Self {
            base_url: normalize_base_url(&base_url),
            org,
            token,
            timeout_ms,
        })
    }
}

/// One webhook registration of the organization, as listed upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct HookRegistration {
    pub id: u64,
    #[serde(default)]
    pub config: HookRegistrationConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookRegistrationConfig {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone)]
pub struct DeliveryApi {
    config: DeliveryApiConfig,
    http: Client,
}

impl std::fmt::Debug for DeliveryApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryApi")
            .field("base_url", &self.config.base_url)
            .field("org", &self.config.org)
            .finish_non_exhaustive()
    }
}

impl DeliveryApi {
    pub fn new(config: DeliveryApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| HookAuditError::Configuration(format!("invalid token value: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { config, http })
    }

    #[must_use]
    pub fn config(&self) -> &DeliveryApiConfig {
        &self.config
    }

    pub fn list_org_hooks(&self) -> Result<Vec<HookRegistration>> {
        let url = format!("{}/orgs/{}/hooks", self.config.base_url, self.config.org);
        let resp = self.http.get(url).send()?;
        if !resp.status().is_success() {
            return Err(HookAuditError::Upstream(format!(
                "hook listing failed with status {}",
                resp.status()
            )));
        }
        Ok(resp.json::<Vec<HookRegistration>>()?)
    }

    /// Resolves the deliveries endpoint for the webhook registered against
    /// `target_url`. No matching registration is fatal to the run.
    pub fn deliveries_endpoint(&self, target_url: &str) -> Result<String> {
        let hooks = self.list_org_hooks()?;
        let hook = hooks
            .into_iter()
            .find(|hook| hook.config.url.as_deref() == Some(target_url))
            .ok_or_else(|| HookAuditError::HookNotFound(target_url.to_string()))?;
        Ok(format!(
            "{}/orgs/{}/hooks/{}/deliveries",
            self.config.base_url, self.config.org, hook.id
        ))
    }

    /// Pages through the delivery listing and joins each summary with its
    /// detail record. Deliveries without a usable commit timestamp are
    /// dropped here; they carry no ordering signal and cannot be
    /// reconciled. Any transport or parse failure aborts the fetch.
    pub fn fetch_all_deliveries(
        &self,
        deliveries_url: &str,
        log: &ActivityLog,
    ) -> Result<Vec<EnrichedDelivery>> {
        let mut next_url = Some(format!("{deliveries_url}?per_page={PER_PAGE}"));
        let mut all = Vec::new();

        while let Some(url) = next_url {
            let (summaries, next) = self.fetch_page(&url)?;
            let mut page = Vec::with_capacity(summaries.len());

            for summary in summaries {
                let detail = self.fetch_detail(deliveries_url, summary.id)?;
                let delivery_id = detail.delivery_id().unwrap_or("unknown").to_string();
                let Some(timestamp) = detail.head_commit_epoch() else {
                    log.line(&format!(
                        "Skipping delivery {delivery_id} with no head_commit"
                    ));
                    continue;
                };
                log.line(&format!(
                    "Found head_commit for delivery id {delivery_id}, timestamp: {timestamp}, {}",
                    local_datetime_string(timestamp)
                ));
                log.line(&format!(
                    "signature: {}, delivery id: {delivery_id}",
                    detail.signature().unwrap_or("none")
                ));
                page.push(EnrichedDelivery {
                    summary,
                    detail,
                    timestamp,
                });
            }

            log.line(&format!("Adding {} deliveries", page.len()));
            all.extend(page);
            log.line(&format!("Total deliveries so far: {}", all.len()));
            next_url = next;
        }

        Ok(all)
    }

    fn fetch_page(&self, url: &str) -> Result<(Vec<DeliverySummary>, Option<String>)> {
        let resp = self.http.get(url).send()?;
        if !resp.status().is_success() {
            return Err(HookAuditError::Upstream(format!(
                "delivery listing failed with status {}",
                resp.status()
            )));
        }
        let next = resp
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_page_url);
        let summaries = resp.json::<Vec<DeliverySummary>>()?;
        Ok((summaries, next))
    }

    fn fetch_detail(&self, deliveries_url: &str, id: u64) -> Result<DeliveryDetail> {
        let url = format!("{deliveries_url}/{id}");
        let resp = self.http.get(url).send()?;
        if !resp.status().is_success() {
            return Err(HookAuditError::Upstream(format!(
                "delivery detail fetch for {id} failed with status {}",
                resp.status()
            )));
        }
        Ok(resp.json::<DeliveryDetail>()?)
    }
}

/// The source the engine runs against in production: one resolved
/// deliveries endpoint behind the API client.
#[derive(Debug, Clone)]
pub struct UpstreamDeliverySource {
    api: DeliveryApi,
    deliveries_url: String,
}

impl UpstreamDeliverySource {
    pub fn new(api: DeliveryApi, deliveries_url: impl Into<String>) -> Self {
        Self {
            api,
            deliveries_url: deliveries_url.into(),
        }
    }
}

impl DeliverySource for UpstreamDeliverySource {
    fn fetch_all_deliveries(&self, log: &ActivityLog) -> Result<Vec<EnrichedDelivery>> {
        self.api.fetch_all_deliveries(&self.deliveries_url, log)
    }
}

/// Extracts the `rel="next"` target from a pagination `Link` header.
pub(crate) fn next_page_url(link_header: &str) -> Option<String> {
    for part in link_header.split(',') {
        if part.contains(r#"rel="next""#) {
            return part
                .split(';')
                .next()
                .map(|target| target.trim().trim_start_matches('<').trim_end_matches('>'))
                .filter(|target| !target.is_empty())
                .map(ToString::to_string);
        }
    }
    None
}

fn read_non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_page_url_extracts_the_next_target() {
        let header = r#"<https://api.github.com/x/deliveries?per_page=100&cursor=v1_abc>; rel="next", <https://api.github.com/x/deliveries?per_page=100>; rel="first""#;
        assert_eq!(
            next_page_url(header).as_deref(),
            Some("https://api.github.com/x/deliveries?per_page=100&cursor=v1_abc")
        );
    }

    #[test]
    fn next_page_url_handles_next_in_any_position() {
        let header = r#"<https://api.github.com/x?page=1>; rel="prev", <https://api.github.com/x?page=3>; rel="next""#;
        assert_eq!(
            next_page_url(header).as_deref(),
            Some("https://api.github.com/x?page=3")
        );
    }

    #[test]
    fn next_page_url_is_none_without_a_next_relation() {
        let header = r#"<https://api.github.com/x?page=1>; rel="prev""#;
        assert_eq!(next_page_url(header), None);
        assert_eq!(next_page_url(""), None);
    }

    #[test]
    fn hook_registration_tolerates_missing_config() {
        let hooks = serde_json::from_str::<Vec<HookRegistration>>(
            r#"[{"id": 7, "config": {"url": "https://qa-developer.fiserv.com/api/git-webhook"}}, {"id": 8}]"#,
        )
        .expect("hooks");
        assert_eq!(hooks[0].config.url.as_deref(), Some("https://qa-developer.fiserv.com/api/git-webhook"));
        assert_eq!(hooks[1].config.url, None);
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        assert_eq!(normalize_base_url("https://ghe.local/api/v3/"), "https://ghe.local/api/v3");
        assert_eq!(normalize_base_url("https://api.github.com"), "https://api.github.com");
    }
}
