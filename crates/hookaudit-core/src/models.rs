use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request header carrying the opaque, run-stable delivery identifier.
pub const DELIVERY_ID_HEADER: &str = "X-GitHub-Delivery";
/// Request header carrying the payload signature; logged, never verified here.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// One entry of the upstream delivery listing. Fields beyond what the
/// engine consumes are ignored on deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliverySummary {
    pub id: u64,
    #[serde(default)]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryRequest {
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryResponse {
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub payload: Option<String>,
}

impl DeliveryResponse {
    /// Empty headers and empty payload together signal a timeout: the
    /// recipient never answered.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.headers.is_empty() && self.payload.as_deref().unwrap_or("").is_empty()
    }
}

/// Full detail record for one delivery: what was sent and what came back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryDetail {
    #[serde(default)]
    pub request: DeliveryRequest,
    #[serde(default)]
    pub response: DeliveryResponse,
}

impl DeliveryDetail {
    fn request_header(&self, name: &str) -> Option<&str> {
        self.request.headers.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn delivery_id(&self) -> Option<&str> {
        self.request_header(DELIVERY_ID_HEADER)
    }

    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.request_header(SIGNATURE_HEADER)
    }

    #[must_use]
    pub fn repository_name(&self) -> Option<&str> {
        self.request
            .payload
            .pointer("/repository/name")
            .and_then(Value::as_str)
    }

    /// Target branch of the push, derived from `ref` with the
    /// `refs/heads/` prefix stripped.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.request
            .payload
            .get("ref")
            .and_then(Value::as_str)
            .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r))
    }

    /// Epoch seconds of `head_commit.timestamp`, the only ordering signal
    /// the upstream record carries. `None` when the commit metadata is
    /// missing or malformed; such deliveries cannot be reconciled.
    #[must_use]
    pub fn head_commit_epoch(&self) -> Option<i64> {
        let raw = self
            .request
            .payload
            .pointer("/head_commit/timestamp")
            .and_then(Value::as_str)?;
        DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.timestamp())
    }
}

/// A delivery summary joined with its detail record and derived timestamp.
#[derive(Debug, Clone)]
pub struct EnrichedDelivery {
    pub summary: DeliverySummary,
    pub detail: DeliveryDetail,
    pub timestamp: i64,
}

impl EnrichedDelivery {
    #[must_use]
    pub fn delivery_id(&self) -> &str {
        self.detail.delivery_id().unwrap_or("unknown")
    }
}

/// Resumable cursor: everything at or before `timestamp` has been
/// reconciled for the environment this file belongs to.
///
/// The JSON field names are kept wire-compatible with the files written by
/// earlier revisions of this tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    #[serde(default)]
    pub delivery_id: Option<String>,
    #[serde(rename = "delivery date-time", default)]
    pub delivery_datetime: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
}

/// One element of the per-day timed-out deliveries list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedOutRecord {
    pub delivery_id: String,
    pub payload: Value,
    pub timestamp: i64,
}

/// Counters and final cursor reported at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub environment: String,
    pub run_id: String,
    pub processed: u64,
    pub blocked: u64,
    pub timed_out: u64,
    pub watermark: Watermark,
}

/// Human-readable local form of an epoch timestamp, for operator-facing
/// files and log lines.
#[must_use]
pub fn local_datetime_string(epoch: i64) -> String {
    DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.with_timezone(&Local).to_rfc3339())
        .unwrap_or_else(|| epoch.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn detail_with_payload(payload: Value) -> DeliveryDetail {
        serde_json::from_value(json!({
            "request": {
                "headers": {
                    "X-GitHub-Delivery": "d-1",
                    "X-Hub-Signature-256": "sha256=aa"
                },
                "payload": payload
            },
            "response": {}
        }))
        .expect("detail")
    }

    #[test]
    fn derives_epoch_from_head_commit_timestamp() {
        let detail = detail_with_payload(json!({
            "head_commit": {"timestamp": "1970-01-01T00:25:00+00:00"}
        }));
        assert_eq!(detail.head_commit_epoch(), Some(1500));
    }

    #[test]
    fn offset_is_folded_into_the_epoch() {
        let utc = detail_with_payload(json!({
            "head_commit": {"timestamp": "2024-06-01T12:00:00+00:00"}
        }));
        let eastern = detail_with_payload(json!({
            "head_commit": {"timestamp": "2024-06-01T08:00:00-04:00"}
        }));
        assert_eq!(utc.head_commit_epoch(), eastern.head_commit_epoch());
    }

    #[test]
    fn malformed_timestamp_yields_none() {
        let detail = detail_with_payload(json!({
            "head_commit": {"timestamp": "yesterday-ish"}
        }));
        assert_eq!(detail.head_commit_epoch(), None);

        let missing = detail_with_payload(json!({"pusher": {"name": "x"}}));
        assert_eq!(missing.head_commit_epoch(), None);
    }

    #[test]
    fn branch_strips_refs_heads_prefix() {
        let detail = detail_with_payload(json!({"ref": "refs/heads/develop"}));
        assert_eq!(detail.branch(), Some("develop"));

        let tag = detail_with_payload(json!({"ref": "v1.2.3"}));
        assert_eq!(tag.branch(), Some("v1.2.3"));
    }

    #[test]
    fn response_absence_requires_both_sides_empty() {
        let absent = DeliveryResponse::default();
        assert!(absent.is_absent());

        let with_payload = DeliveryResponse {
            payload: Some("ok".to_string()),
            ..DeliveryResponse::default()
        };
        assert!(!with_payload.is_absent());
    }

    #[test]
    fn watermark_round_trips_legacy_field_names() {
        let raw = r#"{"delivery_id":"d-9","delivery date-time":"2024-06-01T12:00:00+00:00","timestamp":1717243200}"#;
        let watermark = serde_json::from_str::<Watermark>(raw).expect("watermark");
        assert_eq!(watermark.delivery_id.as_deref(), Some("d-9"));
        assert_eq!(watermark.timestamp, 1_717_243_200);

        let serialized = serde_json::to_string(&watermark).expect("serialize");
        assert!(serialized.contains("delivery date-time"));
    }

    #[test]
    fn delivery_id_and_signature_come_from_request_headers() {
        let detail = detail_with_payload(json!({}));
        assert_eq!(detail.delivery_id(), Some("d-1"));
        assert_eq!(detail.signature(), Some("sha256=aa"));
    }
}
