//! Israel Post keyed tracking: one identifier per request, credential
//! required. Every failure path resolves to an error-tagged `TrackingInfo`
//! so a single bad identifier can never abort a batch.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use shipwatch_core::{
    CarrierAdapter, ConfigStore, Result, TrackingEvent, TrackingInfo, TrackingSlot,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const CARRIER_ID: &str = "israel_post";

const BASE_URL: &str = "https://apimftprd.israelpost.co.il/MyPost-itemtrace";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MISSING_KEY: &str = "Israel Post API key not configured";

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Convert a tracking response body into a `TrackingInfo`.
///
/// The `Maslul` history array arrives oldest-first and is kept in native
/// order. Tolerates malformed input the same way the bulk normalizer does.
pub fn normalize_response(data: &Value) -> TrackingInfo {
    let mut info = TrackingInfo::unknown();
    if !data.is_object() {
        return info;
    }

    if let Some(category) = str_field(data, "CategoryName") {
        info.status = category.to_string();
    }
    info.delivery_type = str_field(data, "DeliveryTypeDesc").map(str::to_string);

    let mut events = Vec::new();
    if let Some(history) = data.get("Maslul").and_then(Value::as_array) {
        for raw in history {
            let Some(description) = str_field(raw, "Status") else {
                continue;
            };
            let mut event =
                TrackingEvent::new(description, str_field(raw, "StatusDate").map(str::to_string));
            event.category = str_field(raw, "CategoryName").map(str::to_string);
            event.branch = str_field(raw, "BranchName").map(str::to_string);
            event.city = str_field(raw, "City").map(str::to_string);
            events.push(event);
        }
    }

    // Detail status: the explicit top-level field, else the latest event.
    info.status_detail = str_field(data, "Status")
        .map(str::to_string)
        .or_else(|| events.last().map(|event| event.description.clone()));
    info.last_update_date = events.last().and_then(|event| event.date.clone());
    info.events = events;
    info
}

/// HTTP client for the per-identifier lookup endpoint.
pub struct IsraelPostClient {
    client: Client,
    base_url: String,
}

impl IsraelPostClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Look up one identifier. Never fails: authentication, not-found, HTTP,
    /// transport, and parse problems all come back as error-tagged infos.
    #[tracing::instrument(level = "debug", skip(self, api_key))]
    pub async fn fetch_one(&self, tracking_number: &str, api_key: &str) -> TrackingInfo {
        let url = format!("{}/items/{}/heb", self.base_url, tracking_number);
        let response = match self
            .client
            .get(&url)
            .header("Ocp-Apim-Subscription-Key", api_key)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) if error.is_timeout() => {
                tracing::warn!(tracking_number, "keyed lookup timed out");
                return TrackingInfo::failed(
                    "Request timed out. The Israel Post API is taking too long to respond.",
                );
            }
            Err(error) if error.is_connect() => {
                tracing::warn!(tracking_number, %error, "keyed lookup connection failed");
                return TrackingInfo::failed(
                    "Connection error. Unable to reach the Israel Post API.",
                );
            }
            Err(error) => {
                tracing::warn!(tracking_number, %error, "keyed lookup failed");
                return TrackingInfo::failed(error.to_string());
            }
        };

        match response.status() {
            StatusCode::UNAUTHORIZED => return TrackingInfo::failed("Invalid API key"),
            StatusCode::NOT_FOUND => return TrackingInfo::failed("Tracking number not found"),
            status if !status.is_success() => {
                return TrackingInfo::failed(format!("HTTP {}", status.as_u16()));
            }
            _ => {}
        }

        match response.json::<Value>().await {
            Ok(body) => normalize_response(&body),
            Err(error) if error.is_timeout() => TrackingInfo::failed(
                "Request timed out. The Israel Post API is taking too long to respond.",
            ),
            Err(error) => {
                tracing::warn!(tracking_number, %error, "failed to parse keyed response");
                TrackingInfo::failed("Failed to parse tracking data")
            }
        }
    }
}

impl Default for IsraelPostClient {
    fn default() -> Self {
        Self::new()
    }
}

/// The keyed carrier as seen by the sync core: secondary tracking slot, no
/// skip predicate, credential read fresh from the config store.
pub struct IsraelPostAdapter {
    client: IsraelPostClient,
    config: Arc<dyn ConfigStore>,
}

impl IsraelPostAdapter {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self {
            client: IsraelPostClient::new(),
            config,
        }
    }

    async fn credential(&self) -> Result<Option<String>> {
        Ok(self
            .config
            .carrier_credential(CARRIER_ID)
            .await?
            .filter(|key| !key.trim().is_empty()))
    }
}

#[async_trait]
impl CarrierAdapter for IsraelPostAdapter {
    fn id(&self) -> &'static str {
        CARRIER_ID
    }

    fn slot(&self) -> TrackingSlot {
        TrackingSlot::Secondary
    }

    async fn ready(&self) -> bool {
        matches!(self.credential().await, Ok(Some(_)))
    }

    async fn fetch(&self, tracking_numbers: &[String]) -> Result<HashMap<String, TrackingInfo>> {
        let mut results = HashMap::new();
        // Lookups are issued one identifier at a time, in sequence.
        for tracking_number in tracking_numbers {
            let trimmed = tracking_number.trim();
            if trimmed.is_empty() {
                continue;
            }
            let info = match self.credential().await? {
                // No credential: error-tagged result, no network call.
                None => TrackingInfo::failed(MISSING_KEY),
                Some(key) => self.client.fetch_one(trimmed, &key).await,
            };
            results.insert(tracking_number.clone(), info);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    #[test]
    fn history_is_kept_in_native_order() {
        let data = json!({
            "CategoryName": "In delivery",
            "Maslul": [
                { "Status": "Accepted", "StatusDate": "01/11/2023" },
                { "Status": "Arrived at sorting center", "StatusDate": "03/11/2023" },
                { "Status": "Out for delivery", "StatusDate": "05/11/2023" },
            ]
        });

        let info = normalize_response(&data);

        let descriptions: Vec<&str> =
            info.events.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["Accepted", "Arrived at sorting center", "Out for delivery"]
        );
        assert_eq!(info.status, "In delivery");
        assert_eq!(info.last_update_date.as_deref(), Some("05/11/2023"));
    }

    #[test]
    fn status_detail_prefers_the_top_level_field() {
        let data = json!({
            "Status": "At the branch",
            "Maslul": [ { "Status": "Accepted" } ]
        });
        assert_eq!(
            normalize_response(&data).status_detail.as_deref(),
            Some("At the branch")
        );
    }

    #[test]
    fn status_detail_falls_back_to_the_latest_event() {
        let data = json!({
            "Maslul": [
                { "Status": "Accepted" },
                { "Status": "Out for delivery" },
            ]
        });
        assert_eq!(
            normalize_response(&data).status_detail.as_deref(),
            Some("Out for delivery")
        );
    }

    #[test]
    fn event_location_fields_are_captured() {
        let data = json!({
            "DeliveryTypeDesc": "Registered mail",
            "Maslul": [
                { "Status": "Accepted", "CategoryName": "Intake", "BranchName": "Tel Aviv 1", "City": "Tel Aviv" },
            ]
        });

        let info = normalize_response(&data);
        assert_eq!(info.delivery_type.as_deref(), Some("Registered mail"));
        let event = &info.events[0];
        assert_eq!(event.category.as_deref(), Some("Intake"));
        assert_eq!(event.branch.as_deref(), Some("Tel Aviv 1"));
        assert_eq!(event.city.as_deref(), Some("Tel Aviv"));
    }

    #[test]
    fn malformed_input_degrades_to_unknown() {
        for data in [json!(null), json!("text"), json!([1])] {
            let info = normalize_response(&data);
            assert_eq!(info.status, "Unknown");
            assert!(info.events.is_empty());
            assert!(!info.is_error());
        }

        let entries_without_status = json!({ "Maslul": [ { "StatusDate": "01/11/2023" } ] });
        assert!(normalize_response(&entries_without_status).events.is_empty());
    }

    struct FakeConfig {
        key: Option<String>,
    }

    #[async_trait]
    impl ConfigStore for FakeConfig {
        async fn carrier_credential(&self, _carrier_id: &str) -> Result<Option<String>> {
            Ok(self.key.clone())
        }

        async fn set_carrier_credential(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn auto_update_interval_hours(&self) -> Result<u32> {
            Ok(6)
        }

        async fn set_auto_update_interval_hours(&self, _: u32) -> Result<()> {
            Ok(())
        }

        async fn carrier_last_update(&self, _: &str) -> Result<Option<DateTime<Utc>>> {
            Ok(None)
        }

        async fn set_carrier_last_update(&self, _: &str, _: DateTime<Utc>) -> Result<()> {
            Ok(())
        }

        async fn next_auto_update(&self) -> Result<Option<DateTime<Utc>>> {
            Ok(None)
        }

        async fn set_next_auto_update(&self, _: DateTime<Utc>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn missing_credential_fails_each_identifier_without_a_network_call() {
        let adapter = IsraelPostAdapter::new(Arc::new(FakeConfig { key: None }));
        assert!(!adapter.ready().await);

        let results = adapter
            .fetch(&["RR123".to_string(), "RR456".to_string()])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        for info in results.values() {
            assert!(info.is_error());
            assert_eq!(info.error.as_deref(), Some(MISSING_KEY));
        }
    }

    #[tokio::test]
    async fn blank_credential_counts_as_missing() {
        let adapter = IsraelPostAdapter::new(Arc::new(FakeConfig {
            key: Some("   ".to_string()),
        }));
        assert!(!adapter.ready().await);
    }

    /// Serve one canned HTTP response on a loopback socket and return the
    /// base URL to point the client at.
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn http_401_means_invalid_api_key() {
        let base =
            serve_once("HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
        let info = IsraelPostClient::new()
            .with_base_url(base)
            .fetch_one("RR123", "bad-key")
            .await;
        assert_eq!(info.error.as_deref(), Some("Invalid API key"));
        assert_eq!(info.status, "Error");
    }

    #[tokio::test]
    async fn http_404_means_unknown_tracking_number() {
        let base =
            serve_once("HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
        let info = IsraelPostClient::new()
            .with_base_url(base)
            .fetch_one("RR123", "key")
            .await;
        assert_eq!(info.error.as_deref(), Some("Tracking number not found"));
    }

    #[tokio::test]
    async fn other_http_statuses_are_reported_by_code() {
        let base = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let info = IsraelPostClient::new()
            .with_base_url(base)
            .fetch_one("RR123", "key")
            .await;
        assert_eq!(info.error.as_deref(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_failure() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 8\r\nconnection: close\r\n\r\nnot json",
        )
        .await;
        let info = IsraelPostClient::new()
            .with_base_url(base)
            .fetch_one("RR123", "key")
            .await;
        assert_eq!(info.error.as_deref(), Some("Failed to parse tracking data"));
    }

    #[tokio::test]
    async fn successful_body_is_normalized() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 31\r\nconnection: close\r\n\r\n{\"CategoryName\":\"In delivery\"}\n",
        )
        .await;
        let info = IsraelPostClient::new()
            .with_base_url(base)
            .fetch_one("RR123", "key")
            .await;
        assert!(!info.is_error());
        assert_eq!(info.status, "In delivery");
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let info = IsraelPostClient::new()
            .with_base_url(format!("http://{addr}"))
            .fetch_one("RR123", "key")
            .await;
        assert!(info.is_error());
        assert!(info
            .error
            .as_deref()
            .unwrap()
            .starts_with("Connection error"));
    }
}
