//! Cainiao bulk tracking: one request resolves N identifiers.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{header, Client};
use serde_json::Value;
use shipwatch_core::sync::policy;
use shipwatch_core::{CarrierAdapter, Order, Result, TrackingEvent, TrackingInfo, TrackingSlot};
use std::collections::HashMap;
use std::time::Duration;

pub const CARRIER_ID: &str = "cainiao";

const BASE_URL: &str = "https://global.cainiao.com/global/detail.json";
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:144.0) Gecko/20100101 Firefox/144.0";

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn format_epoch_ms(millis: i64) -> Option<String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Convert one `module` entry of a tracking response into a `TrackingInfo`.
///
/// Tolerates any malformed or partial input: absent fields degrade to an
/// `"Unknown"` status, an empty event list, and null dates.
pub fn normalize_module(module: &Value) -> TrackingInfo {
    let mut info = TrackingInfo::unknown();
    if !module.is_object() {
        return info;
    }

    let detail_list = module
        .get("detailList")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    // Status: latest trace's group description, else the newest raw event's,
    // else the top-level status fields.
    let status = module
        .pointer("/latestTrace/group/nodeDesc")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            detail_list
                .first()
                .and_then(|event| event.pointer("/group/nodeDesc"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .or_else(|| str_field(module, "statusDesc"))
        .or_else(|| str_field(module, "status"));
    if let Some(status) = status {
        info.status = status.to_string();
    }

    if let Some(latest) = detail_list.first() {
        info.latest_detail = str_field(latest, "standerdDesc")
            .or_else(|| str_field(latest, "desc"))
            .map(str::to_string);
    }

    info.carrier = str_field(module, "carrier")
        .or_else(|| str_field(module, "carrierName"))
        .map(str::to_string);
    if let (Some(origin), Some(dest)) =
        (str_field(module, "originCountry"), str_field(module, "destCountry"))
    {
        info.carrier = Some(format!("{origin} → {dest}"));
    }

    // The raw list is newest-first; keep displayable entries, then reverse so
    // the stored sequence starts at the oldest event.
    let mut events = Vec::new();
    for raw in detail_list {
        let Some(description) = str_field(raw, "standerdDesc")
            .or_else(|| str_field(raw, "desc"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            continue;
        };
        let date = str_field(raw, "timeStr").map(str::to_string).or_else(|| {
            raw.get("time")
                .and_then(Value::as_i64)
                .filter(|t| *t != 0)
                .and_then(format_epoch_ms)
        });
        let mut event = TrackingEvent::new(description, date);
        event.node_desc = raw
            .pointer("/group/nodeDesc")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        events.push(event);
    }
    events.reverse();
    info.events = events;

    // Boundary dates come from the raw entries' own timestamps, preferring a
    // pre-formatted time string over converting the epoch value.
    if !info.events.is_empty() {
        let mut timestamps: Vec<(i64, Option<String>)> = detail_list
            .iter()
            .filter_map(|raw| {
                let millis = raw.get("time").and_then(Value::as_i64).filter(|t| *t != 0)?;
                Some((millis, str_field(raw, "timeStr").map(str::to_string)))
            })
            .collect();
        timestamps.sort_by_key(|(millis, _)| *millis);
        if let (Some((earliest_ms, earliest_str)), Some((latest_ms, latest_str))) =
            (timestamps.first().cloned(), timestamps.last().cloned())
        {
            info.earliest_date = earliest_str.or_else(|| format_epoch_ms(earliest_ms));
            info.last_update_date = latest_str.or_else(|| format_epoch_ms(latest_ms));
        }
    }

    info
}

/// HTTP client for the bulk lookup endpoint.
pub struct CainiaoClient {
    client: Client,
    base_url: String,
}

impl CainiaoClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Fetch tracking state for all identifiers in one round trip.
    ///
    /// Returns identifier → `TrackingInfo` for every entry the carrier
    /// resolved; identifiers the carrier silently drops are absent. A
    /// transport or parse failure yields an empty map.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch_bulk(&self, tracking_numbers: &[String]) -> HashMap<String, TrackingInfo> {
        let valid: Vec<&str> = tracking_numbers
            .iter()
            .map(|tn| tn.trim())
            .filter(|tn| !tn.is_empty())
            .collect();
        if valid.is_empty() {
            return HashMap::new();
        }

        let url = format!(
            "{}?mailNos={}&lang=en-US&language=en-US",
            self.base_url,
            valid.join(",")
        );
        let referer = format!(
            "https://global.cainiao.com/newDetail.htm?mailNoList={}&otherMailNoList=",
            valid.join("%2C")
        );

        let response = match self
            .client
            .get(&url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json, text/plain, */*")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(header::REFERER, referer)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "bulk tracking request failed");
                return HashMap::new();
            }
        };

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(%error, "failed to parse bulk tracking response");
                return HashMap::new();
            }
        };

        let mut results = HashMap::new();
        if body.get("success").and_then(Value::as_bool).unwrap_or(false) {
            if let Some(modules) = body.get("module").and_then(Value::as_array) {
                for module in modules {
                    if let Some(mail_no) = str_field(module, "mailNo") {
                        results.insert(mail_no.to_string(), normalize_module(module));
                    }
                }
            }
        }
        results
    }
}

impl Default for CainiaoClient {
    fn default() -> Self {
        Self::new()
    }
}

/// The bulk carrier as seen by the sync core: primary tracking slot,
/// delivered orders skipped before dispatch.
pub struct CainiaoAdapter {
    client: CainiaoClient,
}

impl CainiaoAdapter {
    pub fn new() -> Self {
        Self {
            client: CainiaoClient::new(),
        }
    }
}

impl Default for CainiaoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CarrierAdapter for CainiaoAdapter {
    fn id(&self) -> &'static str {
        CARRIER_ID
    }

    fn slot(&self) -> TrackingSlot {
        TrackingSlot::Primary
    }

    fn should_skip(&self, order: &Order) -> bool {
        policy::is_delivered(order.effective_status())
    }

    async fn fetch(&self, tracking_numbers: &[String]) -> Result<HashMap<String, TrackingInfo>> {
        Ok(self.client.fetch_bulk(tracking_numbers).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn newest_first_raw_list_is_stored_oldest_first() {
        let module = json!({
            "detailList": [
                { "desc": "C", "time": 300 },
                { "desc": "B", "time": 200 },
                { "desc": "A", "time": 100 },
            ]
        });

        let info = normalize_module(&module);

        let descriptions: Vec<&str> =
            info.events.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["A", "B", "C"]);
        assert_eq!(info.earliest_date.as_deref(), Some("1970-01-01 00:00:00"));
        assert_eq!(info.last_update_date.as_deref(), Some("1970-01-01 00:00:00"));
    }

    #[test]
    fn boundary_dates_come_from_min_and_max_timestamps() {
        // Raw order deliberately scrambled; only the timestamps matter.
        let module = json!({
            "detailList": [
                { "desc": "mid", "time": 1700000600000i64 },
                { "desc": "last", "time": 1700001200000i64 },
                { "desc": "first", "time": 1700000000000i64 },
            ]
        });

        let info = normalize_module(&module);

        assert_eq!(info.earliest_date.as_deref(), Some("2023-11-14 22:13:20"));
        assert_eq!(info.last_update_date.as_deref(), Some("2023-11-14 22:33:20"));
    }

    #[test]
    fn time_str_is_preferred_over_the_epoch_timestamp() {
        let module = json!({
            "detailList": [
                { "desc": "arrived", "time": 1700000000000i64, "timeStr": "2023-11-15 08:13:20" },
            ]
        });

        let info = normalize_module(&module);

        assert_eq!(info.events[0].date.as_deref(), Some("2023-11-15 08:13:20"));
        assert_eq!(info.earliest_date.as_deref(), Some("2023-11-15 08:13:20"));
    }

    #[test]
    fn status_prefers_latest_trace_group() {
        let module = json!({
            "latestTrace": { "group": { "nodeDesc": "Delivered" } },
            "statusDesc": "In transit",
            "detailList": [
                { "desc": "arrived", "group": { "nodeDesc": "Transit" } },
            ]
        });
        assert_eq!(normalize_module(&module).status, "Delivered");
    }

    #[test]
    fn status_falls_back_through_event_group_then_top_level() {
        let from_event = json!({
            "detailList": [ { "desc": "arrived", "group": { "nodeDesc": "Transit" } } ]
        });
        assert_eq!(normalize_module(&from_event).status, "Transit");

        let from_status_desc = json!({ "statusDesc": "In transit", "detailList": [] });
        assert_eq!(normalize_module(&from_status_desc).status, "In transit");

        let from_status = json!({ "status": "DELIVERING" });
        assert_eq!(normalize_module(&from_status).status, "DELIVERING");

        assert_eq!(normalize_module(&json!({})).status, "Unknown");
    }

    #[test]
    fn malformed_input_degrades_to_unknown() {
        for module in [json!(null), json!("text"), json!(42), json!([1, 2])] {
            let info = normalize_module(&module);
            assert_eq!(info.status, "Unknown");
            assert!(info.events.is_empty());
            assert!(info.earliest_date.is_none());
            assert!(!info.is_error());
        }
    }

    #[test]
    fn entries_without_a_description_are_dropped() {
        let module = json!({
            "detailList": [
                { "desc": "  " },
                { "time": 100 },
                { "desc": "kept", "time": 200 },
            ]
        });

        let info = normalize_module(&module);
        assert_eq!(info.events.len(), 1);
        assert_eq!(info.events[0].description, "kept");
    }

    #[test]
    fn origin_and_destination_synthesize_the_carrier() {
        let module = json!({
            "carrierName": "SomePost",
            "originCountry": "CN",
            "destCountry": "IL",
        });
        assert_eq!(normalize_module(&module).carrier.as_deref(), Some("CN → IL"));

        let only_name = json!({ "carrierName": "SomePost", "originCountry": "CN" });
        assert_eq!(normalize_module(&only_name).carrier.as_deref(), Some("SomePost"));
    }

    #[test]
    fn latest_detail_comes_from_the_newest_raw_entry() {
        let module = json!({
            "detailList": [
                { "standerdDesc": "Out for delivery", "desc": "ignored" },
                { "desc": "older" },
            ]
        });
        assert_eq!(
            normalize_module(&module).latest_detail.as_deref(),
            Some("Out for delivery")
        );
    }
}
