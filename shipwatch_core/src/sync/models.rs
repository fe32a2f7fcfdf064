use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status sentinel meaning "no usable signal found".
pub const STATUS_UNKNOWN: &str = "Unknown";

/// Status carried by failure placeholders.
pub const STATUS_ERROR: &str = "Error";

/// Terminal effective status that excludes an order from bulk refreshes.
pub const STATUS_DELIVERED: &str = "delivered";

/// Which per-carrier field on the order a fetched payload replaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingSlot {
    /// `Order::tracking_info` (bulk carrier).
    Primary,
    /// `Order::doar_tracking_info` (keyed carrier).
    Secondary,
}

/// One normalized tracking event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub description: String,
    /// Formatted display date; `None` when the source date was unparsable.
    pub date: Option<String>,
    /// Bulk carrier: the raw entry's group description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_desc: Option<String>,
    // Keyed carrier extras.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl TrackingEvent {
    pub fn new(description: impl Into<String>, date: Option<String>) -> Self {
        Self {
            description: description.into(),
            date,
            node_desc: None,
            category: None,
            branch: None,
            city: None,
        }
    }
}

/// Normalized tracking state for one shipment, as reported by one carrier.
///
/// An `error` marks the value as a failure placeholder; merge logic treats
/// those as "no usable result" and leaves the order untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub status: String,
    /// Bulk carrier: oldest event first (raw list reversed). Keyed carrier:
    /// the source's native order, untouched. The asymmetry is inherited from
    /// each source and deliberately not unified.
    #[serde(default)]
    pub events: Vec<TrackingEvent>,
    /// Carrier description; may be a synthesized "origin → destination".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    /// Keyed carrier: the delivery type description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_type: Option<String>,
    /// Bulk carrier: the most recent raw entry's detail description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_detail: Option<String>,
    /// Keyed carrier: top-level status, else the last built event's
    /// description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
    /// Derived from event timestamps, not wall-clock time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_date: Option<String>,
    /// When this payload was produced.
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrackingInfo {
    /// An empty payload with the "no usable signal" status.
    pub fn unknown() -> Self {
        Self {
            status: STATUS_UNKNOWN.to_string(),
            events: Vec::new(),
            carrier: None,
            delivery_type: None,
            latest_detail: None,
            status_detail: None,
            earliest_date: None,
            last_update_date: None,
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// A failure placeholder. Never merged into an order.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            error: Some(error.into()),
            ..Self::unknown()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the status should overwrite an order's display status.
    pub fn has_informative_status(&self) -> bool {
        !self.status.is_empty() && self.status != STATUS_UNKNOWN
    }
}

/// Outcome of one order's refresh, suitable for the route layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRefreshResult {
    pub order_id: u64,
    pub tracking_number: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OrderRefreshResult {
    pub fn succeeded(order_id: u64, tracking_number: impl Into<String>) -> Self {
        Self {
            order_id,
            tracking_number: tracking_number.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(
        order_id: u64,
        tracking_number: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            tracking_number: tracking_number.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Accounting for one carrier's refresh-all cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub updated: u64,
    pub failed: u64,
    /// Orders excluded by the carrier's skip predicate (delivered orders for
    /// the bulk carrier). A skip is not a failure.
    pub skipped: u64,
    /// Size of the eligible set (orders that entered the network phase).
    pub total: u64,
    pub results: Vec<OrderRefreshResult>,
}

impl RefreshReport {
    /// Whether the network phase ran for at least one order.
    pub fn attempted(&self) -> bool {
        self.total > 0
    }

    pub fn summary(&self) -> String {
        if self.total == 0 {
            if self.skipped > 0 {
                format!("No orders to update. {} delivered orders skipped.", self.skipped)
            } else {
                "No orders with tracking numbers found".to_string()
            }
        } else {
            let mut message = format!("Updated {} out of {} orders", self.updated, self.total);
            if self.skipped > 0 {
                message.push_str(&format!(" ({} delivered orders skipped)", self.skipped));
            }
            message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_placeholder_is_error_tagged() {
        let info = TrackingInfo::failed("timeout");
        assert!(info.is_error());
        assert_eq!(info.status, STATUS_ERROR);
        assert!(!info.has_informative_status() || info.is_error());
    }

    #[test]
    fn unknown_status_is_not_informative() {
        let info = TrackingInfo::unknown();
        assert!(!info.has_informative_status());

        let mut info = TrackingInfo::unknown();
        info.status = "In transit".to_string();
        assert!(info.has_informative_status());
    }

    #[test]
    fn summary_distinguishes_no_op_reasons() {
        let report = RefreshReport::default();
        assert_eq!(report.summary(), "No orders with tracking numbers found");

        let report = RefreshReport {
            skipped: 3,
            ..Default::default()
        };
        assert_eq!(report.summary(), "No orders to update. 3 delivered orders skipped.");

        let report = RefreshReport {
            updated: 2,
            failed: 1,
            skipped: 1,
            total: 3,
            results: Vec::new(),
        };
        assert_eq!(
            report.summary(),
            "Updated 2 out of 3 orders (1 delivered orders skipped)"
        );
    }
}
