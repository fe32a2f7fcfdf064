use crate::sync::models::TrackingInfo;
use serde::{Deserialize, Serialize};

/// Display status assigned to orders that have not reported anything yet.
pub const STATUS_PENDING: &str = "Pending";

/// A tracked purchase.
///
/// Owned by the order store; mutated by the update merger and by the route
/// layer. `tracking_info` holds the bulk carrier's payload and
/// `doar_tracking_info` the keyed carrier's, under separate keys so the two
/// sources never overwrite each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    #[serde(default)]
    pub tracking_number: String,
    #[serde(default = "default_status")]
    pub status: String,
    /// Set once from the earliest tracking event date when absent; automated
    /// refreshes never overwrite it afterwards.
    #[serde(default)]
    pub order_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_info: Option<TrackingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doar_tracking_info: Option<TrackingInfo>,

    // Product metadata maintained by the route layer; the sync core ignores
    // these.
    #[serde(default)]
    pub product_title: String,
    #[serde(default)]
    pub product_url: String,
    #[serde(default)]
    pub product_image: String,
    /// Merchant-side order reference, distinct from `id`.
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub added_date: String,
}

fn default_status() -> String {
    STATUS_PENDING.to_string()
}

impl Order {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            tracking_number: String::new(),
            status: STATUS_PENDING.to_string(),
            order_date: String::new(),
            tracking_info: None,
            doar_tracking_info: None,
            product_title: String::new(),
            product_url: String::new(),
            product_image: String::new(),
            order_id: String::new(),
            added_date: String::new(),
        }
    }

    /// The tracking-derived status when present and non-empty, else the
    /// order's own status field.
    pub fn effective_status(&self) -> &str {
        self.tracking_info
            .as_ref()
            .map(|info| info.status.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.status)
    }
}
