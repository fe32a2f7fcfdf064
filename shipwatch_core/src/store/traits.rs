use crate::models::Order;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Refresh interval used when no interval has been configured.
pub const DEFAULT_AUTO_UPDATE_INTERVAL_HOURS: u32 = 6;

/// The persisted order collection.
///
/// `save` persists the current in-memory state; implementations serialize
/// saves internally, and the sync path treats a failed save as non-fatal.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Order>>;

    async fn get(&self, id: u64) -> Result<Option<Order>>;

    /// Insert the order, or replace the stored order with the same id.
    async fn upsert(&self, order: Order) -> Result<()>;

    /// Returns whether an order was actually removed.
    async fn delete(&self, id: u64) -> Result<bool>;

    /// Max existing id + 1, or 1 for an empty collection.
    async fn next_order_id(&self) -> Result<u64>;

    async fn save(&self) -> Result<()>;
}

/// Runtime-mutable settings: carrier credentials, the auto-update interval,
/// and the per-carrier last-update / next-update stamps.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn carrier_credential(&self, carrier_id: &str) -> Result<Option<String>>;

    /// A blank credential clears the stored one.
    async fn set_carrier_credential(&self, carrier_id: &str, credential: &str) -> Result<()>;

    async fn auto_update_interval_hours(&self) -> Result<u32>;

    async fn set_auto_update_interval_hours(&self, hours: u32) -> Result<()>;

    async fn carrier_last_update(&self, carrier_id: &str) -> Result<Option<DateTime<Utc>>>;

    async fn set_carrier_last_update(&self, carrier_id: &str, at: DateTime<Utc>) -> Result<()>;

    async fn next_auto_update(&self) -> Result<Option<DateTime<Utc>>>;

    async fn set_next_auto_update(&self, at: DateTime<Utc>) -> Result<()>;
}
