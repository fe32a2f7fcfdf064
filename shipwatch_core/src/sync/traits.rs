use crate::models::Order;
use crate::sync::models::{TrackingInfo, TrackingSlot};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// A carrier adapter fetches tracking state for a batch of identifiers and
/// tells the sync policy how to treat orders before dispatch.
///
/// Implementations live in `shipwatch_carriers`.
#[async_trait]
pub trait CarrierAdapter: Send + Sync {
    /// Stable carrier identifier; also keys the per-carrier last-update
    /// stamp in the config store.
    fn id(&self) -> &'static str;

    /// Which field on the order this carrier's payloads replace.
    fn slot(&self) -> TrackingSlot;

    /// Whether the policy should drop this order before dispatch.
    fn should_skip(&self, _order: &Order) -> bool {
        false
    }

    /// Whether the carrier can be queried at all right now (e.g. a stored
    /// credential exists). The auto pass skips carriers that are not ready.
    async fn ready(&self) -> bool {
        true
    }

    /// Fetch tracking state for the given deduplicated identifiers.
    ///
    /// Identifiers absent from the returned map were not resolved by the
    /// carrier and count as per-identifier failures; error-tagged entries
    /// are explicit per-identifier failures. Implementations fail soft: a
    /// carrier that cannot be reached yields an empty map, not an `Err`.
    async fn fetch(&self, tracking_numbers: &[String]) -> Result<HashMap<String, TrackingInfo>>;
}

/// One full synchronization pass over every registered carrier.
///
/// The scheduler depends on this rather than on the concrete engine.
#[async_trait]
pub trait SyncPass: Send + Sync {
    async fn run(&self) -> Result<()>;
}
