use crate::models::Order;
use crate::sync::models::{TrackingInfo, TrackingSlot};

/// What applying a fetched payload did to the order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Payload stored; counts as a successful update.
    Applied,
    /// Payload was a failure placeholder; the order was left untouched and
    /// the refresh counts as failed.
    Rejected,
}

/// Apply a fetched payload onto an order.
///
/// Error-tagged payloads never touch the order. Otherwise the carrier's slot
/// is replaced wholesale, the order status is overwritten only by an
/// informative carrier status, and `order_date` is set once from the
/// earliest event date and never overwritten afterwards. Fields unrelated to
/// tracking are never touched.
pub fn apply_tracking(order: &mut Order, slot: TrackingSlot, info: &TrackingInfo) -> MergeOutcome {
    if info.is_error() {
        return MergeOutcome::Rejected;
    }

    if info.has_informative_status() {
        order.status = info.status.clone();
    }
    if let Some(earliest) = info.earliest_date.as_deref().filter(|d| !d.is_empty()) {
        if order.order_date.trim().is_empty() {
            order.order_date = earliest.to_string();
        }
    }
    match slot {
        TrackingSlot::Primary => order.tracking_info = Some(info.clone()),
        TrackingSlot::Secondary => order.doar_tracking_info = Some(info.clone()),
    }
    MergeOutcome::Applied
}
