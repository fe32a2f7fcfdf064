use crate::models::Order;
use crate::sync::models::STATUS_DELIVERED;
use crate::sync::traits::CarrierAdapter;
use std::collections::HashSet;

/// Orders eligible for one carrier's refresh cycle, plus skip accounting.
#[derive(Debug, Clone, Default)]
pub struct EligibleSet {
    pub orders: Vec<Order>,
    /// Orders excluded by the carrier's skip predicate.
    pub skipped: u64,
}

impl EligibleSet {
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Case-insensitive exact match against the delivered terminal status.
///
/// "delivered shipment" is not a match; such orders stay eligible.
pub fn is_delivered(status: &str) -> bool {
    status.eq_ignore_ascii_case(STATUS_DELIVERED)
}

/// Filter the collection down to orders the given carrier should refresh:
/// a non-trivial tracking number, and not excluded by the carrier's skip
/// predicate.
pub fn eligible_orders(orders: &[Order], adapter: &dyn CarrierAdapter) -> EligibleSet {
    let mut eligible = EligibleSet::default();
    for order in orders {
        if order.tracking_number.trim().is_empty() {
            continue;
        }
        if adapter.should_skip(order) {
            eligible.skipped += 1;
            continue;
        }
        eligible.orders.push(order.clone());
    }
    eligible
}

/// Deduplicate trimmed tracking numbers, preserving first-seen order, so a
/// cycle issues exactly one request per distinct identifier.
pub fn unique_tracking_numbers(orders: &[Order]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for order in orders {
        let tracking_number = order.tracking_number.trim();
        if tracking_number.is_empty() || !seen.insert(tracking_number.to_string()) {
            continue;
        }
        unique.push(tracking_number.to_string());
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testutil::FakeAdapter;
    use crate::sync::models::TrackingInfo;

    fn order(id: u64, tracking_number: &str, status: &str) -> Order {
        let mut order = Order::new(id);
        order.tracking_number = tracking_number.to_string();
        order.status = status.to_string();
        order
    }

    #[test]
    fn filters_out_blank_tracking_numbers() {
        let orders = vec![
            order(1, "A1", "Pending"),
            order(2, "", "Pending"),
            order(3, "   ", "Pending"),
        ];
        let adapter = FakeAdapter::bulk("test");
        let eligible = eligible_orders(&orders, &adapter);
        assert_eq!(eligible.orders.len(), 1);
        assert_eq!(eligible.orders[0].id, 1);
        assert_eq!(eligible.skipped, 0);
    }

    #[test]
    fn delivered_skip_is_case_insensitive_and_exact() {
        let orders = vec![
            order(1, "A1", "Delivered"),
            order(2, "B2", "DELIVERED"),
            order(3, "C3", "delivered shipment"),
            order(4, "D4", "In transit"),
        ];
        let adapter = FakeAdapter::bulk("test");
        let eligible = eligible_orders(&orders, &adapter);
        let ids: Vec<u64> = eligible.orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(eligible.skipped, 2);
    }

    #[test]
    fn delivered_skip_uses_tracking_derived_status_first() {
        let mut delivered_by_tracking = order(1, "A1", "In transit");
        let mut info = TrackingInfo::unknown();
        info.status = "Delivered".to_string();
        delivered_by_tracking.tracking_info = Some(info);

        let adapter = FakeAdapter::bulk("test");
        let eligible = eligible_orders(&[delivered_by_tracking], &adapter);
        assert!(eligible.is_empty());
        assert_eq!(eligible.skipped, 1);
    }

    #[test]
    fn keyed_carrier_never_skips_delivered() {
        let orders = vec![order(1, "A1", "Delivered")];
        let adapter = FakeAdapter::keyed("test");
        let eligible = eligible_orders(&orders, &adapter);
        assert_eq!(eligible.orders.len(), 1);
        assert_eq!(eligible.skipped, 0);
    }

    #[test]
    fn dedupes_trimmed_identifiers_preserving_order() {
        let orders = vec![
            order(1, "A", "Pending"),
            order(2, " A ", "Pending"),
            order(3, "B", "Pending"),
        ];
        assert_eq!(unique_tracking_numbers(&orders), vec!["A", "B"]);
    }
}
