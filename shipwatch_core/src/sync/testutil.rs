//! In-memory fakes shared by the sync core's tests.

use crate::models::Order;
use crate::store::traits::{ConfigStore, OrderStore, DEFAULT_AUTO_UPDATE_INTERVAL_HOURS};
use crate::sync::models::{TrackingInfo, TrackingSlot};
use crate::sync::policy;
use crate::sync::traits::{CarrierAdapter, SyncPass};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<Vec<Order>>,
    pub save_count: AtomicU64,
    pub fail_saves: AtomicBool,
}

impl MemoryOrderStore {
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: Mutex::new(orders),
            ..Default::default()
        }
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn get(&self, id: u64) -> Result<Option<Order>> {
        Ok(self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned())
    }

    async fn upsert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.lock().unwrap();
        match orders.iter_mut().find(|o| o.id == order.id) {
            Some(slot) => *slot = order,
            None => orders.push(order),
        }
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let mut orders = self.orders.lock().unwrap();
        let before = orders.len();
        orders.retain(|o| o.id != id);
        Ok(orders.len() != before)
    }

    async fn next_order_id(&self) -> Result<u64> {
        let orders = self.orders.lock().unwrap();
        Ok(orders.iter().map(|o| o.id).max().map_or(1, |max| max + 1))
    }

    async fn save(&self) -> Result<()> {
        if self.fail_saves.load(Ordering::Relaxed) {
            return Err(Error::BackendMessage("save failed".to_string()));
        }
        self.save_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryConfigStore {
    pub credentials: Mutex<HashMap<String, String>>,
    /// Intervals handed out in order; the last one repeats.
    pub intervals: Mutex<VecDeque<u32>>,
    pub last_updates: Mutex<HashMap<String, DateTime<Utc>>>,
    pub next_auto_updates: Mutex<Vec<DateTime<Utc>>>,
}

impl MemoryConfigStore {
    pub fn with_interval_hours(hours: u32) -> Self {
        let store = Self::default();
        store.intervals.lock().unwrap().push_back(hours);
        store
    }

    pub fn with_interval_sequence(hours: impl IntoIterator<Item = u32>) -> Self {
        let store = Self::default();
        store.intervals.lock().unwrap().extend(hours);
        store
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn carrier_credential(&self, carrier_id: &str) -> Result<Option<String>> {
        Ok(self.credentials.lock().unwrap().get(carrier_id).cloned())
    }

    async fn set_carrier_credential(&self, carrier_id: &str, credential: &str) -> Result<()> {
        let mut credentials = self.credentials.lock().unwrap();
        if credential.trim().is_empty() {
            credentials.remove(carrier_id);
        } else {
            credentials.insert(carrier_id.to_string(), credential.to_string());
        }
        Ok(())
    }

    async fn auto_update_interval_hours(&self) -> Result<u32> {
        let mut intervals = self.intervals.lock().unwrap();
        Ok(match intervals.len() {
            0 => DEFAULT_AUTO_UPDATE_INTERVAL_HOURS,
            1 => *intervals.front().unwrap(),
            _ => intervals.pop_front().unwrap(),
        })
    }

    async fn set_auto_update_interval_hours(&self, hours: u32) -> Result<()> {
        let mut intervals = self.intervals.lock().unwrap();
        intervals.clear();
        intervals.push_back(hours);
        Ok(())
    }

    async fn carrier_last_update(&self, carrier_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.last_updates.lock().unwrap().get(carrier_id).copied())
    }

    async fn set_carrier_last_update(&self, carrier_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.last_updates.lock().unwrap().insert(carrier_id.to_string(), at);
        Ok(())
    }

    async fn next_auto_update(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.next_auto_updates.lock().unwrap().last().copied())
    }

    async fn set_next_auto_update(&self, at: DateTime<Utc>) -> Result<()> {
        self.next_auto_updates.lock().unwrap().push(at);
        Ok(())
    }
}

/// Scripted carrier adapter recording every dispatched identifier batch.
pub struct FakeAdapter {
    id: &'static str,
    slot: TrackingSlot,
    skip_delivered: bool,
    pub ready: AtomicBool,
    pub responses: Mutex<HashMap<String, TrackingInfo>>,
    pub fetches: Mutex<Vec<Vec<String>>>,
}

impl FakeAdapter {
    /// Bulk-carrier shape: primary slot, delivered orders skipped.
    pub fn bulk(id: &'static str) -> Self {
        Self {
            id,
            slot: TrackingSlot::Primary,
            skip_delivered: true,
            ready: AtomicBool::new(true),
            responses: Mutex::new(HashMap::new()),
            fetches: Mutex::new(Vec::new()),
        }
    }

    /// Keyed-carrier shape: secondary slot, no skip predicate.
    pub fn keyed(id: &'static str) -> Self {
        Self {
            skip_delivered: false,
            slot: TrackingSlot::Secondary,
            ..Self::bulk(id)
        }
    }

    pub fn respond_with(&self, tracking_number: &str, info: TrackingInfo) {
        self.responses
            .lock()
            .unwrap()
            .insert(tracking_number.to_string(), info);
    }

    pub fn dispatched(&self) -> Vec<Vec<String>> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl CarrierAdapter for FakeAdapter {
    fn id(&self) -> &'static str {
        self.id
    }

    fn slot(&self) -> TrackingSlot {
        self.slot
    }

    fn should_skip(&self, order: &Order) -> bool {
        self.skip_delivered && policy::is_delivered(order.effective_status())
    }

    async fn ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    async fn fetch(&self, tracking_numbers: &[String]) -> Result<HashMap<String, TrackingInfo>> {
        self.fetches.lock().unwrap().push(tracking_numbers.to_vec());
        let responses = self.responses.lock().unwrap();
        Ok(tracking_numbers
            .iter()
            .filter_map(|tn| responses.get(tn).map(|info| (tn.clone(), info.clone())))
            .collect())
    }
}

/// Scripted synchronization pass for scheduler tests.
#[derive(Default)]
pub struct FakePass {
    pub runs: AtomicU64,
    pub fail: AtomicBool,
    pub ran: Notify,
}

#[async_trait]
impl SyncPass for FakePass {
    async fn run(&self) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.ran.notify_waiters();
        if self.fail.load(Ordering::Relaxed) {
            return Err(Error::BackendMessage("pass failed".to_string()));
        }
        Ok(())
    }
}
