use crate::store::traits::{ConfigStore, OrderStore};
use crate::sync::merge::{apply_tracking, MergeOutcome};
use crate::sync::models::{OrderRefreshResult, RefreshReport};
use crate::sync::policy;
use crate::sync::traits::{CarrierAdapter, SyncPass};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-identifier failure reported when the carrier silently drops an
/// identifier from its response.
const NOT_IN_RESPONSE: &str = "Tracking number not found in carrier response";

/// Orchestrates fetch, normalize, merge, and persist for every registered
/// carrier.
///
/// Adapters run in registration order during an auto-update pass, so the bulk
/// carrier is registered first and its pass fully completes (including its
/// save and last-update stamp) before the keyed carrier's begins.
pub struct TrackingSyncEngine {
    orders: Arc<dyn OrderStore>,
    config: Arc<dyn ConfigStore>,
    adapters: RwLock<Vec<Arc<dyn CarrierAdapter>>>,
}

impl TrackingSyncEngine {
    pub fn new(orders: Arc<dyn OrderStore>, config: Arc<dyn ConfigStore>) -> Self {
        Self {
            orders,
            config,
            adapters: RwLock::new(Vec::new()),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, adapter))]
    pub async fn register_adapter(&self, adapter: Arc<dyn CarrierAdapter>) -> Result<()> {
        let id = adapter.id();
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("carrier id is empty".to_string()));
        }
        let mut adapters = self.adapters.write().await;
        match adapters.iter_mut().find(|a| a.id() == id) {
            Some(existing) => *existing = adapter,
            None => adapters.push(adapter),
        }
        Ok(())
    }

    async fn adapter(&self, carrier_id: &str) -> Result<Arc<dyn CarrierAdapter>> {
        let adapters = self.adapters.read().await;
        adapters
            .iter()
            .find(|a| a.id() == carrier_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("carrier '{carrier_id}' not registered")))
    }

    /// Refresh one order against one carrier, for the route layer.
    ///
    /// A lookup the carrier cannot resolve is a per-order failure in the
    /// returned result, not an `Err`; errors are reserved for an unknown
    /// order, a missing tracking number, or a store failure.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn refresh_order(
        &self,
        order_id: u64,
        carrier_id: &str,
    ) -> Result<OrderRefreshResult> {
        let adapter = self.adapter(carrier_id).await?;
        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("order {order_id} not found")))?;

        let tracking_number = order.tracking_number.trim().to_string();
        if tracking_number.is_empty() {
            return Err(Error::InvalidInput(format!(
                "order {order_id} has no tracking number"
            )));
        }

        let results = adapter.fetch(std::slice::from_ref(&tracking_number)).await?;
        let result = match results.get(&tracking_number) {
            None => OrderRefreshResult::failed(order_id, &tracking_number, NOT_IN_RESPONSE),
            Some(info) => match apply_tracking(&mut order, adapter.slot(), info) {
                MergeOutcome::Rejected => OrderRefreshResult::failed(
                    order_id,
                    &tracking_number,
                    info.error.as_deref().unwrap_or("carrier lookup failed"),
                ),
                MergeOutcome::Applied => {
                    self.orders.upsert(order).await?;
                    self.save_best_effort().await;
                    OrderRefreshResult::succeeded(order_id, &tracking_number)
                }
            },
        };
        Ok(result)
    }

    /// One full fetch-normalize-merge-persist cycle for one carrier.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn refresh_all(&self, carrier_id: &str) -> Result<RefreshReport> {
        let adapter = self.adapter(carrier_id).await?;
        let all_orders = self.orders.list().await?;
        let eligible = policy::eligible_orders(&all_orders, adapter.as_ref());

        let mut report = RefreshReport {
            skipped: eligible.skipped,
            total: eligible.orders.len() as u64,
            ..Default::default()
        };
        if eligible.is_empty() {
            tracing::info!(carrier = carrier_id, skipped = report.skipped, "nothing to refresh");
            return Ok(report);
        }

        let tracking_numbers = policy::unique_tracking_numbers(&eligible.orders);
        tracing::info!(
            carrier = carrier_id,
            identifiers = tracking_numbers.len(),
            orders = eligible.orders.len(),
            "fetching tracking state"
        );
        let results = adapter.fetch(&tracking_numbers).await?;

        // Fan results back out to every order sharing an identifier.
        for mut order in eligible.orders {
            let order_id = order.id;
            let tracking_number = order.tracking_number.trim().to_string();
            let result = match results.get(&tracking_number) {
                None => OrderRefreshResult::failed(order_id, &tracking_number, NOT_IN_RESPONSE),
                Some(info) => match apply_tracking(&mut order, adapter.slot(), info) {
                    MergeOutcome::Rejected => OrderRefreshResult::failed(
                        order_id,
                        &tracking_number,
                        info.error.as_deref().unwrap_or("carrier lookup failed"),
                    ),
                    MergeOutcome::Applied => {
                        self.orders.upsert(order).await?;
                        OrderRefreshResult::succeeded(order_id, &tracking_number)
                    }
                },
            };
            if result.success {
                report.updated += 1;
            } else {
                report.failed += 1;
            }
            report.results.push(result);
        }

        self.save_best_effort().await;

        // Stamped only when the network phase actually ran for this carrier.
        if report.attempted() {
            if let Err(error) = self
                .config
                .set_carrier_last_update(carrier_id, Utc::now())
                .await
            {
                tracing::warn!(carrier = carrier_id, %error, "failed to stamp last update");
            }
        }

        tracing::info!(
            carrier = carrier_id,
            updated = report.updated,
            failed = report.failed,
            skipped = report.skipped,
            total = report.total,
            "refresh cycle completed"
        );
        Ok(report)
    }

    /// One auto-update pass: sequential refresh-all over every registered
    /// carrier, skipping carriers that are not ready. A carrier's failure is
    /// logged and the pass continues.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn run_auto_pass(&self) -> Result<()> {
        let adapters: Vec<Arc<dyn CarrierAdapter>> = self.adapters.read().await.clone();
        for adapter in adapters {
            if !adapter.ready().await {
                tracing::info!(carrier = adapter.id(), "carrier not ready, skipping");
                continue;
            }
            if let Err(error) = self.refresh_all(adapter.id()).await {
                tracing::warn!(carrier = adapter.id(), %error, "carrier pass failed");
            }
        }
        Ok(())
    }

    async fn save_best_effort(&self) {
        if let Err(error) = self.orders.save().await {
            tracing::warn!(%error, "failed to persist orders");
        }
    }
}

#[async_trait]
impl SyncPass for TrackingSyncEngine {
    async fn run(&self) -> Result<()> {
        self.run_auto_pass().await
    }
}
