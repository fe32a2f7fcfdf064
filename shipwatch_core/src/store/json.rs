//! JSON-file-backed stores.
//!
//! Both stores keep their state in memory behind an `RwLock` and rewrite the
//! whole file on save. The lock serializes concurrent saves; there is no
//! atomic-rename dance, matching the deployment's single-process model.

use crate::models::Order;
use crate::store::traits::{ConfigStore, OrderStore, DEFAULT_AUTO_UPDATE_INTERVAL_HOURS};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

async fn read_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> T {
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "corrupt store file, starting empty");
                T::default()
            }
        },
        Err(_) => T::default(),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::backend(format!("create {}", parent.display()), e))?;
    }
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| Error::backend(format!("serialize {}", path.display()), e))?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| Error::backend(format!("write {}", path.display()), e))
}

/// Order collection persisted as a JSON array in a single file.
pub struct JsonOrderStore {
    path: PathBuf,
    orders: RwLock<Vec<Order>>,
}

impl JsonOrderStore {
    /// Load the collection from `path`. A missing or corrupt file yields an
    /// empty collection.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let orders: Vec<Order> = read_json(&path).await;
        tracing::info!(path = %path.display(), count = orders.len(), "loaded orders");
        Self {
            path,
            orders: RwLock::new(orders),
        }
    }
}

#[async_trait]
impl OrderStore for JsonOrderStore {
    async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.orders.read().await.clone())
    }

    async fn get(&self, id: u64) -> Result<Option<Order>> {
        Ok(self.orders.read().await.iter().find(|o| o.id == id).cloned())
    }

    async fn upsert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        match orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => orders.push(order),
        }
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let mut orders = self.orders.write().await;
        let before = orders.len();
        orders.retain(|o| o.id != id);
        Ok(orders.len() != before)
    }

    async fn next_order_id(&self) -> Result<u64> {
        let orders = self.orders.read().await;
        Ok(orders.iter().map(|o| o.id).max().map_or(1, |max| max + 1))
    }

    async fn save(&self) -> Result<()> {
        // Hold the read lock across the write so a concurrent mutation cannot
        // produce a torn file.
        let orders = self.orders.read().await;
        write_json(&self.path, &*orders).await
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Settings {
    #[serde(default)]
    credentials: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auto_update_interval_hours: Option<u32>,
    #[serde(default)]
    carrier_last_updates: HashMap<String, DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_auto_update: Option<DateTime<Utc>>,
}

/// Runtime settings persisted to a JSON file; every setter rewrites the file.
pub struct JsonConfigStore {
    path: PathBuf,
    settings: RwLock<Settings>,
}

impl JsonConfigStore {
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings: Settings = read_json(&path).await;
        Self {
            path,
            settings: RwLock::new(settings),
        }
    }

    async fn persist(&self, settings: &Settings) -> Result<()> {
        write_json(&self.path, settings).await
    }
}

#[async_trait]
impl ConfigStore for JsonConfigStore {
    async fn carrier_credential(&self, carrier_id: &str) -> Result<Option<String>> {
        Ok(self.settings.read().await.credentials.get(carrier_id).cloned())
    }

    async fn set_carrier_credential(&self, carrier_id: &str, credential: &str) -> Result<()> {
        let mut settings = self.settings.write().await;
        if credential.trim().is_empty() {
            settings.credentials.remove(carrier_id);
        } else {
            settings
                .credentials
                .insert(carrier_id.to_string(), credential.to_string());
        }
        self.persist(&settings).await
    }

    async fn auto_update_interval_hours(&self) -> Result<u32> {
        Ok(self
            .settings
            .read()
            .await
            .auto_update_interval_hours
            .unwrap_or(DEFAULT_AUTO_UPDATE_INTERVAL_HOURS))
    }

    async fn set_auto_update_interval_hours(&self, hours: u32) -> Result<()> {
        if hours == 0 {
            return Err(Error::InvalidInput(
                "auto-update interval must be at least 1 hour".to_string(),
            ));
        }
        let mut settings = self.settings.write().await;
        settings.auto_update_interval_hours = Some(hours);
        self.persist(&settings).await
    }

    async fn carrier_last_update(&self, carrier_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .settings
            .read()
            .await
            .carrier_last_updates
            .get(carrier_id)
            .copied())
    }

    async fn set_carrier_last_update(&self, carrier_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut settings = self.settings.write().await;
        settings
            .carrier_last_updates
            .insert(carrier_id.to_string(), at);
        self.persist(&settings).await
    }

    async fn next_auto_update(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.settings.read().await.next_auto_update)
    }

    async fn set_next_auto_update(&self, at: DateTime<Utc>) -> Result<()> {
        let mut settings = self.settings.write().await;
        settings.next_auto_update = Some(at);
        self.persist(&settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with_tracking(id: u64, tracking_number: &str) -> Order {
        let mut order = Order::new(id);
        order.tracking_number = tracking_number.to_string();
        order
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonOrderStore::load(dir.path().join("orders.json")).await;
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.next_order_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        let store = JsonOrderStore::load(&path).await;
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");

        let store = JsonOrderStore::load(&path).await;
        store.upsert(order_with_tracking(1, "A1")).await.unwrap();
        store.upsert(order_with_tracking(5, "B2")).await.unwrap();
        store.save().await.unwrap();

        let reloaded = JsonOrderStore::load(&path).await;
        let orders = reloaded.list().await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].tracking_number, "B2");
        assert_eq!(reloaded.next_order_id().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonOrderStore::load(dir.path().join("orders.json")).await;
        store.upsert(order_with_tracking(1, "A1")).await.unwrap();
        store.upsert(order_with_tracking(1, "A2")).await.unwrap();

        let orders = store.list().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].tracking_number, "A2");
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonOrderStore::load(dir.path().join("orders.json")).await;
        store.upsert(order_with_tracking(1, "A1")).await.unwrap();

        assert!(store.delete(1).await.unwrap());
        assert!(!store.delete(1).await.unwrap());
    }

    #[tokio::test]
    async fn config_defaults_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let config = JsonConfigStore::load(&path).await;
        assert_eq!(
            config.auto_update_interval_hours().await.unwrap(),
            DEFAULT_AUTO_UPDATE_INTERVAL_HOURS
        );
        assert!(config.carrier_credential("israel_post").await.unwrap().is_none());

        config.set_auto_update_interval_hours(12).await.unwrap();
        config
            .set_carrier_credential("israel_post", "key-123")
            .await
            .unwrap();
        let stamped = Utc::now();
        config.set_carrier_last_update("cainiao", stamped).await.unwrap();

        let reloaded = JsonConfigStore::load(&path).await;
        assert_eq!(reloaded.auto_update_interval_hours().await.unwrap(), 12);
        assert_eq!(
            reloaded.carrier_credential("israel_post").await.unwrap().as_deref(),
            Some("key-123")
        );
        assert_eq!(
            reloaded.carrier_last_update("cainiao").await.unwrap(),
            Some(stamped)
        );
    }

    #[tokio::test]
    async fn blank_credential_clears_the_stored_one() {
        let dir = tempfile::tempdir().unwrap();
        let config = JsonConfigStore::load(dir.path().join("settings.json")).await;
        config
            .set_carrier_credential("israel_post", "key-123")
            .await
            .unwrap();
        config.set_carrier_credential("israel_post", "  ").await.unwrap();
        assert!(config.carrier_credential("israel_post").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = JsonConfigStore::load(dir.path().join("settings.json")).await;
        assert!(config.set_auto_update_interval_hours(0).await.is_err());
    }
}
