//! Shipwatch core library: shared models, store traits, and the tracking
//! synchronization core (eligibility policy, update merger, sync engine,
//! auto-update scheduler).
//!
//! Carrier integrations live in `shipwatch_carriers`; HTTP wiring lives in
//! `shipwatch_server`. This crate is transport-free.

pub mod error;
pub mod models;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
pub use models::Order;
pub use store::traits::{ConfigStore, OrderStore};
pub use sync::engine::TrackingSyncEngine;
pub use sync::scheduler::AutoUpdateScheduler;
pub use sync::models::{
    OrderRefreshResult, RefreshReport, TrackingEvent, TrackingInfo, TrackingSlot,
};
pub use sync::traits::{CarrierAdapter, SyncPass};
