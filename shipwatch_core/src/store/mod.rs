//! Order and configuration stores: the traits the sync core consumes, plus
//! the JSON-file-backed implementations used in deployment.

pub mod json;
pub mod traits;

pub use json::{JsonConfigStore, JsonOrderStore};
pub use traits::{ConfigStore, OrderStore, DEFAULT_AUTO_UPDATE_INTERVAL_HOURS};
