//! Carrier integrations: wire-format normalizers and HTTP clients for the
//! two tracking services, exposed to the sync core as `CarrierAdapter`s.
//!
//! Both carrier APIs are third-party and undocumented; the normalizers parse
//! `serde_json::Value` defensively instead of asserting a schema, and every
//! failure mode resolves to result-level data rather than an `Err`.

pub mod cainiao;
pub mod israel_post;

pub use cainiao::CainiaoAdapter;
pub use israel_post::IsraelPostAdapter;
