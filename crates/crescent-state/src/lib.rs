//! crescent-state — persistence for trained forecasters and scaling events.
//!
//! Backed by [redb](https://docs.rs/redb). Each training run stores one
//! [`StoredModel`] under `{tenant_id}:{trained_at}`; the newest key for a
//! tenant is its latest model. Every recommendation the forecaster produces
//! is logged as a [`ScalingEvent`] that starts `pending` and is later
//! approved or rejected by an operator. Tenants never share a record.
//!
//! The `ModelStore` is `Clone` + `Send` + `Sync`.

pub mod error;
pub mod events;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use events::{EventStatus, ScalingEvent, Verdict};
pub use store::ModelStore;
pub use types::{ModelInfo, StoredModel, TrainingStats, validate_tenant_id};
