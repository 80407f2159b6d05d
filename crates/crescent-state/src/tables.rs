//! redb table definitions.
//!
//! Every table maps a `{tenant_id}:...` string key to a JSON document, so a
//! tenant's records form one contiguous key range.

use redb::TableDefinition;

pub(crate) type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Trained models keyed by `{tenant_id}:{trained_at}`, where `trained_at` is
/// a fixed-width timestamp so keys sort chronologically within a tenant.
pub const MODELS: JsonTable = TableDefinition::new("models");

/// Scaling events keyed by `{tenant_id}:{recorded_at}:{event_type}`.
pub const SCALING_EVENTS: JsonTable = TableDefinition::new("scaling_events");
