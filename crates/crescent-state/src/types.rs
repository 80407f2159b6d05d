//! Records persisted by the model store.

use chrono::NaiveDateTime;
use crescent_forecast::HybridForecaster;
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// Fixed-width, lexicographically sortable key timestamp.
const KEY_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.6f";

/// What a training run saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Points after resampling.
    pub total_points: usize,
    pub range_start: NaiveDateTime,
    pub range_end: NaiveDateTime,
    pub days_of_data: i64,
    pub feature_count: usize,
    /// In-period rows the models were fit on.
    pub in_period_rows: usize,
}

/// One trained forecaster version for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredModel {
    pub tenant_id: String,
    pub trained_at: NaiveDateTime,
    pub stats: TrainingStats,
    pub forecaster: HybridForecaster,
}

impl StoredModel {
    /// Key used in the models table: `{tenant_id}:{trained_at}`.
    pub fn table_key(&self) -> String {
        model_key(&self.tenant_id, self.trained_at)
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            key: self.table_key(),
            tenant_id: self.tenant_id.clone(),
            trained_at: self.trained_at,
            stats: self.stats.clone(),
            trained: self.forecaster.is_trained(),
        }
    }
}

/// Listing view of a [`StoredModel`] without the forecaster itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub key: String,
    pub tenant_id: String,
    pub trained_at: NaiveDateTime,
    pub stats: TrainingStats,
    pub trained: bool,
}

pub(crate) fn model_key(tenant_id: &str, trained_at: NaiveDateTime) -> String {
    format!("{tenant_id}:{}", trained_at.format(KEY_TIME_FORMAT))
}

/// Trim and check a tenant id. `:` is reserved as the key separator.
pub fn validate_tenant_id(tenant_id: &str) -> StateResult<String> {
    let trimmed = tenant_id.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(StateError::InvalidTenant(tenant_id.to_string()));
    }
    Ok(trimmed.to_string())
}
