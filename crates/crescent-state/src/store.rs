//! ModelStore: redb-backed persistence for trained forecasters and the
//! scaling events recommended from them.
//!
//! Both tables hold JSON documents under tenant-prefixed keys; the helpers at
//! the bottom of the impl do the redb plumbing once for either table.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{StateError, StateResult, codec, storage};
use crate::events::{EventStatus, ScalingEvent, Verdict};
use crate::tables::{JsonTable, MODELS, SCALING_EVENTS};
use crate::types::{ModelInfo, StoredModel, validate_tenant_id};

const MODEL_RECORD: &str = "model";
const EVENT_RECORD: &str = "scaling event";

/// Key range `[lo, hi)` covering every record of `tenant_id`.
fn tenant_range(tenant_id: &str) -> (String, String) {
    // ';' sorts immediately after ':'.
    (format!("{tenant_id}:"), format!("{tenant_id};"))
}

/// Reject ids that are invalid or not already in trimmed form.
fn stored_tenant(tenant_id: &str) -> StateResult<()> {
    if validate_tenant_id(tenant_id)? != tenant_id {
        return Err(StateError::InvalidTenant(tenant_id.to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ModelStore {
    db: Arc<Database>,
}

impl ModelStore {
    pub fn open(path: &Path) -> StateResult<Self> {
        let store = Self {
            db: Arc::new(Database::create(path).map_err(storage("open"))?),
        };
        store.ensure_tables()?;
        debug!(?path, "store opened");
        Ok(store)
    }

    /// Ephemeral store for tests.
    pub fn open_in_memory() -> StateResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(storage("open"))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(storage("begin write"))?;
        for table in [MODELS, SCALING_EVENTS] {
            txn.open_table(table).map_err(storage("open table"))?;
        }
        txn.commit().map_err(storage("commit"))
    }

    // ── Models ────────────────────────────────────────────────────

    /// Store a model version, replacing any record with the same key.
    /// Returns the key.
    pub fn put_model(&self, model: &StoredModel) -> StateResult<String> {
        stored_tenant(&model.tenant_id)?;
        let key = model.table_key();
        let bytes = self.put_json(MODELS, MODEL_RECORD, &key, model)?;
        debug!(%key, bytes, "model stored");
        Ok(key)
    }

    pub fn get_model(&self, key: &str) -> StateResult<Option<StoredModel>> {
        self.get_json(MODELS, MODEL_RECORD, key)
    }

    /// Most recently trained version for `tenant_id`.
    pub fn latest_model(&self, tenant_id: &str) -> StateResult<Option<StoredModel>> {
        let tenant_id = validate_tenant_id(tenant_id)?;
        self.last_json(MODELS, MODEL_RECORD, &tenant_id)
    }

    /// Versions for one tenant, or for every tenant, oldest first.
    pub fn list_models(&self, tenant_id: Option<&str>) -> StateResult<Vec<ModelInfo>> {
        let tenant_id = tenant_id.map(validate_tenant_id).transpose()?;
        let models: Vec<StoredModel> = self.scan_json(MODELS, MODEL_RECORD, tenant_id.as_deref())?;
        Ok(models.iter().map(StoredModel::info).collect())
    }

    /// Delete every version for `tenant_id`. Returns the number deleted.
    pub fn delete_models(&self, tenant_id: &str) -> StateResult<u32> {
        let tenant_id = validate_tenant_id(tenant_id)?;
        let deleted = self.delete_tenant(MODELS, &tenant_id)?;
        debug!(%tenant_id, deleted, "models deleted");
        Ok(deleted)
    }

    // ── Scaling events ────────────────────────────────────────────

    /// Record an event. Returns its key.
    pub fn put_event(&self, event: &ScalingEvent) -> StateResult<String> {
        stored_tenant(&event.tenant_id)?;
        let key = event.table_key();
        self.put_json(SCALING_EVENTS, EVENT_RECORD, &key, event)?;
        debug!(%key, status = %event.status, "scaling event recorded");
        Ok(key)
    }

    pub fn get_event(&self, key: &str) -> StateResult<Option<ScalingEvent>> {
        self.get_json(SCALING_EVENTS, EVENT_RECORD, key)
    }

    /// Up to `limit` events for `tenant_id`, newest first.
    pub fn list_events(&self, tenant_id: &str, limit: usize) -> StateResult<Vec<ScalingEvent>> {
        let tenant_id = validate_tenant_id(tenant_id)?;
        let mut events: Vec<ScalingEvent> =
            self.scan_json(SCALING_EVENTS, EVENT_RECORD, Some(&tenant_id))?;
        events.reverse();
        events.truncate(limit);
        Ok(events)
    }

    /// Approve or reject a pending event in one write transaction.
    pub fn decide_event(
        &self,
        key: &str,
        verdict: Verdict,
        by: &str,
        at: NaiveDateTime,
    ) -> StateResult<ScalingEvent> {
        let by = by.trim();
        if by.is_empty() {
            return Err(StateError::MissingApprover);
        }

        let txn = self.db.begin_write().map_err(storage("begin write"))?;
        let event = {
            let mut table = txn.open_table(SCALING_EVENTS).map_err(storage("open table"))?;
            let stored = match table.get(key).map_err(storage("read"))? {
                Some(guard) => guard.value().to_vec(),
                None => return Err(StateError::EventNotFound(key.to_string())),
            };
            let mut event: ScalingEvent =
                serde_json::from_slice(&stored).map_err(codec(EVENT_RECORD))?;
            if event.status != EventStatus::Pending {
                return Err(StateError::AlreadyDecided {
                    key: key.to_string(),
                    status: event.status,
                });
            }

            event.decide(verdict, by, at);
            let bytes = serde_json::to_vec(&event).map_err(codec(EVENT_RECORD))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(storage("write"))?;
            event
        };
        txn.commit().map_err(storage("commit"))?;

        info!(%key, status = %event.status, by, "scaling event decided");
        Ok(event)
    }

    // ── JSON table helpers ────────────────────────────────────────

    fn put_json<T: Serialize>(
        &self,
        table: JsonTable,
        record: &'static str,
        key: &str,
        value: &T,
    ) -> StateResult<usize> {
        let bytes = serde_json::to_vec(value).map_err(codec(record))?;
        let txn = self.db.begin_write().map_err(storage("begin write"))?;
        txn.open_table(table)
            .map_err(storage("open table"))?
            .insert(key, bytes.as_slice())
            .map_err(storage("write"))?;
        txn.commit().map_err(storage("commit"))?;
        Ok(bytes.len())
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        table: JsonTable,
        record: &'static str,
        key: &str,
    ) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(storage("begin read"))?;
        let table = txn.open_table(table).map_err(storage("open table"))?;
        let Some(guard) = table.get(key).map_err(storage("read"))? else {
            return Ok(None);
        };
        serde_json::from_slice(guard.value())
            .map(Some)
            .map_err(codec(record))
    }

    /// Greatest-keyed record of `tenant_id`.
    fn last_json<T: DeserializeOwned>(
        &self,
        table: JsonTable,
        record: &'static str,
        tenant_id: &str,
    ) -> StateResult<Option<T>> {
        let (lo, hi) = tenant_range(tenant_id);
        let txn = self.db.begin_read().map_err(storage("begin read"))?;
        let table = txn.open_table(table).map_err(storage("open table"))?;
        let mut range = table
            .range(lo.as_str()..hi.as_str())
            .map_err(storage("read"))?;
        let Some(entry) = range.next_back() else {
            return Ok(None);
        };
        let (_, value) = entry.map_err(storage("read"))?;
        serde_json::from_slice(value.value())
            .map(Some)
            .map_err(codec(record))
    }

    /// Records of one tenant, or of the whole table, in key order.
    fn scan_json<T: DeserializeOwned>(
        &self,
        table: JsonTable,
        record: &'static str,
        tenant_id: Option<&str>,
    ) -> StateResult<Vec<T>> {
        let bounds = tenant_id.map(tenant_range);
        let txn = self.db.begin_read().map_err(storage("begin read"))?;
        let table = txn.open_table(table).map_err(storage("open table"))?;
        let entries = match &bounds {
            Some((lo, hi)) => table.range(lo.as_str()..hi.as_str()),
            None => table.iter(),
        }
        .map_err(storage("read"))?;

        let mut out = Vec::new();
        for entry in entries {
            let (_, value) = entry.map_err(storage("read"))?;
            out.push(serde_json::from_slice(value.value()).map_err(codec(record))?);
        }
        Ok(out)
    }

    fn delete_tenant(&self, table: JsonTable, tenant_id: &str) -> StateResult<u32> {
        let (lo, hi) = tenant_range(tenant_id);
        let txn = self.db.begin_write().map_err(storage("begin write"))?;
        let deleted = {
            let mut t = txn.open_table(table).map_err(storage("open table"))?;
            let removed = t
                .extract_from_if(lo.as_str()..hi.as_str(), |_, _| true)
                .map_err(storage("delete"))?;
            let mut n = 0u32;
            for entry in removed {
                entry.map_err(storage("delete"))?;
                n += 1;
            }
            n
        };
        txn.commit().map_err(storage("commit"))?;
        Ok(deleted)
    }
}
