//! JSON file adapter for durable despawn records.
//!
//! The whole document is rewritten on every change. Records are cached in
//! memory after the first read so single-record writes don't re-parse it.
//! An unreadable document is reported once and then treated as empty, so the
//! next write replaces it.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cometwave_domain::{BlockPos, DespawnRecord, Tier};

use crate::infrastructure::ports::{DespawnStore, StoreError};

pub struct JsonDespawnStore {
    path: PathBuf,
    cache: Mutex<Option<Vec<DespawnRecord>>>,
}

impl JsonDespawnStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    fn read_file(&self) -> Result<Vec<DespawnRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json =
            std::fs::read_to_string(&self.path).map_err(|e| StoreError::io("read", e))?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        let document: DespawnDocumentStored =
            serde_json::from_str(&json).map_err(StoreError::serialization)?;
        Ok(document.comets.into_iter().map(Into::into).collect())
    }

    fn write_file(&self, records: &[DespawnRecord]) -> Result<(), StoreError> {
        let document = DespawnDocumentStored {
            comets: records.iter().map(Into::into).collect(),
        };
        let json =
            serde_json::to_string_pretty(&document).map_err(StoreError::serialization)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io("create_dir", e))?;
        }
        std::fs::write(&self.path, json).map_err(|e| StoreError::io("write", e))
    }

    /// Read the document into an empty cache. A failed read leaves the cache
    /// empty rather than unset.
    fn fill(&self, cache: &mut Option<Vec<DespawnRecord>>) -> Result<(), StoreError> {
        if cache.is_some() {
            return Ok(());
        }
        match self.read_file() {
            Ok(records) => {
                *cache = Some(records);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, path = %self.path.display(), "Despawn file unreadable, starting empty");
                *cache = Some(Vec::new());
                Err(e)
            }
        }
    }

    /// Run `f` against the cached record list, loading it on first use.
    fn with_records<T>(
        &self,
        f: impl FnOnce(&mut Vec<DespawnRecord>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.cache.lock().map_err(|_| StoreError::Poisoned)?;
        // Already logged; the write below replaces the bad document.
        let _ = self.fill(&mut guard);
        f(guard.get_or_insert_with(Vec::new))
    }
}

impl DespawnStore for JsonDespawnStore {
    fn load_all(&self) -> Result<Vec<DespawnRecord>, StoreError> {
        let mut guard = self.cache.lock().map_err(|_| StoreError::Poisoned)?;
        self.fill(&mut guard)?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn upsert(&self, record: &DespawnRecord) -> Result<(), StoreError> {
        self.with_records(|records| {
            match records.iter_mut().find(|r| r.pos == record.pos) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
            self.write_file(records)
        })
    }

    fn delete(&self, pos: BlockPos) -> Result<(), StoreError> {
        self.with_records(|records| {
            let before = records.len();
            records.retain(|r| r.pos != pos);
            if records.len() == before {
                return Ok(());
            }
            self.write_file(records)
        })
    }

    fn save_all(&self, records: &[DespawnRecord]) -> Result<(), StoreError> {
        let mut guard = self.cache.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = Some(records.to_vec());
        self.write_file(records)
    }
}

// =============================================================================
// Persistence serde models
// =============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct DespawnDocumentStored {
    #[serde(default)]
    comets: Vec<DespawnRecordStored>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DespawnRecordStored {
    x: i32,
    y: i32,
    z: i32,
    /// Milliseconds since the Unix epoch.
    spawn_time: i64,
    #[serde(default)]
    tier: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_minutes: Option<f64>,
}

impl From<DespawnRecordStored> for DespawnRecord {
    fn from(value: DespawnRecordStored) -> Self {
        let spawned_at = DateTime::<Utc>::from_timestamp_millis(value.spawn_time)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let tier = Tier::from_ordinal(value.tier).unwrap_or_default();
        DespawnRecord::new(BlockPos::new(value.x, value.y, value.z), spawned_at, tier)
            .with_custom_minutes(value.custom_minutes)
    }
}

impl From<&DespawnRecord> for DespawnRecordStored {
    fn from(value: &DespawnRecord) -> Self {
        Self {
            x: value.pos.x,
            y: value.pos.y,
            z: value.pos.z,
            spawn_time: value.spawned_at.timestamp_millis(),
            tier: value.tier.ordinal(),
            custom_minutes: value.custom_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(x: i32) -> DespawnRecord {
        let spawned = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        DespawnRecord::new(BlockPos::new(x, 64, -5), spawned, Tier::Epic)
    }

    #[test]
    fn when_file_is_missing_then_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDespawnStore::new(dir.path().join("despawns.json"));

        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn when_records_upserted_then_new_store_reads_them_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("despawns.json");
        let store = JsonDespawnStore::new(&path);

        store.upsert(&record(1)).unwrap();
        store
            .upsert(&record(2).with_custom_minutes(Some(5.0)))
            .unwrap();
        store
            .upsert(&record(1).with_custom_minutes(Some(12.0)))
            .unwrap();

        let reloaded = JsonDespawnStore::new(&path).load_all().unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded[0].custom_minutes, Some(12.0));
        assert_eq!(reloaded[1], record(2).with_custom_minutes(Some(5.0)));
    }

    #[test]
    fn when_deleted_then_record_is_gone_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("despawns.json");
        let store = JsonDespawnStore::new(&path);
        store.save_all(&[record(1), record(2)]).unwrap();

        store.delete(BlockPos::new(1, 64, -5)).unwrap();
        store.delete(BlockPos::new(99, 0, 0)).unwrap();

        let reloaded = JsonDespawnStore::new(&path).load_all().unwrap();
        assert_eq!(reloaded, vec![record(2)]);
    }

    #[test]
    fn when_document_is_corrupt_then_load_reports_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("despawns.json");
        std::fs::write(&path, "{ \"comets\": [ {").unwrap();

        let err = JsonDespawnStore::new(&path).load_all().unwrap_err();

        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn when_document_is_corrupt_then_later_writes_replace_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("despawns.json");
        std::fs::write(&path, "{ \"comets\": [ {").unwrap();
        let store = JsonDespawnStore::new(&path);

        assert!(store.load_all().is_err());
        assert!(store.load_all().unwrap().is_empty());
        store.save_all(&[record(1)]).unwrap();
        store.upsert(&record(2)).unwrap();

        let reloaded = JsonDespawnStore::new(&path).load_all().unwrap();
        assert_eq!(reloaded, vec![record(1), record(2)]);
    }

    #[test]
    fn when_document_is_corrupt_then_first_upsert_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("despawns.json");
        std::fs::write(&path, "{ \"comets\": [ {").unwrap();
        let store = JsonDespawnStore::new(&path);

        store.upsert(&record(3)).unwrap();
        store.delete(BlockPos::new(99, 0, 0)).unwrap();

        let reloaded = JsonDespawnStore::new(&path).load_all().unwrap();
        assert_eq!(reloaded, vec![record(3)]);
    }

    #[test]
    fn when_document_uses_camel_case_then_fields_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("despawns.json");
        std::fs::write(
            &path,
            r#"{ "comets": [ { "x": 3, "y": 70, "z": 4, "spawnTime": 0, "tier": 4, "customMinutes": 2.5 } ] }"#,
        )
        .unwrap();

        let records = JsonDespawnStore::new(&path).load_all().unwrap();

        assert_eq!(records[0].pos, BlockPos::new(3, 70, 4));
        assert_eq!(records[0].tier, Tier::Legendary);
        assert_eq!(records[0].despawn_minutes(30.0), 2.5);
    }
}
