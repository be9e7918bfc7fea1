// store.rs — DraftStore: the single persisted draft slot.
//
// The store owns one snapshot at a time. It does not interpret section
// contents; validation of what comes back is the caller's job (see
// session.rs). Saves stamp `savedAt` and replace the whole snapshot, so the
// stored document is always one complete write, never a mix of two.

use chrono::{DateTime, Utc};
use ecodraft_schema::{validate, DraftDocument, ValidationResult};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::medium::{FileMedium, SnapshotMedium};

/// Confirmation of a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// The `savedAt` stamped onto the persisted document.
    pub saved_at: DateTime<Utc>,
    /// SHA-256 of the written snapshot, lowercase hex.
    pub digest: String,
    /// Size of the written snapshot.
    pub bytes: usize,
}

/// Confirmation of a clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearAck {
    /// Whether a snapshot existed before the clear.
    pub removed: bool,
}

/// A snapshot as read back from the medium: well-formed JSON, not yet
/// validated against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    value: Value,
    digest: String,
}

impl Snapshot {
    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn validate(&self) -> ValidationResult {
        validate(&self.value)
    }
}

/// Single-slot persistence for one draft.
pub struct DraftStore<M = FileMedium> {
    medium: M,
    last_saved_at: Option<DateTime<Utc>>,
}

impl DraftStore<FileMedium> {
    /// Store backed by a snapshot file at `path`.
    pub fn open_file(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(FileMedium::new(path))
    }
}

impl<M: SnapshotMedium> DraftStore<M> {
    pub fn new(medium: M) -> Self {
        Self {
            medium,
            last_saved_at: None,
        }
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Read the current snapshot.
    ///
    /// `Ok(None)` means nothing is stored. Bytes that are not JSON at all
    /// yield [`StoreError::CorruptSnapshot`]; medium failures propagate as
    /// they are.
    pub fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let Some(bytes) = self.medium.read()? else {
            tracing::debug!(medium = %self.medium.describe(), "no draft snapshot stored");
            return Ok(None);
        };
        let digest = hash_bytes(&bytes);
        let value = serde_json::from_slice::<Value>(&bytes).map_err(|e| {
            tracing::warn!(
                medium = %self.medium.describe(),
                error = %e,
                "draft snapshot does not parse"
            );
            StoreError::CorruptSnapshot {
                detail: e.to_string(),
            }
        })?;
        Ok(Some(Snapshot { value, digest }))
    }

    /// Read the current snapshot as a typed document without quarantine.
    ///
    /// Any key outside the registry or any bad timestamp is reported as a
    /// corrupt snapshot. Sessions use [`Self::load`] and the validator
    /// instead; this is for callers that only accept exact documents.
    pub fn load_document(&self) -> Result<Option<DraftDocument>, StoreError> {
        let Some(snapshot) = self.load()? else {
            return Ok(None);
        };
        serde_json::from_value(snapshot.into_value())
            .map(Some)
            .map_err(|e| StoreError::CorruptSnapshot {
                detail: e.to_string(),
            })
    }

    /// Stamp `savedAt` and atomically replace the snapshot.
    ///
    /// `savedAt` never moves backwards: it is the latest of the current
    /// time, the document's previous `savedAt`, its `createdAt`, and the
    /// last stamp this store wrote. If the write fails the document keeps
    /// its previous `savedAt` and the old snapshot stays in place.
    pub fn save(&mut self, doc: &mut DraftDocument) -> Result<Ack, StoreError> {
        let saved_at = [
            Some(Utc::now()),
            doc.saved_at,
            self.last_saved_at,
            Some(doc.created_at),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or_else(Utc::now);

        let previous = doc.saved_at.replace(saved_at);
        let result = serde_json::to_vec_pretty(&*doc)
            .map_err(StoreError::from)
            .and_then(|bytes| self.medium.write(&bytes).map(|_| bytes));
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                doc.saved_at = previous;
                tracing::warn!(medium = %self.medium.describe(), error = %e, "draft save failed");
                return Err(e);
            }
        };

        self.last_saved_at = Some(saved_at);
        let ack = Ack {
            saved_at,
            digest: hash_bytes(&bytes),
            bytes: bytes.len(),
        };
        tracing::info!(
            medium = %self.medium.describe(),
            saved_at = %ack.saved_at.to_rfc3339(),
            sections = doc.len(),
            "draft saved"
        );
        Ok(ack)
    }

    /// Remove the snapshot entirely.
    pub fn clear(&mut self) -> Result<ClearAck, StoreError> {
        let removed = self.medium.remove()?;
        tracing::info!(medium = %self.medium.describe(), removed, "draft snapshot cleared");
        Ok(ClearAck { removed })
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::MemoryMedium;
    use chrono::{Duration, TimeZone};
    use ecodraft_schema::{merge, SectionId};
    use serde_json::json;
    use tempfile::tempdir;

    struct FailingMedium {
        inner: MemoryMedium,
        fail_writes: bool,
    }

    impl SnapshotMedium for FailingMedium {
        fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
            self.inner.read()
        }

        fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Unavailable("network down".to_string()));
            }
            self.inner.write(bytes)
        }

        fn remove(&mut self) -> Result<bool, StoreError> {
            self.inner.remove()
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    #[test]
    fn empty_store_loads_none() {
        let store = DraftStore::new(MemoryMedium::new());
        assert!(store.load().unwrap().is_none());
        assert!(store.load_document().unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = DraftStore::open_file(dir.path().join("draft.json"));

        let doc = merge(&DraftDocument::new(), SectionId::FileName, json!("Report A"));
        let mut doc = merge(&doc, SectionId::GeneralInfo, json!({"site": "North Pond"}));
        let ack = store.save(&mut doc).unwrap();
        assert_eq!(doc.saved_at, Some(ack.saved_at));

        let loaded = store.load_document().unwrap().unwrap();
        assert_eq!(loaded, doc);

        let snapshot = store.load().unwrap().unwrap();
        assert_eq!(snapshot.digest(), ack.digest);
        assert_eq!(snapshot.validate(), ValidationResult::Valid);
    }

    #[test]
    fn saved_at_never_decreases() {
        let mut store = DraftStore::new(MemoryMedium::new());
        let mut doc = DraftDocument::new();

        let first = store.save(&mut doc).unwrap();
        let second = store.save(&mut doc).unwrap();
        assert!(second.saved_at >= first.saved_at);

        // A document stamped in the future (clock skew on another device)
        // still never goes backwards.
        let future = Utc::now() + Duration::hours(2);
        doc.saved_at = Some(future);
        let third = store.save(&mut doc).unwrap();
        assert_eq!(third.saved_at, future);

        let mut other = DraftDocument::new();
        let fourth = store.save(&mut other).unwrap();
        assert!(fourth.saved_at >= third.saved_at);
    }

    #[test]
    fn saved_at_not_before_created_at() {
        let mut store = DraftStore::new(MemoryMedium::new());
        let created = Utc::now() + Duration::minutes(30);
        let mut doc = DraftDocument::created_at(created);
        let ack = store.save(&mut doc).unwrap();
        assert!(ack.saved_at >= created);
    }

    #[test]
    fn failed_save_keeps_previous_snapshot_and_stamp() {
        let mut store = DraftStore::new(FailingMedium {
            inner: MemoryMedium::new(),
            fail_writes: false,
        });
        let mut doc = merge(&DraftDocument::new(), SectionId::FileName, json!("Report A"));
        let ack = store.save(&mut doc).unwrap();

        store.medium.fail_writes = true;
        let mut edited = merge(&doc, SectionId::FileName, json!("Report B"));
        let err = store.save(&mut edited).unwrap_err();
        assert!(err.is_medium_failure());
        assert_eq!(edited.saved_at, Some(ack.saved_at));

        let loaded = store.load_document().unwrap().unwrap();
        assert_eq!(loaded.file_name(), Some("Report A"));
    }

    #[test]
    fn non_json_bytes_are_corrupt() {
        let store = DraftStore::new(MemoryMedium::with_bytes(&b"{\"fileName\": \"Rep"[..]));
        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot { .. }));
        assert!(!err.is_medium_failure());
    }

    #[test]
    fn json_that_is_not_a_document_loads_but_does_not_validate() {
        let store = DraftStore::new(MemoryMedium::with_bytes(&b"[1, 2, 3]"[..]));
        let snapshot = store.load().unwrap().unwrap();
        assert!(!snapshot.validate().is_usable());
        assert!(matches!(
            store.load_document(),
            Err(StoreError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn clear_removes_snapshot() {
        let mut store = DraftStore::new(MemoryMedium::new());
        assert!(!store.clear().unwrap().removed);

        let mut doc = DraftDocument::new();
        store.save(&mut doc).unwrap();
        assert!(store.clear().unwrap().removed);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn snapshot_layout_is_flat() {
        let mut store = DraftStore::new(MemoryMedium::new());
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut doc = merge(&DraftDocument::created_at(t0), SectionId::Remarks, json!("ok"));
        store.save(&mut doc).unwrap();

        let value: Value = serde_json::from_slice(store.medium().bytes().unwrap()).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["createdAt", "remarks", "savedAt"]);
        assert_eq!(obj["createdAt"], json!("2026-03-01T09:00:00Z"));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_bytes(b"draft"), hash_bytes(b"draft"));
        assert_ne!(hash_bytes(b"draft"), hash_bytes(b"draft2"));
        assert_eq!(hash_bytes(b"").len(), 64);
    }
}
