// document.rs — DraftDocument: one in-progress report.
//
// Serialized as a single flat JSON object: every present section under its
// wire token, plus `createdAt` and `savedAt`. Unknown keys are rejected by
// the typed representation; untrusted snapshots go through the validator
// instead (see validator.rs).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::SectionId;

/// Key of the creation timestamp in a persisted snapshot.
pub const CREATED_AT_KEY: &str = "createdAt";
/// Key of the last-save timestamp in a persisted snapshot.
pub const SAVED_AT_KEY: &str = "savedAt";

/// The full set of section values plus metadata for one draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftDocument {
    /// When the draft was started. Set once.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// When the draft was last persisted. `None` until the first save;
    /// only the store advances it.
    #[serde(rename = "savedAt", default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    sections: BTreeMap<SectionId, Value>,
}

/// How many registry sections a draft has filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub filled: usize,
    pub total: usize,
}

impl DraftDocument {
    /// Start an empty draft stamped with the current time.
    pub fn new() -> Self {
        Self::created_at(Utc::now())
    }

    /// Start an empty draft with an explicit creation time.
    pub fn created_at(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            saved_at: None,
            sections: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: SectionId) -> Option<&Value> {
        self.sections.get(&id)
    }

    pub fn contains(&self, id: SectionId) -> bool {
        self.sections.contains_key(&id)
    }

    /// Present sections in registry order.
    pub fn sections(&self) -> impl Iterator<Item = (SectionId, &Value)> {
        self.sections.iter().map(|(id, value)| (*id, value))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            filled: self.sections.len(),
            total: SectionId::ALL.len(),
        }
    }

    /// The file name the report is saved under, if set.
    pub fn file_name(&self) -> Option<&str> {
        self.get(SectionId::FileName).and_then(Value::as_str)
    }

    // Mutation is crate-private: callers go through merge.rs so that the
    // non-destruction guarantees live in one place.
    pub(crate) fn put(&mut self, id: SectionId, value: Value) {
        self.sections.insert(id, value);
    }

    /// Serialize into the flat snapshot representation.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Default for DraftDocument {
    fn default() -> Self {
        Self::new()
    }
}
