// complete.rs — Hand-off of finished drafts to report generation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::document::DraftDocument;
use crate::error::DraftError;
use crate::registry::SectionId;
use crate::validator::{section_report, validate_document, ValidationResult};

/// Read-only view of a draft with every mandatory section filled.
///
/// Malformed sections are hidden from the view, so report generation only
/// ever sees well-shaped values.
#[derive(Debug, Clone)]
pub struct CompleteDraft<'a> {
    doc: &'a DraftDocument,
    quarantined: BTreeSet<SectionId>,
}

impl<'a> CompleteDraft<'a> {
    pub fn get(&self, id: SectionId) -> Option<&'a Value> {
        if self.quarantined.contains(&id) {
            return None;
        }
        self.doc.get(id)
    }

    pub fn sections(&self) -> impl Iterator<Item = (SectionId, &'a Value)> + '_ {
        self.doc
            .sections()
            .filter(|(id, _)| !self.quarantined.contains(id))
    }

    /// Always present in a complete draft.
    pub fn file_name(&self) -> &'a str {
        self.doc.file_name().unwrap_or_default()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.doc.created_at
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.doc.saved_at
    }

    /// Sections hidden because their value had the wrong shape.
    pub fn quarantined(&self) -> &BTreeSet<SectionId> {
        &self.quarantined
    }

    /// Copy the visible sections into a standalone document.
    pub fn to_document(&self) -> DraftDocument {
        let mut doc = DraftDocument::created_at(self.doc.created_at);
        doc.saved_at = self.doc.saved_at;
        for (id, value) in self.sections() {
            doc.put(id, value.clone());
        }
        doc
    }
}

/// Check that `doc` can be handed to report generation.
///
/// Timestamp order does not matter here: a draft whose `createdAt` is
/// after its `savedAt` still completes when its sections are complete.
pub fn require_complete(doc: &DraftDocument) -> Result<CompleteDraft<'_>, DraftError> {
    if let ValidationResult::Invalid(reason) = validate_document(doc) {
        tracing::warn!(%reason, "completing draft with inconsistent timestamps");
    }

    let report = section_report(doc);
    if !report.missing_mandatory.is_empty() {
        return Err(DraftError::IncompleteDraft {
            missing: report.missing_mandatory.into_iter().collect(),
        });
    }
    Ok(CompleteDraft {
        doc,
        quarantined: report.malformed,
    })
}
