// error.rs — Error types for the draft schema subsystem.

use thiserror::Error;

use crate::registry::{SectionId, ShapeTag};

/// Errors raised by registry lookups, merges, and completion checks.
///
/// Validation problems are *not* errors: they are reported as
/// [`crate::ValidationResult`] values so callers can quarantine instead of
/// failing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    /// The caller referenced a section token that is not in the registry.
    /// Always a programming error.
    #[error("unknown draft section: '{0}'")]
    UnknownSection(String),

    /// A committed value does not have the shape the registry expects.
    #[error("section '{section}' expects {expected}, got {found}")]
    ShapeMismatch {
        section: SectionId,
        expected: ShapeTag,
        found: &'static str,
    },

    /// A complete document was requested but mandatory sections are missing.
    #[error("draft is incomplete, missing required sections: {}", format_sections(.missing))]
    IncompleteDraft { missing: Vec<SectionId> },
}

fn format_sections(ids: &[SectionId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
