//! # ecodraft-schema
//!
//! Section registry, draft document model, validation, and merge for the
//! ecodraft compliance-report wizard.
//!
//! A report draft is a flat document of named sections (general info,
//! water-quality assessment, attendance, ...) plus two timestamps. Every
//! wizard page writes one or more sections; this crate defines which
//! sections exist and how partial updates are combined and checked.
//!
//! ## Key components
//!
//! - [`SectionId`] — the closed set of section identifiers, each with a
//!   [`ShapeTag`] used for shallow validation
//! - [`DraftDocument`] — one in-progress report
//! - [`validate`] / [`validate_document`] — classify a document as
//!   [`ValidationResult::Valid`], `PartiallyValid`, or `Invalid`
//! - [`admit`] / [`salvage`] — build a usable document from an untrusted
//!   snapshot, quarantining malformed sections
//! - [`merge`] / [`merge_many`] — non-destructive section updates
//! - [`require_complete`] — hand-off to report generation
//!
//! ## Quick Example
//!
//! ```rust
//! use ecodraft_schema::{merge, require_complete, DraftDocument, SectionId};
//! use serde_json::json;
//!
//! let doc = DraftDocument::new();
//! let doc = merge(&doc, SectionId::FileName, json!("North Pond Q1"));
//! let doc = merge(&doc, SectionId::AttendanceData, json!(["Ana", "Ben"]));
//! assert_eq!(require_complete(&doc).unwrap().file_name(), "North Pond Q1");
//! ```

pub mod complete;
pub mod document;
pub mod error;
pub mod merge;
pub mod registry;
pub mod validator;

pub use complete::{require_complete, CompleteDraft};
pub use document::{DraftDocument, Progress, CREATED_AT_KEY, SAVED_AT_KEY};
pub use error::DraftError;
pub use merge::{merge, merge_by_name, merge_many, merge_many_by_name};
pub use registry::{
    list_sections, lookup, mandatory_sections, shape_of, shape_of_name, SectionId, ShapeTag,
};
pub use validator::{
    admit, salvage, validate, validate_document, InvalidReason, Salvaged, ValidationReport,
    ValidationResult,
};
