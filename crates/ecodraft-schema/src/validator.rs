// validator.rs — Classification of candidate draft documents.
//
// Snapshots come back from storage that may be stale, hand-edited, or
// written by an older build. Validation classifies them without mutating
// anything:
//
//   Valid           — every key is registered and well-shaped, timestamps
//                     are sane, mandatory sections are filled.
//   PartiallyValid  — usable, but some sections must be treated as absent
//                     (malformed or unknown keys) or mandatory ones are
//                     still missing.
//   Invalid         — not usable as-is (not an object, bad timestamps).
//
// A malformed section is quarantined rather than failing the whole
// document, so one bad page does not cost the user the other sections.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{DraftDocument, CREATED_AT_KEY, SAVED_AT_KEY};
use crate::registry::SectionId;

/// Why a candidate document cannot be used at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidReason {
    /// The top-level value is not a JSON object.
    NotAMapping { found: String },
    /// A required timestamp field is absent.
    MissingTimestamp { field: String },
    /// A timestamp field is present but does not parse as RFC 3339.
    UnparseableTimestamp { field: String, value: String },
    /// `createdAt` is later than `savedAt`.
    TimestampsOutOfOrder {
        created_at: DateTime<Utc>,
        saved_at: DateTime<Utc>,
    },
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::NotAMapping { found } => {
                write!(f, "snapshot is a {} rather than an object", found)
            }
            InvalidReason::MissingTimestamp { field } => write!(f, "missing '{}'", field),
            InvalidReason::UnparseableTimestamp { field, value } => {
                write!(f, "'{}' is not a timestamp: {:?}", field, value)
            }
            InvalidReason::TimestampsOutOfOrder {
                created_at,
                saved_at,
            } => write!(
                f,
                "createdAt {} is later than savedAt {}",
                created_at.to_rfc3339(),
                saved_at.to_rfc3339()
            ),
        }
    }
}

/// Sections that must be treated as absent or still need input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Mandatory sections that are absent, empty, or malformed.
    pub missing_mandatory: BTreeSet<SectionId>,
    /// Registered sections whose value has the wrong shape.
    pub malformed: BTreeSet<SectionId>,
    /// Keys that are not registered sections.
    pub unknown: BTreeSet<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.missing_mandatory.is_empty() && self.malformed.is_empty() && self.unknown.is_empty()
    }
}

/// Outcome of validating a candidate document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    PartiallyValid(ValidationReport),
    Invalid(InvalidReason),
}

impl ValidationResult {
    /// Whether the document can be used, possibly after quarantine.
    pub fn is_usable(&self) -> bool {
        !matches!(self, ValidationResult::Invalid(_))
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            ValidationResult::PartiallyValid(report) => Some(report),
            _ => None,
        }
    }

    fn from_report(report: ValidationReport) -> Self {
        if report.is_clean() {
            ValidationResult::Valid
        } else {
            ValidationResult::PartiallyValid(report)
        }
    }
}

/// Validate an untrusted snapshot value.
pub fn validate(raw: &Value) -> ValidationResult {
    let obj = match as_mapping(raw) {
        Ok(obj) => obj,
        Err(reason) => return ValidationResult::Invalid(reason),
    };
    if let Err(reason) = check_timestamps(obj) {
        return ValidationResult::Invalid(reason);
    }
    ValidationResult::from_report(classify_sections(obj).0)
}

/// Validate an in-memory document.
///
/// The typed representation already guarantees registry membership, so
/// only shapes, mandatory sections, and timestamp order are checked. A
/// document that has never been saved has no `savedAt` to compare.
pub fn validate_document(doc: &DraftDocument) -> ValidationResult {
    if let Some(saved_at) = doc.saved_at {
        if doc.created_at > saved_at {
            return ValidationResult::Invalid(InvalidReason::TimestampsOutOfOrder {
                created_at: doc.created_at,
                saved_at,
            });
        }
    }

    ValidationResult::from_report(section_report(doc))
}

/// Shape and mandatory-section checks of an in-memory document, ignoring
/// its timestamps.
pub(crate) fn section_report(doc: &DraftDocument) -> ValidationReport {
    let mut report = ValidationReport::default();
    for (id, value) in doc.sections() {
        if !id.shape().matches(value) {
            report.malformed.insert(id);
        }
    }
    report.missing_mandatory = missing_mandatory(|id| match doc.get(id) {
        Some(value) if !report.malformed.contains(&id) => !id.shape().is_empty(value),
        _ => false,
    });
    report
}

/// Build a usable document from a `Valid` or `PartiallyValid` snapshot.
///
/// Malformed and unknown keys are dropped. Returns the reason when the
/// snapshot is `Invalid`; use [`salvage`] for best-effort recovery then.
pub fn admit(raw: &Value) -> Result<(DraftDocument, ValidationResult), InvalidReason> {
    let obj = as_mapping(raw)?;
    let (created_at, saved_at) = check_timestamps(obj)?;
    let (report, good) = classify_sections(obj);

    let mut doc = DraftDocument::created_at(created_at);
    doc.saved_at = Some(saved_at);
    for (id, value) in good {
        doc.put(id, value.clone());
    }

    if !report.malformed.is_empty() || !report.unknown.is_empty() {
        tracing::warn!(
            malformed = ?report.malformed,
            unknown = ?report.unknown,
            "quarantined draft sections"
        );
    }
    Ok((doc, ValidationResult::from_report(report)))
}

/// Result of best-effort recovery from an unusable snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Salvaged {
    pub document: DraftDocument,
    /// Sections carried over.
    pub recovered: BTreeSet<SectionId>,
    /// Keys that were dropped (malformed sections and unknown keys).
    pub discarded: BTreeSet<String>,
}

/// Extract every section that independently passes shape validation.
///
/// Works on any JSON value. `createdAt` is kept when it parses, otherwise
/// the salvaged draft starts now; `savedAt` is kept only when it parses and
/// is not earlier than `createdAt`.
pub fn salvage(raw: &Value) -> Salvaged {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let created_at = obj
        .get(CREATED_AT_KEY)
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);
    let saved_at = obj
        .get(SAVED_AT_KEY)
        .and_then(parse_timestamp)
        .filter(|saved_at| *saved_at >= created_at);

    let mut document = DraftDocument::created_at(created_at);
    document.saved_at = saved_at;

    let (report, good) = classify_sections(obj);
    let mut recovered = BTreeSet::new();
    for (id, value) in good {
        document.put(id, value.clone());
        recovered.insert(id);
    }

    let discarded: BTreeSet<String> = report
        .malformed
        .iter()
        .map(|id| id.as_str().to_string())
        .chain(report.unknown)
        .collect();

    tracing::warn!(
        recovered = recovered.len(),
        discarded = discarded.len(),
        "salvaged draft snapshot"
    );
    Salvaged {
        document,
        recovered,
        discarded,
    }
}

fn as_mapping(raw: &Value) -> Result<&Map<String, Value>, InvalidReason> {
    raw.as_object().ok_or_else(|| InvalidReason::NotAMapping {
        found: crate::registry::json_kind(raw).to_string(),
    })
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn require_timestamp(
    obj: &Map<String, Value>,
    field: &str,
) -> Result<DateTime<Utc>, InvalidReason> {
    let value = obj
        .get(field)
        .ok_or_else(|| InvalidReason::MissingTimestamp {
            field: field.to_string(),
        })?;
    parse_timestamp(value).ok_or_else(|| InvalidReason::UnparseableTimestamp {
        field: field.to_string(),
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    })
}

fn check_timestamps(
    obj: &Map<String, Value>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), InvalidReason> {
    let created_at = require_timestamp(obj, CREATED_AT_KEY)?;
    let saved_at = require_timestamp(obj, SAVED_AT_KEY)?;
    if created_at > saved_at {
        return Err(InvalidReason::TimestampsOutOfOrder {
            created_at,
            saved_at,
        });
    }
    Ok((created_at, saved_at))
}

/// Split the keys of a snapshot into a report and the well-shaped sections.
fn classify_sections(obj: &Map<String, Value>) -> (ValidationReport, Vec<(SectionId, &Value)>) {
    let mut report = ValidationReport::default();
    let mut good = Vec::new();

    for (key, value) in obj {
        if key == CREATED_AT_KEY || key == SAVED_AT_KEY {
            continue;
        }
        match key.parse::<SectionId>() {
            Ok(id) if id.shape().matches(value) => good.push((id, value)),
            Ok(id) => {
                report.malformed.insert(id);
            }
            Err(_) => {
                report.unknown.insert(key.clone());
            }
        }
    }

    report.missing_mandatory = missing_mandatory(|id| {
        good.iter()
            .any(|(good_id, value)| *good_id == id && !id.shape().is_empty(value))
    });
    (report, good)
}

fn missing_mandatory(is_filled: impl Fn(SectionId) -> bool) -> BTreeSet<SectionId> {
    crate::registry::mandatory_sections()
        .filter(|id| !is_filled(*id))
        .collect()
}
