// session.rs — DraftSession: startup reconciliation and the editing loop.
//
// On launch a session decides what to resume from:
//
//   nothing stored                 → NoDraft (new empty document)
//   usable snapshot                → ResumedDraft (malformed sections dropped)
//   unusable or corrupt snapshot   → ConflictPending (user picks discard
//                                    or salvage)
//
// When a device-local cache is also available, the newer `savedAt` wins;
// ties go to the backing store.
//
// State graph:
//   NoDraft → FreshDraft             (first commit or save)
//   ConflictPending → ResumedDraft   (salvage)
//   any → NoDraft                    (discard, or after completion)
// FreshDraft and ResumedDraft behave the same; the distinction only records
// how the session started.

use std::fmt;

use chrono::Utc;
use ecodraft_schema::{
    admit, merge, merge_many, require_complete, salvage, DraftDocument, DraftError,
    InvalidReason, SectionId, ValidationResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{SessionError, StoreError};
use crate::events::{DraftEvent, EventDispatcher};
use crate::medium::SnapshotMedium;
use crate::store::{Ack, DraftStore, Snapshot};

/// Where a session is in its startup / editing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing to resume; a new empty document is ready.
    NoDraft,
    /// Working on a draft started in this session.
    FreshDraft,
    /// Working on a draft restored from storage.
    ResumedDraft,
    /// The stored draft is unusable; waiting for discard or salvage.
    ConflictPending,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NoDraft => write!(f, "no_draft"),
            SessionState::FreshDraft => write!(f, "fresh_draft"),
            SessionState::ResumedDraft => write!(f, "resumed_draft"),
            SessionState::ConflictPending => write!(f, "conflict_pending"),
        }
    }
}

impl SessionState {
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        if next == SessionState::NoDraft {
            return true;
        }
        matches!(
            (self, next),
            (SessionState::NoDraft, SessionState::FreshDraft)
                | (SessionState::ConflictPending, SessionState::ResumedDraft)
        )
    }

    /// Whether the session accepts edits.
    pub fn is_editable(&self) -> bool {
        !matches!(self, SessionState::ConflictPending)
    }
}

/// Which copy of the draft the session started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftSource {
    None,
    Backing,
    Cache,
}

impl fmt::Display for DraftSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftSource::None => write!(f, "none"),
            DraftSource::Backing => write!(f, "backing"),
            DraftSource::Cache => write!(f, "cache"),
        }
    }
}

/// Why a stored draft could not be resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The snapshot parsed but failed validation.
    Invalid(InvalidReason),
    /// The snapshot bytes did not parse at all.
    Corrupt(String),
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::Invalid(reason) => write!(f, "invalid draft: {}", reason),
            ConflictReason::Corrupt(detail) => write!(f, "corrupt draft: {}", detail),
        }
    }
}

/// An unusable draft awaiting the user's decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub reason: ConflictReason,
    /// The parsed snapshot, when it parsed at all. Salvage works from this.
    pub raw: Option<Value>,
    pub source: DraftSource,
}

/// One candidate copy of the draft considered at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Usable {
        document: DraftDocument,
        validation: ValidationResult,
    },
    Unusable {
        reason: ConflictReason,
        raw: Option<Value>,
    },
}

impl Candidate {
    /// Classify a parsed snapshot value.
    pub fn from_value(raw: Value) -> Self {
        match admit(&raw) {
            Ok((document, validation)) => Candidate::Usable {
                document,
                validation,
            },
            Err(reason) => Candidate::Unusable {
                reason: ConflictReason::Invalid(reason),
                raw: Some(raw),
            },
        }
    }

    /// Classify the result of a store load. Medium failures are returned
    /// as errors so they are never mistaken for an empty store.
    pub fn from_load(
        loaded: Result<Option<Snapshot>, StoreError>,
    ) -> Result<Option<Self>, StoreError> {
        match loaded {
            Ok(None) => Ok(None),
            Ok(Some(snapshot)) => Ok(Some(Candidate::from_value(snapshot.into_value()))),
            Err(StoreError::CorruptSnapshot { detail }) => Ok(Some(Candidate::Unusable {
                reason: ConflictReason::Corrupt(detail),
                raw: None,
            })),
            Err(e) => Err(e),
        }
    }

    fn saved_at(&self) -> Option<chrono::DateTime<Utc>> {
        match self {
            Candidate::Usable { document, .. } => document.saved_at,
            Candidate::Unusable { .. } => None,
        }
    }
}

/// Outcome of comparing the local cache with the backing store.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Start,
    Resume {
        source: DraftSource,
        document: DraftDocument,
        validation: ValidationResult,
    },
    Conflict(Conflict),
}

/// Decide which copy of the draft to trust.
///
/// A usable copy beats an unusable or missing one; between two usable
/// copies the newer `savedAt` wins and ties go to the backing store. When
/// neither is usable the backing store's problem is reported.
pub fn reconcile(cache: Option<Candidate>, backing: Option<Candidate>) -> Decision {
    let pick_cache = match (&cache, &backing) {
        (Some(Candidate::Usable { .. }), Some(b @ Candidate::Usable { .. })) => {
            cache.as_ref().and_then(Candidate::saved_at) > b.saved_at()
        }
        (Some(Candidate::Usable { .. }), _) => true,
        _ => false,
    };

    let (source, chosen, other) = if pick_cache {
        (DraftSource::Cache, cache, backing)
    } else {
        (DraftSource::Backing, backing, cache)
    };

    match chosen {
        Some(Candidate::Usable {
            document,
            validation,
        }) => Decision::Resume {
            source,
            document,
            validation,
        },
        Some(Candidate::Unusable { reason, raw }) => Decision::Conflict(Conflict {
            reason,
            raw,
            source,
        }),
        // Backing store empty: fall back to whatever the cache holds.
        None => match other {
            Some(Candidate::Unusable { reason, raw }) => Decision::Conflict(Conflict {
                reason,
                raw,
                source: DraftSource::Cache,
            }),
            Some(Candidate::Usable {
                document,
                validation,
            }) => Decision::Resume {
                source: DraftSource::Cache,
                document,
                validation,
            },
            None => Decision::Start,
        },
    }
}

/// Summary returned by [`DraftSession::salvage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalvageSummary {
    pub recovered: Vec<SectionId>,
    pub discarded: Vec<String>,
}

/// One editing session over the single draft slot.
pub struct DraftSession<M: SnapshotMedium> {
    session_id: Uuid,
    state: SessionState,
    source: DraftSource,
    store: DraftStore<M>,
    document: DraftDocument,
    conflict: Option<Conflict>,
    startup_validation: Option<ValidationResult>,
    events: EventDispatcher,
}

impl<M: SnapshotMedium> DraftSession<M> {
    /// Start a session from whatever the store holds.
    pub fn start(store: DraftStore<M>) -> Result<Self, SessionError> {
        Self::start_with_cache(store, None, EventDispatcher::new())
    }

    /// Start a session, reporting lifecycle events to `events`.
    pub fn start_with_events(
        store: DraftStore<M>,
        events: EventDispatcher,
    ) -> Result<Self, SessionError> {
        Self::start_with_cache(store, None, events)
    }

    /// Start a session, reconciling the store against a device-local cached
    /// snapshot.
    pub fn start_with_cache(
        store: DraftStore<M>,
        cache: Option<Value>,
        events: EventDispatcher,
    ) -> Result<Self, SessionError> {
        let backing = Candidate::from_load(store.load())?;
        let cache = cache.map(Candidate::from_value);

        let mut session = Self {
            session_id: Uuid::new_v4(),
            state: SessionState::NoDraft,
            source: DraftSource::None,
            store,
            document: DraftDocument::new(),
            conflict: None,
            startup_validation: None,
            events,
        };

        match reconcile(cache, backing) {
            Decision::Start => {}
            Decision::Resume {
                source,
                document,
                validation,
            } => {
                session.state = SessionState::ResumedDraft;
                session.source = source;
                session.document = document;
                if let Some(report) = validation.report() {
                    if !report.malformed.is_empty() || !report.unknown.is_empty() {
                        session.events.dispatch(&DraftEvent::SectionsQuarantined {
                            session_id: session.session_id,
                            malformed: report.malformed.iter().copied().collect(),
                            unknown: report.unknown.iter().cloned().collect(),
                            timestamp: Utc::now(),
                        });
                    }
                }
                session.startup_validation = Some(validation);
            }
            Decision::Conflict(conflict) => {
                tracing::warn!(
                    reason = %conflict.reason,
                    source = %conflict.source,
                    "stored draft needs a decision"
                );
                session.state = SessionState::ConflictPending;
                session.source = conflict.source;
                session.conflict = Some(conflict);
            }
        }

        tracing::info!(
            session_id = %session.session_id,
            state = %session.state,
            source = %session.source,
            "draft session started"
        );
        session.events.dispatch(&DraftEvent::SessionStarted {
            session_id: session.session_id,
            state: session.state.to_string(),
            source: session.source.to_string(),
            timestamp: Utc::now(),
        });
        Ok(session)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn source(&self) -> DraftSource {
        self.source
    }

    /// The working document. Empty while a conflict is pending.
    pub fn document(&self) -> &DraftDocument {
        &self.document
    }

    pub fn conflict(&self) -> Option<&Conflict> {
        self.conflict.as_ref()
    }

    /// Validation of the snapshot the session resumed from, if any.
    pub fn startup_validation(&self) -> Option<&ValidationResult> {
        self.startup_validation.as_ref()
    }

    pub fn store(&self) -> &DraftStore<M> {
        &self.store
    }

    /// Merge one section into the working document.
    ///
    /// Values of the wrong shape are rejected before the document changes.
    /// Returns the validation of the updated document so the caller can
    /// show what is still missing.
    pub fn commit(
        &mut self,
        id: SectionId,
        value: Value,
    ) -> Result<ValidationResult, SessionError> {
        self.ensure_editable("commit")?;
        check_shape(id, &value)?;
        self.begin_if_new()?;

        self.document = merge(&self.document, id, value);
        self.events.dispatch(&DraftEvent::SectionCommitted {
            session_id: self.session_id,
            section: id,
            timestamp: Utc::now(),
        });
        Ok(ecodraft_schema::validate_document(&self.document))
    }

    /// [`Self::commit`] with a wire token.
    pub fn commit_by_name(
        &mut self,
        token: &str,
        value: Value,
    ) -> Result<ValidationResult, SessionError> {
        let id: SectionId = token.parse()?;
        self.commit(id, value)
    }

    /// Commit a whole page at once. Every value is shape-checked before any
    /// is applied; later updates to the same section win.
    pub fn commit_many(
        &mut self,
        updates: Vec<(SectionId, Value)>,
    ) -> Result<ValidationResult, SessionError> {
        self.ensure_editable("commit")?;
        for (id, value) in &updates {
            check_shape(*id, value)?;
        }
        self.begin_if_new()?;

        let ids: Vec<SectionId> = updates.iter().map(|(id, _)| *id).collect();
        self.document = merge_many(&self.document, updates);
        let now = Utc::now();
        for section in ids {
            self.events.dispatch(&DraftEvent::SectionCommitted {
                session_id: self.session_id,
                section,
                timestamp: now,
            });
        }
        Ok(ecodraft_schema::validate_document(&self.document))
    }

    /// Persist the working document.
    pub fn save(&mut self) -> Result<Ack, SessionError> {
        self.ensure_editable("save")?;
        self.begin_if_new()?;

        let ack = self.store.save(&mut self.document)?;
        self.events.dispatch(&DraftEvent::DraftSaved {
            session_id: self.session_id,
            saved_at: ack.saved_at,
            digest: ack.digest.clone(),
            timestamp: Utc::now(),
        });
        Ok(ack)
    }

    /// Throw the draft away: clear the store and start over empty.
    pub fn discard(&mut self) -> Result<(), SessionError> {
        self.store.clear()?;
        self.transition(SessionState::NoDraft)?;
        self.document = DraftDocument::new();
        self.conflict = None;
        self.startup_validation = None;
        self.source = DraftSource::None;
        self.events.dispatch(&DraftEvent::DraftDiscarded {
            session_id: self.session_id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Recover every independently valid section of the conflicting draft
    /// and persist the result, replacing the unusable snapshot.
    pub fn salvage(&mut self) -> Result<SalvageSummary, SessionError> {
        let Some(conflict) = self.conflict.clone() else {
            return Err(SessionError::InvalidTransition {
                from: self.state.to_string(),
                to: SessionState::ResumedDraft.to_string(),
            });
        };
        self.transition(SessionState::ResumedDraft)?;

        let salvaged = salvage(conflict.raw.as_ref().unwrap_or(&Value::Null));
        self.document = salvaged.document;
        self.conflict = None;
        if let Err(e) = self.store.save(&mut self.document) {
            // Keep the conflict open so the user can retry.
            self.state = SessionState::ConflictPending;
            self.conflict = Some(conflict);
            self.document = DraftDocument::new();
            return Err(e.into());
        }

        let summary = SalvageSummary {
            recovered: salvaged.recovered.into_iter().collect(),
            discarded: salvaged.discarded.into_iter().collect(),
        };
        self.events.dispatch(&DraftEvent::SnapshotSalvaged {
            session_id: self.session_id,
            recovered: summary.recovered.clone(),
            discarded: summary.discarded.clone(),
            timestamp: Utc::now(),
        });
        Ok(summary)
    }

    /// Hand the finished draft to report generation and clear the slot.
    ///
    /// Fails with [`DraftError::IncompleteDraft`] and leaves everything in
    /// place when mandatory sections are missing. The returned document
    /// excludes malformed sections.
    pub fn complete(&mut self) -> Result<DraftDocument, SessionError> {
        self.ensure_editable("complete")?;
        let finished = require_complete(&self.document)?.to_document();

        self.store.clear()?;
        self.events.dispatch(&DraftEvent::DraftCompleted {
            session_id: self.session_id,
            file_name: finished.file_name().unwrap_or_default().to_string(),
            timestamp: Utc::now(),
        });
        self.transition(SessionState::NoDraft)?;
        self.document = DraftDocument::new();
        self.startup_validation = None;
        self.source = DraftSource::None;
        Ok(finished)
    }

    fn ensure_editable(&self, action: &str) -> Result<(), SessionError> {
        match &self.conflict {
            Some(conflict) if !self.state.is_editable() => {
                Err(SessionError::ConflictPending(format!(
                    "cannot {} until the stored draft is discarded or salvaged ({})",
                    action, conflict.reason
                )))
            }
            _ => Ok(()),
        }
    }

    fn begin_if_new(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::NoDraft {
            self.transition(SessionState::FreshDraft)?;
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(from = %self.state, to = %next, "draft session transition");
        self.state = next;
        Ok(())
    }
}

fn check_shape(id: SectionId, value: &Value) -> Result<(), DraftError> {
    if id.shape().matches(value) {
        Ok(())
    } else {
        Err(DraftError::ShapeMismatch {
            section: id,
            expected: id.shape(),
            found: ecodraft_schema::registry::json_kind(value),
        })
    }
}
