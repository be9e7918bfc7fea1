//! # ecodraft-store
//!
//! Draft persistence and session reconciliation for the ecodraft wizard.
//!
//! The store keeps exactly one snapshot of the in-progress report. Saves
//! replace it atomically and stamp a non-decreasing `savedAt`; loads never
//! confuse "nothing stored" with "could not read". On launch a
//! [`DraftSession`] decides whether to resume, start fresh, or ask the user
//! what to do with an unusable snapshot.
//!
//! ## Key components
//!
//! - [`SnapshotMedium`] — byte storage beneath the store ([`FileMedium`],
//!   [`MemoryMedium`])
//! - [`DraftStore`] — load / save / clear of the single snapshot
//! - [`DraftSession`] — startup state machine (NoDraft, FreshDraft,
//!   ResumedDraft, ConflictPending) and the commit/save loop
//! - [`DraftEvent`] / [`EventDispatcher`] — audit trail of session decisions
//! - [`DraftConfig`] — `.ecodraft/config.toml`

pub mod config;
pub mod error;
pub mod events;
pub mod medium;
pub mod session;
pub mod store;

pub use config::{DraftConfig, ProjectConfig};
pub use error::{SessionError, StoreError};
pub use events::{DraftEvent, EventDispatcher, EventSink, LogSink, MemorySink};
pub use medium::{FileMedium, MemoryMedium, SnapshotMedium};
pub use session::{
    reconcile, Candidate, Conflict, ConflictReason, Decision, DraftSession, DraftSource,
    SalvageSummary, SessionState,
};
pub use store::{Ack, ClearAck, DraftStore, Snapshot};
