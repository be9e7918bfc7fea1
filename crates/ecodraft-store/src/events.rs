// events.rs — Draft lifecycle events and their sinks.
//
// Sessions emit an event at each decision point that matters for an audit
// trail: how a session started, which sections were quarantined or
// salvaged, every save, discard, and completion. Sinks receive events
// synchronously; a failing sink is logged and never stops the session.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use ecodraft_schema::SectionId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Events emitted by a draft session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DraftEvent {
    /// The startup decision was made.
    SessionStarted {
        session_id: Uuid,
        state: String,
        source: String,
        timestamp: DateTime<Utc>,
    },

    /// Sections of a resumed snapshot were dropped as malformed or unknown.
    SectionsQuarantined {
        session_id: Uuid,
        malformed: Vec<SectionId>,
        unknown: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A section was committed into the working document.
    SectionCommitted {
        session_id: Uuid,
        section: SectionId,
        timestamp: DateTime<Utc>,
    },

    /// The working document was persisted.
    DraftSaved {
        session_id: Uuid,
        saved_at: DateTime<Utc>,
        digest: String,
        timestamp: DateTime<Utc>,
    },

    /// An unusable snapshot was recovered section by section.
    SnapshotSalvaged {
        session_id: Uuid,
        recovered: Vec<SectionId>,
        discarded: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// The draft was thrown away by the user.
    DraftDiscarded {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A complete draft was handed over and the slot cleared.
    DraftCompleted {
        session_id: Uuid,
        file_name: String,
        timestamp: DateTime<Utc>,
    },
}

impl DraftEvent {
    /// Get the event type name as a string.
    pub fn event_type(&self) -> &str {
        match self {
            DraftEvent::SessionStarted { .. } => "session_started",
            DraftEvent::SectionsQuarantined { .. } => "sections_quarantined",
            DraftEvent::SectionCommitted { .. } => "section_committed",
            DraftEvent::DraftSaved { .. } => "draft_saved",
            DraftEvent::SnapshotSalvaged { .. } => "snapshot_salvaged",
            DraftEvent::DraftDiscarded { .. } => "draft_discarded",
            DraftEvent::DraftCompleted { .. } => "draft_completed",
        }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            DraftEvent::SessionStarted { session_id, .. }
            | DraftEvent::SectionsQuarantined { session_id, .. }
            | DraftEvent::SectionCommitted { session_id, .. }
            | DraftEvent::DraftSaved { session_id, .. }
            | DraftEvent::SnapshotSalvaged { session_id, .. }
            | DraftEvent::DraftDiscarded { session_id, .. }
            | DraftEvent::DraftCompleted { session_id, .. } => *session_id,
        }
    }
}

/// Destination for draft events. A failing sink never fails the session.
pub trait EventSink: Send {
    fn record(&self, event: &DraftEvent) -> Result<(), StoreError>;
}

/// Appends one JSON object per line to the event log.
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl EventSink for LogSink {
    fn record(&self, event: &DraftEvent) -> Result<(), StoreError> {
        let line = serde_json::to_string(event)?;
        self.append(&line).map_err(|source| StoreError::IoError {
            path: self.path.clone(),
            source,
        })
    }
}

/// Keeps events in memory; clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<DraftEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DraftEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &DraftEvent) -> Result<(), StoreError> {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
        Ok(())
    }
}

/// Fans each event out to every registered sink.
#[derive(Default)]
pub struct EventDispatcher {
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn dispatch(&self, event: &DraftEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.record(event) {
                tracing::warn!(event_type = event.event_type(), error = %e, "event sink failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn discarded() -> DraftEvent {
        DraftEvent::DraftDiscarded {
            session_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn event_serialization_round_trip() {
        let event = DraftEvent::SectionCommitted {
            session_id: Uuid::new_v4(),
            section: SectionId::WaterQualityAssessment,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"section_committed\""));
        assert!(json.contains("\"waterQualityAssessment\""));

        let restored: DraftEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, event);
    }

    #[test]
    fn log_sink_appends_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");
        let sink = LogSink::new(&path);

        sink.record(&discarded()).unwrap();
        sink.record(&discarded()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn dispatcher_sends_to_all_sinks() {
        let first = MemorySink::new();
        let second = MemorySink::new();
        let dispatcher = EventDispatcher::new()
            .with_sink(first.clone())
            .with_sink(second.clone());

        let event = discarded();
        dispatcher.dispatch(&event);

        assert_eq!(first.events(), vec![event.clone()]);
        assert_eq!(second.event_types(), vec!["draft_discarded"]);
        assert_eq!(first.events()[0].session_id(), event.session_id());
    }

    #[test]
    fn failing_sink_does_not_stop_others() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened for appending.
        let broken = LogSink::new(dir.path());
        let memory = MemorySink::new();
        let dispatcher = EventDispatcher::new()
            .with_sink(broken)
            .with_sink(memory.clone());

        dispatcher.dispatch(&discarded());
        assert_eq!(memory.events().len(), 1);
    }
}
