// resume_flow.rs — End-to-end draft lifecycle across process restarts.
//
// Each test opens a file-backed store, works through a session, drops it,
// and opens a second session on the same file to check what a relaunched
// wizard would see:
//
//   1. Empty store → NoDraft with a brand-new document
//   2. Edit → save → relaunch → resumed document with a newer savedAt
//   3. Snapshot with one malformed section → quarantined, still completable
//   4. Unusable snapshot → conflict → discard or salvage
//   5. Audit log records each decision

use std::collections::BTreeSet;
use std::fs;

use chrono::{DateTime, Utc};
use ecodraft_schema::{
    list_sections, merge, require_complete, validate, SectionId, ShapeTag, ValidationReport,
    ValidationResult,
};
use ecodraft_store::{
    DraftSession, DraftSource, DraftStore, EventDispatcher, FileMedium, LogSink, SessionState,
};
use serde_json::{json, Map, Value};
use tempfile::tempdir;

fn open(path: &std::path::Path) -> DraftSession<FileMedium> {
    DraftSession::start(DraftStore::open_file(path)).unwrap()
}

fn well_formed(id: SectionId) -> Value {
    match id.shape() {
        ShapeTag::Record => json!({"recorded": id.as_str()}),
        ShapeTag::Text => json!(format!("{} entry", id.as_str())),
        ShapeTag::TextList => json!(["first", "second"]),
        ShapeTag::RecordList => json!([{"row": 1}, {"row": 2}]),
        ShapeTag::Flag => json!(false),
    }
}

#[test]
fn empty_store_starts_a_new_draft() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("draft.json");

    let session = open(&path);
    assert_eq!(session.state(), SessionState::NoDraft);
    assert!(session.document().is_empty());
    assert!(session.document().saved_at.is_none());
    assert!(session.document().created_at <= Utc::now());
    assert!(!path.exists());
}

#[test]
fn update_save_and_resume() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("draft.json");

    // First launch: write Report A.
    let (created_at, first_saved_at) = {
        let mut session = open(&path);
        session.commit(SectionId::FileName, json!("Report A")).unwrap();
        session
            .commit(
                SectionId::GeneralInfo,
                json!({"site": "North Pond", "inspector": "L. Reyes"}),
            )
            .unwrap();
        let ack = session.save().unwrap();
        assert_eq!(session.state(), SessionState::FreshDraft);
        (session.document().created_at, ack.saved_at)
    };

    // Second launch: rename to Report B and save again.
    let second_saved_at = {
        let mut session = open(&path);
        assert_eq!(session.state(), SessionState::ResumedDraft);
        assert_eq!(session.source(), DraftSource::Backing);
        assert_eq!(session.startup_validation(), Some(&ValidationResult::Valid));
        session.commit(SectionId::FileName, json!("Report B")).unwrap();
        session.save().unwrap().saved_at
    };
    assert!(second_saved_at >= first_saved_at);

    // Third launch: everything is where it was left.
    let store = DraftStore::open_file(&path);
    let doc = store.load_document().unwrap().unwrap();
    assert_eq!(doc.file_name(), Some("Report B"));
    assert_eq!(
        doc.get(SectionId::GeneralInfo),
        Some(&json!({"site": "North Pond", "inspector": "L. Reyes"}))
    );
    assert_eq!(doc.created_at, created_at);
    assert_eq!(doc.saved_at, Some(second_saved_at));
}

#[test]
fn save_load_round_trip_preserves_document() {
    let dir = tempdir().unwrap();
    let mut store = DraftStore::open_file(dir.path().join("draft.json"));

    let mut doc = ecodraft_schema::DraftDocument::new();
    for id in list_sections() {
        doc = merge(&doc, *id, well_formed(*id));
    }
    store.save(&mut doc).unwrap();

    let loaded = store.load_document().unwrap().unwrap();
    assert_eq!(loaded, doc);
}

#[test]
fn malformed_attendance_is_quarantined_and_draft_still_completes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("draft.json");
    fs::write(
        &path,
        serde_json::to_vec_pretty(&json!({
            "createdAt": "2026-03-01T09:00:00Z",
            "savedAt": "2026-03-01T09:45:00Z",
            "fileName": "Report A",
            "generalInfo": {"site": "North Pond"},
            "attendanceData": "Ana, Ben"
        }))
        .unwrap(),
    )
    .unwrap();

    let raw: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(
        validate(&raw),
        ValidationResult::PartiallyValid(ValidationReport {
            malformed: BTreeSet::from([SectionId::AttendanceData]),
            ..Default::default()
        })
    );

    let mut session = open(&path);
    assert_eq!(session.state(), SessionState::ResumedDraft);
    assert!(!session.document().contains(SectionId::AttendanceData));
    assert_eq!(
        require_complete(session.document()).unwrap().file_name(),
        "Report A"
    );

    // The user re-enters the quarantined page and finishes.
    session
        .commit(SectionId::AttendanceData, json!(["Ana", "Ben"]))
        .unwrap();
    let finished = session.complete().unwrap();
    assert_eq!(
        finished.get(SectionId::AttendanceData),
        Some(&json!(["Ana", "Ben"]))
    );
    assert!(!path.exists());
}

#[test]
fn one_bad_section_among_thirty_keeps_the_rest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("draft.json");

    let mut obj = Map::new();
    obj.insert("createdAt".into(), json!("2026-03-01T09:00:00Z"));
    obj.insert("savedAt".into(), json!("2026-03-01T10:00:00Z"));
    for id in list_sections() {
        obj.insert(id.as_str().into(), well_formed(*id));
    }
    obj.insert("laboratoryResults".into(), json!({"not": "a list"}));
    fs::write(&path, serde_json::to_vec(&Value::Object(obj)).unwrap()).unwrap();

    let session = open(&path);
    let report = session
        .startup_validation()
        .and_then(ValidationResult::report)
        .cloned()
        .unwrap();
    assert_eq!(
        report.malformed,
        BTreeSet::from([SectionId::LaboratoryResults])
    );

    let doc = session.document();
    assert_eq!(doc.len(), list_sections().len() - 1);
    for id in list_sections() {
        if *id == SectionId::LaboratoryResults {
            assert!(!doc.contains(*id));
        } else {
            assert_eq!(doc.get(*id), Some(&well_formed(*id)));
        }
    }
}

#[test]
fn truncated_snapshot_can_be_discarded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("draft.json");
    fs::write(&path, b"{\"createdAt\": \"2026-03-01T09:00:00Z\", \"fileNa").unwrap();

    let mut session = open(&path);
    assert_eq!(session.state(), SessionState::ConflictPending);
    session.discard().unwrap();
    assert_eq!(session.state(), SessionState::NoDraft);
    assert!(!path.exists());

    session.commit(SectionId::FileName, json!("Fresh start")).unwrap();
    session.save().unwrap();
    assert_eq!(session.state(), SessionState::FreshDraft);

    let resumed = open(&path);
    assert_eq!(resumed.document().file_name(), Some("Fresh start"));
}

#[test]
fn invalid_snapshot_can_be_salvaged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("draft.json");
    fs::write(
        &path,
        serde_json::to_vec(&json!({
            "createdAt": "2026-03-05T09:00:00Z",
            "savedAt": "2026-03-01T09:00:00Z",
            "fileName": "Report A",
            "noiseMonitoring": {"dbA": 61},
            "signatoryConfirmed": "yes"
        }))
        .unwrap(),
    )
    .unwrap();

    let mut session = open(&path);
    assert_eq!(session.state(), SessionState::ConflictPending);

    let summary = session.salvage().unwrap();
    assert_eq!(
        summary.recovered,
        vec![SectionId::FileName, SectionId::NoiseMonitoring]
    );
    assert_eq!(summary.discarded, vec!["signatoryConfirmed".to_string()]);

    let resumed = open(&path);
    assert_eq!(resumed.state(), SessionState::ResumedDraft);
    let created: DateTime<Utc> = "2026-03-05T09:00:00Z".parse().unwrap();
    assert_eq!(resumed.document().created_at, created);
    assert!(resumed.document().saved_at.unwrap() >= created);
}

#[test]
fn audit_log_records_session_decisions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("draft.json");
    let log_path = dir.path().join("events.jsonl");

    let events = EventDispatcher::new().with_sink(LogSink::new(&log_path));
    let mut session =
        DraftSession::start_with_events(DraftStore::open_file(&path), events).unwrap();
    session.commit(SectionId::FileName, json!("Report A")).unwrap();
    session.save().unwrap();
    session.discard().unwrap();

    let types: Vec<String> = fs::read_to_string(&log_path)
        .unwrap()
        .lines()
        .map(|line| {
            let event: Value = serde_json::from_str(line).unwrap();
            event["event_type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        types,
        vec![
            "session_started",
            "section_committed",
            "draft_saved",
            "draft_discarded"
        ]
    );
}
