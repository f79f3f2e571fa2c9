//! Integration tests for the analyze → assemble → history pipeline
//!
//! The remote analyzer is replaced by scripted completion clients that reply
//! with the report fixture in `tests/fixtures/`, so everything below the HTTP
//! layer runs for real against a temporary history file.

use relscope_core::analyzer::{
    truncate_transcript, CompletionRequest, LlmCompletionClient, LlmTranscriptAnalyzer,
};
use relscope_core::assemble::MISSING_DATE;
use relscope_core::error::TimelineItemKind;
use relscope_core::history::{HistoryStore, HISTORY_CAPACITY, HISTORY_KEY};
use relscope_core::timeline::{merge, merge_valid, TimelineItem};
use relscope_core::types::{AnalysisMode, EventType, TimelineEvent, TimelinePhase};
use relscope_core::{AnalysisSession, Error, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Get the path to a fixture file
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn fixture_json() -> Value {
    let raw = std::fs::read_to_string(fixture_path("report-body.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// Replies with a fixed text and remembers the prompt it was sent.
struct ScriptedClient {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl LlmCompletionClient for ScriptedClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        Ok(self.reply.clone())
    }
}

struct Harness {
    _dir: TempDir,
    history_path: PathBuf,
    prompts: Arc<Mutex<Vec<String>>>,
    session: AnalysisSession,
}

fn harness(reply: Value, max_chars: usize) -> Harness {
    relscope_core::logging::init_test();
    let dir = TempDir::new().unwrap();
    let history_path = dir.path().join("data/history.json");
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let client = ScriptedClient {
        reply: reply.to_string(),
        prompts: prompts.clone(),
    };
    let analyzer = LlmTranscriptAnalyzer::new(Box::new(client), max_chars);
    let session = AnalysisSession::new(Box::new(analyzer), HistoryStore::open(&history_path));
    Harness {
        _dir: dir,
        history_path,
        prompts,
        session,
    }
}

fn event(date: &str, description: &str) -> TimelineEvent {
    TimelineEvent {
        date: date.to_string(),
        kind: EventType::Neutral,
        description: description.to_string(),
        inference: String::new(),
        evidence: String::new(),
    }
}

fn phase(name: &str, start: &str, end: &str) -> TimelinePhase {
    TimelinePhase {
        name: name.to_string(),
        start_date: start.to_string(),
        end_date: end.to_string(),
    }
}

// ============================================
// Pipeline
// ============================================

#[test]
fn test_requested_mode_wins_and_is_persisted() {
    // Fixture echoes "deep"; the request is quick.
    let mut h = harness(fixture_json(), 1_000_000);
    let report = h
        .session
        .submit("A: hi\nB: hey", AnalysisMode::Quick, true, None)
        .expect("analysis should succeed");
    assert_eq!(report.body.analysis_mode, AnalysisMode::Quick);
    assert_eq!(report.meta.file_name, "Uploaded Transcript");
    assert_eq!(report.meta.first_message_date, "2023-11");
    assert_eq!(report.meta.last_message_date, "2024-01");

    let reopened = HistoryStore::open(&h.history_path);
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.list()[0].mode(), AnalysisMode::Quick);
}

#[test]
fn test_missing_verdict_is_rejected_and_not_stored() {
    let mut reply = fixture_json();
    reply.as_object_mut().unwrap().remove("verdict");

    let mut h = harness(reply, 1_000_000);
    let err = h
        .session
        .submit("A: hi", AnalysisMode::Deep, true, None)
        .unwrap_err();
    assert!(matches!(err, Error::SchemaValidation(_)), "got {err:?}");
    assert!(err.user_message().contains("invalid analysis format"));

    assert!(h.session.history().is_empty());
    assert!(!h.history_path.exists());
}

#[test]
fn test_empty_timeline_gives_placeholder_dates() {
    let mut reply = fixture_json();
    reply["timeline"] = Value::Array(Vec::new());

    let mut h = harness(reply, 1_000_000);
    let report = h
        .session
        .submit("A: hi", AnalysisMode::Deep, false, Some("chat.txt"))
        .unwrap();
    assert_eq!(report.meta.first_message_date, MISSING_DATE);
    assert_eq!(report.meta.last_message_date, MISSING_DATE);
    assert!(!report.body.privacy.anonymize);
}

#[test]
fn test_history_keeps_ten_most_recent() {
    let mut h = harness(fixture_json(), 1_000_000);

    let mut ids = Vec::new();
    for n in 0..11 {
        let report = h
            .session
            .submit(&format!("A: message {n}"), AnalysisMode::Quick, true, None)
            .unwrap();
        ids.push(report.meta.id.clone());
        assert_eq!(h.session.history().len(), (n + 1).min(HISTORY_CAPACITY));
    }

    let stored: Vec<&str> = h
        .session
        .history()
        .list()
        .iter()
        .map(|r| r.meta.id.as_str())
        .collect();
    let expected: Vec<&str> = ids[1..].iter().rev().map(String::as_str).collect();
    assert_eq!(stored, expected);
    assert!(h.session.history().get(&ids[0]).is_none());

    let raw: Value =
        serde_json::from_str(&std::fs::read_to_string(&h.history_path).unwrap()).unwrap();
    assert_eq!(raw[HISTORY_KEY].as_array().unwrap().len(), HISTORY_CAPACITY);
}

#[test]
fn test_long_transcript_reaches_analyzer_as_its_tail() {
    let mut transcript = "Q".repeat(500_000);
    transcript.push_str(&"W".repeat(3_000_000));

    let mut h = harness(fixture_json(), 3_000_000);
    h.session
        .submit(&transcript, AnalysisMode::Quick, true, None)
        .unwrap();

    let prompts = h.prompts.lock().unwrap();
    let prompt = &prompts[0];
    assert!(!prompt.contains('Q'));
    assert!(prompt.ends_with(truncate_transcript(&transcript, 3_000_000)));
    assert_eq!(prompt.matches('W').count(), 3_000_000);
}

// ============================================
// Timeline
// ============================================

#[test]
fn test_fixture_timeline_merges_chronologically() {
    let body: relscope_core::ReportBody = serde_json::from_value(fixture_json()).unwrap();
    let viz = &body.visualizations;
    let merged = merge(&viz.visual_timeline_events, &viz.visual_timeline_phases).unwrap();

    let labels: Vec<String> = merged
        .iter()
        .map(|item| match item {
            TimelineItem::Event { event, .. } => format!("event {}", event.date),
            TimelineItem::Phase { phase, .. } => format!("phase {}", phase.name),
        })
        .collect();
    assert_eq!(
        labels,
        vec![
            "phase Early Talking",
            "event 2023-11-02",
            "phase Dating",
            "event 2023-12-24",
            "phase Strain",
            "event 2024-01-14",
            "event 2024-01-20",
        ]
    );
}

#[test]
fn test_merge_orders_events_around_phase() {
    let events = vec![event("2024-01-05", "later"), event("2024-01-01", "earlier")];
    let phases = vec![phase("Dating", "2024-01-03", "2024-01-31")];

    let merged = merge(&events, &phases).unwrap();
    assert_eq!(merged.len(), events.len() + phases.len());
    assert!(merged.windows(2).all(|w| w[0].date() <= w[1].date()));
    assert_eq!(merged[0].raw_date(), "2024-01-01");
    assert_eq!(merged[1].kind(), TimelineItemKind::Phase);
    assert_eq!(merged[2].raw_date(), "2024-01-05");

    assert!(merge(&[], &[]).unwrap().is_empty());
}

#[test]
fn test_bad_date_is_reported_not_dropped() {
    let events = vec![event("2024-01-05", "ok"), event("sometime in spring", "vague")];
    let phases = vec![phase("Dating", "2024-01-03", "2024-01-31")];

    match merge(&events, &phases) {
        Err(Error::InvalidDate { kind, index, value }) => {
            assert_eq!(kind, TimelineItemKind::Event);
            assert_eq!(index, 1);
            assert_eq!(value, "sometime in spring");
        }
        other => panic!("expected InvalidDate, got {other:?}"),
    }

    let partial = merge_valid(&events, &phases);
    assert_eq!(partial.items.len(), 2);
    assert_eq!(partial.rejected.len(), 1);
}
