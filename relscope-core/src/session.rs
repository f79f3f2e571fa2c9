//! One user-facing analysis session: analyze, assemble, remember.

use crate::analyzer::{LlmTranscriptAnalyzer, TranscriptAnalyzer};
use crate::assemble::assemble;
use crate::config::Config;
use crate::history::HistoryStore;
use crate::types::{AnalysisMode, AnalysisReport};
use crate::{Error, Result};
use chrono::Utc;

/// Runs analyses and records successful ones in history.
///
/// `submit` takes `&mut self`, so one session has at most one request in
/// flight.
pub struct AnalysisSession {
    analyzer: Box<dyn TranscriptAnalyzer>,
    history: HistoryStore,
}

impl AnalysisSession {
    pub fn new(analyzer: Box<dyn TranscriptAnalyzer>, history: HistoryStore) -> Self {
        Self { analyzer, history }
    }

    /// Session backed by the configured LLM and the on-disk history.
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = config.require_llm()?;
        let analyzer = LlmTranscriptAnalyzer::from_config(llm, &config.analysis)?;
        Ok(Self::new(
            Box::new(analyzer),
            HistoryStore::open(Config::history_path()),
        ))
    }

    /// Analyze `transcript` and store the resulting report.
    ///
    /// Nothing is stored when analysis fails. On success the returned report
    /// is the newest history entry.
    pub fn submit(
        &mut self,
        transcript: &str,
        mode: AnalysisMode,
        anonymize: bool,
        file_name: Option<&str>,
    ) -> Result<&AnalysisReport> {
        if transcript.trim().is_empty() {
            return Err(Error::EmptyTranscript);
        }

        let requested_at = Utc::now();
        let body = self
            .analyzer
            .analyze(transcript, mode, anonymize)
            .inspect_err(|e| tracing::warn!(error = %e, %mode, "Analysis failed"))?;

        let report = assemble(body, mode, requested_at, file_name);
        let id = report.meta.id.clone();
        self.history.append(report)?;

        tracing::info!(report_id = %id, %mode, "Analysis complete");
        self.history
            .get(&id)
            .ok_or_else(|| Error::ReportNotFound(id.clone()))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn into_history(self) -> HistoryStore {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReportBody;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixtureAnalyzer {
        calls: Arc<AtomicUsize>,
    }

    impl TranscriptAnalyzer for FixtureAnalyzer {
        fn analyze(&self, _: &str, _: AnalysisMode, anonymize: bool) -> Result<ReportBody> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut body = crate::schema::parse_report_body(include_str!(
                "../tests/fixtures/report-body.json"
            ))?;
            body.privacy.anonymize = anonymize;
            Ok(body)
        }
    }

    struct FailingAnalyzer;

    impl TranscriptAnalyzer for FailingAnalyzer {
        fn analyze(&self, _: &str, _: AnalysisMode, _: bool) -> Result<ReportBody> {
            Err(Error::Transport("connection reset".into()))
        }
    }

    #[test]
    fn submit_stores_report_with_requested_mode() {
        let calls = Arc::new(AtomicUsize::new(0));
        let analyzer = FixtureAnalyzer {
            calls: calls.clone(),
        };
        let mut session = AnalysisSession::new(Box::new(analyzer), HistoryStore::in_memory());

        let report = session
            .submit("A: hi\nB: hey", AnalysisMode::Quick, true, Some("chat.txt"))
            .expect("submit");
        assert_eq!(report.mode(), AnalysisMode::Quick);
        assert_eq!(report.meta.file_name, "chat.txt");
        let id = report.meta.id.clone();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.history().list()[0].meta.id, id);
    }

    #[test]
    fn blank_transcript_is_rejected_before_analysis() {
        let calls = Arc::new(AtomicUsize::new(0));
        let analyzer = FixtureAnalyzer {
            calls: calls.clone(),
        };
        let mut session = AnalysisSession::new(Box::new(analyzer), HistoryStore::in_memory());

        assert!(matches!(
            session.submit(" \n\t ", AnalysisMode::Deep, true, None),
            Err(Error::EmptyTranscript)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(session.history().is_empty());
    }

    #[test]
    fn failed_analysis_leaves_history_untouched() {
        let mut session = AnalysisSession::new(Box::new(FailingAnalyzer), HistoryStore::in_memory());
        let err = session
            .submit("A: hi", AnalysisMode::Quick, true, None)
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(session.into_history().is_empty());
    }
}
