//! Transcript analyzer boundary.
//!
//! The analyzer is an external LLM service. This module owns everything on
//! our side of that call: the recency-preserving truncation policy, the
//! prompt, the output schema attached to each request, and classification
//! of failures into transport / content / schema errors.

mod client;
mod prompt;

pub use client::{create_completion_client, HttpLlmClient};
pub use prompt::build_system_prompt;

use crate::config::{AnalysisConfig, LlmConfig};
use crate::schema::{parse_report_body, report_json_schema};
use crate::types::{AnalysisMode, ReportBody};
use crate::{Error, Result};

/// One completion call: instructions, user content and the output schema.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub schema: &'a serde_json::Value,
}

/// LLM completion interface.
///
/// Implementations return the model's raw text and classify failures as
/// [`Error::Transport`] or [`Error::Content`].
pub trait LlmCompletionClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;
}

/// Produces a report body from a transcript.
///
/// May take tens of seconds; blocks the calling thread until the remote
/// service answers or fails.
pub trait TranscriptAnalyzer: Send + Sync {
    fn analyze(&self, transcript: &str, mode: AnalysisMode, anonymize: bool)
        -> Result<ReportBody>;
}

/// Keep only the last `max_chars` characters of `transcript`.
///
/// Recent conversation matters more than old history, so overflow is cut
/// from the front. Counts Unicode scalar values and never splits one.
pub fn truncate_transcript(transcript: &str, max_chars: usize) -> &str {
    let total = transcript.chars().count();
    if total <= max_chars {
        return transcript;
    }
    match transcript.char_indices().nth(total - max_chars) {
        Some((offset, _)) => &transcript[offset..],
        None => "",
    }
}

/// [`TranscriptAnalyzer`] backed by an LLM completion client.
pub struct LlmTranscriptAnalyzer {
    client: Box<dyn LlmCompletionClient>,
    max_transcript_chars: usize,
    schema: serde_json::Value,
}

impl LlmTranscriptAnalyzer {
    pub fn new(client: Box<dyn LlmCompletionClient>, max_transcript_chars: usize) -> Self {
        Self {
            client,
            max_transcript_chars,
            schema: report_json_schema(),
        }
    }

    /// Build the HTTP-backed analyzer described by config.
    pub fn from_config(llm: &LlmConfig, analysis: &AnalysisConfig) -> Result<Self> {
        let client = create_completion_client(llm)?;
        Ok(Self::new(client, analysis.max_transcript_chars))
    }
}

impl TranscriptAnalyzer for LlmTranscriptAnalyzer {
    fn analyze(
        &self,
        transcript: &str,
        mode: AnalysisMode,
        anonymize: bool,
    ) -> Result<ReportBody> {
        let kept = truncate_transcript(transcript, self.max_transcript_chars);
        if kept.len() < transcript.len() {
            tracing::info!(
                original_bytes = transcript.len(),
                kept_bytes = kept.len(),
                max_chars = self.max_transcript_chars,
                "Transcript truncated to its most recent part"
            );
        }

        let system = build_system_prompt(mode, anonymize);
        let prompt = format!("Here is the chat transcript to analyze:\n\n---\n\n{kept}");

        tracing::info!(%mode, anonymize, bytes = kept.len(), "Requesting analysis");
        let raw = self.client.complete(&CompletionRequest {
            system: &system,
            prompt: &prompt,
            schema: &self.schema,
        })?;

        if raw.trim().is_empty() {
            return Err(Error::Content("analyzer returned empty text".to_string()));
        }

        let mut body = parse_report_body(&raw).inspect_err(|e| {
            tracing::warn!(error = %e, response_bytes = raw.len(), "Analyzer output rejected");
        })?;
        body.privacy.anonymize = anonymize;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the last request and replies with a canned result.
    struct MockClient {
        response: Result<String>,
        seen_prompt: Mutex<Option<String>>,
        seen_system: Mutex<Option<String>>,
    }

    impl MockClient {
        fn replying(response: Result<String>) -> Self {
            Self {
                response,
                seen_prompt: Mutex::new(None),
                seen_system: Mutex::new(None),
            }
        }
    }

    impl LlmCompletionClient for MockClient {
        fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
            assert!(request.schema.get("properties").is_some());
            *self.seen_prompt.lock().unwrap() = Some(request.prompt.to_string());
            *self.seen_system.lock().unwrap() = Some(request.system.to_string());
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(Error::Transport(msg)) => Err(Error::Transport(msg.clone())),
                Err(Error::Content(msg)) => Err(Error::Content(msg.clone())),
                Err(other) => panic!("unsupported mock error: {other:?}"),
            }
        }
    }

    impl LlmCompletionClient for std::sync::Arc<MockClient> {
        fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
            self.as_ref().complete(request)
        }
    }

    fn fixture() -> String {
        include_str!("../../tests/fixtures/report-body.json").to_string()
    }

    #[test]
    fn truncation_keeps_the_tail() {
        assert_eq!(truncate_transcript("hello", 10), "hello");
        assert_eq!(truncate_transcript("hello", 5), "hello");
        assert_eq!(truncate_transcript("hello world", 5), "world");
        assert_eq!(truncate_transcript("abc", 0), "");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "ééé💕💕";
        assert_eq!(truncate_transcript(text, 3), "é💕💕");
        assert_eq!(truncate_transcript(text, 2), "💕💕");
    }

    #[test]
    fn truncation_at_documented_ceiling() {
        let mut transcript = "a".repeat(500_000);
        transcript.push_str(&"b".repeat(3_000_000));
        assert_eq!(transcript.chars().count(), 3_500_000);

        let kept = truncate_transcript(&transcript, 3_000_000);
        assert_eq!(kept.len(), 3_000_000);
        assert!(kept.chars().all(|c| c == 'b'));
    }

    #[test]
    fn analyzer_sends_truncated_transcript() {
        let client = std::sync::Arc::new(MockClient::replying(Ok(fixture())));
        let analyzer = LlmTranscriptAnalyzer::new(Box::new(client.clone()), 8);

        analyzer
            .analyze("old stuff | recent!", AnalysisMode::Quick, true)
            .expect("analysis");
        let prompt = client.seen_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.ends_with("recent!"));
        assert!(!prompt.contains("old stuff"));
    }

    #[test]
    fn analyzer_overrides_privacy_flag() {
        let client = MockClient::replying(Ok(fixture()));
        let analyzer = LlmTranscriptAnalyzer::new(Box::new(client), 1_000);

        let body = analyzer
            .analyze("A: hi\nB: hey", AnalysisMode::Deep, false)
            .expect("analysis");
        assert!(!body.privacy.anonymize);
    }

    #[test]
    fn prompt_reflects_mode_and_anonymization() {
        let client = std::sync::Arc::new(MockClient::replying(Ok(fixture())));
        let analyzer = LlmTranscriptAnalyzer::new(Box::new(client.clone()), 1_000);
        analyzer
            .analyze("A: hi", AnalysisMode::Deep, true)
            .expect("analysis");

        let system = client.seen_system.lock().unwrap().clone().unwrap();
        assert!(system.contains("deep analysis"));
        assert!(system.contains("\"Person A\""));
    }

    #[test]
    fn empty_reply_is_content_error() {
        let analyzer =
            LlmTranscriptAnalyzer::new(Box::new(MockClient::replying(Ok("  \n".into()))), 100);
        assert!(matches!(
            analyzer.analyze("A: hi", AnalysisMode::Quick, true),
            Err(Error::Content(_))
        ));
    }

    #[test]
    fn transport_errors_pass_through() {
        let client = MockClient::replying(Err(Error::Transport("timed out".into())));
        let analyzer = LlmTranscriptAnalyzer::new(Box::new(client), 100);
        assert!(matches!(
            analyzer.analyze("A: hi", AnalysisMode::Quick, true),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn malformed_reply_is_schema_error() {
        let client = MockClient::replying(Ok(r#"{"tldr": "only this"}"#.into()));
        let analyzer = LlmTranscriptAnalyzer::new(Box::new(client), 100);
        assert!(matches!(
            analyzer.analyze("A: hi", AnalysisMode::Quick, true),
            Err(Error::SchemaValidation(_))
        ));
    }
}
