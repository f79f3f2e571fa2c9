//! Report assembly: attach metadata to a validated analyzer body.

use crate::types::{AnalysisMode, AnalysisReport, ReportBody, ReportMeta};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Prefix of every report id.
pub const REPORT_ID_PREFIX: &str = "rs";

/// Placeholder for meta dates when the period table is empty.
pub const MISSING_DATE: &str = "N/A";

/// File name used when the transcript did not come from a named file.
pub const DEFAULT_FILE_NAME: &str = "Uploaded Transcript";

/// Build a persisted-ready report.
///
/// `analysisMode` is forced to `mode`; the analyzer's own echo is ignored.
/// Pure: nothing is written to history here.
pub fn assemble(
    mut body: ReportBody,
    mode: AnalysisMode,
    requested_at: DateTime<Utc>,
    file_name: Option<&str>,
) -> AnalysisReport {
    if body.analysis_mode != mode {
        tracing::debug!(
            requested = %mode,
            echoed = %body.analysis_mode,
            "Analyzer echoed a different mode; using the requested one"
        );
    }
    body.analysis_mode = mode;

    let (first_message_date, last_message_date) = match (body.timeline.first(), body.timeline.last())
    {
        (Some(first), Some(last)) => (first.period.clone(), last.period.clone()),
        _ => (MISSING_DATE.to_string(), MISSING_DATE.to_string()),
    };

    let meta = ReportMeta {
        id: new_report_id(requested_at),
        analysis_date: requested_at,
        file_name: file_name.unwrap_or(DEFAULT_FILE_NAME).to_string(),
        first_message_date,
        last_message_date,
    };

    AnalysisReport { meta, body }
}

/// `rs-<unix millis>-<8 hex chars>`; the random suffix keeps ids from the
/// same millisecond apart.
pub fn new_report_id(requested_at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{REPORT_ID_PREFIX}-{}-{}",
        requested_at.timestamp_millis(),
        &suffix[..8]
    )
}
