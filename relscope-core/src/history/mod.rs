//! Bounded report history.
//!
//! The store keeps the most recent [`HISTORY_CAPACITY`] reports, newest
//! first. File-backed stores persist a single JSON record:
//!
//! ```json
//! { "relscopeHistory": [ { "meta": { ... }, "tldr": "...", ... } ] }
//! ```
//!
//! History is recoverable state: a missing, unreadable or corrupt file loads
//! as an empty history (logged) instead of failing startup.

mod lock;

use crate::types::AnalysisReport;
use crate::{Error, Result};
use lock::HistoryLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Number of reports kept; older ones are evicted permanently.
pub const HISTORY_CAPACITY: usize = 10;

/// Namespace key of the persisted record.
pub const HISTORY_KEY: &str = "relscopeHistory";

#[derive(Serialize, Deserialize)]
struct PersistedHistory {
    #[serde(rename = "relscopeHistory")]
    reports: Vec<AnalysisReport>,
}

/// Ordered cache of recent reports.
#[derive(Debug, Default)]
pub struct HistoryStore {
    reports: Vec<AnalysisReport>,
    path: Option<PathBuf>,
}

impl HistoryStore {
    /// Load the history persisted at `path`. Never fails; see module docs.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let reports = read_reports(&path);
        tracing::debug!(
            path = %path.display(),
            reports = reports.len(),
            "History loaded"
        );
        Self {
            reports,
            path: Some(path),
        }
    }

    /// A store that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Prepend `report` and evict everything beyond capacity.
    ///
    /// For file-backed stores the update is a read-modify-write of the file
    /// under an exclusive lock, so concurrent processes do not lose each
    /// other's reports. The in-memory view is refreshed from that file.
    pub fn append(&mut self, report: AnalysisReport) -> Result<()> {
        let id = report.meta.id.clone();

        match self.path.as_deref() {
            Some(path) => {
                let _lock = HistoryLock::acquire(path)?;
                let mut reports = read_reports(path);
                push_front_bounded(&mut reports, report);
                write_reports(path, &reports)?;
                self.reports = reports;
            }
            None => push_front_bounded(&mut self.reports, report),
        }

        tracing::info!(report_id = %id, stored = self.reports.len(), "Report added to history");
        Ok(())
    }

    /// Stored reports, most recent first.
    pub fn list(&self) -> &[AnalysisReport] {
        &self.reports
    }

    /// Exact id lookup.
    pub fn get(&self, id: &str) -> Option<&AnalysisReport> {
        self.reports.iter().find(|r| r.meta.id == id)
    }

    /// Exact id, or a prefix that matches exactly one stored report.
    pub fn find(&self, id_or_prefix: &str) -> Result<&AnalysisReport> {
        if let Some(report) = self.get(id_or_prefix) {
            return Ok(report);
        }

        let mut matches = self
            .reports
            .iter()
            .filter(|r| r.meta.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(report), None) if !id_or_prefix.is_empty() => Ok(report),
            (Some(_), Some(_)) => Err(Error::ReportNotFound(format!(
                "{id_or_prefix} (ambiguous prefix)"
            ))),
            _ => Err(Error::ReportNotFound(id_or_prefix.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn push_front_bounded(reports: &mut Vec<AnalysisReport>, report: AnalysisReport) {
    reports.insert(0, report);
    if reports.len() > HISTORY_CAPACITY {
        let evicted = reports.len() - HISTORY_CAPACITY;
        reports.truncate(HISTORY_CAPACITY);
        tracing::debug!(evicted, "Evicted oldest reports from history");
    }
}

fn read_reports(path: &Path) -> Vec<AnalysisReport> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable history, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<PersistedHistory>(&content) {
        Ok(mut persisted) => {
            persisted.reports.truncate(HISTORY_CAPACITY);
            persisted.reports
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Corrupt history, starting empty");
            Vec::new()
        }
    }
}

fn write_reports(path: &Path, reports: &[AnalysisReport]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let persisted = PersistedHistory {
        reports: reports.to_vec(),
    };
    let json = serde_json::to_vec(&persisted)?;

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
