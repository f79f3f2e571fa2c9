//! Report export: a single Markdown document or the raw JSON record.
//!
//! The Markdown layout mirrors the on-screen report: safety notice first,
//! then the verdict, meters, profiles, communication patterns, flags, the
//! fixing kit, the timeline and closing ideas. Rendering is deterministic;
//! the same report always produces the same document.

use crate::timeline::{merge_valid, TimelineItem};
use crate::types::{AnalysisMode, AnalysisReport, FlagType, PersonAnalysis};
use crate::{Error, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// File name stem shared by all exports.
pub const EXPORT_FILE_PREFIX: &str = "RelationScope_Report_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("unknown export format: {s} (expected md or json)")),
        }
    }
}

/// `RelationScope_Report_<id>.<ext>`
pub fn export_file_name(report: &AnalysisReport, format: ExportFormat) -> String {
    format!("{EXPORT_FILE_PREFIX}{}.{}", report.meta.id, format.extension())
}

/// Write `report` into `dir` and return the path of the new file.
pub fn export_report(report: &AnalysisReport, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(report, format));
    let content = match format {
        ExportFormat::Markdown => render_markdown(report),
        ExportFormat::Json => serde_json::to_string_pretty(report)?,
    };
    fs::write(&path, content).map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Export failed");
        Error::Io(e)
    })?;
    tracing::info!(report_id = %report.meta.id, %format, path = %path.display(), "Report exported");
    Ok(path)
}

/// Make analyzer text safe inside a Markdown table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Render the full report as Markdown.
pub fn render_markdown(report: &AnalysisReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_markdown(&mut out, report);
    out
}

fn write_markdown(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    let meta = &report.meta;
    let body = &report.body;
    let deep = report.mode() == AnalysisMode::Deep;

    writeln!(out, "# RelationScope Report")?;
    writeln!(out)?;
    writeln!(out, "| | |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Report | `{}` |", meta.id)?;
    writeln!(out, "| Source | {} |", cell(&meta.file_name))?;
    writeln!(
        out,
        "| Analyzed | {} |",
        meta.analysis_date.format("%Y-%m-%d %H:%M UTC")
    )?;
    writeln!(out, "| Mode | {} |", report.mode().display_name())?;
    writeln!(
        out,
        "| Period | {} to {} |",
        cell(&meta.first_message_date),
        cell(&meta.last_message_date)
    )?;
    writeln!(out)?;

    if body.safety_warning.is_triggered {
        writeln!(out, "> ⚠️ **Safety notice**")?;
        writeln!(out, ">")?;
        writeln!(out, "> {}", body.safety_warning.details)?;
        for resource in &body.safety_warning.resources {
            writeln!(out, "> - **{}**: {}", resource.name, resource.contact)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "## Verdict")?;
    writeln!(out)?;
    writeln!(
        out,
        "**{}** ({}% confidence)",
        body.verdict.text, body.verdict.confidence
    )?;
    writeln!(out)?;
    writeln!(out, "{}", body.tldr)?;
    writeln!(out)?;

    if !body.final_snapshot.is_empty() {
        writeln!(out, "## Snapshot")?;
        writeln!(out)?;
        writeln!(out, "| Meter | Value |")?;
        writeln!(out, "|-------|-------|")?;
        for meter in &body.final_snapshot {
            writeln!(
                out,
                "| {} {} | {}% |",
                cell(&meter.emoji),
                cell(&meter.name),
                meter.value
            )?;
        }
        writeln!(out)?;
    }

    if !body.general_metrics.is_empty() {
        writeln!(out, "## Key Metrics")?;
        writeln!(out)?;
        for metric in &body.general_metrics {
            writeln!(out, "- **{}**: {}. {}", metric.name, metric.value, metric.insight)?;
            for quote in &metric.evidence {
                writeln!(out, "  - \"{quote}\"")?;
            }
        }
        writeln!(out)?;
    }

    if deep {
        writeln!(out, "## Personality Profiles")?;
        writeln!(out)?;
        write_person(out, &body.person_a_analysis)?;
        write_person(out, &body.person_b_analysis)?;
    }

    let viz = &body.visualizations;
    writeln!(out, "## Communication Patterns")?;
    writeln!(out)?;
    writeln!(out, "| Time of day | Messages |")?;
    writeln!(out, "|-------------|----------|")?;
    writeln!(out, "| Morning | {} |", viz.time_of_day.morning)?;
    writeln!(out, "| Afternoon | {} |", viz.time_of_day.afternoon)?;
    writeln!(out, "| Evening | {} |", viz.time_of_day.evening)?;
    writeln!(out, "| Night | {} |", viz.time_of_day.night)?;
    writeln!(out)?;
    writeln!(
        out,
        "Night texting: {:.0}% of messages.",
        viz.time_of_day.night_percentage()
    )?;
    writeln!(out)?;
    let (a, b) = (cell(&body.person_a_analysis.name), cell(&body.person_b_analysis.name));
    writeln!(out, "| | {a} | {b} |")?;
    writeln!(out, "|---|---|---|")?;
    writeln!(
        out,
        "| Initiations | {} | {} |",
        viz.reciprocity.person_a_initiations, viz.reciprocity.person_b_initiations
    )?;
    writeln!(
        out,
        "| Avg. response (min) | {} | {} |",
        viz.reciprocity.person_a_response_speed_minutes,
        viz.reciprocity.person_b_response_speed_minutes
    )?;
    writeln!(out)?;

    writeln!(out, "## Flags")?;
    for kind in FlagType::ALL {
        writeln!(out)?;
        writeln!(out, "### {} {} Flags", kind.emoji(), kind.as_str())?;
        writeln!(out)?;
        let mut any = false;
        for flag in body.flags_of(kind) {
            any = true;
            writeln!(out, "- {}", flag.description)?;
            if let Some(quote) = flag.evidence.first() {
                writeln!(out, "  > \"{quote}\"")?;
            }
        }
        if !any {
            writeln!(out, "*No {} flags identified.*", kind.as_str())?;
        }
    }
    writeln!(out)?;

    if deep && body.has_fixing_kit() {
        writeln!(out, "## Fixing Kit")?;
        writeln!(out)?;
        for group in &body.fixing_kit {
            writeln!(out, "**{}**", group.category)?;
            writeln!(out)?;
            for item in &group.items {
                writeln!(out, "- {item}")?;
            }
            writeln!(out)?;
        }
        if !body.discussion_topics.is_empty() {
            writeln!(out, "**Topics to discuss**")?;
            writeln!(out)?;
            for topic in &body.discussion_topics {
                writeln!(
                    out,
                    "- {} ({}): {}",
                    topic.topic,
                    topic.when.as_str(),
                    topic.reason
                )?;
            }
            writeln!(out)?;
        }
    }

    writeln!(out, "## Timeline")?;
    writeln!(out)?;
    write_timeline(out, report)?;

    if !body.gift_and_date_ideas.is_empty() {
        writeln!(out, "## Gift & Date Ideas")?;
        writeln!(out)?;
        for idea in &body.gift_and_date_ideas {
            writeln!(out, "- {idea}")?;
        }
        writeln!(out)?;
    }

    Ok(())
}

fn write_person(out: &mut String, person: &PersonAnalysis) -> std::fmt::Result {
    writeln!(out, "### {}", person.name)?;
    writeln!(out)?;
    writeln!(out, "| Trait | Score | Evidence |")?;
    writeln!(out, "|-------|-------|----------|")?;
    let evidence = &person.ocean_evidence;
    let quotes = [
        &evidence.openness,
        &evidence.conscientiousness,
        &evidence.extraversion,
        &evidence.agreeableness,
        &evidence.neuroticism,
    ];
    for ((name, score), quote) in person.ocean_score.traits().into_iter().zip(quotes) {
        writeln!(out, "| {name} | {score} | \"{}\" |", cell(quote))?;
    }
    writeln!(out)?;

    let style = &person.messaging_style;
    writeln!(out, "- Directness: {}", style.directness)?;
    writeln!(out, "- Role: {}", style.role_flavor)?;
    writeln!(out, "- Self-labeling: {}", style.self_labeling)?;
    writeln!(out, "- Boundaries: {}", style.boundary_clarity)?;
    writeln!(out, "- Values: {}", style.value_ethics)?;
    writeln!(out)
}

fn write_timeline(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    let viz = &report.body.visualizations;
    let merged = merge_valid(&viz.visual_timeline_events, &viz.visual_timeline_phases);

    if merged.items.is_empty() {
        writeln!(out, "*Not enough data to generate a timeline.*")?;
    }
    for item in &merged.items {
        match item {
            TimelineItem::Event { event, .. } => {
                writeln!(
                    out,
                    "- {} **{}** {}: {}",
                    event.kind.emoji(),
                    event.date,
                    event.description,
                    event.inference
                )?;
            }
            TimelineItem::Phase { phase, .. } => {
                let inverted = if phase.is_inverted() { " (dates inverted)" } else { "" };
                writeln!(
                    out,
                    "- 📍 **{}** phase, {} to {}{inverted}",
                    phase.name, phase.start_date, phase.end_date
                )?;
            }
        }
    }
    if !merged.rejected.is_empty() {
        writeln!(out)?;
        writeln!(out, "Entries with unreadable dates:")?;
        for rejected in &merged.rejected {
            writeln!(
                out,
                "- {} #{}: `{}`",
                rejected.kind, rejected.index, rejected.value
            )?;
        }
    }
    writeln!(out)
}
