//! relscope - relationship diagnostics for chat transcripts
//!
//! Sends a two-person chat transcript to the configured LLM analyzer, keeps
//! the last ten reports, and prints, exports or charts them.

mod display;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use relscope_core::schema::report_json_schema;
use relscope_core::{
    export_report, AnalysisMode, AnalysisReport, AnalysisSession, Config, ExportFormat,
    HistoryStore,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Shown in turn while the analyzer is working.
const STATUS_MESSAGES: &[&str] = &[
    "Reading the conversation...",
    "Counting messages and replies...",
    "Mapping phases and turning points...",
    "Profiling communication styles...",
    "Looking for green, yellow and red flags...",
    "Writing the report...",
];
const STATUS_INTERVAL: Duration = Duration::from_secs(3);
const TICK: Duration = Duration::from_millis(120);

#[derive(Parser, Debug)]
#[command(name = "relscope")]
#[command(about = "Relationship diagnostic reports from chat transcripts")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a chat transcript and store the report in history
    Analyze {
        /// Transcript file (plain text export of a chat)
        file: PathBuf,

        /// Analysis depth: quick or deep (default from config)
        #[arg(long)]
        mode: Option<AnalysisMode>,

        /// Keep real names instead of "Person A" / "Person B"
        #[arg(long)]
        no_anonymize: bool,

        /// Also export the report (md = markdown, json = JSON)
        #[arg(long)]
        export: Option<ExportFormat>,

        /// Export directory (default: current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List stored reports, newest first
    History,

    /// Print or export a stored report
    Show {
        /// Report id (unique prefix accepted)
        id: String,

        /// Export instead of printing (md = markdown, json = JSON)
        #[arg(long)]
        export: Option<ExportFormat>,

        /// Export directory (default: current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the merged event/phase timeline of a stored report
    Timeline {
        /// Report id (unique prefix accepted)
        id: String,
    },

    /// Print the JSON schema the analyzer must answer with
    Schema,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();
    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = relscope_core::logging::init(&config.logging).ok();

    match args.command {
        Command::Analyze {
            file,
            mode,
            no_anonymize,
            export,
            out,
        } => {
            let mode = mode.unwrap_or(config.analysis.default_mode);
            let anonymize = config.analysis.anonymize && !no_anonymize;
            run_analyze(&config, &file, mode, anonymize, export, out.as_deref())
        }
        Command::History => {
            let history = HistoryStore::open(Config::history_path());
            display::print_history(history.list());
            Ok(())
        }
        Command::Show { id, export, out } => {
            let history = HistoryStore::open(Config::history_path());
            let report = history.find(&id)?;
            match export {
                Some(format) => export_to(report, format, out.as_deref()),
                None => {
                    display::print_report(report);
                    Ok(())
                }
            }
        }
        Command::Timeline { id } => {
            let history = HistoryStore::open(Config::history_path());
            display::print_timeline(history.find(&id)?);
            Ok(())
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&report_json_schema())?);
            Ok(())
        }
    }
}

fn run_analyze(
    config: &Config,
    file: &Path,
    mode: AnalysisMode,
    anonymize: bool,
    export: Option<ExportFormat>,
    out: Option<&Path>,
) -> Result<()> {
    let transcript = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read transcript {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    let mut session =
        AnalysisSession::from_config(config).context("analyzer is not configured")?;

    tracing::info!(%mode, anonymize, bytes = transcript.len(), "Starting analysis");
    let report = with_spinner(|| {
        session
            .submit(&transcript, mode, anonymize, file_name.as_deref())
            .cloned()
    })
    .map_err(|e| {
        tracing::error!(error = %e, "Analysis failed");
        anyhow::anyhow!(e.user_message())
    })?;

    display::print_report(&report);

    if let Some(format) = export {
        export_to(&report, format, out)?;
    }
    Ok(())
}

fn export_to(report: &AnalysisReport, format: ExportFormat, out: Option<&Path>) -> Result<()> {
    let dir = out.unwrap_or_else(|| Path::new("."));
    let path = export_report(report, format, dir)
        .with_context(|| format!("failed to export report to {}", dir.display()))?;
    println!("Exported to {}", path.display());
    Ok(())
}

/// Run `work` behind a spinner whose message cycles through
/// [`STATUS_MESSAGES`]. The spinner hides itself when stderr is not a tty.
fn with_spinner<T>(work: impl FnOnce() -> T) -> T {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(TICK);

    let done = AtomicBool::new(false);
    let result = std::thread::scope(|scope| {
        scope.spawn(|| {
            let ticks_per_message = (STATUS_INTERVAL.as_millis() / TICK.as_millis()) as usize;
            for message in STATUS_MESSAGES.iter().cycle() {
                pb.set_message(*message);
                for _ in 0..ticks_per_message {
                    if done.load(Ordering::Relaxed) {
                        return;
                    }
                    std::thread::sleep(TICK);
                }
            }
        });
        let result = work();
        done.store(true, Ordering::Relaxed);
        result
    });

    pb.finish_and_clear();
    result
}
