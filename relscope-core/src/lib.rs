//! # relscope-core
//!
//! Core library for relscope - a relationship diagnostic report generator
//! for chat transcripts.
//!
//! This library provides:
//! - The report contract (typed schema, JSON Schema, validation)
//! - The transcript analyzer boundary and LLM provider clients
//! - Report assembly and the bounded report history
//! - Timeline reconstruction and Markdown/JSON export
//! - Configuration management and logging infrastructure
//!
//! ## Flow
//!
//! transcript → [`analyzer`] (remote LLM) → [`schema`] (parse + validate)
//! → [`assemble`] (meta) → [`HistoryStore`] (last 10 reports)
//!
//! ## Example
//!
//! ```rust,no_run
//! use relscope_core::{AnalysisMode, AnalysisSession, Config};
//!
//! let config = Config::load().expect("failed to load config");
//! let mut session = AnalysisSession::from_config(&config).expect("no analyzer configured");
//!
//! let transcript = std::fs::read_to_string("chat.txt").expect("read transcript");
//! let report = session
//!     .submit(&transcript, AnalysisMode::Quick, true, Some("chat.txt"))
//!     .expect("analysis failed");
//! println!("{}", report.body.verdict.text);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use export::{export_report, render_markdown, ExportFormat};
pub use history::HistoryStore;
pub use session::AnalysisSession;
pub use types::*;

// Public modules
pub mod analyzer;
pub mod assemble;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod logging;
pub mod schema;
pub mod session;
pub mod timeline;
pub mod types;
