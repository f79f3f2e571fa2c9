//! Timeline reconstruction.
//!
//! Merges the analyzer's point-in-time events and date-ranged phases into one
//! chronological sequence. Events sort by their date, phases by their start
//! date. Items borrow from the report, so the inputs are never modified.
//!
//! Accepted date forms:
//! - `YYYY-MM-DD` (midnight UTC)
//! - RFC 3339 (`2024-01-05T18:30:00+02:00`)
//! - date-times `YYYY-MM-DDTHH:MM[:SS[.fff]]`, `T` or a space as separator,
//!   followed by nothing (UTC), `Z`, or an offset `+HH:MM` / `+HHMM`
//! - `YYYY-MM` (first day of the month)
//! - `YYYY` (January 1st)
//!
//! Anything else is an [`Error::InvalidDate`]. Malformed dates are never
//! replaced with "now" and never dropped without being reported.

use crate::error::TimelineItemKind;
use crate::types::{TimelineEvent, TimelinePhase};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Ordering of an event and a phase that fall on the same instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Events precede phases; equivalent to a stable sort of
    /// events-then-phases by date alone.
    #[default]
    EventsFirst,
    /// A phase opens before the events dated on its start day.
    PhasesFirst,
}

/// One entry of the merged timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineItem<'a> {
    Event {
        date: DateTime<Utc>,
        event: &'a TimelineEvent,
    },
    Phase {
        date: DateTime<Utc>,
        phase: &'a TimelinePhase,
    },
}

impl<'a> TimelineItem<'a> {
    /// Sort key: the event date or the phase start date.
    pub fn date(&self) -> DateTime<Utc> {
        match self {
            TimelineItem::Event { date, .. } | TimelineItem::Phase { date, .. } => *date,
        }
    }

    pub fn kind(&self) -> TimelineItemKind {
        match self {
            TimelineItem::Event { .. } => TimelineItemKind::Event,
            TimelineItem::Phase { .. } => TimelineItemKind::Phase,
        }
    }

    /// The date string as the analyzer wrote it.
    pub fn raw_date(&self) -> &'a str {
        match self {
            TimelineItem::Event { event, .. } => &event.date,
            TimelineItem::Phase { phase, .. } => &phase.start_date,
        }
    }

    fn rank(&self, tie_break: TieBreak) -> u8 {
        match (self, tie_break) {
            (TimelineItem::Event { .. }, TieBreak::EventsFirst)
            | (TimelineItem::Phase { .. }, TieBreak::PhasesFirst) => 0,
            _ => 1,
        }
    }
}

/// A timeline item whose date could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedItem<'a> {
    pub kind: TimelineItemKind,
    /// Position within its source collection
    pub index: usize,
    pub value: &'a str,
}

impl RejectedItem<'_> {
    pub fn to_error(&self) -> Error {
        Error::InvalidDate {
            kind: self.kind,
            index: self.index,
            value: self.value.to_string(),
        }
    }
}

/// Result of a lenient merge: the ordered valid items plus everything rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineMerge<'a> {
    pub items: Vec<TimelineItem<'a>>,
    pub rejected: Vec<RejectedItem<'a>>,
}

impl TimelineMerge<'_> {
    /// Nothing to draw at all (no valid and no rejected items).
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.rejected.is_empty()
    }
}

/// Merge events and phases into ascending date order.
///
/// Ties keep input order: events before phases, and each collection in its
/// own order. Fails on the first unparsable date (events are checked first).
pub fn merge<'a>(
    events: &'a [TimelineEvent],
    phases: &'a [TimelinePhase],
) -> Result<Vec<TimelineItem<'a>>> {
    merge_with(events, phases, TieBreak::EventsFirst)
}

/// [`merge`] with an explicit tie-break.
pub fn merge_with<'a>(
    events: &'a [TimelineEvent],
    phases: &'a [TimelinePhase],
    tie_break: TieBreak,
) -> Result<Vec<TimelineItem<'a>>> {
    let merged = merge_valid_with(events, phases, tie_break);
    match merged.rejected.first() {
        Some(rejected) => Err(rejected.to_error()),
        None => Ok(merged.items),
    }
}

/// Merge whatever parses and report the rest, so a caller can still render
/// a partial timeline.
pub fn merge_valid<'a>(
    events: &'a [TimelineEvent],
    phases: &'a [TimelinePhase],
) -> TimelineMerge<'a> {
    merge_valid_with(events, phases, TieBreak::EventsFirst)
}

/// [`merge_valid`] with an explicit tie-break.
pub fn merge_valid_with<'a>(
    events: &'a [TimelineEvent],
    phases: &'a [TimelinePhase],
    tie_break: TieBreak,
) -> TimelineMerge<'a> {
    let mut merged = TimelineMerge {
        items: Vec::with_capacity(events.len() + phases.len()),
        rejected: Vec::new(),
    };

    for (index, event) in events.iter().enumerate() {
        match parse_timeline_date(&event.date) {
            Some(date) => merged.items.push(TimelineItem::Event { date, event }),
            None => merged.rejected.push(RejectedItem {
                kind: TimelineItemKind::Event,
                index,
                value: &event.date,
            }),
        }
    }

    for (index, phase) in phases.iter().enumerate() {
        match parse_timeline_date(&phase.start_date) {
            Some(date) => {
                if phase.is_inverted() {
                    tracing::debug!(
                        phase = %phase.name,
                        start = %phase.start_date,
                        end = %phase.end_date,
                        "Phase ends before it starts; passing through unchanged"
                    );
                }
                merged.items.push(TimelineItem::Phase { date, phase });
            }
            None => merged.rejected.push(RejectedItem {
                kind: TimelineItemKind::Phase,
                index,
                value: &phase.start_date,
            }),
        }
    }

    // Vec::sort_by is stable: equal keys keep their push order.
    merged.items.sort_by(|a, b| {
        a.date()
            .cmp(&b.date())
            .then_with(|| a.rank(tie_break).cmp(&b.rank(tie_break)))
    });

    if !merged.rejected.is_empty() {
        tracing::warn!(
            rejected = merged.rejected.len(),
            merged = merged.items.len(),
            "Timeline contains unparsable dates"
        );
    }

    merged
}

impl TimelinePhase {
    /// True when both dates parse and the phase ends before it starts.
    ///
    /// Such phases are kept as the analyzer produced them.
    pub fn is_inverted(&self) -> bool {
        match (
            parse_timeline_date(&self.start_date),
            parse_timeline_date(&self.end_date),
        ) {
            (Some(start), Some(end)) => end < start,
            _ => false,
        }
    }
}

/// Date-time layouts, most specific first. Each is tried bare (UTC) and
/// with a trailing offset.
const DATE_TIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse one of the accepted timeline date forms into a UTC instant.
pub fn parse_timeline_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // `Z` means UTC, same as no suffix.
    let naive = s.strip_suffix(['Z', 'z']).unwrap_or(s);
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(dt.and_utc());
        }
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, &format!("{format}%z")) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }

    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).map(|d| d.and_time(NaiveTime::MIN).and_utc());
    }

    None
}
