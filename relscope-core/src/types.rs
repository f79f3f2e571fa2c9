//! Report data model
//!
//! These types are the report contract: the analyzer's JSON output is
//! deserialized into [`ReportBody`], and the JSON Schema sent to the
//! analyzer is derived from the same definitions (see [`crate::schema`]).
//! Field names on the wire are camelCase; persisted history uses the same
//! layout.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Report** | An assembled [`AnalysisReport`]: metadata plus the analyzer body |
//! | **Event** | A single dated, categorized occurrence ([`TimelineEvent`]) |
//! | **Phase** | A named, date-ranged segment of the relationship ([`TimelinePhase`]) |
//! | **Period** | One row of the tabular timeline (usually a month) |
//! | **Snapshot** | Headline percentage meters summarizing the relationship state |
//! | **Reciprocity** | Initiation and response-latency balance between the two people |

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================
// Analysis Mode
// ============================================

/// Depth of analysis requested from the analyzer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// High-level metrics, meters and flags only
    #[default]
    Quick,
    /// Full analysis including personality, timeline and repair dynamics
    Deep,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Quick => "quick",
            AnalysisMode::Deep => "deep",
        }
    }

    /// Returns the display name for this mode
    pub fn display_name(&self) -> &'static str {
        match self {
            AnalysisMode::Quick => "Quick",
            AnalysisMode::Deep => "Deep",
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quick" => Ok(AnalysisMode::Quick),
            "deep" => Ok(AnalysisMode::Deep),
            _ => Err(format!("unknown analysis mode: {}", s)),
        }
    }
}

// ============================================
// Report
// ============================================

/// Metadata attached at assembly time. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    /// Unique report id (`rs-<millis>-<suffix>`)
    pub id: String,
    /// When the analysis was requested
    pub analysis_date: DateTime<Utc>,
    /// Name of the analyzed transcript file
    pub file_name: String,
    /// First timeline period, or `"N/A"`
    pub first_message_date: String,
    /// Last timeline period, or `"N/A"`
    pub last_message_date: String,
}

/// An assembled report: metadata plus everything the analyzer produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub meta: ReportMeta,
    #[serde(flatten)]
    pub body: ReportBody,
}

impl AnalysisReport {
    /// Requested analysis depth (always the caller's, never the analyzer's echo)
    pub fn mode(&self) -> AnalysisMode {
        self.body.analysis_mode
    }
}

/// The analyzer's output: a full report minus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[schemars(title = "RelationshipReport")]
pub struct ReportBody {
    /// A 2-3 line summary of the entire analysis.
    pub tldr: String,
    pub verdict: Verdict,
    pub general_metrics: Vec<GeneralMetric>,
    /// Chronological period table (usually monthly).
    pub timeline: Vec<TimelineEntry>,
    #[serde(rename = "personAAnalysis")]
    pub person_a_analysis: PersonAnalysis,
    #[serde(rename = "personBAnalysis")]
    pub person_b_analysis: PersonAnalysis,
    pub solo_patterns: Vec<DynamicPattern>,
    pub couple_dynamics: Vec<DynamicPattern>,
    pub flags: Vec<Flag>,
    pub fixing_kit: Vec<FixingKitItem>,
    pub discussion_topics: Vec<DiscussionTopic>,
    pub gift_and_date_ideas: Vec<String>,
    pub final_snapshot: Vec<SnapshotMeter>,
    pub safety_warning: SafetyWarning,
    /// The mode of analysis performed.
    pub analysis_mode: AnalysisMode,
    pub privacy: Privacy,
    pub visualizations: Visualizations,
}

impl ReportBody {
    /// Flags of one colour, in analyzer order.
    pub fn flags_of(&self, kind: FlagType) -> impl Iterator<Item = &Flag> {
        self.flags.iter().filter(move |f| f.kind == kind)
    }

    /// Whether the fixing kit section has anything to show: advice groups
    /// or discussion topics, either alone is enough.
    pub fn has_fixing_kit(&self) -> bool {
        !self.fixing_kit.is_empty() || !self.discussion_topics.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub text: String,
    /// Confidence percentage.
    #[schemars(range(min = 0, max = 100))]
    pub confidence: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneralMetric {
    pub name: String,
    /// Free-form value; may be numeric-looking or textual.
    pub value: String,
    /// Why this metric matters.
    pub insight: String,
    /// One to three direct quotes of at most 25 words.
    #[schemars(length(min = 1, max = 3))]
    pub evidence: Vec<String>,
}

// ============================================
// Tabular timeline
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    /// Period label, e.g. "2024-01".
    pub period: String,
    pub phase: String,
    pub phase_description: String,
    /// Ratio string such as "3:1".
    pub affection_to_conflict_ratio: String,
    pub topic_mentions: TopicMentions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicMentions {
    pub ex: u32,
    pub past: u32,
    pub cheat: u32,
    pub trust: u32,
    pub jealousy: u32,
    pub breakup: u32,
    pub block: u32,
}

impl TopicMentions {
    /// Label/count pairs in schema order.
    pub fn counts(&self) -> [(&'static str, u32); 7] {
        [
            ("Ex", self.ex),
            ("Past", self.past),
            ("Cheat", self.cheat),
            ("Trust", self.trust),
            ("Jealousy", self.jealousy),
            ("Breakup", self.breakup),
            ("Block", self.block),
        ]
    }
}

// ============================================
// People
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonAnalysis {
    /// The name of the person, or "Person A" / "Person B" if anonymized.
    pub name: String,
    pub ocean_score: OceanScore,
    pub ocean_evidence: OceanEvidence,
    pub messaging_style: MessagingStyle,
}

/// Big Five (OCEAN) trait scores, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OceanScore {
    #[schemars(range(min = 0, max = 100))]
    pub openness: u32,
    #[schemars(range(min = 0, max = 100))]
    pub conscientiousness: u32,
    #[schemars(range(min = 0, max = 100))]
    pub extraversion: u32,
    #[schemars(range(min = 0, max = 100))]
    pub agreeableness: u32,
    #[schemars(range(min = 0, max = 100))]
    pub neuroticism: u32,
}

impl OceanScore {
    /// Trait name/score pairs in OCEAN order.
    pub fn traits(&self) -> [(&'static str, u32); 5] {
        [
            ("openness", self.openness),
            ("conscientiousness", self.conscientiousness),
            ("extraversion", self.extraversion),
            ("agreeableness", self.agreeableness),
            ("neuroticism", self.neuroticism),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OceanEvidence {
    pub openness: String,
    pub conscientiousness: String,
    pub extraversion: String,
    pub agreeableness: String,
    pub neuroticism: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessagingStyle {
    /// Direct vs indirect vs neutral messaging proportions.
    pub directness: String,
    /// e.g. probing/softening vs decisive/brief.
    pub role_flavor: String,
    pub self_labeling: String,
    pub boundary_clarity: String,
    pub value_ethics: String,
}

// ============================================
// Narrative sections
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DynamicPattern {
    pub title: String,
    pub description: String,
    pub evidence: Vec<String>,
}

/// Flag colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum FlagType {
    Green,
    Yellow,
    Red,
}

impl FlagType {
    pub const ALL: [FlagType; 3] = [FlagType::Green, FlagType::Yellow, FlagType::Red];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlagType::Green => "Green",
            FlagType::Yellow => "Yellow",
            FlagType::Red => "Red",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            FlagType::Green => "✅",
            FlagType::Yellow => "🟡",
            FlagType::Red => "🚩",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    #[serde(rename = "type")]
    pub kind: FlagType,
    pub description: String,
    #[schemars(length(min = 1))]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FixingKitItem {
    pub category: String,
    pub items: Vec<String>,
}

/// When a topic should be raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DiscussionTiming {
    Now,
    Later,
}

impl DiscussionTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionTiming::Now => "Now",
            DiscussionTiming::Later => "Later",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionTopic {
    pub topic: String,
    pub when: DiscussionTiming,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeter {
    pub name: String,
    #[schemars(range(min = 0, max = 100))]
    pub value: u32,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SafetyWarning {
    pub is_triggered: bool,
    pub details: String,
    pub resources: Vec<SafetyResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SafetyResource {
    pub name: String,
    pub contact: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Privacy {
    pub anonymize: bool,
}

// ============================================
// Visualizations
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Visualizations {
    pub time_of_day: TimeOfDay,
    pub reciprocity: Reciprocity,
    pub visual_timeline_events: Vec<TimelineEvent>,
    pub visual_timeline_phases: Vec<TimelinePhase>,
}

/// Message counts per part of day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDay {
    pub morning: u32,
    pub afternoon: u32,
    pub evening: u32,
    pub night: u32,
}

impl TimeOfDay {
    pub fn total(&self) -> u64 {
        u64::from(self.morning)
            + u64::from(self.afternoon)
            + u64::from(self.evening)
            + u64::from(self.night)
    }

    /// Share of messages sent at night, as a whole percentage.
    pub fn night_percentage(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => f64::from(self.night) * 100.0 / total as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reciprocity {
    pub person_a_initiations: u32,
    pub person_b_initiations: u32,
    pub person_a_response_speed_minutes: u32,
    pub person_b_response_speed_minutes: u32,
}

/// Category of a timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum EventType {
    /// Affection, support, gifts
    Positive,
    /// Arguments, threats, blocking
    Negative,
    /// Mood swings, delays
    Neutral,
    /// Significant break in communication
    Stop,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Positive => "Positive",
            EventType::Negative => "Negative",
            EventType::Neutral => "Neutral",
            EventType::Stop => "Stop",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            EventType::Positive => "💚",
            EventType::Negative => "💔",
            EventType::Neutral => "⚪",
            EventType::Stop => "⛔",
        }
    }
}

/// A point-in-time occurrence on the visual timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    /// "YYYY-MM-DD", inferred when not explicit.
    pub date: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub description: String,
    pub inference: String,
    /// A single short quote.
    pub evidence: String,
}

/// A named, date-ranged segment of the relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePhase {
    /// e.g. "Dating", "Commitment", "Strain".
    pub name: String,
    /// "YYYY-MM-DD"
    pub start_date: String,
    /// "YYYY-MM-DD"
    pub end_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_str() {
        assert_eq!("deep".parse::<AnalysisMode>(), Ok(AnalysisMode::Deep));
        assert_eq!("Quick".parse::<AnalysisMode>(), Ok(AnalysisMode::Quick));
        assert!("thorough".parse::<AnalysisMode>().is_err());
        assert_eq!(AnalysisMode::Deep.to_string(), "deep");
    }

    #[test]
    fn wire_names_are_camel_case() {
        let phase = TimelinePhase {
            name: "Dating".to_string(),
            start_date: "2024-01-01".to_string(),
            end_date: "2024-02-01".to_string(),
        };
        let json = serde_json::to_value(&phase).unwrap();
        assert_eq!(json["startDate"], "2024-01-01");
        assert_eq!(json["endDate"], "2024-02-01");

        let event: TimelineEvent = serde_json::from_str(
            r#"{"date":"2024-01-05","type":"Stop","description":"d","inference":"i","evidence":"e"}"#,
        )
        .unwrap();
        assert_eq!(event.kind, EventType::Stop);
    }

    #[test]
    fn time_of_day_night_share() {
        let tod = TimeOfDay {
            morning: 10,
            afternoon: 20,
            evening: 30,
            night: 40,
        };
        assert_eq!(tod.total(), 100);
        assert!((tod.night_percentage() - 40.0).abs() < f64::EPSILON);
        assert_eq!(TimeOfDay::default().night_percentage(), 0.0);
    }
}
