//! Report schema contract.
//!
//! One set of type definitions ([`ReportBody`] and friends) serves two
//! purposes: the JSON Schema sent with every analyzer request, and the
//! strict parse boundary applied to whatever comes back. A response either
//! becomes a fully validated [`ReportBody`] or an
//! [`Error::SchemaValidation`]; nothing is partially accepted.

use crate::types::ReportBody;
use crate::{Error, Result};
use schemars::generate::SchemaSettings;

/// Upper bound for every percentage-like integer in the report.
pub const MAX_PERCENT: u32 = 100;

/// Bounds on `generalMetrics[].evidence`.
pub const METRIC_EVIDENCE_MIN: usize = 1;
pub const METRIC_EVIDENCE_MAX: usize = 3;

/// JSON Schema for the analyzer's output, with all subschemas inlined.
///
/// Providers differ in how much of JSON Schema they accept; an inlined
/// document without `$schema`/`$ref` is understood by all of them.
pub fn report_json_schema() -> serde_json::Value {
    let generator = SchemaSettings::draft2020_12()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    let mut value = generator.into_root_schema_for::<ReportBody>().to_value();
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
    }
    value
}

/// Parse and validate raw analyzer output.
///
/// Accepts a bare JSON object or one embedded in surrounding text (for
/// example a fenced code block). Structural errors (missing fields, wrong
/// types, unknown enum values) and semantic violations (out-of-range
/// scores, missing evidence) are both reported as
/// [`Error::SchemaValidation`].
pub fn parse_report_body(raw: &str) -> Result<ReportBody> {
    let value = match serde_json::from_str::<serde_json::Value>(raw.trim()) {
        Ok(value) => value,
        Err(_) => {
            let extracted = extract_json_object(raw)?;
            serde_json::from_str::<serde_json::Value>(extracted).map_err(|e| {
                Error::SchemaValidation(format!("response is not valid JSON: {e}"))
            })?
        }
    };

    if !value.is_object() {
        return Err(Error::SchemaValidation(
            "response must be a JSON object".to_string(),
        ));
    }

    let body: ReportBody =
        serde_json::from_value(value).map_err(|e| Error::SchemaValidation(e.to_string()))?;
    validate_report_body(&body)?;
    Ok(body)
}

/// Check the constraints serde cannot express: ranges and evidence counts.
pub fn validate_report_body(body: &ReportBody) -> Result<()> {
    let mut violations = Violations::default();

    violations.percent("verdict.confidence", body.verdict.confidence);

    for (i, metric) in body.general_metrics.iter().enumerate() {
        let n = metric.evidence.len();
        if !(METRIC_EVIDENCE_MIN..=METRIC_EVIDENCE_MAX).contains(&n) {
            violations.push(format!(
                "generalMetrics[{i}].evidence must hold {METRIC_EVIDENCE_MIN}-{METRIC_EVIDENCE_MAX} quotes, got {n}"
            ));
        }
    }

    for (label, person) in [
        ("personAAnalysis", &body.person_a_analysis),
        ("personBAnalysis", &body.person_b_analysis),
    ] {
        for (name, score) in person.ocean_score.traits() {
            violations.percent(&format!("{label}.oceanScore.{name}"), score);
        }
    }

    for (i, flag) in body.flags.iter().enumerate() {
        if flag.evidence.is_empty() {
            violations.push(format!("flags[{i}].evidence must not be empty"));
        }
    }

    for (i, meter) in body.final_snapshot.iter().enumerate() {
        violations.percent(&format!("finalSnapshot[{i}].value"), meter.value);
    }

    violations.into_result()
}

#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, message: String) {
        self.0.push(message);
    }

    fn percent(&mut self, path: &str, value: u32) {
        if value > MAX_PERCENT {
            self.push(format!("{path} must be 0-{MAX_PERCENT}, got {value}"));
        }
    }

    fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::SchemaValidation(self.0.join("; ")))
        }
    }
}

fn extract_json_object(raw: &str) -> Result<&str> {
    let start = raw.find('{').ok_or_else(|| {
        Error::SchemaValidation("response did not contain a JSON object".to_string())
    })?;
    let end = raw.rfind('}').ok_or_else(|| {
        Error::SchemaValidation("response did not contain a JSON object".to_string())
    })?;
    if end <= start {
        return Err(Error::SchemaValidation(
            "response JSON bounds are invalid".to_string(),
        ));
    }
    Ok(&raw[start..=end])
}
