//! Classifier response parsing
//!
//! Turns raw model output into a [`LandmarkCandidate`]. This is a total
//! function: malformed or partial output degrades to sentinel fields,
//! never an error, so a bad model response cannot abort the user-facing
//! flow.

use serde::Deserialize;
use waymark_common::models::{
    LandmarkCandidate, DETECTION_FAILED, UNKNOWN_LANDMARK, UNKNOWN_LOCATION,
};

/// How much raw text is carried into a fallback description
const FALLBACK_DESCRIPTION_CHARS: usize = 100;

/// Loose decode target; any field may be missing or empty
#[derive(Debug, Deserialize)]
struct RawCandidate {
    name: Option<String>,
    description: Option<String>,
    location: Option<String>,
}

/// Parse classifier output into a candidate.
///
/// Every output satisfies the non-empty-fields invariant:
/// - structured JSON (optionally fenced) decodes directly, with missing
///   or empty fields substituted field-by-field;
/// - non-JSON prose yields the "Unknown Landmark" sentinel with the
///   prose itself (truncated) as the description;
/// - blank output yields the "Landmark Detection Failed" sentinel, the
///   one case where no usable description text exists.
pub fn parse_candidate(raw: &str) -> LandmarkCandidate {
    let cleaned = strip_code_fences(raw);

    if cleaned.is_empty() {
        return LandmarkCandidate {
            name: DETECTION_FAILED.to_string(),
            description: "The image could not be analyzed.".to_string(),
            location: UNKNOWN_LOCATION.to_string(),
        };
    }

    match serde_json::from_str::<RawCandidate>(cleaned) {
        Ok(decoded) => LandmarkCandidate {
            name: non_empty_or(decoded.name, UNKNOWN_LANDMARK),
            description: non_empty_or(
                decoded.description,
                &truncated(cleaned, FALLBACK_DESCRIPTION_CHARS),
            ),
            location: non_empty_or(decoded.location, UNKNOWN_LOCATION),
        },
        Err(err) => {
            tracing::debug!(error = %err, "Classifier output is not structured JSON, substituting sentinels");
            LandmarkCandidate {
                name: UNKNOWN_LANDMARK.to_string(),
                description: truncated(cleaned, FALLBACK_DESCRIPTION_CHARS),
                location: UNKNOWN_LOCATION.to_string(),
            }
        }
    }
}

/// Strip one enclosing markdown code fence (with optional info string,
/// e.g. ```json) and surrounding whitespace.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string on the opening fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn truncated(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_parses() {
        let raw = "```json\n{\"name\":\"X\",\"description\":\"Y\",\"location\":\"Z\"}\n```";
        let candidate = parse_candidate(raw);
        assert_eq!(candidate.name, "X");
        assert_eq!(candidate.description, "Y");
        assert_eq!(candidate.location, "Z");
    }

    #[test]
    fn bare_fence_without_info_string_parses() {
        let raw = "```\n{\"name\":\"X\",\"description\":\"Y\",\"location\":\"Z\"}\n```";
        let candidate = parse_candidate(raw);
        assert_eq!(candidate.name, "X");
    }

    #[test]
    fn unfenced_json_parses() {
        let raw = r#"{"name":"Eiffel Tower","description":"Iron tower","location":"Paris"}"#;
        let candidate = parse_candidate(raw);
        assert_eq!(candidate.name, "Eiffel Tower");
    }

    #[test]
    fn prose_degrades_to_sentinels_with_prose_description() {
        let candidate = parse_candidate("I see a tower.");
        assert_eq!(candidate.name, UNKNOWN_LANDMARK);
        assert_eq!(candidate.description, "I see a tower.");
        assert_eq!(candidate.location, UNKNOWN_LOCATION);
    }

    #[test]
    fn long_prose_description_is_truncated() {
        let prose = "a".repeat(500);
        let candidate = parse_candidate(&prose);
        assert_eq!(candidate.description.chars().count(), 100);
    }

    #[test]
    fn missing_fields_fill_field_by_field() {
        let raw = r#"{"name":"Big Ben"}"#;
        let candidate = parse_candidate(raw);
        assert_eq!(candidate.name, "Big Ben");
        assert_eq!(candidate.location, UNKNOWN_LOCATION);
        // description falls back to the raw text, same as full decode failure
        assert!(candidate.description.contains("Big Ben"));
    }

    #[test]
    fn empty_string_fields_count_as_missing() {
        let raw = r#"{"name":"  ","description":"Y","location":""}"#;
        let candidate = parse_candidate(raw);
        assert_eq!(candidate.name, UNKNOWN_LANDMARK);
        assert_eq!(candidate.description, "Y");
        assert_eq!(candidate.location, UNKNOWN_LOCATION);
    }

    #[test]
    fn blank_output_yields_detection_failed_sentinel() {
        for raw in ["", "   ", "\n\n", "```\n```", "```json\n```"] {
            let candidate = parse_candidate(raw);
            assert_eq!(candidate.name, DETECTION_FAILED, "input: {:?}", raw);
            assert!(!candidate.description.is_empty());
            assert_eq!(candidate.location, UNKNOWN_LOCATION);
        }
    }

    #[test]
    fn never_produces_empty_fields() {
        let inputs = [
            "",
            "null",
            "[]",
            "{}",
            "{\"name\":null}",
            "```json\ngarbage\n```",
            "{\"unrelated\":true}",
            "Très belle tour à Paris",
            "{\"name\":\"\",\"description\":\"\",\"location\":\"\"}",
        ];
        for raw in inputs {
            let candidate = parse_candidate(raw);
            assert!(!candidate.name.trim().is_empty(), "input: {:?}", raw);
            assert!(!candidate.description.trim().is_empty(), "input: {:?}", raw);
            assert!(!candidate.location.trim().is_empty(), "input: {:?}", raw);
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // multi-byte characters must not split
        let prose = "é".repeat(200);
        let candidate = parse_candidate(&prose);
        assert_eq!(candidate.description.chars().count(), 100);
    }
}
