//! Normalization routines applied to raw model output and re-applied idempotently wherever an `AnalysisResult` is mutated.

use serde_json::Value;

use crate::constants::MAX_KEYWORDS;
use crate::value_objects::smart_folder::SmartFolder;

/// Coerce a raw confidence value (int, numeric string, or float) into the
/// `60..=100` range the model is expected to report in, defaulting to `75`
/// when the value is missing or unparseable.
///
/// Note the model's own output is clamped to `60..=100` here; values lower
/// than that (e.g. hallucination-validation overrides, which clamp to
/// `0..=100` explicitly) are applied *after* this step and are not re-run
/// through this function.
#[must_use]
pub fn coerce_model_confidence(raw: Option<&Value>) -> u8 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => (v.round() as i64).clamp(60, 100) as u8,
        _ => 75,
    }
}

/// Clamp an already-numeric confidence to `0..=100`, idempotently.
#[must_use]
pub fn clamp_confidence(value: i32) -> u8 {
    value.clamp(0, 100) as u8
}

/// De-duplicate keywords case-insensitively, preserving first-seen order and
/// capping at `MAX_KEYWORDS`. Idempotent: running this twice yields the same
/// output as running it once.
#[must_use]
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for kw in keywords {
        let trimmed = kw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if seen.insert(key) {
            out.push(trimmed.to_string());
        }
        if out.len() >= MAX_KEYWORDS {
            break;
        }
    }
    out
}

/// Trim a free-text field and collapse it to `None`/empty-string sentinel
/// handling consistent across every normalization call site.
#[must_use]
pub fn normalize_text_field(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

/// Validate an ISO-8601 `YYYY-MM-DD` date string; returns `None` if the
/// input is missing or malformed rather than erroring.
#[must_use]
pub fn validate_iso_date(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.len() != 10 {
        return None;
    }
    let bytes = raw.as_bytes();
    let digits_ok = raw
        .char_indices()
        .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !digits_ok || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let year: u32 = raw[0..4].parse().ok()?;
    let month: u32 = raw[5..7].parse().ok()?;
    let day: u32 = raw[8..10].parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || year < 1000 {
        return None;
    }
    Some(raw.to_string())
}

/// Result of attempting to normalize a model-reported category against the
/// known smart-folder set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryMatch {
    /// Matched an existing folder name; carries the canonical (folder's own)
    /// spelling.
    Matched(String),
    /// No smart folders configured, or none matched; the category is kept
    /// as reported.
    Unmatched,
}

/// Match a category against a smart-folder set: exact name match first,
/// then case-insensitive, then canonical alphanumeric-only comparison.
#[must_use]
pub fn match_category_to_folders(category: &str, folders: &[SmartFolder]) -> CategoryMatch {
    if folders.is_empty() {
        return CategoryMatch::Unmatched;
    }
    if folders.iter().any(|f| f.name == category) {
        return CategoryMatch::Matched(category.to_string());
    }
    let lower = category.to_lowercase();
    if let Some(f) = folders.iter().find(|f| f.name.to_lowercase() == lower) {
        return CategoryMatch::Matched(f.name.clone());
    }
    let canonical = canonical_alnum(category);
    if let Some(f) = folders.iter().find(|f| canonical_alnum(&f.name) == canonical) {
        return CategoryMatch::Matched(f.name.clone());
    }
    CategoryMatch::Unmatched
}

fn canonical_alnum(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Generic categories the model may emit that are never specific enough to
/// keep over a filename-derived alternative or a folder match.
const GENERIC_CATEGORIES: &[&str] = &["documents", "files", "work", "general", "other", "misc"];

/// Whether a category string is one of the known-generic placeholders.
#[must_use]
pub fn is_generic_category(category: &str) -> bool {
    GENERIC_CATEGORIES.contains(&category.trim().to_lowercase().as_str())
}

/// Strip a leading code-fence (```` ```json... ``` ````or bare ```` ``` ````)
/// from a raw model response before JSON parsing.
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\n', '\r']);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Extract the first balanced `{...}` JSON object substring from a raw
/// response, tolerating surrounding prose the model may have added.
#[must_use]
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let bytes = raw.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
