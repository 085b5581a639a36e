//! Per-field coercions. Every function here is total: bad input degrades to
//! a canonical empty value, never an error.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Bare image filenames are rewritten against this base; absolute URLs pass
/// through unchanged.
pub const IMAGE_BASE_URL: &str = "https://img.toploader.cards";

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b((?:19|20)\d\d)\b").unwrap())
}

fn card_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\s*([A-Za-z0-9][A-Za-z0-9-]*)").unwrap())
}

fn season_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:19|20)\d\d(?:\s*[-/]\s*\d{2,4})?\s*").unwrap())
}

fn front_back_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(front|back)\s*=\s*([^\s|,;]+)").unwrap()
    })
}

/// Fold text for matching: deburr via canonical decomposition, lower-case,
/// `&` → "and", collapse non-alphanumerics to single spaces, trim.
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch == '&' {
            out.push_str(" and ");
            continue;
        }
        if ch.is_alphanumeric() {
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First plausible 4-digit year in the string. Season ranges like "2023-24"
/// yield the leading year.
pub fn extract_year(input: &str) -> String {
    year_regex()
        .captures(input)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

/// Strip everything but digits, `.`, `-`, then parse as decimal.
/// Empty or invalid → `None`, deliberately distinct from zero.
pub fn parse_money(input: &str) -> Option<f64> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Non-negative integer, defaulting to 1 when blank or unparsable.
pub fn parse_quantity(input: &str) -> u32 {
    input.trim().parse::<u32>().unwrap_or(1)
}

/// Tri-state boolean folding: recognized truthy/falsy tokens map to
/// "true"/"false", anything else passes through trimmed and lower-cased.
pub fn parse_boolean(input: &str) -> String {
    let token = input.trim().to_lowercase();
    match token.as_str() {
        "1" | "true" | "yes" | "y" | "t" => "true".to_string(),
        "0" | "false" | "no" | "n" | "f" => "false".to_string(),
        _ => token,
    }
}

/// Ordered list of image URLs/filenames from a cell. Parser attempts are
/// tried in priority order: JSON array, `front=…back=…` pairs, then a plain
/// delimiter split. Bare filenames are rewritten to [`IMAGE_BASE_URL`].
pub fn parse_image_list(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let names = try_json_list(trimmed)
        .or_else(|| try_front_back_pairs(trimmed))
        .unwrap_or_else(|| split_image_list(trimmed));

    names.iter().map(|n| resolve_image_url(n)).collect()
}

fn try_json_list(input: &str) -> Option<Vec<String>> {
    if !input.starts_with('[') {
        return None;
    }
    let parsed: Vec<String> = serde_json::from_str(input).ok()?;
    Some(
        parsed
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

fn try_front_back_pairs(input: &str) -> Option<Vec<String>> {
    let mut front = None;
    let mut back = None;
    for cap in front_back_regex().captures_iter(input) {
        match cap[1].to_lowercase().as_str() {
            "front" => front = Some(cap[2].to_string()),
            "back" => back = Some(cap[2].to_string()),
            _ => {}
        }
    }
    if front.is_none() && back.is_none() {
        return None;
    }
    Some(front.into_iter().chain(back).collect())
}

fn split_image_list(input: &str) -> Vec<String> {
    input
        .split(['|', ',', ';', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn resolve_image_url(name: &str) -> String {
    if name.starts_with("http://") || name.starts_with("https://") {
        name.to_string()
    } else {
        format!("{IMAGE_BASE_URL}/{}", name.trim_start_matches('/'))
    }
}

/// Best-effort card number mined from a listing title, e.g.
/// `"2024 Topps #221 Messi"` → `"221"`. Approximate: a fallback for blank
/// structured columns, not authoritative.
pub fn extract_card_number_from_title(title: &str) -> String {
    card_number_regex()
        .captures(title)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

/// Best-effort set name mined from a listing title: leading year/season
/// token stripped, text before the card number kept. Approximate.
pub fn extract_set_from_title(title: &str) -> String {
    let stripped = season_prefix_regex().replace(title, "");
    match stripped.split('#').next() {
        Some(prefix) if stripped.contains('#') => prefix.trim().to_string(),
        _ => String::new(),
    }
}

/// Timestamp parsing for merge decisions: RFC 3339 first, then the common
/// spreadsheet shapes, else `None`.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_folding_is_diacritic_and_case_invariant() {
        assert_eq!(normalize_text("José Ramírez"), normalize_text("jose ramirez"));
        assert_eq!(normalize_text("  Topps--Chrome  "), "topps chrome");
        assert_eq!(normalize_text("Upper & Deck"), "upper and deck");
    }

    #[test]
    fn year_extraction() {
        assert_eq!(extract_year("2023-24"), "2023");
        assert_eq!(extract_year("Topps 1989 Traded"), "1989");
        assert_eq!(extract_year("card #2099x"), "");
        assert_eq!(extract_year("no year here"), "");
        assert_eq!(extract_year("1850"), "");
    }

    #[test]
    fn money_parsing() {
        assert_eq!(parse_money("$1,234.56"), Some(1234.56));
        assert_eq!(parse_money("12"), Some(12.0));
        assert_eq!(parse_money("-3.50"), Some(-3.5));
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("n/a"), None);
        assert_eq!(parse_money("1.2.3"), None);
    }

    #[test]
    fn quantity_defaults_to_one() {
        assert_eq!(parse_quantity("3"), 3);
        assert_eq!(parse_quantity("0"), 0);
        assert_eq!(parse_quantity(""), 1);
        assert_eq!(parse_quantity("-2"), 1);
        assert_eq!(parse_quantity("lots"), 1);
    }

    #[test]
    fn boolean_tri_state() {
        assert_eq!(parse_boolean("Yes"), "true");
        assert_eq!(parse_boolean("0"), "false");
        assert_eq!(parse_boolean("  T "), "true");
        assert_eq!(parse_boolean("Graded"), "graded");
        assert_eq!(parse_boolean(""), "");
    }

    #[test]
    fn image_list_pipe_split() {
        assert_eq!(
            parse_image_list("a.jpg | b.jpg"),
            vec![
                format!("{IMAGE_BASE_URL}/a.jpg"),
                format!("{IMAGE_BASE_URL}/b.jpg"),
            ]
        );
    }

    #[test]
    fn image_list_json() {
        assert_eq!(
            parse_image_list(r#"["https://cdn.example.com/x.png", "y.png"]"#),
            vec![
                "https://cdn.example.com/x.png".to_string(),
                format!("{IMAGE_BASE_URL}/y.png"),
            ]
        );
    }

    #[test]
    fn image_list_front_back() {
        assert_eq!(
            parse_image_list("back=b.jpg front=f.jpg"),
            vec![
                format!("{IMAGE_BASE_URL}/f.jpg"),
                format!("{IMAGE_BASE_URL}/b.jpg"),
            ]
        );
    }

    #[test]
    fn malformed_json_falls_back_to_split() {
        // Unterminated JSON is not an error, just the next parser's input
        let urls = parse_image_list("[not json");
        assert_eq!(urls.len(), 1);
        assert!(urls[0].ends_with("[not json"));
    }

    #[test]
    fn title_mining() {
        let title = "2023-24 Panini Prizm #221 Haaland";
        assert_eq!(extract_year(title), "2023");
        assert_eq!(extract_card_number_from_title(title), "221");
        assert_eq!(extract_set_from_title(title), "Panini Prizm");
    }

    #[test]
    fn title_mining_without_number_stays_empty() {
        assert_eq!(extract_card_number_from_title("1999 UD Griffey"), "");
        assert_eq!(extract_set_from_title("1999 UD Griffey"), "");
    }

    #[test]
    fn timestamp_shapes() {
        assert!(parse_timestamp("2024-05-01T10:30:00Z").is_some());
        assert!(parse_timestamp("2024-05-01 10:30:00").is_some());
        assert!(parse_timestamp("2024-05-01").is_some());
        assert!(parse_timestamp("05/01/2024").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
