//! Name normalization and "did you mean" suggestions.

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// Maximum number of suggestions offered for an unknown name.
const MAX_SUGGESTIONS: usize = 3;

/// Minimum similarity for a name to be suggested.
const SUGGESTION_CUTOFF: f64 = 0.6;

/// Catalog key of a variable name: index suffix dropped, uppercase,
/// underscores read as spaces.
///
/// `"plane_altitude"` and `"GENERAL ENG RPM:1"` become `"PLANE ALTITUDE"`
/// and `"GENERAL ENG RPM"`.
pub fn normalize_variable_name(name: &str) -> String {
    let base = match name.rsplit_once(':') {
        Some((base, _)) => base,
        None => name,
    };
    base.to_uppercase().replace('_', " ")
}

/// Whether `name` carries a `:N` index suffix.
pub fn has_index_suffix(name: &str) -> bool {
    name.contains(':')
}

/// Normalized event name: uppercase, with spaces and hyphens as underscores.
pub fn normalize_event_name(name: &str) -> String {
    name.trim()
        .to_uppercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Catalog key of a unit name.
///
/// Only the first line and first comma-separated alternative count.
/// Parenthesized abbreviations are dropped and "per" becomes `/`, so
/// `"Feet (ft) per second"` and `"feet/second"` share a key.
pub fn canonical_unit(units: &str) -> String {
    let patterns = match unit_patterns() {
        Ok(patterns) => patterns,
        Err(err) => {
            warn!("unit patterns failed to compile: {}", err);
            return units.trim().to_uppercase();
        }
    };
    let units = patterns.struct_prefix.replace(units, "");
    let first = units.lines().next().unwrap_or("");
    let first = first.split(',').next().unwrap_or("");

    let mut s = first.trim().trim_end_matches(':').to_uppercase();
    s = s.replace(['-', '_'], " ");
    s = patterns.per.replace_all(&s, "/").into_owned();
    s = patterns.group.replace_all(&s, "").into_owned();
    s = patterns.unclosed_group.replace_all(&s, "").into_owned();

    for (from, to) in [
        ("SCALAR", "SCALER"),
        ("POUNDS/SQUARE FOOT", "PSF"),
        ("POUND FORCE/SQUARE FOOT", "PSF"),
        ("POUNDS/SQUARE INCH", "PSI"),
        ("SLUGS/FEET SQUARED", "SLUGS FEET SQUARED"),
        ("KILO PASCAL", "KILOPASCAL"),
        ("FOOT POUNDS/SECOND", "FT LB/SECOND"),
    ] {
        s = s.replace(from, to);
    }

    patterns.struct_type.replace(&s, "${name}").trim().to_string()
}

struct UnitPatterns {
    struct_prefix: Regex,
    per: Regex,
    group: Regex,
    unclosed_group: Regex,
    struct_type: Regex,
}

fn unit_patterns() -> Result<&'static UnitPatterns, regex::Error> {
    static PATTERNS: OnceLock<Result<UnitPatterns, regex::Error>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Ok(UnitPatterns {
                struct_prefix: Regex::new(r"^Struct:\n\s*")?,
                per: Regex::new(r"\s+PER\s+")?,
                group: Regex::new(r"\s*\([^()]+\)\s*")?,
                unclosed_group: Regex::new(r"\s*\([^)]+$")?,
                struct_type: Regex::new(r"^SIMCONNECT DATA\s+(?P<name>.*?)(\s+STRUCT(URE)?)?$")?,
            })
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Similarity of two strings in `[0, 1]`: twice the number of matching
/// characters over the total length, where matches are found by repeatedly
/// taking the longest common run and recursing on both sides of it.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (start_a, start_b, len) = longest_common_run(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..start_a], &b[..start_b])
        + matching_chars(&a[start_a + len..], &b[start_b + len..])
}

fn longest_common_run(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // run[j + 1] = length of the common run ending at a[i], b[j]
    let mut run = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut prev_diag = 0;
        for (j, cb) in b.iter().enumerate() {
            let above = run[j + 1];
            run[j + 1] = if ca == cb { prev_diag + 1 } else { 0 };
            if run[j + 1] > best.2 {
                best = (i + 1 - run[j + 1], j + 1 - run[j + 1], run[j + 1]);
            }
            prev_diag = above;
        }
    }
    best
}

/// Options most similar to `query`, best first.
pub fn close_matches<'a>(query: &str, options: &[&'a str]) -> Vec<&'a str> {
    let mut scored: Vec<(f64, &str)> = options
        .iter()
        .map(|option| (similarity(query, option), *option))
        .filter(|(score, _)| *score >= SUGGESTION_CUTOFF)
        .collect();
    scored.sort_by(|x, y| y.0.total_cmp(&x.0));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, option)| option)
        .collect()
}

/// Hint appended to "unrecognized" warnings.
pub fn suggestion_message(query: &str, options: &[&str]) -> String {
    let matches = close_matches(query, options);
    if !matches.is_empty() {
        return format!("perhaps one of {}?", matches.join(", "));
    }
    let mut shown: Vec<&str> = options.iter().take(MAX_SUGGESTIONS).copied().collect();
    if options.len() > MAX_SUGGESTIONS {
        shown.push("...");
    }
    format!("found no similar options among: {}", shown.join(", "))
}
