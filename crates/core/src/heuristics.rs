use crate::models::{HeuristicOptions, KeyValueMap};
use regex::Regex;
use std::sync::OnceLock;

/// Scan raw text for `key: value`-shaped lines and known domain patterns.
///
/// Two passes feed one map: a line scan (first colon splits key from value,
/// last occurrence of a key wins) and a named-regex pass over the full text.
/// Pattern results overwrite line results on key collision; a pattern key
/// that differs from any line key simply coexists (`policy_no` from the
/// regex next to `policy no` from the line scan). Never fails.
pub fn extract_key_values(text: &str, options: &HeuristicOptions) -> KeyValueMap {
    let mut kv = line_scan(text, options);
    for (key, value) in pattern_scan(text) {
        kv.insert(key, value);
    }
    kv
}

fn line_scan(text: &str, options: &HeuristicOptions) -> KeyValueMap {
    let mut kv = KeyValueMap::new();

    for line in text.lines() {
        let line = line.trim();
        let Some((left, right)) = line.split_once(':') else {
            continue;
        };

        let key = left.trim().to_lowercase();
        let value = right.trim();

        if !value.is_empty() && key.len() < options.max_key_len {
            kv.insert(key, value.to_string());
        }
    }

    kv
}

fn pattern_scan(text: &str) -> Vec<(String, String)> {
    named_patterns()
        .iter()
        .filter_map(|(name, pattern)| {
            let captures = pattern.captures(text)?;
            // The value lives in group 2 when the pattern has a label prefix
            // group; single-group patterns keep the whole match.
            let matched = if captures.len() > 2 {
                captures.get(2)
            } else {
                captures.get(0)
            }?;
            Some(((*name).to_string(), matched.as_str().trim().to_string()))
        })
        .collect()
}

fn named_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            ("policy_no", r"(?i)(policy\s*no[:\s]*)([A-Z0-9\-/]+)"),
            ("premium", r"(?i)(premium[:\s]*)([\d,\.]+)"),
            (
                "date",
                r"(\b(?:\d{1,2}[/\-\.\s]\d{1,2}[/\-\.\s]\d{2,4}|\d{4}-\d{2}-\d{2})\b)",
            ),
        ]
        .into_iter()
        .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|regex| (name, regex)))
        .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> KeyValueMap {
        extract_key_values(text, &HeuristicOptions::default())
    }

    #[test]
    fn line_and_pattern_keys_coexist() {
        let kv = extract("Policy No: ABC-123\nPremium: 4,500.00\nDate: 2024-01-15");

        assert_eq!(kv["policy no"], "ABC-123");
        assert_eq!(kv["policy_no"], "ABC-123");
        assert_eq!(kv["premium"], "4,500.00");
        assert_eq!(kv["date"], "2024-01-15");
    }

    #[test]
    fn pattern_values_win_over_line_values_on_collision() {
        // The line scan sees the literal "policy_no" key first; the regex
        // pass finds the real value later in the text and must overwrite.
        let kv = extract("policy_no: stale\nPolicy No: XY-9");
        assert_eq!(kv["policy_no"], "XY-9");
    }

    #[test]
    fn value_splits_on_first_colon_only() {
        let kv = extract("Issued: 12:30 PM");
        assert_eq!(kv["issued"], "12:30 PM");
    }

    #[test]
    fn last_line_occurrence_wins() {
        let kv = extract("Status: draft\nStatus: final");
        assert_eq!(kv["status"], "final");
    }

    #[test]
    fn empty_values_and_long_keys_are_discarded() {
        let long_key = "a".repeat(40);
        let text = format!("Empty:\n{long_key}: prose sentence fragment");
        let kv = extract(&text);

        assert!(kv.is_empty());
    }

    #[test]
    fn never_panics_and_bounds_hold_on_arbitrary_text() {
        let samples = [
            "",
            ":::",
            "no separators here",
            "a: b: c: d",
            "Premium:9,999.99 Policy No:Z/1-A Date 01/02/2003",
            "\u{0}\u{1}: control",
        ];

        for sample in samples {
            let kv = extract(sample);
            for (key, value) in &kv {
                assert!(!value.is_empty());
                assert!(key.len() < 40);
            }
        }
    }

    #[test]
    fn date_pattern_takes_first_occurrence() {
        let kv = extract("Effective 01/02/2023 through 01/02/2024");
        assert_eq!(kv["date"], "01/02/2023");
    }
}
