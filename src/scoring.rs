use std::sync::LazyLock;

use regex::Regex;

const YOE_WEIGHT: f64 = 0.3;
const KEYWORD_WEIGHT: f64 = 0.7;

/// Tried in order, first hit wins. Group 1 is always the value taken, which
/// for a range is its lower bound.
static YOE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d+)\s*\+\s*(?:years?|yrs?)",
        r"at\s+least\s+(\d+)\s*(?:years?|yrs?)",
        r"(\d+)\s*(?:-|–|to)\s*\d+\s*(?:years?|yrs?)",
        r"(\d+)\s*(?:years?|yrs?)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("YOE pattern is valid"))
    .collect()
});

/// Years of experience asked for in `text`, if any phrase states it.
pub fn extract_yoe(text: &str) -> Option<u32> {
    let text = text.to_lowercase();
    YOE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// Percentage in [0, 100], rounded to two decimals.
pub fn score(has_yoe: bool, matched_keywords: usize, total_keywords: usize) -> f64 {
    let yoe_part = if has_yoe { 1.0 } else { 0.0 };
    let keyword_part = if total_keywords == 0 {
        0.0
    } else {
        matched_keywords.min(total_keywords) as f64 / total_keywords as f64
    };
    let raw = 100.0 * (YOE_WEIGHT * yoe_part + KEYWORD_WEIGHT * keyword_part);
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_yoe_forms() {
        assert_eq!(extract_yoe("We need 3+ years of Go"), Some(3));
        assert_eq!(extract_yoe("2-3 years of backend work"), Some(2));
        assert_eq!(extract_yoe("At least 6 years of experience"), Some(6));
        assert_eq!(extract_yoe("5 years building APIs"), Some(5));
        assert_eq!(extract_yoe("4 to 7 yrs in product companies"), Some(4));
        assert_eq!(extract_yoe("No experience figure here"), None);
    }

    #[test]
    fn earlier_patterns_win_over_later_ones() {
        // "N years" alone would pick the 10
        assert_eq!(extract_yoe("10 years old company, needs 5+ years"), Some(5));
    }

    #[test]
    fn scores_with_weights() {
        assert_eq!(score(true, 26, 26), 100.0);
        assert_eq!(score(false, 0, 26), 0.0);
        assert_eq!(score(true, 0, 26), 30.0);
        // 0.7 * 3/26 = 8.0769...
        assert_eq!(score(false, 3, 26), 8.08);
        assert_eq!(score(true, 3, 26), 38.08);
    }

    #[test]
    fn empty_keyword_list_only_counts_yoe() {
        assert_eq!(score(true, 0, 0), 30.0);
        assert_eq!(score(false, 0, 0), 0.0);
    }
}
