/// Score reported for every successful match.
///
/// Matches are not ranked, so all of them share this value.
pub const MATCH_SCORE: u32 = 0;

/// Result of a successful fuzzy match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub score: u32,
    /// Character (not byte) indices into the text, strictly increasing
    pub positions: Vec<usize>,
}

/// Greedy, case-insensitive subsequence match of `query` against `text`.
///
/// Each query character consumes the first matching text character after the
/// previous match. Returns `None` when the text runs out before the query does.
/// An empty query matches everything with no highlighted positions.
pub fn fuzzy_match(text: &str, query: &str) -> Option<FuzzyMatch> {
    let mut text_chars = text.chars().enumerate();
    let mut positions = Vec::with_capacity(query.chars().count());

    for query_char in query.chars() {
        let (index, _) = text_chars.find(|(_, text_char)| chars_match(*text_char, query_char))?;
        positions.push(index);
    }

    Some(FuzzyMatch {
        score: MATCH_SCORE,
        positions,
    })
}

pub fn is_fuzzy_match(text: &str, query: &str) -> bool {
    fuzzy_match(text, query).is_some()
}

fn chars_match(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_subsequence_with_increasing_positions() {
        let result = fuzzy_match("Fix login bug", "flb").expect("should match");
        assert_eq!(result.positions, vec![0, 4, 10]);
        assert!(result.positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(result.score, MATCH_SCORE);
    }

    #[test]
    fn test_rejects_characters_missing_from_text() {
        assert!(fuzzy_match("Fix login bug", "xyz").is_none());
    }

    #[test]
    fn test_rejects_out_of_order_characters() {
        assert!(fuzzy_match("Fix login bug", "bf").is_none());
    }

    #[test]
    fn test_is_case_insensitive_in_both_directions() {
        assert_eq!(fuzzy_match("Fix login bug", "FIX").unwrap().positions, vec![0, 1, 2]);
        assert_eq!(fuzzy_match("FIX LOGIN", "fl").unwrap().positions, vec![0, 4]);
    }

    #[test]
    fn test_empty_query_matches_without_positions() {
        let result = fuzzy_match("Anything", "").unwrap();
        assert!(result.positions.is_empty());
    }

    #[test]
    fn test_empty_text_only_matches_empty_query() {
        assert!(fuzzy_match("", "").is_some());
        assert!(fuzzy_match("", "a").is_none());
    }

    #[test]
    fn test_greedy_match_takes_first_occurrence() {
        assert_eq!(fuzzy_match("Prefix handling", "fix").unwrap().positions, vec![3, 4, 5]);
    }

    #[test]
    fn test_positions_are_character_indices() {
        assert_eq!(fuzzy_match("Überarbeitung fix", "üf").unwrap().positions, vec![0, 14]);
    }

    #[test]
    fn test_query_longer_than_text_does_not_match() {
        assert!(!is_fuzzy_match("ab", "abc"));
    }
}
