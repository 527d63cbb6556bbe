use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::errors::SearchError;

/// How query keywords are turned into a pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Keywords are joined as pattern alternation; meta-characters keep their meaning.
    #[default]
    Pattern,
    /// Keywords are escaped and matched as plain substrings.
    Literal,
}

pub fn keywords(query: &str) -> Vec<&str> {
    query.split_whitespace().collect()
}

/// Case-insensitive "contains any keyword" test.
#[derive(Clone, Debug)]
pub struct KeywordMatcher {
    pattern: Option<Regex>,
}

impl KeywordMatcher {
    pub fn new(query: &str, mode: MatchMode) -> Result<Self, SearchError> {
        let keywords = keywords(query);
        if keywords.is_empty() {
            return Ok(Self { pattern: None });
        }

        let alternation = match mode {
            MatchMode::Pattern => keywords.join("|"),
            MatchMode::Literal => {
                keywords.iter().map(|keyword| regex::escape(keyword)).collect::<Vec<_>>().join("|")
            }
        };

        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()
            .map_err(|source| SearchError::InvalidPattern { pattern: alternation.clone(), source })?;

        Ok(Self { pattern: Some(pattern) })
    }

    pub fn is_match(&self, value: &str) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.is_match(&value.to_lowercase()),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{keywords, KeywordMatcher, MatchMode};
    use crate::errors::SearchError;

    #[test]
    fn keywords_split_on_any_whitespace() {
        assert_eq!(keywords("  黑骑士\t狂铁  黑骑士 "), vec!["黑骑士", "狂铁", "黑骑士"]);
        assert!(keywords(" \n ").is_empty());
    }

    #[test]
    fn any_keyword_matches_case_insensitively() {
        let matcher = KeywordMatcher::new("KNIGHT 狂铁", MatchMode::Pattern).expect("matcher");

        assert!(matcher.is_match("Black Knight"));
        assert!(matcher.is_match("狂铁-黑骑士"));
        assert!(!matcher.is_match("测试皮肤"));
    }

    #[test]
    fn pattern_mode_interprets_meta_characters() {
        let matcher = KeywordMatcher::new("a.c", MatchMode::Pattern).expect("matcher");
        assert!(matcher.is_match("abc"));

        let literal = KeywordMatcher::new("a.c", MatchMode::Literal).expect("matcher");
        assert!(!literal.is_match("abc"));
        assert!(literal.is_match("xa.cx"));
    }

    #[test]
    fn literal_mode_accepts_unbalanced_parentheses() {
        let error = KeywordMatcher::new("皮肤(", MatchMode::Pattern).expect_err("invalid pattern");
        assert!(matches!(error, SearchError::InvalidPattern { .. }));

        let literal = KeywordMatcher::new("皮肤(", MatchMode::Literal).expect("literal matcher");
        assert!(literal.is_match("限定皮肤(新)"));
    }

    #[test]
    fn blank_query_matches_nothing() {
        let matcher = KeywordMatcher::new("   ", MatchMode::Pattern).expect("matcher");
        assert!(!matcher.is_match("anything"));
    }
}
