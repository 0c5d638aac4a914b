use regex::Regex;

/// Case-insensitive `suite/test` filter, read from the environment so a run
/// can be narrowed to one suite or one test without editing code. The part
/// before the first `/` matches suite names, the remainder matches test
/// names; either half may be empty to match everything.
#[derive(Clone, Debug)]
pub struct TestMatcher {
    suite: Regex,
    test: Regex,
    pub pattern: String,
}

impl TestMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let (suite_part, test_part) = match pattern.split_once('/') {
            Some((suite, test)) => (suite, test),
            None => (pattern, ""),
        };
        Ok(Self {
            suite: Regex::new(&format!("(?i:{suite_part})"))?,
            test: Regex::new(&format!("(?i:{test_part})"))?,
            pattern: pattern.to_string(),
        })
    }

    pub fn matches_suite(&self, suite: &str) -> bool {
        self.suite.is_match(suite)
    }

    pub fn matches(&self, suite: &str, test: &str) -> bool {
        self.matches_suite(suite) && self.test.is_match(test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_and_test_halves() {
        let matcher = TestMatcher::new("ingest/upload").expect("valid pattern");
        assert!(matcher.matches("ingest", "upload_document_creates_chunks"));
        assert!(matcher.matches("Ingest", "Upload"));
        assert!(!matcher.matches("library", "upload_document_creates_chunks"));
        assert!(!matcher.matches("ingest", "process_text"));
    }

    #[test]
    fn test_empty_suite_half_matches_any_suite() {
        let matcher = TestMatcher::new("/delete").expect("valid pattern");
        assert!(matcher.matches("library", "delete_missing_article"));
        assert!(matcher.matches("assets", "delete_missing_asset"));
        assert!(!matcher.matches("assets", "list_assets"));
    }

    #[test]
    fn test_suite_only_pattern_matches_all_its_tests() {
        let matcher = TestMatcher::new("health").expect("valid pattern");
        assert!(matcher.matches_suite("health"));
        assert!(matcher.matches("health", "service_reachable"));
        assert!(matcher.matches("health", "anything"));
        assert!(!matcher.matches_suite("ingest"));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(TestMatcher::new("ingest/(unclosed").is_err());
    }
}
