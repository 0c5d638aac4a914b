use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::types::TestOutcome;
use crate::utils::html_to_text;

/// Content payload under inspection: raw HTML or a decoded JSON document.
#[derive(Clone, Debug)]
pub enum Payload {
    Html(String),
    Json(Value),
}

impl Payload {
    pub fn html(html: impl Into<String>) -> Self {
        Payload::Html(html.into())
    }

    pub fn json(value: Value) -> Self {
        Payload::Json(value)
    }

    fn as_html(&self) -> Option<&str> {
        match self {
            Payload::Html(html) => Some(html),
            Payload::Json(_) => None,
        }
    }

    fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Html(_) => None,
        }
    }

    /// De-tagged visible text for HTML, compact serialization for JSON.
    pub fn plain_text(&self) -> String {
        match self {
            Payload::Html(html) => html_to_text(html),
            Payload::Json(value) => value.to_string(),
        }
    }
}

/// Whether a failing rule flips the whole outcome or is merely reported.
/// Informational rules formalize the corpus's "partial, not necessarily a
/// failure" verdicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Blocking,
    Informational,
}

#[derive(Clone, Copy, Debug)]
pub enum Comparison {
    AtLeast(f64),
    AtMost(f64),
    Exactly(f64),
    Between(f64, f64),
}

impl Comparison {
    fn holds(&self, value: f64) -> bool {
        match self {
            Comparison::AtLeast(min) => value >= *min,
            Comparison::AtMost(max) => value <= *max,
            Comparison::Exactly(expected) => value == *expected,
            Comparison::Between(min, max) => value >= *min && value <= *max,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::AtLeast(min) => write!(f, ">= {min}"),
            Comparison::AtMost(max) => write!(f, "<= {max}"),
            Comparison::Exactly(expected) => write!(f, "== {expected}"),
            Comparison::Between(min, max) => write!(f, "in {min}..={max}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Bool,
    Array,
    Object,
    Any,
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Any => true,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Bool => "bool",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
            FieldKind::Any => "any",
        }
    }
}

#[derive(Clone, Debug)]
enum Pattern {
    Literal(String),
    Matching(Regex),
}

impl Pattern {
    fn found_in(&self, text: &str) -> bool {
        match self {
            Pattern::Literal(needle) => text.contains(needle.as_str()),
            Pattern::Matching(re) => re.is_match(text),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(needle) => write!(f, "{needle:?}"),
            Pattern::Matching(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

#[derive(Clone, Debug)]
enum Metric {
    Words,
    Chars,
    Field(String),
}

#[derive(Clone)]
enum Check {
    TagCount {
        tag: String,
        min: usize,
        max: Option<usize>,
    },
    ForbiddenWrapper {
        tag: String,
        max_ratio: f64,
    },
    Field {
        path: String,
        kind: FieldKind,
    },
    Metric {
        metric: Metric,
        cmp: Comparison,
    },
    Contains {
        pattern: Pattern,
    },
    Lacks {
        pattern: Pattern,
    },
    Custom(Arc<dyn Fn(&Payload) -> Result<String, String> + Send + Sync>),
}

/// A named, stateless predicate over a content payload. Rules are evaluated
/// in order and never short-circuit, so a single run surfaces every
/// violation at once.
#[derive(Clone)]
pub struct Rule {
    pub description: String,
    pub severity: Severity,
    check: Check,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule({:?}, {:?})", self.description, self.severity)
    }
}

impl Rule {
    fn blocking(description: String, check: Check) -> Self {
        Self {
            description,
            severity: Severity::Blocking,
            check,
        }
    }

    /// Downgrades the rule so a failure is reported but not fatal.
    pub fn informational(mut self) -> Self {
        self.severity = Severity::Informational;
        self
    }

    /// Count of `<tag>` occurrences must fall within `[min, max]`.
    pub fn tag_count(tag: &str, min: usize, max: Option<usize>) -> Self {
        let description = match max {
            Some(max) => format!("between {min} and {max} <{tag}> tags"),
            None => format!("at least {min} <{tag}> tags"),
        };
        Self::blocking(
            description,
            Check::TagCount {
                tag: tag.to_string(),
                min,
                max,
            },
        )
    }

    /// Fails when more than `max_ratio` of the visible text sits inside one
    /// `<tag>` wrapper, e.g. an article delivered entirely as a code block.
    pub fn forbidden_wrapper(tag: &str, max_ratio: f64) -> Self {
        Self::blocking(
            format!("article not wrapped in a single <{tag}> block"),
            Check::ForbiddenWrapper {
                tag: tag.to_string(),
                max_ratio,
            },
        )
    }

    /// Required JSON field, present and of the expected kind.
    pub fn required_field(path: &str, kind: FieldKind) -> Self {
        Self::blocking(
            format!("required field {path}"),
            Check::Field {
                path: path.to_string(),
                kind,
            },
        )
    }

    /// Optional JSON field: tracked and reported, never fails the outcome.
    pub fn optional_field(path: &str, kind: FieldKind) -> Self {
        Self::blocking(
            format!("optional field {path}"),
            Check::Field {
                path: path.to_string(),
                kind,
            },
        )
        .informational()
    }

    pub fn word_count(cmp: Comparison) -> Self {
        Self::blocking(
            format!("word count {cmp}"),
            Check::Metric {
                metric: Metric::Words,
                cmp,
            },
        )
    }

    pub fn char_count(cmp: Comparison) -> Self {
        Self::blocking(
            format!("character count {cmp}"),
            Check::Metric {
                metric: Metric::Chars,
                cmp,
            },
        )
    }

    /// Numeric JSON field compared against a threshold.
    pub fn field_compare(path: &str, cmp: Comparison) -> Self {
        Self::blocking(
            format!("{path} {cmp}"),
            Check::Metric {
                metric: Metric::Field(path.to_string()),
                cmp,
            },
        )
    }

    pub fn field_at_least(path: &str, min: f64) -> Self {
        Self::field_compare(path, Comparison::AtLeast(min))
    }

    /// Visible text must contain the literal.
    pub fn contains(needle: &str) -> Self {
        Self::blocking(
            format!("contains {needle:?}"),
            Check::Contains {
                pattern: Pattern::Literal(needle.to_string()),
            },
        )
    }

    /// Visible text must not contain the literal (placeholder markers and
    /// the like).
    pub fn lacks(needle: &str) -> Self {
        Self::blocking(
            format!("does not contain {needle:?}"),
            Check::Lacks {
                pattern: Pattern::Literal(needle.to_string()),
            },
        )
    }

    pub fn contains_match(re: Regex) -> Self {
        Self::blocking(
            format!("matches /{}/", re.as_str()),
            Check::Contains {
                pattern: Pattern::Matching(re),
            },
        )
    }

    pub fn lacks_match(re: Regex) -> Self {
        Self::blocking(
            format!("does not match /{}/", re.as_str()),
            Check::Lacks {
                pattern: Pattern::Matching(re),
            },
        )
    }

    /// One-off predicate; the closure reports its own pass/fail detail.
    pub fn custom(
        description: &str,
        predicate: impl Fn(&Payload) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self::blocking(description.to_string(), Check::Custom(Arc::new(predicate)))
    }

    fn apply(&self, payload: &Payload) -> Result<String, String> {
        match &self.check {
            Check::TagCount { tag, min, max } => {
                let html = payload
                    .as_html()
                    .ok_or_else(|| "payload is not HTML".to_string())?;
                let count = count_tags(html, tag)?;
                if count < *min {
                    return Err(format!(
                        "found {count} <{tag}> tags, expected at least {min}"
                    ));
                }
                if let Some(max) = max {
                    if count > *max {
                        return Err(format!(
                            "found {count} <{tag}> tags, expected at most {max}"
                        ));
                    }
                }
                Ok(format!("found {count} <{tag}> tags"))
            }
            Check::ForbiddenWrapper { tag, max_ratio } => {
                let html = payload
                    .as_html()
                    .ok_or_else(|| "payload is not HTML".to_string())?;
                wrapper_ratio(html, tag).and_then(|ratio| {
                    if ratio > *max_ratio {
                        Err(format!(
                            "entire article wrapped in <{tag}>: {:.0}% of visible text sits inside it (limit {:.0}%)",
                            ratio * 100.0,
                            max_ratio * 100.0
                        ))
                    } else {
                        Ok(format!(
                            "{:.0}% of visible text inside <{tag}>",
                            ratio * 100.0
                        ))
                    }
                })
            }
            Check::Field { path, kind } => {
                let value = payload
                    .as_json()
                    .ok_or_else(|| "payload is not JSON".to_string())?;
                match lookup(value, path) {
                    None => Err(format!("field {path} is missing")),
                    Some(found) if !kind.matches(found) => Err(format!(
                        "field {path} expected {}, found {}",
                        kind.describe(),
                        value_type_name(found)
                    )),
                    Some(_) => Ok("present".to_string()),
                }
            }
            Check::Metric { metric, cmp } => {
                let (name, value) = match metric {
                    Metric::Words => (
                        "word count".to_string(),
                        payload.plain_text().split_whitespace().count() as f64,
                    ),
                    Metric::Chars => (
                        "character count".to_string(),
                        payload.plain_text().chars().count() as f64,
                    ),
                    Metric::Field(path) => {
                        let value = payload
                            .as_json()
                            .ok_or_else(|| "payload is not JSON".to_string())?;
                        let number = lookup(value, path)
                            .and_then(Value::as_f64)
                            .ok_or_else(|| format!("field {path} is missing or non-numeric"))?;
                        (path.clone(), number)
                    }
                };
                if cmp.holds(value) {
                    Ok(format!("{name} = {value}"))
                } else {
                    Err(format!("{name} = {value}, expected {cmp}"))
                }
            }
            Check::Contains { pattern } => {
                if pattern.found_in(&payload.plain_text()) {
                    Ok("found".to_string())
                } else {
                    Err(format!("pattern {pattern} not found"))
                }
            }
            Check::Lacks { pattern } => {
                if pattern.found_in(&payload.plain_text()) {
                    Err(format!("forbidden pattern {pattern} present"))
                } else {
                    Ok("absent".to_string())
                }
            }
            Check::Custom(predicate) => predicate(payload),
        }
    }
}

/// Evaluates every rule against the payload; no short-circuit on the first
/// failure. The outcome passes iff all blocking rules pass; informational
/// failures are recorded as WARN lines only.
pub fn evaluate(payload: &Payload, rules: &[Rule]) -> TestOutcome {
    let mut lines = Vec::with_capacity(rules.len());
    let mut passed = true;

    for rule in rules {
        match (rule.apply(payload), rule.severity) {
            (Ok(detail), _) => lines.push(format!("PASS {}: {detail}", rule.description)),
            (Err(detail), Severity::Blocking) => {
                passed = false;
                lines.push(format!("FAIL {}: {detail}", rule.description));
            }
            (Err(detail), Severity::Informational) => {
                lines.push(format!("WARN {}: {detail}", rule.description));
            }
        }
    }

    let details = lines.join("\n");
    if passed {
        TestOutcome::pass(details)
    } else {
        TestOutcome::fail(details)
    }
}

fn count_tags(html: &str, tag: &str) -> Result<usize, String> {
    let re = Regex::new(&format!(r"(?i)<{}(\s[^>]*)?>", regex::escape(tag)))
        .map_err(|err| format!("bad tag pattern for <{tag}>: {err}"))?;
    Ok(re.find_iter(html).count())
}

/// Share of the document's visible text enclosed by `<tag>` wrappers.
fn wrapper_ratio(html: &str, tag: &str) -> Result<f64, String> {
    let total = html_to_text(html).chars().count();
    if total == 0 {
        return Ok(0.0);
    }
    let escaped = regex::escape(tag);
    let re = Regex::new(&format!(r"(?is)<{escaped}(\s[^>]*)?>(.*?)</{escaped}>"))
        .map_err(|err| format!("bad wrapper pattern for <{tag}>: {err}"))?;
    let wrapped: usize = re
        .captures_iter(html)
        .filter_map(|caps| caps.get(2))
        .map(|inner| html_to_text(inner.as_str()).chars().count())
        .sum();
    Ok(wrapped as f64 / total as f64)
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |acc, key| acc.get(key))
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_count_bounds() {
        let payload = Payload::html("<h1>Title</h1><p>a</p><p>b</p>");

        let outcome = evaluate(&payload, &[Rule::tag_count("h1", 1, Some(1))]);
        assert!(outcome.passed);

        let outcome = evaluate(&payload, &[Rule::tag_count("table", 1, None)]);
        assert!(!outcome.passed);
        assert!(outcome.details.contains("found 0 <table> tags"));

        let outcome = evaluate(&payload, &[Rule::tag_count("p", 0, Some(1))]);
        assert!(!outcome.passed);
        assert!(outcome.details.contains("at most 1"));
    }

    #[test]
    fn test_tag_count_matches_attributes_and_case() {
        let payload = Payload::html(r#"<H1 class="hero">Title</H1><h1>Second</h1>"#);
        let outcome = evaluate(&payload, &[Rule::tag_count("h1", 2, Some(2))]);
        assert!(outcome.passed, "{}", outcome.details);
    }

    #[test]
    fn test_wrapper_rule_fails_fully_wrapped_article() {
        // An article delivered entirely as one code block.
        let html = format!("<pre><code>{}</code></pre>", "x".repeat(5000));
        let outcome = evaluate(&Payload::html(html), &[Rule::forbidden_wrapper("pre", 0.8)]);
        assert!(!outcome.passed);
        assert!(outcome.details.contains("entire article wrapped"));
    }

    #[test]
    fn test_wrapper_rule_allows_small_code_blocks() {
        let mut html = String::from("<h1>Guide</h1>");
        html.push_str(&format!("<p>{}</p>", "prose ".repeat(200)));
        html.push_str("<pre><code>let x = 1;</code></pre>");
        let outcome = evaluate(&Payload::html(html), &[Rule::forbidden_wrapper("pre", 0.8)]);
        assert!(outcome.passed, "{}", outcome.details);
    }

    #[test]
    fn test_rules_do_not_short_circuit() {
        let payload = Payload::html("<p>plain paragraph</p>");
        let outcome = evaluate(
            &payload,
            &[
                Rule::tag_count("h1", 1, None),
                Rule::contains("missing marker"),
            ],
        );
        assert!(!outcome.passed);
        // Both failures surface in one evaluation.
        assert!(outcome.details.contains("FAIL at least 1 <h1> tags"));
        assert!(outcome.details.contains("FAIL contains \"missing marker\""));
    }

    #[test]
    fn test_informational_failure_does_not_flip_outcome() {
        let payload = Payload::json(json!({"title": "Guide"}));
        let outcome = evaluate(
            &payload,
            &[
                Rule::required_field("title", FieldKind::String),
                Rule::optional_field("tags", FieldKind::Array),
            ],
        );
        assert!(outcome.passed);
        assert!(outcome.details.contains("WARN optional field tags"));
    }

    #[test]
    fn test_field_presence_and_kind() {
        let payload = Payload::json(json!({
            "total": 3,
            "articles": [],
            "meta": {"engine": "v2"}
        }));

        let outcome = evaluate(
            &payload,
            &[
                Rule::required_field("total", FieldKind::Number),
                Rule::required_field("articles", FieldKind::Array),
                Rule::required_field("meta.engine", FieldKind::String),
            ],
        );
        assert!(outcome.passed, "{}", outcome.details);

        let outcome = evaluate(&payload, &[Rule::required_field("total", FieldKind::String)]);
        assert!(!outcome.passed);
        assert!(outcome.details.contains("expected string, found number"));
    }

    #[test]
    fn test_metric_thresholds() {
        let payload = Payload::html("<p>one two three four five</p>");
        assert!(evaluate(&payload, &[Rule::word_count(Comparison::AtLeast(5.0))]).passed);
        assert!(!evaluate(&payload, &[Rule::word_count(Comparison::AtLeast(6.0))]).passed);
        assert!(evaluate(&payload, &[Rule::word_count(Comparison::Between(3.0, 10.0))]).passed);
        assert!(evaluate(&payload, &[Rule::word_count(Comparison::Exactly(5.0))]).passed);

        let job = Payload::json(json!({"articles_generated": 2}));
        assert!(evaluate(&job, &[Rule::field_at_least("articles_generated", 1.0)]).passed);
        assert!(!evaluate(&job, &[Rule::field_at_least("chunks_created", 1.0)]).passed);
    }

    #[test]
    fn test_placeholder_markers_detected_through_markup() {
        let payload = Payload::html("<p>Full text here</p><p>TODO: finish section</p>");
        let outcome = evaluate(&payload, &[Rule::lacks("TODO:")]);
        assert!(!outcome.passed);
        assert!(outcome.details.contains("forbidden pattern"));

        let clean = Payload::html("<p>Full text here</p>");
        assert!(evaluate(&clean, &[Rule::lacks("TODO:")]).passed);
    }

    #[test]
    fn test_regex_patterns() {
        let payload = Payload::html("<p>Revision 42 of the guide</p>");
        let re = Regex::new(r"Revision \d+").expect("fixed regex");
        assert!(evaluate(&payload, &[Rule::contains_match(re)]).passed);

        let re = Regex::new(r"(?i)coming soon").expect("fixed regex");
        assert!(evaluate(&payload, &[Rule::lacks_match(re)]).passed);
    }

    #[test]
    fn test_html_rule_on_json_payload_fails_gracefully() {
        let payload = Payload::json(json!({"html": "<h1>hi</h1>"}));
        let outcome = evaluate(&payload, &[Rule::tag_count("h1", 1, None)]);
        assert!(!outcome.passed);
        assert!(outcome.details.contains("payload is not HTML"));
    }

    #[test]
    fn test_custom_rule() {
        let payload = Payload::json(json!({"articles": [1, 2, 3]}));
        let outcome = evaluate(
            &payload,
            &[Rule::custom("odd number of articles", |payload| {
                let count = payload
                    .plain_text()
                    .matches(',')
                    .count();
                if count % 2 == 0 {
                    Ok(format!("{count} separators"))
                } else {
                    Err(format!("{count} separators"))
                }
            })],
        );
        assert!(outcome.passed, "{}", outcome.details);
    }
}
