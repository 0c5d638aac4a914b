use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::http::Body;

/// Server-side lifecycle of an asynchronous processing job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    #[default]
    Unknown,
}

impl JobStatus {
    /// Maps the backend's free-form status string; anything unrecognized is
    /// `Unknown`, which the poller treats as still-in-flight.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// A job observed in a terminal state, as returned by the poller.
#[derive(Clone, Debug)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    /// Raw payload of the final status response.
    pub result: Value,
    pub error: Option<String>,
    pub elapsed: Duration,
    pub polls: u32,
}

impl Job {
    pub fn chunks_created(&self) -> u64 {
        self.result
            .get("chunks_created")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    pub fn articles_generated(&self) -> u64 {
        self.result
            .get("articles_generated")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

/// Result of running one test case. Owned and aggregated by the runner,
/// never mutated after creation.
#[derive(Clone, Debug)]
pub struct TestOutcome {
    pub passed: bool,
    pub details: String,
    pub data: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl TestOutcome {
    pub fn pass(details: impl Into<String>) -> Self {
        Self {
            passed: true,
            details: details.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn fail(details: impl Into<String>) -> Self {
        Self {
            passed: false,
            details: details.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Decodes a loose record from a response body. The backend's response
/// shapes are not strictly contractual, so a body that is missing, is not
/// JSON, or has a surprising shape degrades to `Default` instead of erroring.
pub fn decode_record<T>(body: &Body) -> T
where
    T: DeserializeOwned + Default,
{
    match body {
        Body::Json(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
        _ => T::default(),
    }
}

/// Response to a content submission (upload or process).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitRecord {
    pub job_id: Option<String>,
    pub status: Option<String>,
    pub chunks_created: Option<u64>,
    pub articles_generated: Option<u64>,
    pub engine: Option<String>,
}

/// Response of the job status endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobStatusRecord {
    pub status: Option<String>,
    pub chunks_created: Option<u64>,
    pub articles_generated: Option<u64>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticleRecord {
    pub id: Option<Value>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub html: Option<String>,
    pub markdown: Option<String>,
    pub status: Option<String>,
    pub tags: Vec<String>,
    pub created_at: Option<String>,
    pub metadata: Option<Value>,
}

impl ArticleRecord {
    /// Identifier as a string, whichever JSON type the backend used.
    pub fn id_str(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Renderable body, preferring the dedicated html field.
    pub fn body_html(&self) -> Option<&str> {
        self.html.as_deref().or(self.content.as_deref())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LibraryRecord {
    pub total: Option<u64>,
    pub articles: Vec<ArticleRecord>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssetRecord {
    pub id: Option<Value>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl AssetRecord {
    pub fn id_str(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssetListRecord {
    pub total: Option<u64>,
    pub assets: Vec<AssetRecord>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct HealthRecord {
    pub status: Option<String>,
    pub version: Option<String>,
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_status_parse() {
        assert_eq!(JobStatus::parse("queued"), JobStatus::Queued);
        assert_eq!(JobStatus::parse("Processing"), JobStatus::Processing);
        assert_eq!(JobStatus::parse(" completed "), JobStatus::Completed);
        assert_eq!(JobStatus::parse("FAILED"), JobStatus::Failed);
        assert_eq!(JobStatus::parse("half-done"), JobStatus::Unknown);
        assert_eq!(JobStatus::parse(""), JobStatus::Unknown);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_decode_record_tolerates_missing_fields() {
        let body = Body::Json(json!({"job_id": "j-1"}));
        let record: SubmitRecord = decode_record(&body);
        assert_eq!(record.job_id.as_deref(), Some("j-1"));
        assert!(record.status.is_none());
        assert!(record.chunks_created.is_none());
    }

    #[test]
    fn test_decode_record_degrades_on_non_json() {
        let record: SubmitRecord = decode_record(&Body::Text("<html>oops</html>".to_string()));
        assert!(record.job_id.is_none());

        let record: LibraryRecord = decode_record(&Body::Empty);
        assert!(record.articles.is_empty());
    }

    #[test]
    fn test_article_id_accepts_string_or_number() {
        let body = Body::Json(json!({
            "articles": [
                {"id": "abc123", "title": "First"},
                {"id": 42, "title": "Second"},
                {"title": "No id"}
            ]
        }));
        let listing: LibraryRecord = decode_record(&body);
        assert_eq!(listing.articles.len(), 3);
        assert_eq!(listing.articles[0].id_str().as_deref(), Some("abc123"));
        assert_eq!(listing.articles[1].id_str().as_deref(), Some("42"));
        assert!(listing.articles[2].id_str().is_none());
    }

    #[test]
    fn test_article_body_prefers_html() {
        let article = ArticleRecord {
            html: Some("<h1>Hi</h1>".to_string()),
            content: Some("plain".to_string()),
            ..Default::default()
        };
        assert_eq!(article.body_html(), Some("<h1>Hi</h1>"));

        let article = ArticleRecord {
            content: Some("plain".to_string()),
            ..Default::default()
        };
        assert_eq!(article.body_html(), Some("plain"));
    }
}
