use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::error::TransportError;
use crate::http::{ApiResponse, HttpClient};
use crate::poller::{JobSnapshot, PollOptions, StatusSource};
use crate::types::{
    decode_record, AssetListRecord, AssetRecord, JobStatus, JobStatusRecord, LibraryRecord,
    SubmitRecord,
};

/// Wraps the Knowledge Engine HTTP API with one method per endpoint family.
/// Methods return the raw response alongside a loosely decoded record, so a
/// test can assert on the HTTP status deliberately (404 on a duplicate
/// delete is an acceptable outcome, not an error).
#[derive(Clone, Debug)]
pub struct EngineClient {
    http: HttpClient,
    read_timeout: Duration,
    submit_timeout: Duration,
    poll: PollOptions,
}

impl EngineClient {
    pub fn new(config: &EngineConfig) -> Result<Self, TransportError> {
        Ok(Self {
            http: HttpClient::new(&config.base_url)?,
            read_timeout: config.read_timeout,
            submit_timeout: config.submit_timeout,
            poll: config.poll,
        })
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn poll_options(&self) -> &PollOptions {
        &self.poll
    }

    pub async fn health(&self) -> Result<ApiResponse, TransportError> {
        self.http.get("/health", self.read_timeout).await
    }

    pub async fn engine_info(&self) -> Result<ApiResponse, TransportError> {
        self.http.get("/engine", self.read_timeout).await
    }

    pub async fn process_content(
        &self,
        content: &str,
        content_type: &str,
        metadata: &Value,
    ) -> Result<(ApiResponse, SubmitRecord), TransportError> {
        self.submit("/content/process", content, content_type, metadata)
            .await
    }

    pub async fn process_text(
        &self,
        content: &str,
        content_type: &str,
        metadata: &Value,
    ) -> Result<(ApiResponse, SubmitRecord), TransportError> {
        self.submit("/content/process-text", content, content_type, metadata)
            .await
    }

    async fn submit(
        &self,
        path: &str,
        content: &str,
        content_type: &str,
        metadata: &Value,
    ) -> Result<(ApiResponse, SubmitRecord), TransportError> {
        let body = json!({
            "content": content,
            "content_type": content_type,
            "metadata": metadata,
        });
        let response = self.http.post_json(path, &body, self.submit_timeout).await?;
        let record = decode_record(&response.body);
        Ok((response, record))
    }

    /// Multipart document upload: `file` part plus a `metadata` JSON-string
    /// part.
    pub async fn upload_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        metadata: &Value,
    ) -> Result<(ApiResponse, SubmitRecord), TransportError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("metadata", metadata.to_string());
        let response = self
            .http
            .post_multipart("/content/upload", form, self.submit_timeout)
            .await?;
        let record = decode_record(&response.body);
        Ok((response, record))
    }

    pub async fn job_status(
        &self,
        job_id: &str,
    ) -> Result<(ApiResponse, JobStatusRecord), TransportError> {
        let response = self
            .http
            .get(&format!("/jobs/{job_id}"), self.read_timeout)
            .await?;
        let record = decode_record(&response.body);
        Ok((response, record))
    }

    pub async fn list_articles(
        &self,
        limit: Option<u32>,
    ) -> Result<(ApiResponse, LibraryRecord), TransportError> {
        let path = match limit {
            Some(limit) => format!("/content-library?limit={limit}"),
            None => "/content-library".to_string(),
        };
        let response = self.http.get(&path, self.read_timeout).await?;
        let record = decode_record(&response.body);
        Ok((response, record))
    }

    pub async fn update_article(
        &self,
        id: &str,
        title: &str,
        content: &str,
        status: &str,
    ) -> Result<ApiResponse, TransportError> {
        let body = json!({
            "title": title,
            "content": content,
            "status": status,
        });
        self.http
            .put_json(&format!("/content-library/{id}"), &body, self.read_timeout)
            .await
    }

    pub async fn delete_article(&self, id: &str) -> Result<ApiResponse, TransportError> {
        self.http
            .delete(&format!("/content-library/{id}"), self.read_timeout)
            .await
    }

    pub async fn list_assets(&self) -> Result<(ApiResponse, AssetListRecord), TransportError> {
        let response = self.http.get("/assets", self.read_timeout).await?;
        let record = decode_record(&response.body);
        Ok((response, record))
    }

    pub async fn upload_asset(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(ApiResponse, AssetRecord), TransportError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post_multipart("/assets/upload", form, self.submit_timeout)
            .await?;
        let record = decode_record(&response.body);
        Ok((response, record))
    }

    pub async fn delete_asset(&self, id: &str) -> Result<ApiResponse, TransportError> {
        self.http
            .delete(&format!("/assets/{id}"), self.read_timeout)
            .await
    }
}

#[async_trait]
impl StatusSource for EngineClient {
    async fn job_snapshot(&self, job_id: &str) -> Result<JobSnapshot, TransportError> {
        let (response, _) = self.job_status(job_id).await?;
        Ok(snapshot_from_response(&response))
    }
}

/// A 2xx JSON response maps to the backend's reported status; anything else
/// (5xx during processing, a 404 race right after submission) is a transient
/// `Unknown` observation the poller retries.
fn snapshot_from_response(response: &ApiResponse) -> JobSnapshot {
    if !response.is_success() {
        return JobSnapshot {
            status: JobStatus::Unknown,
            error: Some(format!(
                "status endpoint returned HTTP {}",
                response.status
            )),
            raw: Value::Null,
        };
    }
    let record: JobStatusRecord = decode_record(&response.body);
    let status = record
        .status
        .as_deref()
        .map(JobStatus::parse)
        .unwrap_or_default();
    JobSnapshot {
        status,
        error: record.error,
        raw: response.json().cloned().unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Body;
    use serde_json::json;

    fn response(status: u16, body: Value) -> ApiResponse {
        ApiResponse {
            status,
            body: Body::Json(body),
        }
    }

    #[test]
    fn test_snapshot_maps_reported_status() {
        let snapshot = snapshot_from_response(&response(
            200,
            json!({"status": "completed", "articles_generated": 3}),
        ));
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.raw["articles_generated"], 3);
    }

    #[test]
    fn test_snapshot_carries_backend_error() {
        let snapshot = snapshot_from_response(&response(
            200,
            json!({"status": "failed", "error": "no chunks produced"}),
        ));
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("no chunks produced"));
    }

    #[test]
    fn test_snapshot_treats_server_error_as_transient() {
        let snapshot = snapshot_from_response(&ApiResponse {
            status: 502,
            body: Body::Text("bad gateway".to_string()),
        });
        assert_eq!(snapshot.status, JobStatus::Unknown);
        assert!(snapshot
            .error
            .as_deref()
            .is_some_and(|err| err.contains("502")));
    }

    #[test]
    fn test_snapshot_tolerates_missing_status_field() {
        let snapshot = snapshot_from_response(&response(200, json!({"progress": 0.4})));
        assert_eq!(snapshot.status, JobStatus::Unknown);
    }
}
