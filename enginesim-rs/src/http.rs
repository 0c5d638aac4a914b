use std::time::Duration;

use serde_json::Value;

use crate::error::TransportError;

/// Thin wrapper around `reqwest` that normalizes outbound calls to the
/// backend. Every call takes an explicit timeout, any HTTP status is returned
/// to the caller, and only network-level failures surface as errors. Retries
/// belong to the caller; several endpoints create resources and must not be
/// blindly resubmitted.
#[derive(Clone, Debug)]
pub struct HttpClient {
    base_url: String,
    inner: reqwest::Client,
}

/// Response body, classified once at receive time. A body that fails to parse
/// as JSON is kept as text rather than treated as an error.
#[derive(Clone, Debug)]
pub enum Body {
    Json(Value),
    Text(String),
    Empty,
}

#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Body,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let inner = reqwest::Client::builder()
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            inner,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str, timeout: Duration) -> Result<ApiResponse, TransportError> {
        let url = self.url(path);
        let request = self.inner.get(&url).timeout(timeout);
        self.dispatch("GET", url, request).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(path);
        let request = self.inner.post(&url).json(body).timeout(timeout);
        self.dispatch("POST", url, request).await
    }

    pub async fn put_json(
        &self,
        path: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(path);
        let request = self.inner.put(&url).json(body).timeout(timeout);
        self.dispatch("PUT", url, request).await
    }

    pub async fn delete(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(path);
        let request = self.inner.delete(&url).timeout(timeout);
        self.dispatch("DELETE", url, request).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        timeout: Duration,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(path);
        let request = self.inner.post(&url).multipart(form).timeout(timeout);
        self.dispatch("POST", url, request).await
    }

    async fn dispatch(
        &self,
        method: &str,
        url: String,
        request: reqwest::RequestBuilder,
    ) -> Result<ApiResponse, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|err| classify_send_error(&url, err))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|err| TransportError::Other {
            url: url.clone(),
            source: err,
        })?;
        tracing::debug!(%method, %url, status, "request complete");
        Ok(ApiResponse {
            status,
            body: classify_body(&text),
        })
    }
}

fn classify_send_error(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            source: err,
        }
    } else {
        TransportError::Other {
            url: url.to_string(),
            source: err,
        }
    }
}

fn classify_body(text: &str) -> Body {
    if text.trim().is_empty() {
        return Body::Empty;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Body::Json(value),
        Err(_) => Body::Text(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joining() {
        let client = HttpClient::new("http://engine.local/api/").expect("client build");
        assert_eq!(client.url("/health"), "http://engine.local/api/health");
        assert_eq!(client.url("jobs/j-1"), "http://engine.local/api/jobs/j-1");
        assert_eq!(client.base_url(), "http://engine.local/api");
    }

    #[test]
    fn test_body_classification() {
        assert!(matches!(classify_body(""), Body::Empty));
        assert!(matches!(classify_body("  \n"), Body::Empty));

        match classify_body(r#"{"status": "ok"}"#) {
            Body::Json(value) => assert_eq!(value, json!({"status": "ok"})),
            other => panic!("expected json body, got {other:?}"),
        }

        // Malformed JSON degrades to text instead of erroring.
        match classify_body("<html>502 Bad Gateway</html>") {
            Body::Text(text) => assert!(text.contains("502")),
            other => panic!("expected text body, got {other:?}"),
        }
    }

    #[test]
    fn test_success_range() {
        let ok = ApiResponse {
            status: 204,
            body: Body::Empty,
        };
        assert!(ok.is_success());
        let missing = ApiResponse {
            status: 404,
            body: Body::Empty,
        };
        assert!(!missing.is_success());
    }
}
