//! HTTP Transport Abstraction
//!
//! Defines the transport seam between the connection pipeline and the actual
//! socket-level HTTP implementation. The pipeline only ever talks to
//! [`HttpClient`], which keeps the retry/refresh/redirect state machine fully
//! testable against a mock transport.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Result, TransportError};

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
    /// When false the transport must hand back 3xx responses untouched so the
    /// caller can take manual control of the redirect.
    pub follow_redirects: bool,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
            follow_redirects: true,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body)
            .map_err(|e| TransportError::Body(format!("JSON serialization failed: {}", e)))?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn form(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self.headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| TransportError::Body(format!("JSON deserialization failed: {}", e)))
    }

    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TransportError::Body(format!("Invalid UTF-8: {}", e)))
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Header lookup, case-insensitive on the header name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Server-directed backoff in whole seconds, when the response carries a
    /// parseable `Retry-After` header.
    pub fn retry_after(&self) -> Option<u64> {
        self.header("retry-after").and_then(|v| v.trim().parse().ok())
    }

    /// The `Location` header of a redirect response.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}

/// A multipart/form-data payload: one file part plus any number of plain text
/// fields.
///
/// Every part is fully sized before the form is handed to the transport, so
/// the encoded body has a known content length and the request is never sent
/// with chunked framing.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    pub file_name: String,
    pub file: Bytes,
    pub fields: Vec<(String, String)>,
}

impl MultipartForm {
    pub fn new(file_name: impl Into<String>, file: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            file,
            fields: Vec::new(),
        }
    }

    /// Append a plain text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// Async HTTP transport trait
///
/// Implementations perform the actual socket-level calls. They must not
/// interpret application status codes: responses come back verbatim, success
/// or not, so the connection pipeline can run its own dispatch. Only
/// network-level failures surface as errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails, TLS validation fails, or the
    /// request times out.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute a multipart upload. The form is encoded with a known content
    /// length before any bytes hit the wire.
    async fn upload(&self, request: HttpRequest, form: MultipartForm) -> Result<HttpResponse>;

    /// Fetch a URL as a stream of bytes, for large downloads that should not
    /// be buffered in memory.
    async fn download_stream(
        &self,
        url: String,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::new(HttpMethod::Get, "https://example.com")
            .header("User-Agent", "test")
            .bearer_token("secret")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert!(request.headers.contains_key("Authorization"));
        assert!(request.follow_redirects);
    }

    #[test]
    fn test_no_redirects_flag() {
        let request = HttpRequest::new(HttpMethod::Get, "https://example.com").no_redirects();
        assert!(!request.follow_redirects);
    }

    #[test]
    fn test_http_response_status_checks() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from("test"),
        };

        assert!(response.is_success());
        assert!(!response.is_client_error());
        assert!(!response.is_server_error());
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HashMap::new();
        headers.insert("Retry-After".to_string(), "7".to_string());
        let response = HttpResponse {
            status: 202,
            headers,
            body: Bytes::new(),
        };

        assert_eq!(response.retry_after(), Some(7));
    }

    #[test]
    fn test_retry_after_missing_or_garbage() {
        let response = HttpResponse {
            status: 202,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert_eq!(response.retry_after(), None);

        let mut headers = HashMap::new();
        headers.insert("retry-after".to_string(), "soon".to_string());
        let response = HttpResponse {
            status: 202,
            headers,
            body: Bytes::new(),
        };
        assert_eq!(response.retry_after(), None);
    }

    #[test]
    fn test_location_header_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("Location".to_string(), "https://dl.example.com/f".to_string());
        let response = HttpResponse {
            status: 302,
            headers,
            body: Bytes::new(),
        };

        assert_eq!(response.location(), Some("https://dl.example.com/f"));
    }

    #[test]
    fn test_multipart_form_fields() {
        let form = MultipartForm::new("report.pdf", Bytes::from_static(b"%PDF"))
            .text("folder_id", "0")
            .text("description", "quarterly report");

        assert_eq!(form.file_name, "report.pdf");
        assert_eq!(form.fields.len(), 2);
        assert_eq!(form.fields[0], ("folder_id".to_string(), "0".to_string()));
    }
}
