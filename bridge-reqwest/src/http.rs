//! HTTP Transport Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{Result, TransportError},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm},
};
use reqwest::{multipart, redirect, Client};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Reqwest-based HTTP transport
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - TLS support by default
/// - Sized multipart encoding for uploads
/// - A second client with redirects disabled, for requests that take manual
///   control of 3xx responses
pub struct ReqwestHttpClient {
    client: Client,
    manual_redirect_client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP transport with default configuration
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP transport with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let builder = || {
            Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(10))
                .pool_max_idle_per_host(10)
                .user_agent("box-connector/0.1.0")
        };

        let client = builder().build().expect("Failed to build HTTP client");
        let manual_redirect_client = builder()
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            manual_redirect_client,
        }
    }

    /// Convert transport HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build a reqwest request from a transport request
    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.manual_redirect_client
        };
        let mut req = client.request(method, &request.url);

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    /// Encode a multipart form with every part sized up front.
    ///
    /// Bytes and text parts carry their own lengths, so reqwest emits a
    /// Content-Length for the whole body instead of chunked framing.
    fn build_form(form: MultipartForm) -> multipart::Form {
        let file_name = form.file_name.clone();
        let mut encoded = multipart::Form::new().part(
            "filename",
            multipart::Part::bytes(form.file.to_vec()).file_name(file_name),
        );

        for (name, value) in form.fields {
            encoded = encoded.text(name, value);
        }

        encoded
    }

    fn map_error(e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::RequestFailed(e.to_string())
        }
    }

    async fn collect_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response.bytes().await.map_err(Self::map_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(url = %request.url, method = ?request.method, "Executing HTTP request");

        let response = self
            .build_request(&request)
            .send()
            .await
            .map_err(Self::map_error)?;

        Self::collect_response(response).await
    }

    async fn upload(&self, request: HttpRequest, form: MultipartForm) -> Result<HttpResponse> {
        debug!(
            url = %request.url,
            file_name = %form.file_name,
            file_len = form.file.len(),
            "Executing multipart upload"
        );

        let response = self
            .build_request(&request)
            .multipart(Self::build_form(form))
            .send()
            .await
            .map_err(Self::map_error)?;

        Self::collect_response(response).await
    }

    async fn download_stream(
        &self,
        url: String,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_error)?;

        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "Download request rejected");
            return Err(TransportError::RequestFailed(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let stream = response.bytes_stream().map_err(std::io::Error::other);

        use futures_util::TryStreamExt;
        let reader = tokio_util::io::StreamReader::new(stream);

        Ok(Box::new(reader))
    }
}
