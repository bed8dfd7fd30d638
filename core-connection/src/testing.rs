//! Shared test fixtures: a mock transport and connection builders.

use crate::connection::Connection;
use crate::types::AuthTokens;
use async_trait::async_trait;
use bridge_traits::error::Result as TransportResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, MultipartForm};
use bytes::Bytes;
use core_runtime::config::ConnectorConfig;
use mockall::mock;
use std::collections::HashMap;
use std::sync::Arc;

mock! {
    pub(crate) Transport {}

    #[async_trait]
    impl HttpClient for Transport {
        async fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse>;
        async fn upload(
            &self,
            request: HttpRequest,
            form: MultipartForm,
        ) -> TransportResult<HttpResponse>;
        async fn download_stream(
            &self,
            url: String,
        ) -> TransportResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
    }
}

pub(crate) fn config() -> ConnectorConfig {
    ConnectorConfig::builder()
        .client_id("test-client")
        .client_secret("test-secret")
        .host("localhost")
        .port(9040)
        .build()
        .unwrap()
}

pub(crate) fn connection(transport: MockTransport) -> Connection {
    Connection::new(&config(), "user@example.com", Arc::new(transport))
}

pub(crate) fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::copy_from_slice(body.as_bytes()),
    }
}

pub(crate) fn response_with_header(
    status: u16,
    name: &str,
    value: &str,
    body: &str,
) -> HttpResponse {
    let mut headers = HashMap::new();
    headers.insert(name.to_string(), value.to_string());
    HttpResponse {
        status,
        headers,
        body: Bytes::copy_from_slice(body.as_bytes()),
    }
}

pub(crate) async fn authenticate(connection: &Connection) {
    connection
        .set_tokens(AuthTokens {
            access_token: Some("initial-token".to_string()),
            refresh_token: Some("refresh-1".to_string()),
            ..Default::default()
        })
        .await;
}
