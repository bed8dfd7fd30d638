//! # Connection
//!
//! One [`Connection`] per account. It owns the credential state for that
//! account and funnels every API call through a single request pipeline that
//! attaches bearer authentication, waits out server-directed backoff,
//! refreshes rejected access tokens, and follows redirects, so the endpoint
//! wrappers in [`crate::api`] stay trivial.
//!
//! ## Overview
//!
//! - [`Connection::auth_url`] renders the authorization link for interactive
//!   login; the local callback server finalizes it with
//!   [`Connection::set_tokens`] after checking the echoed `state` against
//!   [`Connection::csrf`].
//! - [`Connection::ready`] defers startup work until the first successful
//!   authentication.
//! - [`Connection::request`] is the pipeline: an explicit loop over the
//!   states `Sending`, `AwaitingBackoff`, `RefreshingToken`,
//!   `FollowingRedirect` and `Done`, replacing the recursive re-dispatch the
//!   callback style would invite. The loop makes the unbounded 202 retry and
//!   the refresh re-entry visible and testable.
//!
//! ## Usage
//!
//! ```no_run
//! use bridge_traits::http::HttpClient;
//! use core_connection::Connection;
//! use core_runtime::config::ConnectorConfig;
//! use std::sync::Arc;
//!
//! # async fn example(http: Arc<dyn HttpClient>) -> core_connection::Result<()> {
//! let config = ConnectorConfig::builder()
//!     .client_id("client-id")
//!     .client_secret("client-secret")
//!     .build()
//!     .expect("config");
//!
//! let connection = Connection::new(&config, "user@example.com", http);
//! println!("Sign in at: {}", connection.auth_url());
//!
//! connection.ready().await;
//! let folder = connection.folder_info("0").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{ConnectionError, Result};
use crate::types::{AuthTokens, ConnectionEvent};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm};
use bytes::Bytes;
use core_runtime::config::ConnectorConfig;
use core_runtime::events::{EventBus, RecvError};
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Content API base URL
const CONTENT_API_BASE: &str = "https://www.box.com/api/2.0";

/// Upload API base URL, used whenever a request carries a multipart upload
const UPLOAD_API_BASE: &str = "https://upload.box.com/api/2.0";

/// OAuth token endpoint for the refresh grant
const TOKEN_URL: &str = "https://www.box.com/api/oauth2/token";

/// Authorization endpoint rendered into the interactive login URL
const AUTHORIZE_URL: &str = "https://www.box.com/api/oauth2/authorize";

/// Backoff applied when a 202 arrives without a parseable retry-after header
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// The subset of transport methods the API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    /// Fails synchronously for any other method, before a transport call is
    /// ever issued.
    fn from_method(method: HttpMethod) -> Result<Self> {
        match method {
            HttpMethod::Get => Ok(Self::Get),
            HttpMethod::Post => Ok(Self::Post),
            HttpMethod::Put => Ok(Self::Put),
            HttpMethod::Delete => Ok(Self::Delete),
            other => Err(ConnectionError::UnsupportedMethod(other)),
        }
    }

    fn method(self) -> HttpMethod {
        match self {
            Self::Get => HttpMethod::Get,
            Self::Post => HttpMethod::Post,
            Self::Put => HttpMethod::Put,
            Self::Delete => HttpMethod::Delete,
        }
    }

    fn sends_payload(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

/// Per-request options for [`Connection::request`].
///
/// Query pairs are attached for every method; the JSON payload only rides on
/// POST/PUT bodies, or is flattened into form fields when an upload is
/// present.
#[derive(Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    payload: Option<serde_json::Value>,
    upload: Option<MultipartForm>,
    headers: Vec<(String, String)>,
    pipe: Option<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query string pair.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set the JSON payload.
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach a multipart upload. The request targets the upload host and the
    /// payload's fields are flattened into form fields next to the file part.
    pub fn upload(mut self, form: MultipartForm) -> Self {
        self.upload = Some(form);
        self
    }

    /// Layer an extra header on top of the defaults, in application order.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Stream a redirected GET response into `sink` instead of returning its
    /// body. Disables transport-level redirect following so the pipeline can
    /// take manual control of the 302.
    pub fn pipe(mut self, sink: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.pipe = Some(Box::new(sink));
        self
    }
}

/// The pipeline's explicit states. One logical request walks these until it
/// reaches `Done` or errors out.
enum RequestState {
    /// Issue the request against `url`.
    Sending { url: String },
    /// Sleep out a server-directed backoff, then send again.
    AwaitingBackoff { url: String, delay: Duration },
    /// Trade the refresh token for a new access token, then send again.
    /// `stale` is the bearer value the rejected attempt carried.
    RefreshingToken { url: String, stale: Option<String> },
    /// Fetch the redirect target of a 302.
    FollowingRedirect { location: String },
    /// Terminal: hand `body` to the caller.
    Done { body: Bytes },
}

/// Response payload of the OAuth token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default)]
    token_type: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// Render a JSON value as a multipart form field.
fn field_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One authenticated connection to the API, scoped to a single account.
///
/// Created once per account by the owning registry and kept for the process
/// lifetime; token refresh and revocation mutate its state but never replace
/// the instance.
pub struct Connection {
    login: String,
    host: String,
    port: u16,
    client_id: String,
    client_secret: String,
    csrf: String,
    tokens: RwLock<AuthTokens>,
    auth_url: OnceLock<String>,
    events: EventBus<ConnectionEvent>,
    http: Arc<dyn HttpClient>,
    /// Serializes 401-triggered refreshes so concurrent requests that hit an
    /// expired token coalesce into one refresh call.
    refresh_gate: Mutex<()>,
}

impl Connection {
    /// Creates a connection for `login`.
    ///
    /// The anti-forgery token is generated here and never changes for the
    /// lifetime of the instance.
    pub fn new(
        config: &ConnectorConfig,
        login: impl Into<String>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let mut csrf_bytes = [0u8; 16];
        rand::thread_rng().fill(&mut csrf_bytes);

        Self {
            login: login.into(),
            host: config.host.clone(),
            port: config.port,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            csrf: URL_SAFE_NO_PAD.encode(csrf_bytes),
            tokens: RwLock::new(AuthTokens::default()),
            auth_url: OnceLock::new(),
            events: EventBus::default(),
            http,
            refresh_gate: Mutex::new(()),
        }
    }

    /// The account identifier this connection serves.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// The anti-forgery token embedded in the authorization URL. The callback
    /// server compares the echoed `state` parameter against this value before
    /// accepting tokens.
    pub fn csrf(&self) -> &str {
        &self.csrf
    }

    /// The connection's event bus. Subscribe for
    /// [`ConnectionEvent::TokensSet`] / [`ConnectionEvent::TokensUnset`]
    /// transitions.
    pub fn events(&self) -> &EventBus<ConnectionEvent> {
        &self.events
    }

    /// Snapshot of the current token state.
    pub async fn tokens(&self) -> AuthTokens {
        self.tokens.read().await.clone()
    }

    /// The authentication URL to navigate to when running in standalone mode.
    ///
    /// Computed at most once; subsequent calls return the cached value.
    pub fn auth_url(&self) -> &str {
        self.auth_url.get_or_init(|| {
            let redirect_uri = format!(
                "http://{}:{}/authorize?id={}",
                self.host, self.port, self.login
            );
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("state", &self.csrf)
                .append_pair("redirect_uri", &redirect_uri)
                .finish();
            format!("{}?{}", AUTHORIZE_URL, query)
        })
    }

    /// Apply tokens to this connection.
    ///
    /// Merges the given fields over the current state (fields absent from
    /// `tokens` survive) and emits [`ConnectionEvent::TokensSet`] carrying
    /// the merged result. Called by the authorization callback server on
    /// login and internally after every refresh, so it can fire repeatedly.
    #[instrument(skip(self, tokens), fields(login = %self.login))]
    pub async fn set_tokens(&self, tokens: AuthTokens) {
        let applied = {
            let mut state = self.tokens.write().await;
            state.merge(&tokens);
            state.clone()
        };
        debug!("Tokens updated");
        let _ = self.events.emit(ConnectionEvent::TokensSet { tokens: applied });
    }

    /// Drop the access token, keeping the refresh token and client identity
    /// so the connection can re-authenticate without a new authorization
    /// dance. Emits [`ConnectionEvent::TokensUnset`].
    #[instrument(skip(self), fields(login = %self.login))]
    pub async fn revoke_access(&self) {
        self.tokens.write().await.access_token = None;
        info!("Access token revoked");
        let _ = self.events.emit(ConnectionEvent::TokensUnset);
    }

    /// Wait for the connection to become authenticated.
    ///
    /// Returns immediately when an access token is already present;
    /// otherwise completes on the next token-set event, exactly once.
    pub async fn ready(&self) {
        // Subscribe before checking state so a token set between the check
        // and the wait is never missed.
        let mut events = self.events.subscribe();
        if self.tokens.read().await.is_authenticated() {
            return;
        }
        loop {
            match events.recv().await {
                Ok(ConnectionEvent::TokensSet { .. }) => return,
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => {
                    // The missed burst may have included the set event.
                    if self.tokens.read().await.is_authenticated() {
                        return;
                    }
                }
                Err(RecvError::Closed) => return,
            }
        }
    }

    /// Perform an API request on this connection.
    ///
    /// Normally called through the wrapper methods in [`crate::api`]. The
    /// path is `segments` joined with `/` under the content API base, or the
    /// upload base when `options` carries an upload.
    ///
    /// The pipeline resolves exactly once per logical request, but latency is
    /// unbounded: a service that keeps answering 202 keeps the request in its
    /// backoff loop indefinitely.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::UnsupportedMethod`] before any transport call
    /// - [`ConnectionError::Transport`] on network-level failures, which are
    ///   terminal (status dispatch is never attempted without a response)
    /// - [`ConnectionError::RefreshFailed`] /
    ///   [`ConnectionError::MissingRefreshToken`] when a 401 cannot be
    ///   recovered
    /// - [`ConnectionError::Api`] for terminal 400/403/412 responses
    ///
    /// Any other status, success or not, resolves with the raw response body.
    #[instrument(skip(self, options), fields(login = %self.login, path = %segments.join("/")))]
    pub async fn request(
        &self,
        segments: &[&str],
        method: HttpMethod,
        mut options: RequestOptions,
    ) -> Result<Bytes> {
        let verb = Verb::from_method(method)?;
        let mut state = RequestState::Sending {
            url: self.endpoint_url(segments, &options)?,
        };

        loop {
            state = match state {
                RequestState::Sending { url } => {
                    let token = self.tokens.read().await.access_token.clone();
                    let response = self.dispatch(&url, verb, &options, &token).await?;
                    self.transition(url, response, token)?
                }
                RequestState::AwaitingBackoff { url, delay } => {
                    debug!(delay_secs = delay.as_secs(), "Waiting out server backoff");
                    tokio::time::sleep(delay).await;
                    RequestState::Sending { url }
                }
                RequestState::RefreshingToken { url, stale } => {
                    self.refresh_access_token(stale).await?;
                    RequestState::Sending { url }
                }
                RequestState::FollowingRedirect { location } => {
                    self.follow_redirect(location, &mut options).await?
                }
                RequestState::Done { body } => return Ok(body),
            };
        }
    }

    /// Map a response status onto the next pipeline state.
    fn transition(
        &self,
        url: String,
        response: HttpResponse,
        token: Option<String>,
    ) -> Result<RequestState> {
        match response.status {
            // Accepted but not ready: retry the identical request after the
            // server-directed delay. No cap on how often this repeats.
            202 => {
                let delay = response
                    .retry_after()
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_RETRY_AFTER);
                debug!(delay_secs = delay.as_secs(), "Resource not ready, retrying");
                Ok(RequestState::AwaitingBackoff { url, delay })
            }
            401 => {
                warn!("Access token rejected");
                Ok(RequestState::RefreshingToken { url, stale: token })
            }
            302 => {
                let location = response
                    .location()
                    .ok_or(ConnectionError::MissingRedirectLocation)?
                    .to_string();
                Ok(RequestState::FollowingRedirect { location })
            }
            301 => {
                let location = response
                    .location()
                    .ok_or(ConnectionError::MissingRedirectLocation)?
                    .to_string();
                debug!(%location, "Resource moved, repeating request");
                Ok(RequestState::Sending { url: location })
            }
            400 | 403 | 412 => Err(ConnectionError::Api {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            }),
            _ => Ok(RequestState::Done {
                body: response.body,
            }),
        }
    }

    /// Issue one attempt of the request.
    async fn dispatch(
        &self,
        url: &str,
        verb: Verb,
        options: &RequestOptions,
        token: &Option<String>,
    ) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(verb.method(), url)
            .bearer_token(token.clone().unwrap_or_default());

        for (name, value) in &options.headers {
            request = request.header(name.clone(), value.clone());
        }

        if options.pipe.is_some() && verb == Verb::Get {
            request = request.no_redirects();
        }

        let outcome = if let Some(upload) = &options.upload {
            let mut form = upload.clone();
            if let Some(serde_json::Value::Object(fields)) = &options.payload {
                for (name, value) in fields {
                    form = form.text(name.clone(), field_text(value));
                }
            }
            self.http.upload(request, form).await
        } else {
            if verb.sends_payload() {
                if let Some(payload) = &options.payload {
                    request = request.json(payload)?;
                }
            }
            self.http.execute(request).await
        };

        // A transport failure is terminal: there is no response to run the
        // status dispatch against.
        outcome.map_err(|e| {
            error!(error = %e, url = %url, "Transport failure");
            ConnectionError::Transport(e)
        })
    }

    /// Resolve a 302 by fetching its target: into the pipe sink when one was
    /// supplied, otherwise into the returned body.
    async fn follow_redirect(
        &self,
        location: String,
        options: &mut RequestOptions,
    ) -> Result<RequestState> {
        if let Some(mut sink) = options.pipe.take() {
            debug!(%location, "Streaming redirect target into pipe");
            let mut stream = self
                .http
                .download_stream(location)
                .await
                .map_err(ConnectionError::Transport)?;
            tokio::io::copy(&mut stream, &mut sink).await?;
            sink.shutdown().await?;
            Ok(RequestState::Done { body: Bytes::new() })
        } else {
            debug!(%location, "Following redirect");
            let request = HttpRequest::new(HttpMethod::Get, location);
            let response = self.http.execute(request).await.map_err(|e| {
                error!(error = %e, "Transport failure");
                ConnectionError::Transport(e)
            })?;
            Ok(RequestState::Done {
                body: response.body,
            })
        }
    }

    /// Exchange the refresh token for a new access token and apply it.
    ///
    /// Concurrent in-flight requests can all hit 401 when a token expires.
    /// The revocation only fires if the rejected bearer value is still the
    /// current one, and the gate serializes the refresh calls themselves:
    /// whoever enters after a successful refresh sees the restored token and
    /// skips the duplicate round-trip.
    #[instrument(skip(self, stale), fields(login = %self.login))]
    async fn refresh_access_token(&self, stale: Option<String>) -> Result<()> {
        {
            let tokens = self.tokens.read().await;
            if tokens.access_token != stale {
                debug!("Token already replaced by a concurrent request");
                return Ok(());
            }
        }
        self.revoke_access().await;

        let _gate = self.refresh_gate.lock().await;

        let refresh_token = {
            let tokens = self.tokens.read().await;
            if tokens.is_authenticated() {
                debug!("Token already refreshed by a concurrent request");
                return Ok(());
            }
            tokens
                .refresh_token
                .clone()
                .ok_or(ConnectionError::MissingRefreshToken)?
        };

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("client_id", self.client_id.as_str());
        params.insert("client_secret", self.client_secret.as_str());
        params.insert("refresh_token", refresh_token.as_str());

        let body = serde_urlencoded::to_string(&params)
            .map_err(|e| ConnectionError::Internal(format!("Failed to encode token request: {}", e)))?;

        debug!("Refreshing access token");

        let request = HttpRequest::new(HttpMethod::Post, TOKEN_URL).form(body);
        let response = self.http.execute(request).await.map_err(|e| {
            error!(error = %e, "Transport failure during token refresh");
            ConnectionError::Transport(e)
        })?;

        if response.status != 200 {
            let body = String::from_utf8_lossy(&response.body).into_owned();
            warn!(status = response.status, "Token refresh rejected");
            return Err(ConnectionError::RefreshFailed(body));
        }

        let refreshed: TokenResponse = response
            .json()
            .map_err(|e| ConnectionError::Parse(e.to_string()))?;

        info!("Access token refreshed");
        self.set_tokens(AuthTokens {
            access_token: Some(refreshed.access_token),
            refresh_token: refreshed.refresh_token,
            expires_in: Some(refreshed.expires_in),
            token_type: refreshed.token_type,
            obtained_at: None,
        })
        .await;

        Ok(())
    }

    /// Build the absolute request URL: upload base when the request carries
    /// an upload, content base otherwise; query pairs attached for every
    /// method.
    fn endpoint_url(&self, segments: &[&str], options: &RequestOptions) -> Result<String> {
        let base = if options.upload.is_some() {
            UPLOAD_API_BASE
        } else {
            CONTENT_API_BASE
        };

        let mut url = Url::parse(base)
            .map_err(|e| ConnectionError::Internal(format!("Invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ConnectionError::Internal("API base URL cannot carry a path".to_string()))?
            .extend(segments);

        if !options.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &options.query {
                pairs.append_pair(name, value);
            }
        }

        Ok(url.into())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("login", &self.login)
            .field("client_id", &self.client_id)
            .finish()
    }
}
