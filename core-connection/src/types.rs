use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth 2.0 token state for a connection.
///
/// Every field is optional: the authorization callback and the refresh grant
/// may each deliver a different subset, and [`AuthTokens::merge`] folds each
/// delivery over the previous state additively instead of replacing it.
///
/// # Security
///
/// Token values are never logged. The `Debug` implementation redacts them.
///
/// # Examples
///
/// ```
/// use core_connection::AuthTokens;
///
/// let mut tokens = AuthTokens {
///     access_token: Some("a".to_string()),
///     ..Default::default()
/// };
/// tokens.merge(&AuthTokens {
///     refresh_token: Some("r".to_string()),
///     ..Default::default()
/// });
///
/// assert_eq!(tokens.access_token.as_deref(), Some("a"));
/// assert_eq!(tokens.refresh_token.as_deref(), Some("r"));
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthTokens {
    /// The access token used for API requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// The refresh token used to obtain new access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds, as reported by the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Token type, normally `bearer`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// When the current access token was applied; anchors `expires_in`
    #[serde(skip)]
    pub obtained_at: Option<DateTime<Utc>>,
}

impl AuthTokens {
    /// Fold `incoming` over this state. Fields absent from `incoming` keep
    /// their previous values.
    pub fn merge(&mut self, incoming: &AuthTokens) {
        if incoming.access_token.is_some() {
            self.access_token = incoming.access_token.clone();
            self.obtained_at = Some(Utc::now());
        }
        if incoming.refresh_token.is_some() {
            self.refresh_token = incoming.refresh_token.clone();
        }
        if incoming.expires_in.is_some() {
            self.expires_in = incoming.expires_in;
        }
        if incoming.token_type.is_some() {
            self.token_type = incoming.token_type.clone();
        }
    }

    /// An access token is present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Whether the access token is expired or will expire within the buffer
    /// period. Unknown lifetimes are treated as unexpired; expiry is only
    /// advisory here, the 401 path is what actually triggers a refresh.
    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        match (self.obtained_at, self.expires_in) {
            (Some(obtained_at), Some(expires_in)) => {
                let expires_at = obtained_at + chrono::Duration::seconds(expires_in);
                Utc::now() >= expires_at - chrono::Duration::seconds(buffer_seconds)
            }
            _ => false,
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Connection state transitions published on the connection's event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ConnectionEvent {
    /// Tokens were applied to the connection. Carries the complete merged
    /// token state. May fire more than once over a connection's lifetime, so
    /// listeners must not assume single delivery.
    TokensSet {
        /// The token state after the merge.
        tokens: AuthTokens,
    },
    /// The access token was revoked. The refresh token survives.
    TokensUnset,
}

impl ConnectionEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            ConnectionEvent::TokensSet { .. } => "Tokens set on connection",
            ConnectionEvent::TokensUnset => "Access token revoked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_additive() {
        let mut tokens = AuthTokens::default();

        tokens.merge(&AuthTokens {
            access_token: Some("a".to_string()),
            ..Default::default()
        });
        tokens.merge(&AuthTokens {
            refresh_token: Some("b".to_string()),
            ..Default::default()
        });

        assert_eq!(tokens.access_token.as_deref(), Some("a"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("b"));
    }

    #[test]
    fn test_merge_replaces_present_fields() {
        let mut tokens = AuthTokens {
            access_token: Some("old".to_string()),
            refresh_token: Some("keep".to_string()),
            expires_in: Some(3600),
            token_type: Some("bearer".to_string()),
            obtained_at: None,
        };

        tokens.merge(&AuthTokens {
            access_token: Some("new".to_string()),
            expires_in: Some(7200),
            ..Default::default()
        });

        assert_eq!(tokens.access_token.as_deref(), Some("new"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("keep"));
        assert_eq!(tokens.expires_in, Some(7200));
        assert_eq!(tokens.token_type.as_deref(), Some("bearer"));
        assert!(tokens.obtained_at.is_some());
    }

    #[test]
    fn test_is_authenticated() {
        let mut tokens = AuthTokens::default();
        assert!(!tokens.is_authenticated());

        tokens.access_token = Some("a".to_string());
        assert!(tokens.is_authenticated());
    }

    #[test]
    fn test_expiry_with_buffer() {
        let mut tokens = AuthTokens {
            access_token: Some("a".to_string()),
            expires_in: Some(600),
            ..Default::default()
        };
        // Unknown anchor: never considered expired.
        assert!(!tokens.is_expired_with_buffer(300));

        tokens.obtained_at = Some(Utc::now());
        assert!(!tokens.is_expired_with_buffer(60));
        assert!(tokens.is_expired_with_buffer(900));

        tokens.obtained_at = Some(Utc::now() - chrono::Duration::hours(2));
        assert!(tokens.is_expired_with_buffer(0));
    }

    #[test]
    fn test_debug_redacts_token_values() {
        let tokens = AuthTokens {
            access_token: Some("secret_access".to_string()),
            refresh_token: Some("secret_refresh".to_string()),
            ..Default::default()
        };

        let debug = format!("{:?}", tokens);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret_access"));
        assert!(!debug.contains("secret_refresh"));
    }

    #[test]
    fn test_token_payload_deserialization() {
        let json = r#"{
            "access_token": "atoken",
            "refresh_token": "rtoken",
            "expires_in": 3600,
            "token_type": "bearer"
        }"#;

        let tokens: AuthTokens = serde_json::from_str(json).unwrap();
        assert_eq!(tokens.access_token.as_deref(), Some("atoken"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("rtoken"));
        assert_eq!(tokens.expires_in, Some(3600));
    }

    #[test]
    fn test_event_description() {
        let event = ConnectionEvent::TokensSet {
            tokens: AuthTokens::default(),
        };
        assert_eq!(event.description(), "Tokens set on connection");
        assert_eq!(
            ConnectionEvent::TokensUnset.description(),
            "Access token revoked"
        );
    }
}
