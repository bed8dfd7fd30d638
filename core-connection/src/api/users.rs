//! User operations.

use super::decode;
use crate::api::models::User;
use crate::connection::{Connection, RequestOptions};
use crate::error::Result;
use bridge_traits::http::HttpMethod;

impl Connection {
    /// Fetch the account this connection is authenticated as.
    pub async fn current_user(&self) -> Result<User> {
        let body = self
            .request(&["users", "me"], HttpMethod::Get, RequestOptions::new())
            .await?;
        decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{authenticate, connection, response, MockTransport};

    #[tokio::test]
    async fn test_current_user_parses_account() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .times(1)
            .withf(|req| req.url.ends_with("/api/2.0/users/me"))
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{
                        "type": "user",
                        "id": "17738362",
                        "name": "sean rose",
                        "login": "sean@box.com"
                    }"#,
                ))
            });

        let connection = connection(transport);
        authenticate(&connection).await;

        let user = connection.current_user().await.unwrap();
        assert_eq!(user.id, "17738362");
        assert_eq!(user.login.as_deref(), Some("sean@box.com"));
    }
}
