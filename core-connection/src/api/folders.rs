//! Folder operations.

use super::{decode, ListOptions};
use crate::api::models::{Folder, ItemCollection};
use crate::connection::{Connection, RequestOptions};
use crate::error::Result;
use bridge_traits::http::HttpMethod;
use serde_json::json;

impl Connection {
    /// Fetch a folder's metadata. Folder id `0` is the account root.
    pub async fn folder_info(&self, folder_id: &str) -> Result<Folder> {
        let body = self
            .request(&["folders", folder_id], HttpMethod::Get, RequestOptions::new())
            .await?;
        decode(&body)
    }

    /// List a folder's children, honoring `fields`/`limit`/`offset`.
    pub async fn folder_items(
        &self,
        folder_id: &str,
        options: &ListOptions,
    ) -> Result<ItemCollection> {
        let body = self
            .request(
                &["folders", folder_id, "items"],
                HttpMethod::Get,
                options.apply(RequestOptions::new()),
            )
            .await?;
        decode(&body)
    }

    /// Create a folder under `parent_id`.
    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<Folder> {
        let body = self
            .request(
                &["folders"],
                HttpMethod::Post,
                RequestOptions::new().payload(json!({
                    "name": name,
                    "parent": { "id": parent_id },
                })),
            )
            .await?;
        decode(&body)
    }

    /// Update folder attributes; `fields` is sent verbatim as the request
    /// body.
    pub async fn update_folder(
        &self,
        folder_id: &str,
        fields: serde_json::Value,
    ) -> Result<Folder> {
        let body = self
            .request(
                &["folders", folder_id],
                HttpMethod::Put,
                RequestOptions::new().payload(fields),
            )
            .await?;
        decode(&body)
    }

    /// Delete a folder, recursively when asked.
    pub async fn delete_folder(&self, folder_id: &str, recursive: bool) -> Result<()> {
        self.request(
            &["folders", folder_id],
            HttpMethod::Delete,
            RequestOptions::new().query("recursive", recursive.to_string()),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{authenticate, connection, response, MockTransport};

    #[tokio::test]
    async fn test_folder_items_builds_listing_query() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .times(1)
            .withf(|req| {
                req.url.contains("/api/2.0/folders/11446498/items")
                    && req.url.contains("fields=name%2Csize")
                    && req.url.contains("limit=2")
                    && req.url.contains("offset=4")
            })
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{
                        "total_count": 24,
                        "entries": [
                            {"type": "folder", "id": "192429928", "name": "Stephen Curry Three Pointers"},
                            {"type": "file", "id": "818853862", "name": "Warriors.jpg"}
                        ],
                        "offset": 4,
                        "limit": 2
                    }"#,
                ))
            });

        let connection = connection(transport);
        authenticate(&connection).await;

        let options = ListOptions {
            fields: Some("name,size".to_string()),
            limit: Some(2),
            offset: Some(4),
        };
        let items = connection.folder_items("11446498", &options).await.unwrap();

        assert_eq!(items.total_count, Some(24));
        assert_eq!(items.entries.len(), 2);
        assert_eq!(items.entries[0].kind, "folder");
        assert_eq!(items.entries[1].name.as_deref(), Some("Warriors.jpg"));
    }

    #[tokio::test]
    async fn test_create_folder_posts_name_and_parent() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .times(1)
            .withf(|req| {
                let body = req
                    .body
                    .as_ref()
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                req.method == bridge_traits::http::HttpMethod::Post
                    && req.url.ends_with("/api/2.0/folders")
                    && body.contains(r#""name":"Pictures""#)
                    && body.contains(r#""id":"0""#)
            })
            .returning(|_| Ok(response(201, r#"{"type":"folder","id":"11446498","name":"Pictures"}"#)));

        let connection = connection(transport);
        authenticate(&connection).await;

        let folder = connection.create_folder("Pictures", "0").await.unwrap();
        assert_eq!(folder.id, "11446498");
        assert_eq!(folder.name.as_deref(), Some("Pictures"));
    }

    #[tokio::test]
    async fn test_delete_folder_sends_recursive_flag() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .times(1)
            .withf(|req| {
                req.method == bridge_traits::http::HttpMethod::Delete
                    && req.url.contains("/api/2.0/folders/11446498")
                    && req.url.contains("recursive=true")
            })
            .returning(|_| Ok(response(204, "")));

        let connection = connection(transport);
        authenticate(&connection).await;

        connection.delete_folder("11446498", true).await.unwrap();
    }
}
