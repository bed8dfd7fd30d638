//! File operations.

use super::decode;
use crate::api::models::{File, ItemCollection};
use crate::connection::{Connection, RequestOptions};
use crate::error::Result;
use bridge_traits::http::{HttpMethod, MultipartForm};
use bytes::Bytes;
use serde_json::json;
use tokio::io::AsyncWrite;

impl Connection {
    /// Fetch a file's metadata.
    pub async fn file_info(&self, file_id: &str) -> Result<File> {
        let body = self
            .request(&["files", file_id], HttpMethod::Get, RequestOptions::new())
            .await?;
        decode(&body)
    }

    /// Update file attributes; `fields` is sent verbatim as the request body.
    pub async fn update_file(&self, file_id: &str, fields: serde_json::Value) -> Result<File> {
        let body = self
            .request(
                &["files", file_id],
                HttpMethod::Put,
                RequestOptions::new().payload(fields),
            )
            .await?;
        decode(&body)
    }

    /// Delete a file.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.request(&["files", file_id], HttpMethod::Delete, RequestOptions::new())
            .await?;
        Ok(())
    }

    /// Upload `content` as a new file in `folder_id`.
    ///
    /// Goes to the upload host as a multipart request; the target folder
    /// travels as a form field next to the file part. The API answers with a
    /// one-entry item collection.
    pub async fn upload_file(
        &self,
        file_name: &str,
        content: Bytes,
        folder_id: &str,
    ) -> Result<ItemCollection> {
        let body = self
            .request(
                &["files", "content"],
                HttpMethod::Post,
                RequestOptions::new()
                    .upload(MultipartForm::new(file_name, content))
                    .payload(json!({ "folder_id": folder_id })),
            )
            .await?;
        decode(&body)
    }

    /// Download a file into memory.
    ///
    /// The content endpoint answers with a redirect to the storage location;
    /// the pipeline follows it and returns the final body.
    pub async fn file_contents(&self, file_id: &str) -> Result<Bytes> {
        self.request(
            &["files", file_id, "content"],
            HttpMethod::Get,
            RequestOptions::new(),
        )
        .await
    }

    /// Download a file by streaming it into `sink`, without buffering the
    /// whole body.
    pub async fn download_file(
        &self,
        file_id: &str,
        sink: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Result<()> {
        self.request(
            &["files", file_id, "content"],
            HttpMethod::Get,
            RequestOptions::new().pipe(sink),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{authenticate, connection, response, response_with_header, MockTransport};
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_file_info_parses_metadata() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .times(1)
            .withf(|req| req.url.contains("/api/2.0/files/5000948880"))
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{
                        "type": "file",
                        "id": "5000948880",
                        "name": "tigers.jpeg",
                        "size": 629644,
                        "sha1": "134b65991ed521fcfe4724b7d814ab8ded5185dc"
                    }"#,
                ))
            });

        let connection = connection(transport);
        authenticate(&connection).await;

        let file = connection.file_info("5000948880").await.unwrap();
        assert_eq!(file.kind, "file");
        assert_eq!(file.name.as_deref(), Some("tigers.jpeg"));
        assert_eq!(file.size, Some(629644));
    }

    #[tokio::test]
    async fn test_upload_file_returns_created_entry() {
        let mut transport = MockTransport::new();
        transport
            .expect_upload()
            .times(1)
            .withf(|req, form| {
                req.url
                    .starts_with("https://upload.box.com/api/2.0/files/content")
                    && form.file_name == "tigers.jpeg"
                    && form
                        .fields
                        .iter()
                        .any(|(name, value)| name == "folder_id" && value == "11446498")
            })
            .returning(|_, _| {
                Ok(response(
                    200,
                    r#"{
                        "total_count": 1,
                        "entries": [{"type": "file", "id": "5000948880", "name": "tigers.jpeg"}]
                    }"#,
                ))
            });

        let connection = connection(transport);
        authenticate(&connection).await;

        let created = connection
            .upload_file("tigers.jpeg", Bytes::from_static(b"jpeg-bytes"), "11446498")
            .await
            .unwrap();
        assert_eq!(created.total_count, Some(1));
        assert_eq!(created.entries[0].id, "5000948880");
    }

    #[tokio::test]
    async fn test_download_file_streams_through_redirect() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .times(1)
            .withf(|req| req.url.contains("/api/2.0/files/5000948880/content") && !req.follow_redirects)
            .returning(|_| {
                Ok(response_with_header(
                    302,
                    "location",
                    "https://dl.box.com/d/1/tigers.jpeg",
                    "",
                ))
            });
        transport
            .expect_download_stream()
            .times(1)
            .returning(|_| Ok(Box::new(std::io::Cursor::new(b"jpeg-bytes".to_vec()))));

        let connection = connection(transport);
        authenticate(&connection).await;

        let (sink, mut drain) = tokio::io::duplex(64);
        connection.download_file("5000948880", sink).await.unwrap();

        let mut piped = Vec::new();
        drain.read_to_end(&mut piped).await.unwrap();
        assert_eq!(piped, b"jpeg-bytes");
    }
}
