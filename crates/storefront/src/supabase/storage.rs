//! Storage API: product image uploads.

use reqwest::Method;
use tracing::instrument;

use super::{SupabaseClient, SupabaseError, check_status};

impl SupabaseClient {
    /// Upload (or replace) an object in a bucket.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the bucket rejects the object.
    #[instrument(skip(self, access_token, bytes), fields(size = bytes.len()))]
    pub async fn upload_object(
        &self,
        access_token: &str,
        bucket: &str,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), SupabaseError> {
        let url = self.endpoint(&format!(
            "storage/v1/object/{}/{}",
            encode_segment(bucket),
            encode_path(object_path)
        ))?;

        let response = self
            .request(Method::POST, url, access_token)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        check_status(response).await.map(|_| ())
    }

    /// Delete an object from a bucket.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the bucket refuses the delete.
    #[instrument(skip(self, access_token))]
    pub async fn delete_object(
        &self,
        access_token: &str,
        bucket: &str,
        object_path: &str,
    ) -> Result<(), SupabaseError> {
        let url = self.endpoint(&format!(
            "storage/v1/object/{}/{}",
            encode_segment(bucket),
            encode_path(object_path)
        ))?;

        let response = self
            .request(Method::DELETE, url, access_token)
            .send()
            .await?;

        check_status(response).await.map(|_| ())
    }

    /// Public URL of an object in a public bucket.
    #[must_use]
    pub fn public_url(&self, bucket: &str, object_path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url(),
            encode_segment(bucket),
            encode_path(object_path)
        )
    }
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Percent-encode each segment of a slash-separated object path.
fn encode_path(object_path: &str) -> String {
    object_path
        .trim_matches('/')
        .split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::SupabaseConfig;

    fn client_for(uri: &str) -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: url::Url::parse(uri).unwrap(),
            anon_key: SecretString::from("anon-key"),
            service_role_key: None,
        })
        .unwrap()
    }

    #[test]
    fn test_public_url_encodes_segments() {
        let client = client_for("https://abc.supabase.co");
        assert_eq!(
            client.public_url("product-images", "products/seed drill.png"),
            "https://abc.supabase.co/storage/v1/object/public/product-images/products/seed%20drill.png"
        );
    }

    #[tokio::test]
    async fn test_upload_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/product-images/products/a.png"))
            .and(header("x-upsert", "true"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Key": "product-images/products/a.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        client
            .upload_object(
                "user-token",
                "product-images",
                "products/a.png",
                vec![1, 2, 3],
                "image/png",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_object() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/product-images/products/a.png"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Successfully deleted"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        client
            .delete_object("user-token", "product-images", "products/a.png")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_object_reports_refusal() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "message": "new row violates row-level security policy"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        assert!(client
            .delete_object("user-token", "product-images", "products/a.png")
            .await
            .is_err());
    }
}
