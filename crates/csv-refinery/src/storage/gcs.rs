//! Google Cloud Storage blob store
//!
//! Uploads and results live as plain objects in one bucket; the naming
//! convention decides the prefixes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use google_cloud_storage::client::{Client as GcsClient, ClientConfig};
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use google_cloud_storage::http::objects::Object;

use super::{BlobInfo, BlobStore};
use crate::error::{Error, Result};

/// Google Cloud Storage blob store
pub struct GcsBlobStore {
    client: GcsClient,
    bucket: String,
}

impl GcsBlobStore {
    /// Connect using application default credentials
    pub async fn new(bucket: String) -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| Error::ConfigMissing(format!("Failed to create GCS client: {}", e)))?;

        Ok(Self {
            client: GcsClient::new(config),
            bucket,
        })
    }

    fn get_request(&self, name: &str) -> GetObjectRequest {
        GetObjectRequest {
            bucket: self.bucket.clone(),
            object: name.to_string(),
            ..Default::default()
        }
    }
}

fn is_not_found(err: &google_cloud_storage::http::Error) -> bool {
    matches!(err, google_cloud_storage::http::Error::Response(resp) if resp.code == 404)
}

fn map_gcs_error(name: &str, action: &str, err: google_cloud_storage::http::Error) -> Error {
    if is_not_found(&err) {
        Error::NotFound(name.to_string())
    } else {
        Error::storage(format!("Failed to {} gs object {}: {}", action, name, err))
    }
}

fn updated_at(object: &Object) -> DateTime<Utc> {
    object
        .updated
        .or(object.time_created)
        .and_then(|t| DateTime::from_timestamp(t.unix_timestamp(), t.nanosecond()))
        .unwrap_or_default()
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn exists(&self, name: &str) -> Result<bool> {
        match self.client.get_object(&self.get_request(name)).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(map_gcs_error(name, "stat", e)),
        }
    }

    async fn read_text(&self, name: &str) -> Result<String> {
        let bytes = self
            .client
            .download_object(&self.get_request(name), &Range::default())
            .await
            .map_err(|e| map_gcs_error(name, "download", e))?;

        String::from_utf8(bytes)
            .map_err(|e| Error::storage(format!("Object {} is not valid UTF-8: {}", name, e)))
    }

    async fn write_text(&self, name: &str, content: &str, content_type: &str) -> Result<()> {
        let mut media = Media::new(name.to_string());
        media.content_type = content_type.to_string().into();
        let upload_type = UploadType::Simple(media);

        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket.clone(),
                    ..Default::default()
                },
                content.as_bytes().to_vec(),
                &upload_type,
            )
            .await
            .map_err(|e| map_gcs_error(name, "upload", e))?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>> {
        let mut items = Vec::new();
        let mut page_token = None;

        loop {
            let request = ListObjectsRequest {
                bucket: self.bucket.clone(),
                prefix: Some(prefix.to_string()),
                page_token: page_token.take(),
                ..Default::default()
            };

            let response = self
                .client
                .list_objects(&request)
                .await
                .map_err(|e| Error::storage(format!("Failed to list GCS objects: {}", e)))?;

            for object in response.items.unwrap_or_default() {
                items.push(BlobInfo {
                    updated: updated_at(&object),
                    name: object.name,
                });
            }

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.client
            .delete_object(&DeleteObjectRequest {
                bucket: self.bucket.clone(),
                object: name.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| map_gcs_error(name, "delete", e))
    }

    fn name(&self) -> &str {
        "gcs"
    }
}
