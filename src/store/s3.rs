use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use super::{BlobMetadata, TileStore};
use crate::error::StoreError;
use crate::tile::TileName;

/// Tile store backed by S3 or an S3-compatible service.
///
/// Tiles are stored at `<prefix>/<name>` (e.g. `v7/013.png`). Ancestor tags
/// are written as S3 object tagging, `p1=01&p2=0`.
#[derive(Clone)]
pub struct S3TileStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3TileStore {
    pub fn new(client: Client, bucket: String, prefix: String) -> Self {
        let prefix = prefix.trim_matches('/').to_string();
        Self {
            client,
            bucket,
            prefix,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Object key for a tile.
    pub fn key(&self, name: &TileName) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }
}

/// Encode `p<level>:<prefix>` tags as an S3 tagging query string.
fn tagging(tags: &[String]) -> String {
    tags.iter()
        .filter_map(|tag| tag.split_once(':'))
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Whether an SDK error means the object does not exist.
fn is_not_found<E, R>(err: &aws_sdk_s3::error::SdkError<E, R>, service_not_found: bool) -> bool
where
    E: std::fmt::Debug,
    R: std::fmt::Debug,
{
    if service_not_found {
        return true;
    }
    let err_str = format!("{:?}", err);
    err_str.contains("NotFound") || err_str.contains("NoSuchKey") || err_str.contains("404")
}

#[async_trait]
impl TileStore for S3TileStore {
    async fn exists(&self, name: &TileName) -> Result<bool, StoreError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false)
                    || e.raw_response()
                        .map(|r| r.status().as_u16() == 404)
                        .unwrap_or(false);

                if is_not_found(&e, service_not_found) {
                    Ok(false)
                } else {
                    Err(StoreError::Backend(e.to_string()))
                }
            }
        }
    }

    async fn get(&self, name: &TileName) -> Result<Bytes, StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .send()
            .await
            .map_err(|e| {
                let service_not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if is_not_found(&e, service_not_found) {
                    StoreError::NotFound(self.location(name))
                } else {
                    StoreError::Backend(e.to_string())
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .into_bytes();

        Ok(data)
    }

    async fn put(
        &self,
        name: &TileName,
        data: Bytes,
        metadata: BlobMetadata,
    ) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .content_type(metadata.content_type)
            .body(ByteStream::from(data));

        let tags = tagging(&metadata.tags);
        if !tags.is_empty() {
            request = request.tagging(tags);
        }

        request
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn location(&self, name: &TileName) -> String {
        format!("s3://{}/{}", self.bucket, self.key(name))
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services usually need path-style addressing
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(endpoint_url.is_some())
        .build();

    Client::from_conf(s3_config)
}
