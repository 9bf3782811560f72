//! S3 object storage wrapper for uploaded media.

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::time::Duration;

pub struct ObjectStorage {
    client: Client,
    bucket: String,
    region: String,
}

impl ObjectStorage {
    /// Credentials and region resolution follow the SDK's standard
    /// environment chain.
    pub async fn new(config: &StorageConfig) -> Self {
        let shared = aws_config::load_from_env().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(config.timeout_secs))
                    .build(),
            )
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
        }
    }

    /// Uploads a media object and returns its durable public URL.
    pub async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "s3",
                message: format!("put_object for {key} failed: {e}"),
            })?;

        tracing::info!(key = %key, size, content_type = %content_type, "Media uploaded to S3");

        Ok(format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        ))
    }

    pub async fn health_check(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "s3",
                message: format!("head_bucket failed: {e}"),
            })?;

        Ok(())
    }
}
