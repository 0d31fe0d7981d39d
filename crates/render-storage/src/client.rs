//! S3-API-compatible blob store client (§4.B Blob I/O).

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// Configuration for the blob store client (§6 env vars).
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region: String,
    /// Public base URL clients fetch finished videos/thumbnails through (§4.B, §6).
    pub cdn_base_url: String,
    /// Optional purge endpoint; CDN purge is skipped (and logged) if unset (§4.B).
    pub cdn_purge_url: Option<String>,
}

impl BlobStoreConfig {
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("R2_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("R2_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("R2_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("R2_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("R2_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("R2_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("R2_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("R2_BUCKET_NAME not set"))?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            cdn_base_url: std::env::var("CDN_BASE_URL")
                .map_err(|_| StorageError::config_error("CDN_BASE_URL not set"))?,
            cdn_purge_url: std::env::var("CDN_PURGE_URL").ok(),
        })
    }
}

/// Content-type and cache-control contract for a render's two uploaded artifacts (§4.B).
#[derive(Debug, Clone, Copy)]
pub enum Artifact {
    Video,
    Thumbnail,
}

impl Artifact {
    fn content_type(self) -> &'static str {
        match self {
            Artifact::Video => "video/mp4",
            Artifact::Thumbnail => "image/jpeg",
        }
    }

    fn cache_control(self) -> &'static str {
        match self {
            Artifact::Video => "public, max-age=3600",
            Artifact::Thumbnail => "public, max-age=3600",
        }
    }
}

/// S3-API-compatible object store client, configured against an explicit CDN base URL
/// used to build the public URLs returned from uploads (§4.B).
#[derive(Clone)]
pub struct BlobStore {
    client: Client,
    bucket: String,
    cdn_base_url: String,
    cdn_purge_url: Option<String>,
    http: reqwest::Client,
}

impl BlobStore {
    pub async fn new(config: BlobStoreConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "render-storage",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            cdn_base_url: config.cdn_base_url.trim_end_matches('/').to_string(),
            cdn_purge_url: config.cdn_purge_url,
            http: reqwest::Client::new(),
        })
    }

    pub async fn from_env() -> StorageResult<Self> {
        Self::new(BlobStoreConfig::from_env()?).await
    }

    /// Public URL a given object key resolves to under the configured CDN.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.cdn_base_url, key)
    }

    /// Upload a local file to `key` under the object-key contract (§4.B, §6:
    /// `renders/<public_id>.(mp4|jpg)`), overwriting any existing object at that key.
    pub async fn upload_artifact(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        artifact: Artifact,
    ) -> StorageResult<String> {
        let path = path.as_ref();
        debug!(path = %path.display(), key, "uploading render artifact");

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(artifact.content_type())
            .cache_control(artifact.cache_control())
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let url = self.public_url(key);
        info!(key, url, "uploaded render artifact");
        Ok(url)
    }

    /// Fetch bytes from a signed or public HTTPS URL, rejecting responses over `max_bytes`
    /// (facecams ≤ 100 MB, CSVs ≤ 5 MB, §4.B).
    pub async fn fetch_bytes(&self, url: &str, max_bytes: u64) -> StorageResult<Vec<u8>> {
        debug!(url, max_bytes, "fetching blob");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::fetch_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StorageError::fetch_failed(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        if let Some(len) = response.content_length() {
            if len > max_bytes {
                return Err(StorageError::TooLarge {
                    size: len,
                    limit: max_bytes,
                });
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::fetch_failed(e.to_string()))?;

        if bytes.len() as u64 > max_bytes {
            return Err(StorageError::TooLarge {
                size: bytes.len() as u64,
                limit: max_bytes,
            });
        }

        Ok(bytes.to_vec())
    }

    /// Download a blob straight to disk, for facecams/CSVs pulled into a working directory.
    pub async fn fetch_to_file(
        &self,
        url: &str,
        max_bytes: u64,
        dest: impl AsRef<Path>,
    ) -> StorageResult<()> {
        let bytes = self.fetch_bytes(url, max_bytes).await?;
        let dest = dest.as_ref();
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }

    /// Best-effort CDN purge for one or more URLs. Failures are logged, never fatal (§4.B).
    pub async fn purge_cdn(&self, urls: &[String]) {
        let Some(purge_url) = &self.cdn_purge_url else {
            debug!("CDN_PURGE_URL not configured, skipping purge");
            return;
        };
        if urls.is_empty() {
            return;
        }

        let body = serde_json::json!({ "urls": urls });
        match self.http.post(purge_url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(count = urls.len(), "purged CDN urls");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "CDN purge returned non-success status");
            }
            Err(e) => {
                warn!(error = %e, "CDN purge request failed");
            }
        }
    }

    /// Check connectivity to the bucket (readiness probe).
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("connectivity check failed: {e}")))?;
        Ok(())
    }
}
