use crate::constants::LIST_PAGE_SIZE;
use crate::error::{Result, ThumbError};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

/// The object-store surface the pipeline consumes. Production runs use
/// [`S3Store`]; unit tests drive the pipeline with an in-memory store.
///
/// "Not found" is a normal branch everywhere (`Ok(None)` / `Ok(false)`), never
/// an error; only other transport failures surface as `ThumbError::Store`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Full object body, or `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()>;

    /// Immediate "subfolder" names under `prefix` (delimiter `/`), following
    /// continuation tokens until the listing is exhausted.
    async fn list_prefixes(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Connection parameters for one bucket. The originals and thumbnails buckets
/// carry independent credential pairs, so each run builds two of these.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn connect(config: &StoreConfig) -> Self {
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "env");
        // The SDK insists on a region; path-style endpoints ignore it.
        let conf = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(conf),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match response {
            Ok(output) => {
                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| ThumbError::Store(format!("read body of {key}: {e}")))?;
                Ok(Some(body.into_bytes().to_vec()))
            }
            Err(err) => {
                let service = err.into_service_error();
                if service.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(ThumbError::Store(format!("get {key}: {service}")))
                }
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match response {
            Ok(_) => Ok(true),
            Err(err) => {
                let service = err.into_service_error();
                if service.is_not_found() {
                    Ok(false)
                } else {
                    Err(ThumbError::Store(format!("head {key}: {service}")))
                }
            }
        }
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .cache_control(cache_control)
            .send()
            .await
            .map_err(|e| ThumbError::Store(format!("put {key}: {}", e.into_service_error())))?;
        Ok(())
    }

    async fn list_prefixes(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .delimiter("/")
                .max_keys(LIST_PAGE_SIZE);
            if let Some(t) = &token {
                request = request.continuation_token(t);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ThumbError::Store(format!("list {prefix}: {}", e.into_service_error())))?;

            for common in response.common_prefixes() {
                let Some(p) = common.prefix() else { continue };
                let Some(rest) = p.strip_prefix(prefix) else { continue };
                let name = rest.trim_matches('/');
                if !name.is_empty() {
                    names.push(name.to_string());
                }
            }

            match (
                response.is_truncated().unwrap_or(false),
                response.next_continuation_token(),
            ) {
                (true, Some(next)) => token = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(names)
    }
}
