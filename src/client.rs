//! Storage client configuration and the consumed operations contract
//!
//! The harness does not implement storage semantics. It binds an anonymous
//! client to the emulator endpoint and consumes a small operations contract
//! (create bucket, get bucket, write object, get object) whose behavior is
//! owned by the backend.

use crate::config::{ClientSettings, CredentialsMode};
use crate::emulator::Emulator;
use crate::error::HarnessError;
use async_trait::async_trait;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::buckets::get::GetBucketRequest;
use google_cloud_storage::http::buckets::insert::{InsertBucketParam, InsertBucketRequest};
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use google_cloud_storage::http::Error as GcsError;
use tracing::debug;

/// Minimal bucket view returned by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketMeta {
    /// Bucket name
    pub name: String,
}

/// Minimal object view returned by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Owning bucket
    pub bucket: String,
    /// Object name
    pub name: String,
    /// Payload size in bytes
    pub size: u64,
}

/// Outcome of a bucket creation request. The backend either created the
/// bucket or reported that it already existed; every other failure is an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketCreation {
    Created,
    AlreadyExists,
}

/// Storage operations contract consumed by scenario steps.
///
/// All semantics (consistency, naming rules, payload durability) belong to
/// the backend; implementations are thin request wrappers.
#[async_trait]
pub trait StorageOps: Send + Sync {
    /// Request bucket creation. Already-exists is classified, not an error.
    async fn create_bucket(&self, name: &str) -> Result<BucketCreation, HarnessError>;

    /// Look up a bucket; absent buckets are `None`.
    async fn get_bucket(&self, name: &str) -> Result<Option<BucketMeta>, HarnessError>;

    /// Write a byte payload to an object.
    async fn write_object(
        &self,
        bucket: &str,
        name: &str,
        data: &[u8],
    ) -> Result<ObjectMeta, HarnessError>;

    /// Look up an object; absent objects are `None`.
    async fn get_object(&self, bucket: &str, name: &str)
        -> Result<Option<ObjectMeta>, HarnessError>;

    /// Read an object's full payload.
    async fn read_object(&self, bucket: &str, name: &str) -> Result<Vec<u8>, HarnessError>;
}

/// A configured client bound to one emulator instance and a synthetic
/// project identity. Stateless beyond its configuration; owns no remote
/// state.
pub struct StorageClient {
    inner: Client,
    project_id: String,
}

impl StorageClient {
    /// Bind an anonymous client to a started emulator.
    ///
    /// Taking `&Emulator` enforces configure-after-ready ordering: the
    /// emulator value only exists once its readiness probe has passed.
    pub fn configure(
        emulator: &Emulator,
        settings: &ClientSettings,
    ) -> Result<Self, HarnessError> {
        // Only the no-credentials emulator mode is supported.
        match settings.credentials {
            CredentialsMode::None => {}
        }

        let endpoint = emulator.endpoint();
        reqwest::Url::parse(&endpoint).map_err(|e| {
            HarnessError::Configuration(format!("invalid emulator endpoint {}: {}", endpoint, e))
        })?;

        let mut config = ClientConfig::default().anonymous();
        config.storage_endpoint = endpoint.clone();

        debug!(%endpoint, project_id = %settings.project_id, "storage client configured");
        Ok(Self {
            inner: Client::new(config),
            project_id: settings.project_id.clone(),
        })
    }

    /// Project identity sent with bucket creation requests.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

#[async_trait]
impl StorageOps for StorageClient {
    async fn create_bucket(&self, name: &str) -> Result<BucketCreation, HarnessError> {
        let req = InsertBucketRequest {
            name: name.to_string(),
            param: InsertBucketParam {
                project: self.project_id.clone(),
                ..Default::default()
            },
            ..Default::default()
        };

        match self.inner.insert_bucket(&req).await {
            Ok(_) => Ok(BucketCreation::Created),
            Err(ref e) if status_code(e) == Some(409) => Ok(BucketCreation::AlreadyExists),
            Err(e) => Err(HarnessError::Creation(format!("bucket {}: {}", name, e))),
        }
    }

    async fn get_bucket(&self, name: &str) -> Result<Option<BucketMeta>, HarnessError> {
        let req = GetBucketRequest {
            bucket: name.to_string(),
            ..Default::default()
        };

        match self.inner.get_bucket(&req).await {
            Ok(bucket) => Ok(Some(BucketMeta { name: bucket.name })),
            Err(ref e) if status_code(e) == Some(404) => Ok(None),
            Err(e) => Err(HarnessError::Storage(format!("get bucket {}: {}", name, e))),
        }
    }

    async fn write_object(
        &self,
        bucket: &str,
        name: &str,
        data: &[u8],
    ) -> Result<ObjectMeta, HarnessError> {
        let req = UploadObjectRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        };
        let media = Media::new(name.to_string());

        let object = self
            .inner
            .upload_object(&req, data.to_vec(), &UploadType::Simple(media))
            .await
            .map_err(|e| {
                HarnessError::Storage(format!("write object {}/{}: {}", bucket, name, e))
            })?;

        Ok(ObjectMeta {
            bucket: object.bucket,
            name: object.name,
            size: object.size.max(0) as u64,
        })
    }

    async fn get_object(
        &self,
        bucket: &str,
        name: &str,
    ) -> Result<Option<ObjectMeta>, HarnessError> {
        let req = GetObjectRequest {
            bucket: bucket.to_string(),
            object: name.to_string(),
            ..Default::default()
        };

        match self.inner.get_object(&req).await {
            Ok(object) => Ok(Some(ObjectMeta {
                bucket: object.bucket,
                name: object.name,
                size: object.size.max(0) as u64,
            })),
            Err(ref e) if status_code(e) == Some(404) => Ok(None),
            Err(e) => Err(HarnessError::Storage(format!(
                "get object {}/{}: {}",
                bucket, name, e
            ))),
        }
    }

    async fn read_object(&self, bucket: &str, name: &str) -> Result<Vec<u8>, HarnessError> {
        let req = GetObjectRequest {
            bucket: bucket.to_string(),
            object: name.to_string(),
            ..Default::default()
        };

        self.inner
            .download_object(&req, &Range::default())
            .await
            .map_err(|e| {
                HarnessError::Storage(format!("read object {}/{}: {}", bucket, name, e))
            })
    }
}

/// Extract the backend status code from a client error, where one exists.
fn status_code(e: &GcsError) -> Option<u16> {
    match e {
        GcsError::Response(resp) => Some(resp.code as u16),
        _ => None,
    }
}
