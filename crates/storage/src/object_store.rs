//! Object storage for raw files, intermediate arrays and finished stores.

use std::path::{Path as LocalPath, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::{
    aws::AmazonS3Builder, gcp::GoogleCloudStorageBuilder, local::LocalFileSystem,
    memory::InMemory, path::Path, ObjectStore,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use cyclone_common::{CycloneError, CycloneResult};

/// Concurrent uploads when mirroring a directory.
const UPLOAD_CONCURRENCY: usize = 8;

/// Which backend to talk to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ObjectStorageConfig {
    /// S3 or MinIO.
    S3 {
        endpoint: String,
        bucket: String,
        access_key_id: String,
        secret_access_key: String,
        #[serde(default = "default_region")]
        region: String,
        #[serde(default)]
        allow_http: bool,
    },
    /// Google Cloud Storage. Credentials come from the environment unless a
    /// service account file is given.
    Gcs {
        bucket: String,
        #[serde(default)]
        service_account_path: Option<String>,
    },
    /// A directory on the local filesystem.
    Local { root: PathBuf },
    /// Process-local memory, used in tests.
    Memory,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        ObjectStorageConfig::Local {
            root: PathBuf::from("data"),
        }
    }
}

impl ObjectStorageConfig {
    /// Short name for logs.
    pub fn describe(&self) -> String {
        match self {
            ObjectStorageConfig::S3 {
                endpoint, bucket, ..
            } => format!("s3://{} ({})", bucket, endpoint),
            ObjectStorageConfig::Gcs { bucket, .. } => format!("gs://{}", bucket),
            ObjectStorageConfig::Local { root } => format!("file://{}", root.display()),
            ObjectStorageConfig::Memory => "memory://".to_string(),
        }
    }
}

/// Blob store operations the preprocessing stages depend on.
///
/// Keys are `/`-separated object names. Every failure is reported as
/// [`CycloneError::StorageError`], or [`CycloneError::NotFound`] for a
/// missing key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download `key` into the file at `local_path`.
    async fn get(&self, key: &str, local_path: &LocalPath) -> CycloneResult<()>;

    /// Upload the file at `local_path` as `key`.
    async fn put(&self, local_path: &LocalPath, key: &str) -> CycloneResult<()>;

    /// Upload every file below `local_dir` under `prefix`, keeping relative
    /// paths. Returns the number of files uploaded.
    async fn put_directory(&self, local_dir: &LocalPath, prefix: &str) -> CycloneResult<usize>;

    async fn delete(&self, key: &str) -> CycloneResult<()>;

    /// Delete every object under `prefix`. Returns the number deleted.
    async fn delete_prefix(&self, prefix: &str) -> CycloneResult<usize>;

    async fn exists(&self, key: &str) -> CycloneResult<bool>;
}

/// Object storage client over any `object_store` backend.
#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    name: String,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage").field("name", &self.name).finish()
    }
}

impl ObjectStorage {
    /// Create a client from config.
    pub fn new(config: &ObjectStorageConfig) -> CycloneResult<Self> {
        let store: Arc<dyn ObjectStore> = match config {
            ObjectStorageConfig::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
                allow_http,
            } => {
                let mut builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_bucket_name(bucket)
                    .with_access_key_id(access_key_id)
                    .with_secret_access_key(secret_access_key)
                    .with_region(region);

                if *allow_http {
                    builder = builder.with_allow_http(true);
                }

                Arc::new(builder.build().map_err(|e| {
                    CycloneError::StorageError(format!("Failed to create S3 client: {}", e))
                })?)
            }
            ObjectStorageConfig::Gcs {
                bucket,
                service_account_path,
            } => {
                let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
                if let Some(path) = service_account_path {
                    builder = builder.with_service_account_path(path);
                }

                Arc::new(builder.build().map_err(|e| {
                    CycloneError::StorageError(format!("Failed to create GCS client: {}", e))
                })?)
            }
            ObjectStorageConfig::Local { root } => {
                std::fs::create_dir_all(root)?;
                Arc::new(LocalFileSystem::new_with_prefix(root).map_err(|e| {
                    CycloneError::StorageError(format!(
                        "Failed to open {}: {}",
                        root.display(),
                        e
                    ))
                })?)
            }
            ObjectStorageConfig::Memory => Arc::new(InMemory::new()),
        };

        Ok(Self {
            store,
            name: config.describe(),
        })
    }

    /// In-memory store.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            name: ObjectStorageConfig::Memory.describe(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write bytes to a key.
    #[instrument(skip(self, data), fields(store = %self.name, key = %key))]
    pub async fn put_bytes(&self, key: &str, data: Bytes) -> CycloneResult<()> {
        let location = Path::from(key);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data)
            .await
            .map_err(|e| CycloneError::StorageError(format!("Failed to write {}: {}", key, e)))?;

        Ok(())
    }

    /// Read bytes from a key.
    #[instrument(skip(self), fields(store = %self.name, key = %key))]
    pub async fn get_bytes(&self, key: &str) -> CycloneResult<Bytes> {
        let location = Path::from(key);

        let result = self.store.get(&location).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => CycloneError::NotFound(key.to_string()),
            e => CycloneError::StorageError(format!("Failed to read {}: {}", key, e)),
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| CycloneError::StorageError(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// List keys with a given prefix.
    pub async fn list(&self, prefix: &str) -> CycloneResult<Vec<String>> {
        let prefix_path = Path::from(prefix);
        let mut keys = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| CycloneError::StorageError(format!("List failed: {}", e)))?
        {
            keys.push(meta.location.to_string());
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl BlobStore for ObjectStorage {
    #[instrument(skip(self, local_path), fields(store = %self.name, key = %key))]
    async fn get(&self, key: &str, local_path: &LocalPath) -> CycloneResult<()> {
        let bytes = self.get_bytes(key).await?;
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_path, &bytes).await.map_err(|e| {
            CycloneError::StorageError(format!("Failed to write {}: {}", local_path.display(), e))
        })?;
        Ok(())
    }

    #[instrument(skip(self, local_path), fields(store = %self.name, key = %key))]
    async fn put(&self, local_path: &LocalPath, key: &str) -> CycloneResult<()> {
        let data = tokio::fs::read(local_path).await.map_err(|e| {
            CycloneError::StorageError(format!("Failed to read {}: {}", local_path.display(), e))
        })?;
        self.put_bytes(key, Bytes::from(data)).await
    }

    #[instrument(skip(self, local_dir), fields(store = %self.name, prefix = %prefix))]
    async fn put_directory(&self, local_dir: &LocalPath, prefix: &str) -> CycloneResult<usize> {
        let files = directory_keys(local_dir, prefix)?;
        let count = files.len();

        futures::stream::iter(files)
            .map(|(path, key)| async move { self.put(&path, &key).await })
            .buffer_unordered(UPLOAD_CONCURRENCY)
            .try_collect::<Vec<_>>()
            .await?;

        info!(files = count, "Uploaded directory");
        Ok(count)
    }

    #[instrument(skip(self), fields(store = %self.name, key = %key))]
    async fn delete(&self, key: &str) -> CycloneResult<()> {
        let location = Path::from(key);

        self.store
            .delete(&location)
            .await
            .map_err(|e| CycloneError::StorageError(format!("Failed to delete {}: {}", key, e)))?;

        Ok(())
    }

    #[instrument(skip(self), fields(store = %self.name, prefix = %prefix))]
    async fn delete_prefix(&self, prefix: &str) -> CycloneResult<usize> {
        let keys = self.list(prefix).await?;
        for key in &keys {
            self.delete(key).await?;
        }
        debug!(objects = keys.len(), "Deleted prefix");
        Ok(keys.len())
    }

    async fn exists(&self, key: &str) -> CycloneResult<bool> {
        let location = Path::from(key);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(CycloneError::StorageError(format!(
                "Failed to check {}: {}",
                key, e
            ))),
        }
    }
}

/// Every regular file below `local_dir` paired with its key under `prefix`.
fn directory_keys(local_dir: &LocalPath, prefix: &str) -> CycloneResult<Vec<(PathBuf, String)>> {
    if !local_dir.is_dir() {
        return Err(CycloneError::StorageError(format!(
            "{} is not a directory",
            local_dir.display()
        )));
    }

    let prefix = prefix.trim_matches('/');
    let mut files = Vec::new();
    for entry in WalkDir::new(local_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| CycloneError::StorageError(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(local_dir)
            .map_err(|e| CycloneError::InternalError(e.to_string()))?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let key = if prefix.is_empty() {
            relative
        } else {
            format!("{}/{}", prefix, relative)
        };
        files.push((entry.path().to_path_buf(), key));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_yaml() {
        let config: ObjectStorageConfig = serde_yaml::from_str(
            "backend: s3\nendpoint: http://minio:9000\nbucket: cyclones\naccess_key_id: a\nsecret_access_key: b\nallow_http: true\n",
        )
        .unwrap();
        match &config {
            ObjectStorageConfig::S3 { region, allow_http, .. } => {
                assert_eq!(region, "us-east-1");
                assert!(allow_http);
            }
            other => panic!("unexpected backend {:?}", other),
        }
        assert_eq!(config.describe(), "s3://cyclones (http://minio:9000)");

        let config: ObjectStorageConfig = serde_yaml::from_str("backend: gcs\nbucket: era5\n").unwrap();
        assert_eq!(config.describe(), "gs://era5");

        let config: ObjectStorageConfig = serde_yaml::from_str("backend: memory\n").unwrap();
        assert!(matches!(config, ObjectStorageConfig::Memory));
    }

    #[test]
    fn test_directory_keys() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("2010_inputs.zarr");
        std::fs::create_dir_all(root.join("c/0/0")).unwrap();
        std::fs::write(root.join("zarr.json"), b"{}").unwrap();
        std::fs::write(root.join("c/0/0/0"), b"x").unwrap();

        let keys: Vec<String> = directory_keys(&root, "/datasets/2010_inputs.zarr/")
            .unwrap()
            .into_iter()
            .map(|(_, k)| k)
            .collect();
        assert_eq!(
            keys,
            vec![
                "datasets/2010_inputs.zarr/c/0/0/0",
                "datasets/2010_inputs.zarr/zarr.json",
            ]
        );

        assert!(directory_keys(&root.join("zarr.json"), "x").is_err());
    }
}
