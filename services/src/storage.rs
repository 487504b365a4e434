//! Bulk-storage access: bucket listing, object reads and CSV auto-discovery.
//!
//! [`ObjectStore`] is the capability the pipeline depends on. [`LocalObjectStore`]
//! maps every bucket to a directory under a root and every key to a
//! `/`-separated path relative to that directory.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, info, trace};
use walkdir::WalkDir;

/// Storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object {key} is not valid UTF-8")]
    InvalidEncoding { key: String },

    #[error("no CSV files found in bucket {bucket}")]
    NoCsvFound { bucket: String },

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Read-only access to bucketed objects.
pub trait ObjectStore: Send + Sync {
    /// Lists object keys under `prefix`, sorted lexicographically.
    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>>>;

    /// Reads a whole object as UTF-8 text.
    fn get_object<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<String>>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>>> {
        (**self).list_objects(bucket, prefix)
    }

    fn get_object<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<String>> {
        (**self).get_object(bucket, key)
    }
}

/// Returns the first key ending in `.csv` (case-insensitive) in listing order.
///
/// # Errors
/// [`StorageError::NoCsvFound`] when the bucket holds no CSV object.
pub async fn discover_first_csv(store: &dyn ObjectStore, bucket: &str) -> Result<String> {
    let keys = store.list_objects(bucket, "").await?;
    let csv: Vec<&String> = keys
        .iter()
        .filter(|k| k.to_ascii_lowercase().ends_with(".csv"))
        .collect();
    info!(bucket, found = csv.len(), "scanned bucket for CSV files");
    debug!(?csv, "CSV candidates");
    csv.first()
        .map(|k| (*k).clone())
        .ok_or_else(|| StorageError::NoCsvFound {
            bucket: bucket.to_string(),
        })
}

/// Filesystem-backed [`ObjectStore`].
#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }
        let dir = self.root.join(bucket);
        if !dir.is_dir() {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }
        Ok(dir)
    }
}

/// Rejects absolute keys and keys escaping the bucket.
fn checked_key(key: &str) -> Result<&Path> {
    let path = Path::new(key);
    let ok = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if ok {
        Ok(path)
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

fn to_key(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl ObjectStore for LocalObjectStore {
    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(async move {
            let dir = self.bucket_dir(bucket)?;
            trace!(?dir, prefix, "listing objects");
            let prefix = prefix.to_string();

            let keys = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
                let mut keys = Vec::new();
                for entry in WalkDir::new(&dir).follow_links(false) {
                    let entry = entry.map_err(|e| {
                        StorageError::Io(e.into_io_error().unwrap_or_else(|| {
                            std::io::Error::other("walkdir loop detected")
                        }))
                    })?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let Ok(rel) = entry.path().strip_prefix(&dir) else {
                        continue;
                    };
                    let key = to_key(rel);
                    if key.starts_with(&prefix) {
                        keys.push(key);
                    }
                }
                keys.sort();
                Ok(keys)
            })
            .await
            .map_err(|e| StorageError::Join(e.to_string()))??;

            debug!(bucket, count = keys.len(), "listed objects");
            Ok(keys)
        })
    }

    fn get_object<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let path = self.bucket_dir(bucket)?.join(checked_key(key)?);
            let bytes = match tokio::fs::read(&path).await {
                Ok(b) => b,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(StorageError::ObjectNotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            };
            debug!(bucket, key, bytes = bytes.len(), "read object");
            String::from_utf8(bytes).map_err(|_| StorageError::InvalidEncoding {
                key: key.to_string(),
            })
        })
    }
}
