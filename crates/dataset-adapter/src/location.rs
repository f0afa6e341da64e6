//! Archive locations: local paths and S3-compatible object storage.

use std::path::PathBuf;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use zarrs::storage::ReadableListableStorage;
use zarrs_filesystem::FilesystemStore;
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{
    AsyncToSyncBlockOn, AsyncToSyncStorageAdapter,
};

use crate::error::{AdapterError, Result};

/// Blocking executor that works from within a tokio runtime.
///
/// Uses `tokio::task::block_in_place` to move the current task to a blocking
/// thread, then uses the runtime handle to drive the future. This avoids the
/// "cannot start a runtime from within a runtime" error.
#[derive(Clone, Copy)]
pub struct TokioBlockOn;

impl AsyncToSyncBlockOn for TokioBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

/// Access parameters for S3-compatible storage.
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    /// Custom endpoint URL (e.g. a MinIO or Ceph gateway).
    pub endpoint: Option<String>,
    /// AWS region; backends like MinIO accept any value here.
    pub region: Option<String>,
    /// Skip request signing for public buckets.
    pub anonymous: bool,
}

/// Where an archive lives.
#[derive(Debug, Clone)]
pub enum Location {
    /// A Zarr store on the local filesystem.
    Local(PathBuf),
    /// A Zarr store inside an S3-compatible bucket.
    S3 {
        bucket: String,
        /// Key prefix of the store root inside the bucket, without slashes
        /// on either end.
        prefix: String,
        options: S3Options,
    },
}

impl Location {
    /// Parse a location identifier: an `s3://bucket/key` URI or a local path.
    pub fn parse(spec: &str, options: S3Options) -> Result<Self> {
        if let Some(rest) = spec.strip_prefix("s3://") {
            let mut parts = rest.splitn(2, '/');
            let bucket = parts.next().unwrap_or("").to_string();
            if bucket.is_empty() {
                return Err(AdapterError::not_found(format!(
                    "malformed S3 URI '{}': missing bucket",
                    spec
                )));
            }
            let prefix = parts.next().unwrap_or("").trim_matches('/').to_string();
            return Ok(Location::S3 {
                bucket,
                prefix,
                options,
            });
        }
        if spec.contains("://") {
            return Err(AdapterError::unsupported(format!(
                "unsupported location scheme in '{}'",
                spec
            )));
        }
        Ok(Location::Local(PathBuf::from(spec)))
    }

    /// Node-path prefix of the store root ("" for a filesystem store rooted
    /// at the archive directory).
    pub fn node_prefix(&self) -> &str {
        match self {
            Location::Local(_) => "",
            Location::S3 { prefix, .. } => prefix,
        }
    }

    /// Build the node path of a child array.
    pub fn node_path(&self, name: &str) -> String {
        let prefix = self.node_prefix();
        if prefix.is_empty() {
            format!("/{}", name)
        } else {
            format!("/{}/{}", prefix, name)
        }
    }

    /// Node path of the store root group.
    pub fn root_path(&self) -> String {
        let prefix = self.node_prefix();
        if prefix.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", prefix)
        }
    }

    /// Open the underlying storage backend for read access.
    ///
    /// For S3 the async object store is wrapped in an async-to-sync adapter
    /// so the archive can be consumed through the synchronous zarrs API.
    pub fn build_storage(&self) -> Result<ReadableListableStorage> {
        match self {
            Location::Local(path) => {
                if !path.exists() {
                    return Err(AdapterError::not_found(path.display().to_string()));
                }
                let store = FilesystemStore::new(path).map_err(|e| {
                    AdapterError::access_denied(format!(
                        "failed to open {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(Arc::new(store))
            }
            Location::S3 {
                bucket, options, ..
            } => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(endpoint) = &options.endpoint {
                    builder = builder.with_endpoint(endpoint);
                    if endpoint.starts_with("http://") {
                        builder = builder.with_allow_http(true);
                    }
                }
                if let Some(region) = &options.region {
                    builder = builder.with_region(region);
                } else {
                    builder = builder.with_region("us-east-1");
                }
                if options.anonymous {
                    builder = builder.with_skip_signature(true);
                }
                let s3 = builder.build().map_err(|e| {
                    AdapterError::access_denied(format!("failed to create S3 client: {}", e))
                })?;
                let async_store = Arc::new(AsyncObjectStore::new(s3));
                let sync_store = AsyncToSyncStorageAdapter::new(async_store, TokioBlockOn);
                Ok(Arc::new(sync_store))
            }
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::S3 { bucket, prefix, .. } => {
                if prefix.is_empty() {
                    write!(f, "s3://{}", bucket)
                } else {
                    write!(f, "s3://{}/{}", bucket, prefix)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_path() {
        let loc = Location::parse("/data/radar.zarr", S3Options::default()).unwrap();
        assert!(matches!(loc, Location::Local(_)));
        assert_eq!(loc.node_path("time"), "/time");
        assert_eq!(loc.root_path(), "/");
    }

    #[test]
    fn test_parse_s3_uri() {
        let loc = Location::parse("s3://radar-archive/dk/composite.zarr", S3Options::default())
            .unwrap();
        match &loc {
            Location::S3 { bucket, prefix, .. } => {
                assert_eq!(bucket, "radar-archive");
                assert_eq!(prefix, "dk/composite.zarr");
            }
            other => panic!("expected S3 location, got {:?}", other),
        }
        assert_eq!(loc.node_path("time"), "/dk/composite.zarr/time");
        assert_eq!(loc.to_string(), "s3://radar-archive/dk/composite.zarr");
    }

    #[test]
    fn test_parse_rejects_empty_bucket() {
        assert!(Location::parse("s3:///key", S3Options::default()).is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_scheme() {
        let err = Location::parse("gs://bucket/key", S3Options::default()).unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedFormat(_)));
    }
}
