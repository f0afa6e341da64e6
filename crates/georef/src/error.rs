//! Error types for CRS interpretation.

use thiserror::Error;

/// Errors raised while parsing a CRS description or transforming through it.
#[derive(Error, Debug)]
pub enum GeorefError {
    /// The WKT string is syntactically malformed.
    #[error("malformed WKT: {0}")]
    Wkt(String),

    /// The CRS uses a projection this crate does not implement.
    #[error("unsupported projection: {0}")]
    UnsupportedProjection(String),

    /// A required projection parameter is absent.
    #[error("missing projection parameter: {0}")]
    MissingParameter(String),

    /// The transform produced a non-finite result.
    #[error("transform failed: {0}")]
    Transform(String),
}

/// Result type for georeferencing operations.
pub type Result<T> = std::result::Result<T, GeorefError>;
