//! The capability trait consumed by the validation engine.

use std::ops::Range;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Dimension, Frame, VariableMeta, ZarrFormat};

/// Read-only view of an opened archive.
///
/// Accessors are pure and safe for concurrent use: the adapter is immutable
/// once open, and nothing here mutates the archive. Metadata access must not
/// require materializing the data variable; the time coordinate is exposed
/// through [`Dataset::time_slice`] so callers can sample or binary-search a
/// very large axis without loading it whole.
pub trait Dataset: Send + Sync {
    /// Location identifier the archive was opened from.
    fn location(&self) -> String;

    /// Ordered dimension names with sizes, as declared by the data variable
    /// layout (time first when present).
    fn dimensions(&self) -> Vec<Dimension>;

    /// Names of every array in the archive, coordinates included.
    fn variable_names(&self) -> Vec<String>;

    /// Names of the data variables: arrays that are neither coordinate
    /// arrays nor grid-mapping (CRS container) variables.
    fn data_variable_names(&self) -> Vec<String>;

    /// Metadata for one array, if it exists.
    fn variable(&self, name: &str) -> Option<VariableMeta>;

    /// Global (group-level) attributes.
    fn global_attributes(&self) -> serde_json::Map<String, serde_json::Value>;

    /// Length of the time coordinate (0 when there is none).
    fn time_len(&self) -> u64;

    /// Decoded timestamps for `range`, reading only the chunks it covers.
    fn time_slice(&self, range: Range<u64>) -> Result<Vec<DateTime<Utc>>>;

    /// Values of a 1-D coordinate array.
    fn coord_values(&self, name: &str) -> Result<Vec<f64>>;

    /// One 2D timestep slice of a data variable.
    fn read_frame(&self, variable: &str, time_index: u64) -> Result<Frame>;

    /// Detected storage format.
    fn zarr_format(&self) -> ZarrFormat;

    /// Global string attribute lookup, trimmed.
    fn global_attr_str(&self, key: &str) -> Option<String> {
        self.global_attributes()
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
    }
}
