//! Structural metadata types exposed by the adapter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named dimension with its size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub size: u64,
}

/// Element type of an array, reduced to what the validator cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Float16,
    Float32,
    Float64,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Other(String),
}

impl ScalarType {
    /// Whether this is one of the floating-point types.
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            ScalarType::Float16 | ScalarType::Float32 | ScalarType::Float64
        )
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScalarType::Float16 => "float16",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::UInt32 => "uint32",
            ScalarType::UInt64 => "uint64",
            ScalarType::Other(name) => name,
        };
        write!(f, "{}", s)
    }
}

/// Metadata for one array in the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableMeta {
    pub name: String,
    /// Dimension names in storage order (empty when the store carries none).
    pub dims: Vec<String>,
    pub shape: Vec<u64>,
    pub dtype: ScalarType,
    /// Regular chunk shape, when the chunk grid exposes one.
    pub chunk_shape: Option<Vec<u64>>,
    /// Variable attributes.
    pub attrs: serde_json::Map<String, serde_json::Value>,
    /// Codec/compressor names applied to this array, outermost first.
    pub codecs: Vec<String>,
}

impl VariableMeta {
    /// String attribute lookup, trimmed.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_str()).map(str::trim)
    }
}

/// A single-timestep 2D slice of the data variable.
#[derive(Debug, Clone)]
pub struct Frame {
    pub height: usize,
    pub width: usize,
    /// Row-major values, `height * width` long.
    pub data: Vec<f32>,
    /// Fill value of the source array, when it is a finite float.
    pub fill_value: Option<f32>,
}

impl Frame {
    /// A pixel is valid when it is finite and not the fill value.
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        let v = self.data[row * self.width + col];
        if !v.is_finite() {
            return false;
        }
        match self.fill_value {
            Some(fill) => v != fill,
            None => true,
        }
    }
}

/// Storage format of the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZarrFormat {
    /// Zarr specification version (2 or 3).
    pub version: u8,
    /// Whether consolidated metadata is present (meaningful for v2).
    pub consolidated: bool,
}
