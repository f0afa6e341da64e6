//! Zarr-backed implementation of the [`Dataset`] trait.
//!
//! Opens a Zarr v2/v3 store once, extracts structural metadata for every
//! member array, and serves all later reads through chunk-granular
//! retrievals so large axes never have to be materialized in full.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument};
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs::group::Group;
use zarrs::storage::ReadableListableStorage;
use zarrs_storage::{
    ListableStorageTraits, ReadableListableStorageTraits, ReadableStorageTraits, StoreKey,
    StorePrefix,
};

use crate::dataset::Dataset;
use crate::error::{AdapterError, Result};
use crate::location::Location;
use crate::time::TimeEncoding;
use crate::types::{Dimension, Frame, ScalarType, VariableMeta, ZarrFormat};

type DynArray = Array<dyn ReadableListableStorageTraits>;

/// An opened Zarr archive.
///
/// Immutable once constructed; all accessors are read-only and safe to call
/// concurrently. Owned exclusively by the validation run that opened it.
pub struct ZarrDataset {
    location: Location,
    format: ZarrFormat,
    global_attrs: serde_json::Map<String, Value>,
    variables: BTreeMap<String, VariableMeta>,
    arrays: BTreeMap<String, DynArray>,
    dimensions: Vec<Dimension>,
    time_encoding: Option<TimeEncoding>,
}

impl std::fmt::Debug for ZarrDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZarrDataset")
            .field("location", &self.location)
            .field("format", &self.format)
            .field("global_attrs", &self.global_attrs)
            .field("variables", &self.variables)
            .field("arrays", &self.arrays.keys().collect::<Vec<_>>())
            .field("dimensions", &self.dimensions)
            .field("time_encoding", &self.time_encoding)
            .finish()
    }
}

impl ZarrDataset {
    /// Open an archive at `location`.
    ///
    /// Fails with a classified [`AdapterError`]; no partial adapter is ever
    /// returned.
    #[instrument(skip_all, fields(location = %location))]
    pub fn open(location: Location) -> Result<Self> {
        let storage = location.build_storage()?;
        let format = probe_format(&storage, &location)?;
        debug!(version = format.version, consolidated = format.consolidated, "Detected Zarr format");

        let global_attrs = read_global_attrs(&storage, &location)?;

        let mut variables = BTreeMap::new();
        let mut arrays = BTreeMap::new();
        for name in list_children(&storage, &location)? {
            let path = location.node_path(&name);
            let array = match Array::open(storage.clone(), &path) {
                Ok(array) => array,
                // Non-array children (subgroups) are not part of this
                // archive's data model; skip them.
                Err(_) => continue,
            };
            let meta = extract_variable_meta(&name, &array)?;
            variables.insert(name.clone(), meta);
            arrays.insert(name, array);
        }

        if variables.is_empty() {
            return Err(AdapterError::corrupt(format!(
                "archive at {} contains no readable arrays",
                location
            )));
        }

        let dimensions = collect_dimensions(&variables);
        let time_encoding = variables
            .get("time")
            .and_then(|meta| meta.attr_str("units"))
            .and_then(|units| TimeEncoding::parse(units).ok());

        debug!(
            variables = variables.len(),
            dimensions = dimensions.len(),
            "Opened archive"
        );

        Ok(Self {
            location,
            format,
            global_attrs,
            variables,
            arrays,
            dimensions,
            time_encoding,
        })
    }

    fn array(&self, name: &str) -> Result<&DynArray> {
        self.arrays
            .get(name)
            .ok_or_else(|| AdapterError::not_found(format!("no array named '{}'", name)))
    }
}

impl Dataset for ZarrDataset {
    fn location(&self) -> String {
        self.location.to_string()
    }

    fn dimensions(&self) -> Vec<Dimension> {
        self.dimensions.clone()
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    fn data_variable_names(&self) -> Vec<String> {
        let grid_mapping_targets: BTreeSet<String> = self
            .variables
            .values()
            .filter_map(|meta| meta.attr_str("grid_mapping"))
            .map(str::to_string)
            .collect();

        self.variables
            .values()
            .filter(|meta| !grid_mapping_targets.contains(&meta.name))
            .filter(|meta| meta.shape.len() >= 2)
            .filter(|meta| {
                // 1-D arrays named after their own dimension are coordinates;
                // 2-D latitude/longitude arrays are auxiliary coordinates.
                !matches!(
                    meta.attr_str("standard_name"),
                    Some("latitude") | Some("longitude")
                )
            })
            .filter(|meta| !matches!(meta.name.as_str(), "lat" | "lon" | "latitude" | "longitude"))
            .map(|meta| meta.name.clone())
            .collect()
    }

    fn variable(&self, name: &str) -> Option<VariableMeta> {
        self.variables.get(name).cloned()
    }

    fn global_attributes(&self) -> serde_json::Map<String, Value> {
        self.global_attrs.clone()
    }

    fn time_len(&self) -> u64 {
        self.variables
            .get("time")
            .and_then(|meta| meta.shape.first().copied())
            .unwrap_or(0)
    }

    fn time_slice(&self, range: Range<u64>) -> Result<Vec<DateTime<Utc>>> {
        let array = self.array("time")?;
        let len = self.time_len();
        if range.end > len || range.start > range.end {
            return Err(AdapterError::corrupt(format!(
                "time slice {:?} out of bounds for axis of length {}",
                range, len
            )));
        }
        let encoding = self.time_encoding.ok_or_else(|| {
            AdapterError::corrupt("time coordinate has no parseable CF 'units' attribute")
        })?;

        let subset = subset_1d(range.start, range.end - range.start)?;
        let raw: Vec<i64> = match self.variables["time"].dtype {
            ScalarType::Int64 => array
                .retrieve_array_subset_elements::<i64>(&subset)
                .map_err(read_err)?,
            ScalarType::Int32 => array
                .retrieve_array_subset_elements::<i32>(&subset)
                .map_err(read_err)?
                .into_iter()
                .map(i64::from)
                .collect(),
            ScalarType::UInt64 => array
                .retrieve_array_subset_elements::<u64>(&subset)
                .map_err(read_err)?
                .into_iter()
                .map(|v| v as i64)
                .collect(),
            ScalarType::Float64 => array
                .retrieve_array_subset_elements::<f64>(&subset)
                .map_err(read_err)?
                .into_iter()
                .map(|v| v as i64)
                .collect(),
            ref other => {
                return Err(AdapterError::unsupported(format!(
                    "time coordinate dtype {} is not supported",
                    other
                )))
            }
        };
        Ok(raw.into_iter().map(|v| encoding.decode(v)).collect())
    }

    fn coord_values(&self, name: &str) -> Result<Vec<f64>> {
        let meta = self
            .variables
            .get(name)
            .ok_or_else(|| AdapterError::not_found(format!("no coordinate named '{}'", name)))?;
        if meta.shape.len() != 1 {
            return Err(AdapterError::corrupt(format!(
                "coordinate '{}' is not 1-D (shape {:?})",
                name, meta.shape
            )));
        }
        let array = self.array(name)?;
        let subset = subset_1d(0, meta.shape[0])?;
        let values = match meta.dtype {
            ScalarType::Float64 => array
                .retrieve_array_subset_elements::<f64>(&subset)
                .map_err(read_err)?,
            ScalarType::Float32 => array
                .retrieve_array_subset_elements::<f32>(&subset)
                .map_err(read_err)?
                .into_iter()
                .map(f64::from)
                .collect(),
            ScalarType::Int64 => array
                .retrieve_array_subset_elements::<i64>(&subset)
                .map_err(read_err)?
                .into_iter()
                .map(|v| v as f64)
                .collect(),
            ScalarType::Int32 => array
                .retrieve_array_subset_elements::<i32>(&subset)
                .map_err(read_err)?
                .into_iter()
                .map(f64::from)
                .collect(),
            ref other => {
                return Err(AdapterError::unsupported(format!(
                    "coordinate '{}' dtype {} is not supported",
                    name, other
                )))
            }
        };
        Ok(values)
    }

    fn read_frame(&self, variable: &str, time_index: u64) -> Result<Frame> {
        let meta = self
            .variables
            .get(variable)
            .ok_or_else(|| AdapterError::not_found(format!("no variable named '{}'", variable)))?;
        if meta.shape.len() != 3 {
            return Err(AdapterError::corrupt(format!(
                "variable '{}' is not (time, y, x) (shape {:?})",
                variable, meta.shape
            )));
        }
        let (height, width) = (meta.shape[1] as usize, meta.shape[2] as usize);
        let array = self.array(variable)?;
        let subset = ArraySubset::new_with_start_shape(
            vec![time_index, 0, 0],
            vec![1, height as u64, width as u64],
        )
        .map_err(|e| AdapterError::corrupt(e.to_string()))?;

        let data: Vec<f32> = match meta.dtype {
            ScalarType::Float32 => array
                .retrieve_array_subset_elements::<f32>(&subset)
                .map_err(read_err)?,
            ScalarType::Float64 => array
                .retrieve_array_subset_elements::<f64>(&subset)
                .map_err(read_err)?
                .into_iter()
                .map(|v| v as f32)
                .collect(),
            ScalarType::Float16 => {
                let bytes = array
                    .retrieve_array_subset(&subset)
                    .map_err(read_err)?
                    .into_fixed()
                    .map_err(|e| AdapterError::corrupt(e.to_string()))?;
                bytes
                    .chunks_exact(2)
                    .map(|pair| f16_bits_to_f32(u16::from_le_bytes([pair[0], pair[1]])))
                    .collect()
            }
            ref other => {
                return Err(AdapterError::unsupported(format!(
                    "variable '{}' dtype {} is not a supported float type",
                    variable, other
                )))
            }
        };

        let fill_value = fill_value_f32(array, &meta.dtype).filter(|v| v.is_finite());
        Ok(Frame {
            height,
            width,
            data,
            fill_value,
        })
    }

    fn zarr_format(&self) -> ZarrFormat {
        self.format
    }
}

/// Build a 1-D array subset.
fn subset_1d(start: u64, len: u64) -> Result<ArraySubset> {
    ArraySubset::new_with_start_shape(vec![start], vec![len])
        .map_err(|e| AdapterError::corrupt(e.to_string()))
}

fn read_err(err: impl std::fmt::Display) -> AdapterError {
    AdapterError::corrupt(format!("read failed: {}", err))
}

/// Classify a raw storage error message into an adapter error kind.
fn classify_storage_error(err: impl std::fmt::Display) -> AdapterError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("not found") || lower.contains("404") {
        AdapterError::NotFound(msg)
    } else if lower.contains("403")
        || lower.contains("401")
        || lower.contains("forbidden")
        || lower.contains("access denied")
        || lower.contains("credential")
    {
        AdapterError::AccessDenied(msg)
    } else {
        AdapterError::Corrupt(msg)
    }
}

/// Probe raw store keys to detect the Zarr format version.
fn probe_format(storage: &ReadableListableStorage, location: &Location) -> Result<ZarrFormat> {
    let key = |name: &str| -> Result<StoreKey> {
        let prefix = location.node_prefix();
        let raw = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        };
        StoreKey::new(&raw).map_err(|e| AdapterError::corrupt(e.to_string()))
    };
    let fetch = |name: &str| -> Result<Option<bytes::Bytes>> {
        storage.get(&key(name)?).map_err(classify_storage_error)
    };

    if let Some(root) = fetch("zarr.json")? {
        let consolidated = serde_json::from_slice::<Value>(&root)
            .ok()
            .and_then(|v| v.get("consolidated_metadata").cloned())
            .map(|v| !v.is_null())
            .unwrap_or(false);
        return Ok(ZarrFormat {
            version: 3,
            consolidated,
        });
    }
    if fetch(".zgroup")?.is_some() || fetch(".zarray")?.is_some() {
        let consolidated = fetch(".zmetadata")?.is_some();
        return Ok(ZarrFormat {
            version: 2,
            consolidated,
        });
    }
    Err(AdapterError::unsupported(format!(
        "no Zarr v2/v3 metadata found at {}",
        location
    )))
}

/// Read group-level attributes, tolerating stores without a root group.
fn read_global_attrs(
    storage: &ReadableListableStorage,
    location: &Location,
) -> Result<serde_json::Map<String, Value>> {
    match Group::open(storage.clone(), &location.root_path()) {
        Ok(group) => Ok(group.attributes().clone()),
        Err(err) => {
            debug!(error = %err, "Root group open failed; falling back to raw .zattrs");
            let prefix = location.node_prefix();
            let raw = if prefix.is_empty() {
                ".zattrs".to_string()
            } else {
                format!("{}/.zattrs", prefix)
            };
            let key = StoreKey::new(&raw).map_err(|e| AdapterError::corrupt(e.to_string()))?;
            match storage.get(&key).map_err(classify_storage_error)? {
                Some(bytes) => serde_json::from_slice(&bytes)
                    .map_err(|e| AdapterError::corrupt(format!("invalid .zattrs: {}", e))),
                None => Ok(serde_json::Map::new()),
            }
        }
    }
}

/// List immediate children of the store root.
fn list_children(
    storage: &ReadableListableStorage,
    location: &Location,
) -> Result<Vec<String>> {
    let prefix = location.node_prefix();
    let root = if prefix.is_empty() {
        StorePrefix::root()
    } else {
        StorePrefix::new(&format!("{}/", prefix))
            .map_err(|e| AdapterError::corrupt(e.to_string()))?
    };
    let listing = storage.list_dir(&root).map_err(classify_storage_error)?;
    let mut names = Vec::new();
    for child in listing.prefixes() {
        let name = child
            .as_str()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string();
        if !name.is_empty() && !name.starts_with('.') {
            names.push(name);
        }
    }
    Ok(names)
}

/// Build the metadata record for one member array.
fn extract_variable_meta(name: &str, array: &DynArray) -> Result<VariableMeta> {
    let shape = array.shape().to_vec();
    let attrs = array.attributes().clone();
    let dtype = scalar_type(array);

    // A single JSON view of the array metadata serves both dimension names
    // (v3 `dimension_names`, v2 xarray `_ARRAY_DIMENSIONS`) and codec names.
    let metadata_json = serde_json::to_value(array.metadata())
        .map_err(|e| AdapterError::corrupt(format!("unencodable metadata for '{}': {}", name, e)))?;

    let dims = dimension_names(&metadata_json, &attrs, shape.len());
    let codecs = codec_names(&metadata_json);

    let origin = vec![0u64; shape.len()];
    let chunk_shape = array
        .chunk_grid()
        .chunk_shape(&origin, array.shape())
        .ok()
        .flatten()
        .map(|chunk| chunk.iter().map(|d| d.get()).collect());

    Ok(VariableMeta {
        name: name.to_string(),
        dims,
        shape,
        dtype,
        chunk_shape,
        attrs,
        codecs,
    })
}

fn scalar_type(array: &DynArray) -> ScalarType {
    use zarrs::array::DataType;
    match array.data_type() {
        DataType::Float16 => ScalarType::Float16,
        DataType::Float32 => ScalarType::Float32,
        DataType::Float64 => ScalarType::Float64,
        DataType::Int32 => ScalarType::Int32,
        DataType::Int64 => ScalarType::Int64,
        DataType::UInt32 => ScalarType::UInt32,
        DataType::UInt64 => ScalarType::UInt64,
        other => ScalarType::Other(format!("{:?}", other).to_lowercase()),
    }
}

/// Dimension names from array metadata, falling back to the xarray
/// convention and finally to positional names.
fn dimension_names(
    metadata: &Value,
    attrs: &serde_json::Map<String, Value>,
    ndim: usize,
) -> Vec<String> {
    let from_list = |v: &Value| -> Option<Vec<String>> {
        let list = v.as_array()?;
        let names: Vec<String> = list
            .iter()
            .map(|item| item.as_str().unwrap_or("").to_string())
            .collect();
        (names.len() == ndim && names.iter().all(|n| !n.is_empty())).then_some(names)
    };

    if let Some(names) = metadata.get("dimension_names").and_then(from_list) {
        return names;
    }
    if let Some(names) = attrs.get("_ARRAY_DIMENSIONS").and_then(from_list) {
        return names;
    }
    (0..ndim).map(|i| format!("dim_{}", i)).collect()
}

/// Codec/compressor names from array metadata (v3 codec chain or v2
/// compressor), outermost first.
fn codec_names(metadata: &Value) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(codecs) = metadata.get("codecs").and_then(Value::as_array) {
        for codec in codecs {
            if let Some(name) = codec.get("name").and_then(Value::as_str) {
                names.push(name.to_string());
            }
        }
    }
    if let Some(compressor) = metadata.get("compressor") {
        if let Some(id) = compressor.get("id").and_then(Value::as_str) {
            names.push(id.to_string());
        }
        if let Some(cname) = compressor.get("cname").and_then(Value::as_str) {
            names.push(cname.to_string());
        }
    }
    names
}

/// Union of dimensions across variables, in first-seen order with 3-D
/// variables (the data layout) taking precedence.
fn collect_dimensions(variables: &BTreeMap<String, VariableMeta>) -> Vec<Dimension> {
    let mut seen = BTreeSet::new();
    let mut dims = Vec::new();
    let mut add_from = |meta: &VariableMeta| {
        for (dim, size) in meta.dims.iter().zip(meta.shape.iter()) {
            if seen.insert(dim.clone()) {
                dims.push(Dimension {
                    name: dim.clone(),
                    size: *size,
                });
            }
        }
    };
    for meta in variables.values().filter(|m| m.shape.len() >= 3) {
        add_from(meta);
    }
    for meta in variables.values().filter(|m| m.shape.len() < 3) {
        add_from(meta);
    }
    dims
}

/// Decode the array fill value as f32, following the element width.
fn fill_value_f32(array: &DynArray, dtype: &ScalarType) -> Option<f32> {
    let bytes = array.fill_value().as_ne_bytes();
    match dtype {
        ScalarType::Float32 => bytes.try_into().map(f32::from_ne_bytes).ok(),
        ScalarType::Float64 => bytes
            .try_into()
            .map(f64::from_ne_bytes)
            .map(|v| v as f32)
            .ok(),
        ScalarType::Float16 => bytes
            .try_into()
            .map(u16::from_ne_bytes)
            .map(f16_bits_to_f32)
            .ok(),
        _ => None,
    }
}

/// IEEE 754 binary16 to binary32 conversion.
fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = u32::from(bits >> 15);
    let exp = u32::from((bits >> 10) & 0x1f);
    let frac = u32::from(bits & 0x3ff);

    let out = if exp == 0 {
        if frac == 0 {
            sign << 31
        } else {
            // Subnormal: renormalize into the f32 exponent range.
            let mut exp32: i32 = 113;
            let mut frac32 = frac;
            while frac32 & 0x400 == 0 {
                frac32 <<= 1;
                exp32 -= 1;
            }
            (sign << 31) | ((exp32 as u32) << 23) | ((frac32 & 0x3ff) << 13)
        }
    } else if exp == 0x1f {
        (sign << 31) | (0xff << 23) | (frac << 13)
    } else {
        (sign << 31) | ((exp + 112) << 23) | (frac << 13)
    };
    f32::from_bits(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f16_conversion() {
        assert_eq!(f16_bits_to_f32(0x3c00), 1.0);
        assert_eq!(f16_bits_to_f32(0xc000), -2.0);
        assert_eq!(f16_bits_to_f32(0x0000), 0.0);
        assert!(f16_bits_to_f32(0x7e00).is_nan());
        assert_eq!(f16_bits_to_f32(0x7c00), f32::INFINITY);
    }

    #[test]
    fn test_dimension_names_fallbacks() {
        let md = serde_json::json!({"dimension_names": ["time", "y", "x"]});
        let attrs = serde_json::Map::new();
        assert_eq!(dimension_names(&md, &attrs, 3), vec!["time", "y", "x"]);

        let md = serde_json::json!({});
        let mut attrs = serde_json::Map::new();
        attrs.insert(
            "_ARRAY_DIMENSIONS".to_string(),
            serde_json::json!(["time", "y", "x"]),
        );
        assert_eq!(dimension_names(&md, &attrs, 3), vec!["time", "y", "x"]);

        let empty = serde_json::Map::new();
        assert_eq!(dimension_names(&md, &empty, 2), vec!["dim_0", "dim_1"]);
    }

    #[test]
    fn test_codec_names_v2_and_v3() {
        let v3 = serde_json::json!({"codecs": [{"name": "bytes"}, {"name": "zstd"}]});
        assert_eq!(codec_names(&v3), vec!["bytes", "zstd"]);

        let v2 = serde_json::json!({"compressor": {"id": "blosc", "cname": "zstd"}});
        assert_eq!(codec_names(&v2), vec!["blosc", "zstd"]);
    }

    #[test]
    fn test_classify_storage_error() {
        assert!(matches!(
            classify_storage_error("object not found"),
            AdapterError::NotFound(_)
        ));
        assert!(matches!(
            classify_storage_error("HTTP 403 Forbidden"),
            AdapterError::AccessDenied(_)
        ));
        assert!(matches!(
            classify_storage_error("truncated chunk"),
            AdapterError::Corrupt(_)
        ));
    }
}
