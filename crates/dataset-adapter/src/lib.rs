//! Dataset adapter for chunked radar composite archives.
//!
//! This crate provides uniform, read-only access to the structural metadata
//! of a Zarr archive (v2 or v3, local filesystem or S3-compatible object
//! storage) without materializing the data variable:
//!
//! - **One open, pure reads**: the archive is opened once; every accessor
//!   afterwards is total — absent attributes are represented, not raised.
//! - **Lazy time axis**: the time coordinate is sliced chunk-by-chunk, so a
//!   multi-year sub-hourly axis never has to be resident in full.
//! - **Frame reads**: single-timestep 2D slices for mask construction.
//!
//! The [`Dataset`] trait is the seam consumed by the validation engine;
//! [`ZarrDataset`] is the production implementation.

pub mod dataset;
pub mod error;
pub mod location;
pub mod time;
pub mod types;
pub mod zarr;

pub use dataset::Dataset;
pub use error::{AdapterError, Result};
pub use location::{Location, S3Options};
pub use time::TimeEncoding;
pub use types::{Dimension, Frame, ScalarType, VariableMeta, ZarrFormat};
pub use zarr::ZarrDataset;
