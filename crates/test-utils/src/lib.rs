//! Common test fixtures for radar-archive-validator tests.
//!
//! Provides an in-memory [`MockDataset`] for engine-level tests and an
//! on-disk Zarr v2 fixture writer for adapter/probe integration tests.

pub mod generators;
pub mod mock;
pub mod zarr_fixture;

pub use generators::{masked_frame, nan_frame, regular_times};
pub use mock::MockDataset;
pub use zarr_fixture::{write_radar_store, StoreConfig};
