//! On-disk Zarr v2 fixture archives.
//!
//! Writes a minimal uncompressed store by hand (group/array metadata plus
//! raw little-endian chunks) so integration tests exercise the real read
//! path without needing a Zarr writer.

use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};

use crate::mock::MockDataset;

/// Shape and content knobs of a fixture archive.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub n_time: usize,
    pub start: DateTime<Utc>,
    pub step_seconds: i64,
    pub height: usize,
    pub width: usize,
    /// Coordinate spacing in meters.
    pub resolution_m: f64,
    pub license: String,
    /// Chunk shape of the data variable.
    pub chunks: (usize, usize, usize),
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            n_time: 40,
            start: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            // 30-day cadence: 40 steps span ~3.2 years
            step_seconds: 30 * 24 * 3600,
            height: 16,
            width: 16,
            resolution_m: 1000.0,
            license: "CC-BY-4.0".to_string(),
            chunks: (1, 16, 16),
        }
    }
}

fn write_json(path: &Path, value: serde_json::Value) {
    fs::write(path, serde_json::to_vec_pretty(&value).expect("serializable"))
        .expect("fixture write");
}

/// Write a radar composite archive at `root` that satisfies the v1.0
/// acceptance rules apart from compression (chunks are stored raw).
pub fn write_radar_store(root: &Path, config: &StoreConfig) {
    fs::create_dir_all(root).expect("fixture root");
    write_json(&root.join(".zgroup"), serde_json::json!({"zarr_format": 2}));
    write_json(
        &root.join(".zattrs"),
        serde_json::json!({"license": config.license}),
    );
    // Consolidated-metadata stub; the validator only probes for presence.
    write_json(
        &root.join(".zmetadata"),
        serde_json::json!({
            "zarr_consolidated_format": 1,
            "metadata": {".zgroup": {"zarr_format": 2}}
        }),
    );

    // time
    let time_dir = root.join("time");
    fs::create_dir_all(&time_dir).expect("time dir");
    write_json(
        &time_dir.join(".zarray"),
        serde_json::json!({
            "zarr_format": 2, "shape": [config.n_time], "chunks": [config.n_time],
            "dtype": "<i8", "compressor": null, "fill_value": 0,
            "order": "C", "filters": null
        }),
    );
    write_json(
        &time_dir.join(".zattrs"),
        serde_json::json!({
            "_ARRAY_DIMENSIONS": ["time"],
            "standard_name": "time",
            "units": "seconds since 1970-01-01T00:00:00Z"
        }),
    );
    let mut time_bytes = Vec::new();
    for i in 0..config.n_time {
        let t = config.start.timestamp() + i as i64 * config.step_seconds;
        time_bytes.extend_from_slice(&t.to_le_bytes());
    }
    fs::write(time_dir.join("0"), time_bytes).expect("time chunk");

    // x / y projected coordinates
    let axes: [(&str, usize, f64, f64); 2] = [
        ("x", config.width, -200_000.0, config.resolution_m),
        ("y", config.height, -3_800_000.0, -config.resolution_m),
    ];
    for (name, len, origin, step) in axes {
        let dir = root.join(name);
        fs::create_dir_all(&dir).expect("coord dir");
        write_json(
            &dir.join(".zarray"),
            serde_json::json!({
                "zarr_format": 2, "shape": [len], "chunks": [len], "dtype": "<f8",
                "compressor": null, "fill_value": "NaN", "order": "C", "filters": null
            }),
        );
        write_json(
            &dir.join(".zattrs"),
            serde_json::json!({
                "_ARRAY_DIMENSIONS": [name],
                "standard_name": format!("projection_{}_coordinate", name),
                "units": "m",
                "axis": name.to_uppercase()
            }),
        );
        let mut bytes = Vec::new();
        for i in 0..len {
            bytes.extend_from_slice(&(origin + i as f64 * step).to_le_bytes());
        }
        fs::write(dir.join("0"), bytes).expect("coord chunk");
    }

    // crs grid-mapping variable with matching WKT and CF attributes
    let crs_dir = root.join("crs");
    fs::create_dir_all(&crs_dir).expect("crs dir");
    write_json(
        &crs_dir.join(".zarray"),
        serde_json::json!({
            "zarr_format": 2, "shape": [1], "chunks": [1], "dtype": "<i4",
            "compressor": null, "fill_value": 0, "order": "C", "filters": null
        }),
    );
    write_json(
        &crs_dir.join(".zattrs"),
        serde_json::json!({
            "_ARRAY_DIMENSIONS": ["crs"],
            "crs_wkt": MockDataset::stereo_wkt(),
            "spatial_ref": MockDataset::stereo_wkt(),
            "grid_mapping_name": "polar_stereographic",
            "straight_vertical_longitude_from_pole": 10.5666,
            "latitude_of_projection_origin": 90.0,
            "standard_parallel": 56.0,
            "earth_radius": 6371229.0
        }),
    );
    fs::write(crs_dir.join("0"), 0i32.to_le_bytes()).expect("crs chunk");

    // precip data variable, fully valid sensing area
    let precip_dir = root.join("precip");
    fs::create_dir_all(&precip_dir).expect("precip dir");
    let (ct, cy, cx) = config.chunks;
    write_json(
        &precip_dir.join(".zarray"),
        serde_json::json!({
            "zarr_format": 2,
            "shape": [config.n_time, config.height, config.width],
            "chunks": [ct, cy, cx],
            "dtype": "<f4", "compressor": null, "fill_value": "NaN",
            "order": "C", "filters": null
        }),
    );
    write_json(
        &precip_dir.join(".zattrs"),
        serde_json::json!({
            "_ARRAY_DIMENSIONS": ["time", "y", "x"],
            "grid_mapping": "crs",
            "standard_name": "rainfall_flux",
            "long_name": "surface rainfall rate",
            "units": "mm/h"
        }),
    );
    let chunks_t = config.n_time.div_ceil(ct);
    let chunks_y = config.height.div_ceil(cy);
    let chunks_x = config.width.div_ceil(cx);
    for t in 0..chunks_t {
        for j in 0..chunks_y {
            for i in 0..chunks_x {
                let mut bytes = Vec::with_capacity(ct * cy * cx * 4);
                for _ in 0..(ct * cy * cx) {
                    bytes.extend_from_slice(&1.5f32.to_le_bytes());
                }
                fs::write(precip_dir.join(format!("{}.{}.{}", t, j, i)), bytes)
                    .expect("precip chunk");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let dir = std::env::temp_dir().join(format!(
            "radar-fixture-{}-{}",
            std::process::id(),
            line!()
        ));
        let _ = fs::remove_dir_all(&dir);
        write_radar_store(&dir, &StoreConfig::default());
        assert!(dir.join(".zgroup").exists());
        assert!(dir.join("precip/.zarray").exists());
        assert!(dir.join("precip/0.0.0").exists());
        assert!(dir.join("time/0").exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
