//! In-memory [`Dataset`] implementation for engine tests.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use dataset_adapter::{
    AdapterError, Dataset, Dimension, Frame, Result, ScalarType, VariableMeta, ZarrFormat,
};

use crate::generators::{masked_frame, regular_times};

/// A fully in-memory dataset with public fields so tests can bend any part
/// of it into shape.
#[derive(Clone)]
pub struct MockDataset {
    pub location: String,
    pub global_attrs: serde_json::Map<String, Value>,
    pub variables: BTreeMap<String, VariableMeta>,
    pub data_vars: Vec<String>,
    pub coords: BTreeMap<String, Vec<f64>>,
    pub times: Vec<DateTime<Utc>>,
    /// Per-timestep frames of the data variable; when a timestep has no
    /// entry, `default_frame` is served instead.
    pub frames: BTreeMap<u64, Vec<f32>>,
    pub default_frame: Vec<f32>,
    pub height: usize,
    pub width: usize,
    pub format: ZarrFormat,
}

impl MockDataset {
    /// A radar archive that satisfies every v1.0 rule: 4 years of regular
    /// daily coverage, 1 km grid, correct chunking, zstd compression, CF
    /// attributes, CC-BY license and a fully valid 32x32 sensing area.
    pub fn radar_default() -> Self {
        let height = 32;
        let width = 32;
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let times = regular_times(start, Duration::days(1), 1462);

        let mut variables = BTreeMap::new();
        let mut coords = BTreeMap::new();

        let x: Vec<f64> = (0..width).map(|i| -200_000.0 + i as f64 * 1000.0).collect();
        let y: Vec<f64> = (0..height)
            .map(|i| -3_800_000.0 - i as f64 * 1000.0)
            .collect();
        variables.insert("x".to_string(), coord_meta("x", width, "projection_x_coordinate"));
        variables.insert("y".to_string(), coord_meta("y", height, "projection_y_coordinate"));
        coords.insert("x".to_string(), x);
        coords.insert("y".to_string(), y);

        let mut time_attrs = serde_json::Map::new();
        time_attrs.insert("units".into(), "seconds since 1970-01-01".into());
        time_attrs.insert("standard_name".into(), "time".into());
        variables.insert(
            "time".to_string(),
            VariableMeta {
                name: "time".to_string(),
                dims: vec!["time".to_string()],
                shape: vec![times.len() as u64],
                dtype: ScalarType::Int64,
                chunk_shape: Some(vec![times.len() as u64]),
                attrs: time_attrs,
                codecs: vec!["lz4".to_string()],
            },
        );

        let mut crs_attrs = serde_json::Map::new();
        crs_attrs.insert("crs_wkt".into(), Value::String(Self::stereo_wkt()));
        crs_attrs.insert("spatial_ref".into(), Value::String(Self::stereo_wkt()));
        for (k, v) in [
            ("grid_mapping_name", Value::String("polar_stereographic".into())),
            ("straight_vertical_longitude_from_pole", 10.5666.into()),
            ("latitude_of_projection_origin", 90.0.into()),
            ("standard_parallel", 56.0.into()),
            ("earth_radius", 6371229.0.into()),
        ] {
            crs_attrs.insert(k.to_string(), v);
        }
        variables.insert(
            "crs".to_string(),
            VariableMeta {
                name: "crs".to_string(),
                dims: vec![],
                shape: vec![],
                dtype: ScalarType::Int32,
                chunk_shape: None,
                attrs: crs_attrs,
                codecs: vec![],
            },
        );

        let mut precip_attrs = serde_json::Map::new();
        for (k, v) in [
            ("standard_name", "rainfall_flux"),
            ("long_name", "surface rainfall rate"),
            ("units", "mm/h"),
            ("grid_mapping", "crs"),
        ] {
            precip_attrs.insert(k.to_string(), Value::String(v.to_string()));
        }
        variables.insert(
            "precip".to_string(),
            VariableMeta {
                name: "precip".to_string(),
                dims: vec!["time".to_string(), "y".to_string(), "x".to_string()],
                shape: vec![times.len() as u64, height as u64, width as u64],
                dtype: ScalarType::Float32,
                chunk_shape: Some(vec![1, height as u64, width as u64]),
                attrs: precip_attrs,
                codecs: vec!["bytes".to_string(), "zstd".to_string()],
            },
        );

        let mut global_attrs = serde_json::Map::new();
        global_attrs.insert("license".into(), "CC-BY-4.0".into());

        Self {
            location: "mem://radar".to_string(),
            global_attrs,
            variables,
            data_vars: vec!["precip".to_string()],
            coords,
            times,
            frames: BTreeMap::new(),
            default_frame: masked_frame(height, width, (0, 0, height, width)),
            height,
            width,
            format: ZarrFormat {
                version: 3,
                consolidated: false,
            },
        }
    }

    /// The WKT matching the CF grid-mapping attributes of
    /// [`MockDataset::radar_default`].
    pub fn stereo_wkt() -> String {
        concat!(
            "PROJCS[\"radar stereographic\",",
            "GEOGCS[\"sphere\",DATUM[\"sphere\",SPHEROID[\"sphere\",6371229,0]],",
            "PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]],",
            "PROJECTION[\"Polar_Stereographic\"],",
            "PARAMETER[\"latitude_of_origin\",56],",
            "PARAMETER[\"central_meridian\",10.5666],",
            "PARAMETER[\"false_easting\",0],",
            "PARAMETER[\"false_northing\",0],",
            "UNIT[\"metre\",1]]"
        )
        .to_string()
    }

    /// Resize the spatial grid, keeping 1 km spacing and rebuilding the
    /// coordinate arrays, shapes and default frame.
    pub fn with_grid(mut self, height: usize, width: usize) -> Self {
        self.height = height;
        self.width = width;
        self.coords.insert(
            "x".to_string(),
            (0..width).map(|i| -200_000.0 + i as f64 * 1000.0).collect(),
        );
        self.coords.insert(
            "y".to_string(),
            (0..height)
                .map(|i| -3_800_000.0 - i as f64 * 1000.0)
                .collect(),
        );
        if let Some(meta) = self.variables.get_mut("x") {
            meta.shape = vec![width as u64];
            meta.chunk_shape = Some(vec![width as u64]);
        }
        if let Some(meta) = self.variables.get_mut("y") {
            meta.shape = vec![height as u64];
            meta.chunk_shape = Some(vec![height as u64]);
        }
        if let Some(meta) = self.variables.get_mut("precip") {
            meta.shape = vec![self.times.len() as u64, height as u64, width as u64];
            meta.chunk_shape = Some(vec![1, height as u64, width as u64]);
        }
        self.frames.clear();
        self.default_frame = masked_frame(height, width, (0, 0, height, width));
        self
    }

    /// Replace the time axis.
    pub fn with_times(mut self, times: Vec<DateTime<Utc>>) -> Self {
        self.times = times;
        if let Some(meta) = self.variables.get_mut("time") {
            meta.shape = vec![self.times.len() as u64];
        }
        if let Some(meta) = self.variables.get_mut("precip") {
            meta.shape[0] = self.times.len() as u64;
        }
        self
    }

    /// Serve the same mask for every timestep.
    pub fn with_default_frame(mut self, frame: Vec<f32>) -> Self {
        self.default_frame = frame;
        self
    }

    /// Override the frame of one timestep.
    pub fn with_frame_at(mut self, t: u64, frame: Vec<f32>) -> Self {
        self.frames.insert(t, frame);
        self
    }

    /// Set one global attribute.
    pub fn with_global_attr(mut self, key: &str, value: Value) -> Self {
        self.global_attrs.insert(key.to_string(), value);
        self
    }

    /// Mutate the metadata of one variable in place.
    pub fn edit_variable(mut self, name: &str, edit: impl FnOnce(&mut VariableMeta)) -> Self {
        if let Some(meta) = self.variables.get_mut(name) {
            edit(meta);
        }
        self
    }
}

fn coord_meta(name: &str, len: usize, standard_name: &str) -> VariableMeta {
    let mut attrs = serde_json::Map::new();
    attrs.insert("standard_name".into(), standard_name.into());
    attrs.insert("units".into(), "m".into());
    attrs.insert("axis".into(), name.to_uppercase().into());
    VariableMeta {
        name: name.to_string(),
        dims: vec![name.to_string()],
        shape: vec![len as u64],
        dtype: ScalarType::Float64,
        chunk_shape: Some(vec![len as u64]),
        attrs,
        codecs: vec!["lz4".to_string()],
    }
}

impl Dataset for MockDataset {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn dimensions(&self) -> Vec<Dimension> {
        vec![
            Dimension {
                name: "time".to_string(),
                size: self.times.len() as u64,
            },
            Dimension {
                name: "y".to_string(),
                size: self.height as u64,
            },
            Dimension {
                name: "x".to_string(),
                size: self.width as u64,
            },
        ]
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    fn data_variable_names(&self) -> Vec<String> {
        self.data_vars.clone()
    }

    fn variable(&self, name: &str) -> Option<VariableMeta> {
        self.variables.get(name).cloned()
    }

    fn global_attributes(&self) -> serde_json::Map<String, Value> {
        self.global_attrs.clone()
    }

    fn time_len(&self) -> u64 {
        self.times.len() as u64
    }

    fn time_slice(&self, range: Range<u64>) -> Result<Vec<DateTime<Utc>>> {
        let len = self.times.len() as u64;
        if range.end > len || range.start > range.end {
            return Err(AdapterError::corrupt(format!(
                "time slice {:?} out of bounds for axis of length {}",
                range, len
            )));
        }
        Ok(self.times[range.start as usize..range.end as usize].to_vec())
    }

    fn coord_values(&self, name: &str) -> Result<Vec<f64>> {
        self.coords
            .get(name)
            .cloned()
            .ok_or_else(|| AdapterError::not_found(format!("no coordinate named '{}'", name)))
    }

    fn read_frame(&self, variable: &str, time_index: u64) -> Result<Frame> {
        if !self.variables.contains_key(variable) {
            return Err(AdapterError::not_found(format!(
                "no variable named '{}'",
                variable
            )));
        }
        if time_index >= self.times.len() as u64 {
            return Err(AdapterError::corrupt(format!(
                "time index {} out of bounds",
                time_index
            )));
        }
        let data = self
            .frames
            .get(&time_index)
            .unwrap_or(&self.default_frame)
            .clone();
        Ok(Frame {
            height: self.height,
            width: self.width,
            data,
            fill_value: None,
        })
    }

    fn zarr_format(&self) -> ZarrFormat {
        self.format
    }
}
