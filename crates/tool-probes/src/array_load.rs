//! Array-loading probe.
//!
//! Opens the archive a second time through the general-purpose array-access
//! collaborator and reads a corner window of the data variable, proving the
//! store is consumable by plain `zarrs` without the adapter's help.

use async_trait::async_trait;
use tracing::debug;
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;

use crate::probe::{ProbeInput, ProbeReport, ToolProbe};

/// Edge length of the corner window the probe reads.
const SAMPLE_EDGE: u64 = 16;

/// Probe of the array-access collaborator.
#[derive(Debug, Default)]
pub struct ArrayLoadProbe;

#[async_trait]
impl ToolProbe for ArrayLoadProbe {
    fn tool(&self) -> &'static str {
        "array-load"
    }

    async fn run(&self, input: &ProbeInput) -> ProbeReport {
        let tool = self.tool();
        let variable = match &input.data_variable {
            Some(name) => name.clone(),
            None => return ProbeReport::failure(tool, "no data variable to load"),
        };
        let location = match &input.location {
            Some(location) => location,
            None => {
                return ProbeReport::failure(tool, "archive location is not re-openable")
            }
        };

        let storage = match location.build_storage() {
            Ok(storage) => storage,
            Err(err) => {
                return ProbeReport::failure(tool, format!("storage open failed: {}", err))
            }
        };

        let path = location.node_path(&variable);
        let array = match Array::open(storage, &path) {
            Ok(array) => array,
            Err(err) => {
                return ProbeReport::failure(
                    tool,
                    format!("failed to open array '{}': {}", variable, err),
                )
            }
        };

        let shape = array.shape().to_vec();
        if shape.len() != 3 {
            return ProbeReport::failure(
                tool,
                format!("array '{}' has shape {:?}, expected 3 dimensions", variable, shape),
            );
        }

        let window = vec![
            1,
            SAMPLE_EDGE.min(shape[1]),
            SAMPLE_EDGE.min(shape[2]),
        ];
        let subset = match ArraySubset::new_with_start_shape(vec![0, 0, 0], window.clone()) {
            Ok(subset) => subset,
            Err(err) => return ProbeReport::failure(tool, format!("bad subset: {}", err)),
        };

        match array.retrieve_array_subset(&subset) {
            Ok(_) => {
                debug!(variable = %variable, ?window, "Array-load probe read succeeded");
                ProbeReport::success(
                    tool,
                    format!(
                        "opened '{}' (shape {:?}) and read a {}x{} corner window",
                        variable, shape, window[1], window[2]
                    ),
                )
            }
            Err(err) => ProbeReport::failure(tool, format!("corner read failed: {}", err)),
        }
    }
}
