//! The standard rule registry.
//!
//! Order matters: findings keep registry order in the report, and rules with
//! declared dependencies must come after the rules they depend on.

use dataset_adapter::Location;

use crate::checks::{data_variable, global_attrs, spatial, temporal, tool_compat};
use crate::rule::Rule;

/// The full v1 rule set, in evaluation order.
///
/// `location` is handed to probes that re-open the archive themselves; pass
/// `None` for datasets that only exist in memory.
pub fn standard_rules(location: Option<Location>) -> Vec<Rule> {
    vec![
        spatial::coordinate_names(),
        spatial::latlon_coords(),
        spatial::resolution(),
        spatial::domain_consistency(),
        spatial::valid_crop(),
        temporal::coverage(),
        temporal::timestep_regularity(),
        temporal::declared_regular_start(),
        temporal::future_extension(),
        data_variable::data_structure(),
        data_variable::variable_naming(),
        data_variable::chunking(),
        data_variable::compression(),
        data_variable::georeferencing(),
        global_attrs::license_spdx(),
        global_attrs::license_choice(),
        global_attrs::conditional_attrs(),
        global_attrs::zarr_format(),
        tool_compat::array_load(location),
        tool_compat::wkt_parse(),
        tool_compat::cartographic(),
        tool_compat::crs_agreement(),
    ]
}
