//! Tool-compatibility probes.
//!
//! Each probe asks one collaborating capability — the array-access library,
//! the WKT parser, the cartographic transform — to interpret the archive and
//! classifies the outcome as a structured [`ProbeReport`]. Probes never
//! panic outward and never mutate anything; a library API change only
//! touches the one probe that wraps it.

pub mod array_load;
pub mod cartographic;
pub mod probe;
pub mod wkt_parse;

pub use array_load::ArrayLoadProbe;
pub use cartographic::CartographicProbe;
pub use probe::{max_component_delta, ProbeInput, ProbeReport, ToolProbe};
pub use wkt_parse::WktParseProbe;
