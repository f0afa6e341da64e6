//! CRS interpretation for gridded radar archives.
//!
//! Implements the two independent routes from projected grid coordinates to
//! geographic longitude/latitude that the validator's tool-compatibility
//! checks compare against each other:
//!
//! - parsing a WKT1 string ([`wkt`]) and building a projection from its
//!   `PROJECTION`/`PARAMETER` entries, and
//! - building the same projection from CF grid-mapping attributes.
//!
//! Projection math is implemented from scratch; only the projections that
//! occur in operational radar composites are supported.

pub mod error;
pub mod lambert;
pub mod stereographic;
pub mod transform;
pub mod wkt;

pub use error::GeorefError;
pub use lambert::LambertConformal;
pub use stereographic::PolarStereographic;
pub use transform::Projection;
pub use wkt::{WktNode, WktValue};
