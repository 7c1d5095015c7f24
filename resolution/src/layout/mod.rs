//! Decoding of the shell's persisted desktop icon layout.
//!
//! The layout value is an opaque byte blob. [`decoder`] recovers icon names
//! and, optionally, their grid cells; [`mapping`] inverts the shell's bucket
//! encoding of grid lines; [`geometry`] turns cells into pixel centres.

pub mod decoder;
pub mod geometry;
pub mod mapping;

pub use decoder::{decode, DesktopIcon};
pub use geometry::{to_pixel, GridPosition, IconGeometry};
pub use mapping::{build_mapping, PositionMapping, UNMAPPED};
