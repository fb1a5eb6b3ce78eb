//! Spatial layer: the ocean raster and the seasonal allocation grids

pub mod allocation;
pub mod loader;
pub mod map;

pub use allocation::{AllocationGrids, WeightGrid};
pub use map::{MapExtent, OceanMap};
