pub mod cancellation;
pub mod constants;
pub mod geometry;
pub mod raster;
