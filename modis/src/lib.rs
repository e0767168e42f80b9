//! MODIS snow cover (`MOD10A1`) and burned area (`MCD64A1`) granules.
//!
//! Granules are one degree square tiles stored as band-sequential
//! planes. Every band is decoded into a masked [Raster], so fill and
//! unmapped codes never leak into downstream statistics.
//!
//! # References
//!
//! 1. [MOD10A1 user guide](https://nsidc.org/sites/default/files/mod10a1-v061-userguide_1_0.pdf)
//! 1. [MCD64A1 user guide](https://modis-fire.umd.edu/files/MODIS_C6_BA_User_Guide_1.3.pdf)

mod error;
mod footprint;
mod granule;
mod raster;

pub use crate::{
    error::ModisError,
    footprint::{parse_tile, tile_name, Footprint},
    granule::{BurnGranule, Granule, GranuleName, SnowBands, SnowGranule},
    raster::Raster,
};

/// Base floating point type used for all coordinates.
pub type C = f64;

/// Largest valid NDSI snow cover value; larger values are flag codes.
pub const MAX_SNOW_COVER: u8 = 100;
