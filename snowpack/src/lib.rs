//! # Snowpack
//!
//! `snowpack` turns MODIS granules into snow and burn products: gap
//! filled daily snow cover, yearly snow persistence, seasonal snow
//! area, and burn masks within that area.

pub mod burn;
pub mod daily;
mod days;
mod error;
pub mod export;
mod granule_source;
pub mod persistence;

pub use crate::{
    days::{day_index, time_start, DayRange, HYDROLOGICAL_YEAR_START},
    error::SnowpackError,
    granule_source::{GranuleDir, GranuleMap, GranuleSource, ReadMode, DEFAULT_CACHE_DAYS},
};
pub use modis;
