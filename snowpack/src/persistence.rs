//! Snow persistence: how often a pixel is snow covered when seen.

use crate::{
    daily::{assemble, day_mosaics, DailyRaster},
    DayRange, GranuleSource, SnowpackError,
};
use chrono::NaiveDate;
use log::info;
use modis::{Raster, SnowGranule};
use rayon::prelude::*;

/// Denominator of a persistence percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Basis {
    /// Days with a valid snow cover value.
    #[default]
    ValidDays,

    /// Every day in the collection, observed or not.
    AllDays,
}

/// Per-pixel tally of days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnowDays {
    /// Days with snow cover above zero.
    pub snow: u32,

    /// Days with a valid snow cover value.
    pub valid: u32,

    /// Days tallied.
    pub days: u32,
}

impl SnowDays {
    pub fn push(&mut self, snow_cover: Option<u8>) {
        self.days += 1;
        if let Some(snow_cover) = snow_cover {
            self.valid += 1;
            if snow_cover > 0 {
                self.snow += 1;
            }
        }
    }

    /// Returns the percentage of days with snow, or `None` if no day
    /// was valid.
    pub fn percent(&self, basis: Basis) -> Option<f64> {
        let denominator = match basis {
            Basis::ValidDays => self.valid,
            Basis::AllDays => self.days,
        };
        (self.valid > 0).then(|| 100.0 * f64::from(self.snow) / f64::from(denominator))
    }
}

/// Returns, for every pixel, the percentage of days on which snow was
/// present.
///
/// Pixels never observed are masked.
pub fn snow_persistence(
    days: &[DailyRaster],
    basis: Basis,
) -> Result<Raster<f64>, SnowpackError> {
    let dimensions = days
        .first()
        .ok_or(SnowpackError::EmptyCollection)?
        .bands
        .dimensions();
    let mut tally = vec![SnowDays::default(); dimensions.0 * dimensions.1];
    for day in days {
        day.bands.snow_cover.check_dimensions(dimensions)?;
        for (pixel, snow_cover) in tally.iter_mut().zip(day.bands.snow_cover.iter()) {
            pixel.push(snow_cover);
        }
    }
    Ok(Raster::from_fn(dimensions, |index| tally[index].percent(basis)))
}

/// Snow persistence over one hydrological year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyPersistence {
    /// Calendar year the hydrological year starts in.
    pub year: i32,
    pub range: DayRange,
    pub raster: Raster<f64>,
}

impl YearlyPersistence {
    /// Returns this product's name, e.g. `SnowPers20181001to20191001`.
    pub fn name(&self) -> String {
        format!("SnowPers{}", self.range.label())
    }
}

/// Returns snow persistence for every hydrological year starting in
/// `[year(start), year(end))`.
pub fn yearly_persistence<S>(
    source: &S,
    start: NaiveDate,
    end: NaiveDate,
    basis: Basis,
) -> Result<Vec<YearlyPersistence>, SnowpackError>
where
    S: GranuleSource<Granule = SnowGranule>,
{
    let years = DayRange::new(start, end)?.hydrological_years()?;
    years
        .par_iter()
        .map(|&(year, range)| -> Result<YearlyPersistence, SnowpackError> {
            let days = assemble(source, range.start(), range.end())?;
            let days = day_mosaics(&days, range)?;
            let raster = snow_persistence(&days, basis)?;
            info!(
                "{year}: {} of {} pixels observed",
                raster.valid_count(),
                raster.len()
            );
            Ok(YearlyPersistence {
                year,
                range,
                raster,
            })
        })
        .collect()
}

/// Returns the per-pixel mean of `rasters`, ignoring masked pixels.
pub fn mean_persistence(rasters: &[Raster<f64>]) -> Result<Raster<f64>, SnowpackError> {
    let dimensions = rasters
        .first()
        .ok_or(SnowpackError::EmptyCollection)?
        .dimensions();
    let len = dimensions.0 * dimensions.1;
    let (mut sum, mut n) = (vec![0.0; len], vec![0_u32; len]);
    for raster in rasters {
        raster.check_dimensions(dimensions)?;
        for (index, value) in raster.iter().enumerate() {
            if let Some(value) = value {
                sum[index] += value;
                n[index] += 1;
            }
        }
    }
    Ok(Raster::from_fn(dimensions, |index| {
        (n[index] > 0).then(|| sum[index] / f64::from(n[index]))
    }))
}

/// Returns `mean` masked to pixels with any persistent snow.
pub fn seasonal_snow_area(mean: &Raster<f64>) -> Raster<f64> {
    let mut area = mean.clone();
    area.update_mask(|index| mean.get(index).is_some_and(|value| value > 0.0));
    area
}

/// Returns the seasonal snow area product name for `range`.
pub fn seasonal_name(range: &DayRange) -> String {
    format!("SnowArea{}", range.label())
}
