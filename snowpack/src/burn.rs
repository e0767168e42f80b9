//! Burned area filtering and burn masks.

use crate::{DayRange, GranuleSource, SnowpackError};
use chrono::{Datelike, NaiveDate};
use modis::{BurnGranule, Raster};
use rayon::prelude::*;
use std::sync::Arc;

/// Burn dates with an uncertainty of this many days or more are
/// discarded.
pub const MAX_UNCERTAINTY: u8 = 30;

/// QA bits which must both be set: land, and valid data.
pub const QA_MASK: u8 = 0b11;

/// Value of pixels in the never burned product.
pub const NEVER_BURNED: u8 = 100;

/// Days from 0001-01-01 (day 1) to 2000-01-01, the burn date epoch.
const EPOCH_DAYS_FROM_CE: i32 = 730_120;

/// Returns the days from 2000-01-01 to January 1 of `date`'s year.
pub fn year_offset(date: NaiveDate) -> i32 {
    #[allow(clippy::cast_possible_wrap)]
    let jan1 = date.num_days_from_ce() - date.ordinal0() as i32;
    jan1 - EPOCH_DAYS_FROM_CE
}

/// Returns the confident burn dates of `granule` as days since
/// 2000-01-01.
///
/// Pixels are masked where the uncertainty is [MAX_UNCERTAINTY] days
/// or more, or where either [QA_MASK] bit is clear.
pub fn good_burn(granule: &BurnGranule) -> Result<Raster<f64>, SnowpackError> {
    let offset = f64::from(year_offset(granule.name.date));
    let mut burn = granule.burn_date.map(|day| f64::from(day) + offset);
    burn.mask_with(&granule.uncertainty)?;
    burn.mask_with(&granule.qa)?;
    burn.update_mask(|index| {
        let certain = granule
            .uncertainty
            .get(index)
            .is_some_and(|days| days < MAX_UNCERTAINTY);
        let qa_ok = granule
            .qa
            .get(index)
            .is_some_and(|qa| qa & QA_MASK == QA_MASK);
        certain && qa_ok
    });
    Ok(burn)
}

/// Returns [good_burn] for every burn granule in `[start, end)`, in
/// chronological order.
pub fn good_burns<S>(
    source: &S,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Raster<f64>>, SnowpackError>
where
    S: GranuleSource<Granule = BurnGranule>,
{
    let range = DayRange::new(start, end)?;
    let granules = source.granules(range.start(), range.end())?;
    granules.par_iter().map(|g| good_burn(g)).collect()
}

/// Returns, for every pixel, the number of granules with a valid burn
/// date.
pub fn burn_counts(granules: &[Arc<BurnGranule>]) -> Result<Raster<u32>, SnowpackError> {
    let dimensions = granules
        .first()
        .ok_or(SnowpackError::EmptyCollection)?
        .burn_date
        .dimensions();
    let mut counts = vec![0_u32; dimensions.0 * dimensions.1];
    for granule in granules {
        granule.burn_date.check_dimensions(dimensions)?;
        for (count, burn) in counts.iter_mut().zip(granule.burn_date.iter()) {
            if burn.is_some() {
                *count += 1;
            }
        }
    }
    Ok(Raster::new(dimensions, counts)?)
}

/// Returns the burn dates of pixels inside `snow_area` that burned
/// exactly once according to `counts`, later burns on top.
pub fn burned_once(
    good_burns: &[Raster<f64>],
    snow_area: &Raster<f64>,
    counts: &Raster<u32>,
) -> Result<Raster<f64>, SnowpackError> {
    snow_area.check_dimensions(counts.dimensions())?;
    let mut mosaic = Raster::masked(snow_area.dimensions());
    for burn in good_burns {
        let mut burn = burn.clone();
        burn.mask_with(snow_area)?;
        burn.update_mask(|index| counts.get(index) == Some(1));
        mosaic.overlay(&burn)?;
    }
    Ok(mosaic)
}

/// Returns [NEVER_BURNED] on every pixel inside `snow_area` without a
/// valid burn date anywhere in `history`.
///
/// Pixels outside the snow area are masked even if they never burned,
/// the same restriction [burned_once] applies.
pub fn never_burned(
    history: &[Arc<BurnGranule>],
    snow_area: &Raster<f64>,
) -> Result<Raster<u8>, SnowpackError> {
    let counts = burn_counts(history)?;
    snow_area.check_dimensions(counts.dimensions())?;
    Ok(Raster::from_fn(snow_area.dimensions(), |index| {
        (snow_area.is_valid(index) && counts.get(index) == Some(0)).then_some(NEVER_BURNED)
    }))
}

/// Returns the burned once product name for burns in `range`.
pub fn burned_once_name(range: &DayRange) -> String {
    format!("burnImage-{}_burnOnce", range.label())
}

/// Returns the never burned product name for a burn history `range`.
pub fn never_burned_name(range: &DayRange) -> String {
    format!("burnImage-{}_NeverBurn", range.label())
}

/// Returns the name of the pixel table of raster product `name`.
pub fn table_name(name: &str) -> String {
    format!("burnCSV-{name}")
}

#[cfg(test)]
mod tests {
    use super::{
        burn_counts, burned_once, burned_once_name, good_burn, good_burns, never_burned,
        never_burned_name, table_name, year_offset, NEVER_BURNED,
    };
    use crate::{DayRange, GranuleMap, SnowpackError};
    use chrono::NaiveDate;
    use geo::geometry::Coord;
    use modis::{BurnGranule, Footprint, GranuleName, Raster};
    use std::sync::Arc;

    const TILE: Coord<i16> = Coord { x: 10, y: 60 };

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn granule(
        date: NaiveDate,
        burn_date: [i16; 4],
        uncertainty: [u8; 4],
        qa: [u8; 4],
    ) -> BurnGranule {
        let valid = burn_date.iter().map(|d| *d > 0).collect();
        BurnGranule {
            name: GranuleName {
                date,
                tile: TILE,
                pass: 0,
            },
            footprint: Footprint::tile(TILE, 2),
            burn_date: Raster::from_parts((2, 2), burn_date.to_vec(), valid).unwrap(),
            uncertainty: Raster::new((2, 2), uncertainty.to_vec()).unwrap(),
            qa: Raster::new((2, 2), qa.to_vec()).unwrap(),
        }
    }

    #[test]
    fn test_year_offset() {
        assert_eq!(year_offset(ymd(2000, 6, 15)), 0);
        assert_eq!(year_offset(ymd(2001, 1, 1)), 366);
        assert_eq!(year_offset(ymd(2005, 10, 1)), 1827);
        assert_eq!(year_offset(ymd(1999, 12, 31)), -365);
    }

    #[test]
    fn test_good_burn() {
        let g = granule(
            ymd(2005, 8, 1),
            [220, 221, 222, 0],
            [1, 30, 2, 1],
            [3, 3, 1, 3],
        );
        let burn = good_burn(&g).unwrap();
        assert_eq!(
            burn.iter().collect::<Vec<_>>(),
            vec![Some(2047.0), None, None, None]
        );
    }

    #[test]
    fn test_good_burns_by_range() {
        let mut source = GranuleMap::new(Footprint::tile(TILE, 2));
        for date in [ymd(2005, 7, 1), ymd(2005, 8, 1), ymd(2006, 7, 1)] {
            source
                .insert(granule(date, [10; 4], [0; 4], [3; 4]))
                .unwrap();
        }
        let burns = good_burns(&source, ymd(2005, 1, 1), ymd(2006, 1, 1)).unwrap();
        assert_eq!(burns.len(), 2);
        assert!(matches!(
            good_burns(&source, ymd(2006, 1, 1), ymd(2005, 1, 1)),
            Err(SnowpackError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_burned_once_in_snow_area() {
        let history = vec![
            Arc::new(granule(ymd(2005, 7, 1), [200, 200, 0, 200], [0; 4], [3; 4])),
            Arc::new(granule(ymd(2006, 7, 1), [0, 190, 0, 0], [0; 4], [3; 4])),
        ];
        let counts = burn_counts(&history).unwrap();
        assert_eq!(
            counts.iter().collect::<Vec<_>>(),
            vec![Some(1), Some(2), Some(0), Some(1)]
        );

        let snow_area =
            Raster::from_parts((2, 2), vec![5.0, 5.0, 5.0, 5.0], vec![true, true, true, false])
                .unwrap();
        let goods: Vec<_> = history.iter().map(|g| good_burn(g).unwrap()).collect();
        let once = burned_once(&goods, &snow_area, &counts).unwrap();
        assert_eq!(
            once.iter().collect::<Vec<_>>(),
            vec![Some(f64::from(200 + year_offset(ymd(2005, 1, 1)))), None, None, None]
        );
    }

    #[test]
    fn test_never_burned_in_snow_area() {
        let history = vec![
            Arc::new(granule(ymd(2005, 7, 1), [200, 0, 0, 0], [0; 4], [3; 4])),
            Arc::new(granule(ymd(2006, 7, 1), [0, 190, 0, 0], [99; 4], [0; 4])),
        ];
        let snow_area =
            Raster::from_parts((2, 2), vec![1.0; 4], vec![true, true, true, false]).unwrap();
        let never = never_burned(&history, &snow_area).unwrap();
        assert_eq!(
            never.iter().collect::<Vec<_>>(),
            vec![None, None, Some(NEVER_BURNED), None]
        );
        assert!(matches!(
            never_burned(&[], &snow_area),
            Err(SnowpackError::EmptyCollection)
        ));
    }

    #[test]
    fn test_product_names() {
        let range = DayRange::new(ymd(2018, 10, 1), ymd(2019, 10, 1)).unwrap();
        let once = burned_once_name(&range);
        assert_eq!(once, "burnImage-20181001to20191001_burnOnce");
        assert_eq!(
            never_burned_name(&range),
            "burnImage-20181001to20191001_NeverBurn"
        );
        assert_eq!(
            table_name(&once),
            "burnCSV-burnImage-20181001to20191001_burnOnce"
        );
    }
}
