//! Gap-filled, quality-filtered daily snow cover.

use crate::{
    days::{day_index, time_start},
    DayRange, GranuleSource, SnowpackError,
};
use chrono::NaiveDate;
use log::debug;
use modis::{SnowBands, SnowGranule};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Quality flag of the most confident retrievals.
pub const GOOD_QUALITY: u8 = 0;

/// Whether a [DailyRaster] holds observed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKind {
    /// At least one pixel passed quality filtering.
    Observed,

    /// No usable observation for the day; every pixel is masked.
    Placeholder,
}

/// Snow cover for one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRaster {
    pub day: NaiveDate,
    pub kind: DayKind,
    pub bands: SnowBands,
}

impl DailyRaster {
    /// Returns the all-zero, fully masked raster for `day`.
    pub fn placeholder(day: NaiveDate, dimensions: (usize, usize)) -> Self {
        Self {
            day,
            kind: DayKind::Placeholder,
            bands: SnowBands::placeholder(dimensions),
        }
    }

    /// Returns `bands` with every pixel whose quality flag is not
    /// [GOOD_QUALITY] masked.
    ///
    /// Observations with no good pixel at all become placeholders.
    pub fn observed(day: NaiveDate, mut bands: SnowBands) -> Self {
        filter_quality(&mut bands);
        let kind = if bands.is_fully_masked() {
            debug!("no good quality pixels on {day}");
            DayKind::Placeholder
        } else {
            DayKind::Observed
        };
        Self { day, kind, bands }
    }

    /// Returns the `yyyy_MM_dd` index of this day.
    pub fn index(&self) -> String {
        day_index(self.day)
    }

    /// Returns the start of this day in milliseconds since the Unix
    /// epoch.
    pub fn time_start(&self) -> i64 {
        time_start(self.day)
    }
}

/// Masks every band where the quality flag is not [GOOD_QUALITY].
pub fn filter_quality(bands: &mut SnowBands) {
    let good: Vec<bool> = bands
        .quality
        .iter()
        .map(|flag| flag == Some(GOOD_QUALITY))
        .collect();
    bands.update_mask(|index| good[index]);
}

/// Returns the composite of every snow granule acquired on `day`, or
/// `None` if there are none.
///
/// Each pass is quality filtered before compositing, so a later pass
/// only replaces pixels where it is itself of [GOOD_QUALITY].
pub fn query_day<S>(source: &S, day: NaiveDate) -> Result<Option<SnowBands>, SnowpackError>
where
    S: GranuleSource<Granule = SnowGranule>,
{
    let next = day
        .succ_opt()
        .ok_or(SnowpackError::InvalidRange { start: day, end: day })?;
    let mut granules = source.granules(day, next)?.into_iter();
    let Some(first) = granules.next() else {
        return Ok(None);
    };
    let mut composite = first.bands.clone();
    filter_quality(&mut composite);
    for granule in granules {
        let mut pass = granule.bands.clone();
        filter_quality(&mut pass);
        composite.overlay(&pass)?;
    }
    Ok(Some(composite))
}

/// Returns one [DailyRaster] for every day in `[start, end)`, in
/// chronological order.
///
/// Days without a granule are filled with a placeholder. Source
/// failures are returned as is.
pub fn assemble<S>(
    source: &S,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyRaster>, SnowpackError>
where
    S: GranuleSource<Granule = SnowGranule>,
{
    let range = DayRange::new(start, end)?;
    let dimensions = source.footprint().dimensions;
    let days: Vec<NaiveDate> = range.days().collect();
    days.par_iter()
        .map(|&day| -> Result<DailyRaster, SnowpackError> {
            match query_day(source, day)? {
                Some(bands) => Ok(DailyRaster::observed(day, bands)),
                None => {
                    debug!("no snow granule on {day}, using placeholder");
                    Ok(DailyRaster::placeholder(day, dimensions))
                }
            }
        })
        .collect()
}

/// Returns one mosaic per day of `range` from the rasters of that
/// day, later rasters on top.
///
/// Days with no raster are omitted.
pub fn day_mosaics(
    rasters: &[DailyRaster],
    range: DayRange,
) -> Result<Vec<DailyRaster>, SnowpackError> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&DailyRaster>> = BTreeMap::new();
    for raster in rasters.iter().filter(|r| range.contains(r.day)) {
        by_day.entry(raster.day).or_default().push(raster);
    }
    let mut mosaics = Vec::with_capacity(by_day.len());
    for (_, day) in by_day {
        let mut layers = day.into_iter();
        let Some(first) = layers.next() else { continue };
        let mut mosaic = first.clone();
        for layer in layers {
            mosaic.bands.overlay(&layer.bands)?;
            if layer.kind == DayKind::Observed {
                mosaic.kind = DayKind::Observed;
            }
        }
        mosaics.push(mosaic);
    }
    Ok(mosaics)
}

#[cfg(test)]
mod tests {
    use super::{assemble, day_mosaics, query_day, DailyRaster, DayKind};
    use crate::{DayRange, GranuleMap, GranuleSource, SnowpackError};
    use chrono::NaiveDate;
    use geo::geometry::Coord;
    use modis::{Footprint, GranuleName, Raster, SnowBands, SnowGranule};
    use std::sync::Arc;

    const TILE: Coord<i16> = Coord { x: -72, y: 44 };

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bands(snow: [u8; 4], quality: [u8; 4]) -> SnowBands {
        SnowBands {
            snow_cover: Raster::new((2, 2), snow.to_vec()).unwrap(),
            quality: Raster::new((2, 2), quality.to_vec()).unwrap(),
            class: Raster::new((2, 2), vec![25; 4]).unwrap(),
        }
    }

    fn granule(date: NaiveDate, pass: u32, bands: SnowBands) -> SnowGranule {
        SnowGranule {
            name: GranuleName {
                date,
                tile: TILE,
                pass,
            },
            footprint: Footprint::tile(TILE, 2),
            bands,
        }
    }

    fn source(granules: Vec<SnowGranule>) -> GranuleMap<SnowGranule> {
        let mut map = GranuleMap::new(Footprint::tile(TILE, 2));
        for g in granules {
            map.insert(g).unwrap();
        }
        map
    }

    struct FailingSource;

    impl GranuleSource for FailingSource {
        type Granule = SnowGranule;

        fn granules(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Arc<SnowGranule>>, SnowpackError> {
            Err(SnowpackError::Source("timed out".to_string()))
        }

        fn footprint(&self) -> Footprint {
            Footprint::tile(TILE, 2)
        }
    }

    #[test]
    fn test_observed_then_placeholder() {
        let src = source(vec![granule(
            ymd(2005, 10, 1),
            0,
            bands([0, 10, 50, 100], [0; 4]),
        )]);
        let days = assemble(&src, ymd(2005, 10, 1), ymd(2005, 10, 3)).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, ymd(2005, 10, 1));
        assert_eq!(days[0].kind, DayKind::Observed);
        assert_eq!(days[0].bands, bands([0, 10, 50, 100], [0; 4]));
        assert_eq!(days[1], DailyRaster::placeholder(ymd(2005, 10, 2), (2, 2)));
        assert_eq!(days[1].index(), "2005_10_02");
    }

    #[test]
    fn test_length_matches_range() {
        let src = source(vec![]);
        for (start, end, len) in [
            (ymd(2005, 10, 1), ymd(2005, 10, 2), 1),
            (ymd(2018, 10, 1), ymd(2019, 10, 1), 365),
            (ymd(2019, 10, 1), ymd(2020, 10, 1), 366),
        ] {
            let days = assemble(&src, start, end).unwrap();
            assert_eq!(days.len(), len);
            assert!(days.windows(2).all(|w| w[0].day.succ_opt() == Some(w[1].day)));
            assert!(days.iter().all(|d| d.kind == DayKind::Placeholder));
        }
    }

    #[test]
    fn test_quality_filter_masks_every_band() {
        let src = source(vec![granule(
            ymd(2005, 10, 1),
            0,
            bands([5, 6, 7, 8], [0, 1, 0, 2]),
        )]);
        let day = assemble(&src, ymd(2005, 10, 1), ymd(2005, 10, 2))
            .unwrap()
            .remove(0);
        let expect = vec![Some(5), None, Some(7), None];
        assert_eq!(day.bands.snow_cover.iter().collect::<Vec<_>>(), expect);
        assert_eq!(
            day.bands.quality.iter().collect::<Vec<_>>(),
            vec![Some(0), None, Some(0), None]
        );
        assert_eq!(
            day.bands.class.iter().collect::<Vec<_>>(),
            vec![Some(25), None, Some(25), None]
        );
    }

    #[test]
    fn test_all_bad_quality_is_placeholder() {
        let src = source(vec![granule(
            ymd(2005, 10, 1),
            0,
            bands([5, 6, 7, 8], [1, 1, 2, 3]),
        )]);
        let days = assemble(&src, ymd(2005, 10, 1), ymd(2005, 10, 2)).unwrap();
        assert_eq!(days[0], DailyRaster::placeholder(ymd(2005, 10, 1), (2, 2)));
    }

    #[test]
    fn test_later_passes_on_top() {
        let mut top = bands([90, 90, 90, 90], [0; 4]);
        top.snow_cover.update_mask(|index| index == 3);
        top.quality.update_mask(|index| index == 3);
        top.class.update_mask(|index| index == 3);
        let src = source(vec![
            granule(ymd(2005, 10, 1), 0, bands([1, 2, 3, 4], [0; 4])),
            granule(ymd(2005, 10, 1), 1, top),
        ]);
        let bands = query_day(&src, ymd(2005, 10, 1)).unwrap().unwrap();
        assert_eq!(
            bands.snow_cover.iter().collect::<Vec<_>>(),
            vec![Some(1), Some(2), Some(3), Some(90)]
        );
        assert!(query_day(&src, ymd(2005, 10, 2)).unwrap().is_none());
    }

    #[test]
    fn test_bad_later_pass_keeps_good_earlier_pass() {
        let src = source(vec![
            granule(ymd(2005, 10, 1), 0, bands([50, 50, 50, 50], [0, 0, 1, 1])),
            granule(ymd(2005, 10, 1), 1, bands([90, 90, 90, 90], [2, 0, 2, 0])),
        ]);
        let day = assemble(&src, ymd(2005, 10, 1), ymd(2005, 10, 2))
            .unwrap()
            .remove(0);
        assert_eq!(day.kind, DayKind::Observed);
        assert_eq!(
            day.bands.snow_cover.iter().collect::<Vec<_>>(),
            vec![Some(50), Some(90), None, Some(90)]
        );
        assert_eq!(
            day.bands.quality.iter().collect::<Vec<_>>(),
            vec![Some(0), Some(0), None, Some(0)]
        );
    }

    #[test]
    fn test_idempotent() {
        let src = source(vec![
            granule(ymd(2005, 10, 1), 0, bands([1, 2, 3, 4], [0, 1, 0, 0])),
            granule(ymd(2005, 10, 4), 0, bands([4, 3, 2, 1], [0, 0, 0, 5])),
        ]);
        let first = assemble(&src, ymd(2005, 9, 28), ymd(2005, 10, 8)).unwrap();
        let second = assemble(&src, ymd(2005, 9, 28), ymd(2005, 10, 8)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_errors() {
        let src = source(vec![]);
        assert!(matches!(
            assemble(&src, ymd(2005, 10, 3), ymd(2005, 10, 1)),
            Err(SnowpackError::InvalidRange { .. })
        ));
        assert!(matches!(
            assemble(&FailingSource, ymd(2005, 10, 1), ymd(2005, 10, 3)),
            Err(SnowpackError::Source(_))
        ));
    }

    #[test]
    fn test_day_mosaics_skip_empty_days() {
        let range = DayRange::new(ymd(2005, 10, 1), ymd(2005, 10, 4)).unwrap();
        let day1 = DailyRaster::observed(ymd(2005, 10, 1), bands([1, 1, 1, 1], [0, 0, 1, 1]));
        let day1b = DailyRaster::observed(ymd(2005, 10, 1), bands([2, 2, 2, 2], [1, 0, 0, 1]));
        let day3 = DailyRaster::placeholder(ymd(2005, 10, 3), (2, 2));
        let outside = DailyRaster::placeholder(ymd(2005, 10, 9), (2, 2));
        let mosaics = day_mosaics(&[day3.clone(), day1, day1b, outside], range).unwrap();
        assert_eq!(mosaics.len(), 2);
        assert_eq!(mosaics[0].day, ymd(2005, 10, 1));
        assert_eq!(
            mosaics[0].bands.snow_cover.iter().collect::<Vec<_>>(),
            vec![Some(1), Some(2), Some(2), None]
        );
        assert_eq!(mosaics[1], day3);
    }
}
