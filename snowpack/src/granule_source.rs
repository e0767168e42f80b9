//! Granule collections queryable by date.

use crate::SnowpackError;
use chrono::NaiveDate;
use dashmap::DashMap;
use geo::geometry::Coord;
use log::{debug, warn};
use modis::{Footprint, Granule, GranuleName, ModisError};
use std::{
    collections::BTreeMap,
    ffi::OsStr,
    path::{Path, PathBuf},
    sync::Arc,
};

/// A collection of granules covering a single footprint.
pub trait GranuleSource: Sync {
    type Granule: Granule + Send + Sync;

    /// Returns every granule acquired in `[start, end)`, ordered by
    /// date and then by pass.
    fn granules(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Arc<Self::Granule>>, SnowpackError>;

    /// Returns the footprint shared by every granule in this source.
    fn footprint(&self) -> Footprint;
}

/// Days of decoded granules a [GranuleDir] keeps by default.
pub const DEFAULT_CACHE_DAYS: usize = 32;

/// A directory of granule files for one tile.
///
/// Recently queried days are cached, up to a fixed number of days;
/// the earliest cached day is evicted first.
pub struct GranuleDir<G> {
    /// Directory containing granule files.
    dir: PathBuf,

    /// How to read granules (in-memory or mapped).
    read_mode: ReadMode,

    /// Footprint of the first granule found.
    footprint: Footprint,

    /// Granule file paths by acquisition day, ordered by pass.
    index: BTreeMap<NaiveDate, Vec<PathBuf>>,

    /// Days which have been loaded on demand.
    granules: DashMap<NaiveDate, Vec<Arc<G>>>,

    /// Maximum number of days held in `granules`.
    cache_days: usize,
}

impl<G> GranuleDir<G>
where
    G: Granule + Send + Sync,
{
    pub fn new(dir: PathBuf, tile: Coord<i16>, read_mode: ReadMode) -> Result<Self, SnowpackError> {
        let mut index: BTreeMap<NaiveDate, Vec<(u32, PathBuf)>> = BTreeMap::new();

        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if Some(G::EXTENSION) != path.extension().and_then(OsStr::to_str) {
                continue;
            }
            match GranuleName::parse(&path) {
                Ok(name) if name.tile == tile => {
                    index.entry(name.date).or_default().push((name.pass, path));
                }
                Ok(_) => {}
                Err(e) => warn!("skipping {path:?}: {e}"),
            }
        }

        let index: BTreeMap<NaiveDate, Vec<PathBuf>> = index
            .into_iter()
            .map(|(date, mut passes)| {
                passes.sort_unstable_by_key(|(pass, _)| *pass);
                (date, passes.into_iter().map(|(_, path)| path).collect())
            })
            .collect();

        // Let's try to fail early by checking that dir has at least one
        // granule for this tile.
        let first = index
            .values()
            .next()
            .and_then(|paths| paths.first())
            .ok_or_else(|| SnowpackError::NoGranules(dir.clone()))?;
        let footprint = *read::<G>(first, read_mode)?.footprint();

        debug!(
            "indexed {} days of .{} granules in {dir:?}",
            index.len(),
            G::EXTENSION
        );

        Ok(Self {
            dir,
            read_mode,
            footprint,
            index,
            granules: DashMap::new(),
            cache_days: DEFAULT_CACHE_DAYS,
        })
    }

    /// Sets the number of decoded days kept in memory. Zero disables
    /// caching.
    pub fn with_cache_days(mut self, cache_days: usize) -> Self {
        self.cache_days = cache_days;
        self
    }

    /// Returns the number of days currently cached.
    pub fn cached_days(&self) -> usize {
        self.granules.len()
    }

    /// Directory this source reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the days for which at least one granule exists.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.index.keys().copied()
    }
}

/// Private API.
impl<G> GranuleDir<G>
where
    G: Granule + Send + Sync,
{
    fn load_day(&self, date: NaiveDate) -> Result<Vec<Arc<G>>, SnowpackError> {
        let paths = self.index.get(&date).map_or(&[][..], Vec::as_slice);
        paths
            .iter()
            .map(|path| -> Result<Arc<G>, SnowpackError> {
                let granule = read::<G>(path, self.read_mode)?;
                if *granule.footprint() != self.footprint {
                    return Err(ModisError::Dimensions {
                        expected: self.footprint.dimensions,
                        actual: granule.footprint().dimensions,
                    }
                    .into());
                }
                Ok(Arc::new(granule))
            })
            .collect()
    }

    fn get_day(&self, date: NaiveDate) -> Result<Vec<Arc<G>>, SnowpackError> {
        if self.cache_days == 0 {
            return self.load_day(date);
        }
        let day = self
            .granules
            .entry(date)
            .or_try_insert_with(|| self.load_day(date))?
            .value()
            .clone();
        self.evict();
        Ok(day)
    }

    fn evict(&self) {
        while self.granules.len() > self.cache_days {
            let Some(oldest) = self.granules.iter().map(|entry| *entry.key()).min() else {
                break;
            };
            self.granules.remove(&oldest);
        }
    }
}

impl<G> GranuleSource for GranuleDir<G>
where
    G: Granule + Send + Sync,
{
    type Granule = G;

    fn granules(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Arc<G>>, SnowpackError> {
        if end <= start {
            return Err(SnowpackError::InvalidRange { start, end });
        }
        let mut granules = Vec::new();
        for date in self.index.range(start..end).map(|(date, _)| *date) {
            granules.extend(self.get_day(date)?);
        }
        Ok(granules)
    }

    fn footprint(&self) -> Footprint {
        self.footprint
    }
}

fn read<G: Granule>(path: &Path, read_mode: ReadMode) -> Result<G, SnowpackError> {
    debug!("loading {path:?}");
    match read_mode {
        ReadMode::InMem => Ok(G::load(path)?),
        ReadMode::MemMap => Ok(G::memmap(path)?),
    }
}

/// How to read granule files.
///
/// Granules are always decoded into memory; this only selects how
/// the raw bytes are accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Buffered reads.
    #[default]
    InMem,

    /// Memory map file contents.
    MemMap,
}

/// An in-memory granule collection.
pub struct GranuleMap<G> {
    footprint: Footprint,
    granules: BTreeMap<NaiveDate, Vec<Arc<G>>>,
}

impl<G> GranuleMap<G>
where
    G: Granule + Send + Sync,
{
    pub fn new(footprint: Footprint) -> Self {
        Self {
            footprint,
            granules: BTreeMap::new(),
        }
    }

    /// Adds `granule` after any granule already held for its day.
    pub fn insert(&mut self, granule: G) -> Result<(), SnowpackError> {
        if *granule.footprint() != self.footprint {
            return Err(ModisError::Dimensions {
                expected: self.footprint.dimensions,
                actual: granule.footprint().dimensions,
            }
            .into());
        }
        self.granules
            .entry(granule.name().date)
            .or_default()
            .push(Arc::new(granule));
        Ok(())
    }
}

impl<G> GranuleSource for GranuleMap<G>
where
    G: Granule + Send + Sync,
{
    type Granule = G;

    fn granules(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Arc<G>>, SnowpackError> {
        if end <= start {
            return Err(SnowpackError::InvalidRange { start, end });
        }
        Ok(self
            .granules
            .range(start..end)
            .flat_map(|(_, day)| day.iter().cloned())
            .collect())
    }

    fn footprint(&self) -> Footprint {
        self.footprint
    }
}
