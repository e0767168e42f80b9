use crate::{
    footprint::{parse_tile, tile_name},
    Footprint, ModisError, Raster, MAX_SNOW_COVER,
};
use byteorder::{BigEndian as BE, ReadBytesExt, WriteBytesExt};
use chrono::NaiveDate;
use geo::geometry::Coord;
use memmap2::Mmap;
use std::{
    ffi::OsStr,
    fs::File,
    io::{self, BufReader, Read, Write},
    path::Path,
};

/// Snow cover value written for masked pixels.
const SNOW_FILL: u8 = 255;

/// Identity of a granule, parsed from its file name.
///
/// Granule files are named `<yyyy>_<mm>_<dd>_<tile>[.<pass>].<ext>`,
/// e.g. `2005_10_01_N44W072.snow` or `2005_10_01_N44W072.1.snow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GranuleName {
    /// Acquisition day.
    pub date: NaiveDate,

    /// Southwest corner of the tile this granule covers.
    pub tile: Coord<i16>,

    /// Pass number for days with more than one acquisition.
    pub pass: u32,
}

impl GranuleName {
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self, ModisError> {
        let mk_err = || ModisError::GranuleName(path.as_ref().to_owned());
        let stem = path
            .as_ref()
            .file_stem()
            .and_then(OsStr::to_str)
            .ok_or_else(mk_err)?;
        let (base, pass) = match stem.split_once('.') {
            Some((base, pass)) => (base, pass.parse::<u32>().map_err(|_| mk_err())?),
            None => (stem, 0),
        };
        let (date, tile) = base.rsplit_once('_').ok_or_else(mk_err)?;
        let date = NaiveDate::parse_from_str(date, "%Y_%m_%d").map_err(|_| mk_err())?;
        let tile = parse_tile(tile).ok_or_else(mk_err)?;
        Ok(Self { date, tile, pass })
    }

    /// Returns the file name for this granule with extension `ext`.
    pub fn file_name(&self, ext: &str) -> String {
        let date = self.date.format("%Y_%m_%d");
        let tile = tile_name(self.tile);
        match self.pass {
            0 => format!("{date}_{tile}.{ext}"),
            pass => format!("{date}_{tile}.{pass}.{ext}"),
        }
    }
}

/// A granule file format.
pub trait Granule: Sized {
    /// File extension of this granule kind.
    const EXTENSION: &'static str;

    /// Bytes stored on disk for every pixel, summed over all bands.
    const BYTES_PER_PIXEL: u64;

    /// Decodes band-sequential planes from `rdr`.
    fn decode<R: Read>(name: GranuleName, footprint: Footprint, rdr: &mut R)
        -> Result<Self, ModisError>;

    fn name(&self) -> &GranuleName;

    fn footprint(&self) -> &Footprint;

    /// Returns a granule read into memory from the file at `path`.
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModisError> {
        let (name, footprint) = inspect::<Self, _>(&path)?;
        let mut rdr = BufReader::new(File::open(path)?);
        Self::decode(name, footprint, &mut rdr)
    }

    /// Returns a granule decoded from a memory map of `path`.
    fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, ModisError> {
        let (name, footprint) = inspect::<Self, _>(&path)?;
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::decode(name, footprint, &mut &mmap[..])
    }
}

/// The three snow bands of a daily snow cover observation.
#[derive(Debug, Clone, PartialEq)]
pub struct SnowBands {
    /// NDSI snow cover, 0 to 100.
    pub snow_cover: Raster<u8>,

    /// Basic quality flag, 0 is best.
    pub quality: Raster<u8>,

    /// Snow cover class flag.
    pub class: Raster<u8>,
}

impl SnowBands {
    /// Returns all-zero, fully masked bands.
    pub fn placeholder(dimensions: (usize, usize)) -> Self {
        Self {
            snow_cover: Raster::masked(dimensions),
            quality: Raster::masked(dimensions),
            class: Raster::masked(dimensions),
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.snow_cover.dimensions()
    }

    /// Masks every band where `keep` returns false.
    pub fn update_mask<F>(&mut self, keep: F)
    where
        F: Fn(usize) -> bool,
    {
        self.snow_cover.update_mask(&keep);
        self.quality.update_mask(&keep);
        self.class.update_mask(&keep);
    }

    /// Composites `top` over `self`, band by band.
    pub fn overlay(&mut self, top: &SnowBands) -> Result<(), ModisError> {
        self.snow_cover.overlay(&top.snow_cover)?;
        self.quality.overlay(&top.quality)?;
        self.class.overlay(&top.class)?;
        Ok(())
    }

    pub fn is_fully_masked(&self) -> bool {
        self.snow_cover.is_fully_masked()
            && self.quality.is_fully_masked()
            && self.class.is_fully_masked()
    }

    /// Writes these bands in the `snow` granule layout.
    pub fn write<W: Write>(&self, mut wtr: W) -> io::Result<()> {
        for value in self.snow_cover.iter() {
            wtr.write_u8(value.unwrap_or(SNOW_FILL))?;
        }
        for band in [&self.quality, &self.class] {
            for value in band.iter() {
                wtr.write_u8(value.unwrap_or_default())?;
            }
        }
        Ok(())
    }
}

/// A daily snow cover granule.
#[derive(Debug, Clone, PartialEq)]
pub struct SnowGranule {
    pub name: GranuleName,
    pub footprint: Footprint,
    pub bands: SnowBands,
}

impl Granule for SnowGranule {
    const EXTENSION: &'static str = "snow";
    const BYTES_PER_PIXEL: u64 = 3;

    fn decode<R: Read>(
        name: GranuleName,
        footprint: Footprint,
        rdr: &mut R,
    ) -> Result<Self, ModisError> {
        let dimensions = footprint.dimensions;
        let snow_cover = {
            let plane = read_plane(rdr, footprint.len())?;
            let valid = plane.iter().map(|v| *v <= MAX_SNOW_COVER).collect();
            Raster::from_parts(dimensions, plane, valid)?
        };
        let quality = Raster::new(dimensions, read_plane(rdr, footprint.len())?)?;
        let class = Raster::new(dimensions, read_plane(rdr, footprint.len())?)?;
        Ok(Self {
            name,
            footprint,
            bands: SnowBands {
                snow_cover,
                quality,
                class,
            },
        })
    }

    fn name(&self) -> &GranuleName {
        &self.name
    }

    fn footprint(&self) -> &Footprint {
        &self.footprint
    }
}

/// A monthly burned area granule.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnGranule {
    pub name: GranuleName,
    pub footprint: Footprint,

    /// Day of year of the burn, valid only where a burn was mapped.
    pub burn_date: Raster<i16>,

    /// Estimated uncertainty of the burn date, in days.
    pub uncertainty: Raster<u8>,

    /// Quality bit field.
    pub qa: Raster<u8>,
}

impl BurnGranule {
    /// Writes this granule in the `burn` granule layout.
    pub fn write<W: Write>(&self, mut wtr: W) -> io::Result<()> {
        for value in self.burn_date.iter() {
            wtr.write_i16::<BE>(value.unwrap_or_default())?;
        }
        for band in [&self.uncertainty, &self.qa] {
            for value in band.iter() {
                wtr.write_u8(value.unwrap_or_default())?;
            }
        }
        Ok(())
    }
}

impl Granule for BurnGranule {
    const EXTENSION: &'static str = "burn";
    const BYTES_PER_PIXEL: u64 = 4;

    fn decode<R: Read>(
        name: GranuleName,
        footprint: Footprint,
        rdr: &mut R,
    ) -> Result<Self, ModisError> {
        let dimensions = footprint.dimensions;
        let burn_date = {
            let mut plane = Vec::with_capacity(footprint.len());
            for _ in 0..footprint.len() {
                plane.push(rdr.read_i16::<BE>()?);
            }
            // 0 is unburned, negative values are unmapped or water.
            let valid = plane.iter().map(|v| *v > 0).collect();
            Raster::from_parts(dimensions, plane, valid)?
        };
        let uncertainty = Raster::new(dimensions, read_plane(rdr, footprint.len())?)?;
        let qa = Raster::new(dimensions, read_plane(rdr, footprint.len())?)?;
        Ok(Self {
            name,
            footprint,
            burn_date,
            uncertainty,
            qa,
        })
    }

    fn name(&self) -> &GranuleName {
        &self.name
    }

    fn footprint(&self) -> &Footprint {
        &self.footprint
    }
}

fn read_plane<R: Read>(rdr: &mut R, len: usize) -> Result<Vec<u8>, ModisError> {
    let mut plane = vec![0_u8; len];
    rdr.read_exact(&mut plane)?;
    Ok(plane)
}

/// Returns the name and footprint of the granule at `path` without
/// reading its samples.
fn inspect<G: Granule, P: AsRef<Path>>(path: P) -> Result<(GranuleName, Footprint), ModisError> {
    let name = GranuleName::parse(&path)?;
    let len = path.as_ref().metadata()?.len();
    let side = side_len(len, G::BYTES_PER_PIXEL)
        .ok_or_else(|| ModisError::GranuleLen(len, path.as_ref().to_owned()))?;
    Ok((name, Footprint::tile(name.tile, side)))
}

/// Returns the edge length of a square granule of `len` bytes.
fn side_len(len: u64, bytes_per_pixel: u64) -> Option<usize> {
    if len == 0 || len % bytes_per_pixel != 0 {
        return None;
    }
    let pixels = len / bytes_per_pixel;
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let side = (pixels as f64).sqrt().round() as u64;
    (side * side == pixels).then_some(usize::try_from(side).ok()?)
}
