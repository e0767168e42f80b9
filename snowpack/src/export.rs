//! Handing products off to storage.

use crate::SnowpackError;
use geo::geometry::Coord;
use log::info;
use modis::{Footprint, Raster};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// A destination for finished products.
pub trait ExportSink {
    fn export_raster(
        &self,
        name: &str,
        raster: &Raster<f64>,
        footprint: &Footprint,
    ) -> Result<(), SnowpackError>;

    fn export_table(&self, name: &str, rows: &[PixelRow]) -> Result<(), SnowpackError>;
}

/// One valid pixel of a product, located by its center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRow {
    /// Position among the valid pixels of the product.
    pub index: usize,
    pub value: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Returns one row per valid pixel of `raster`.
pub fn pixel_table(
    raster: &Raster<f64>,
    footprint: &Footprint,
) -> Result<Vec<PixelRow>, SnowpackError> {
    raster.check_dimensions(footprint.dimensions)?;
    Ok(raster
        .iter()
        .enumerate()
        .filter_map(|(pixel, value)| value.map(|value| (pixel, value)))
        .enumerate()
        .map(|(index, (pixel, value))| {
            let Coord { x: lon, y: lat } = footprint.pixel_center(pixel);
            PixelRow {
                index,
                value,
                lat,
                lon,
            }
        })
        .collect())
}

#[derive(Debug, Serialize, Deserialize)]
struct RasterRecord {
    name: String,
    west: f64,
    north: f64,
    pixel_deg: f64,
    columns: usize,
    rows: usize,
    /// Row-major samples, `null` where masked.
    values: Vec<Option<f64>>,
}

/// Writes products as JSON files named `<prefix>-<name>.json`.
pub struct DirSink {
    dir: PathBuf,
    prefix: String,
}

impl DirSink {
    pub fn new(dir: PathBuf, prefix: String) -> Result<Self, SnowpackError> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, prefix })
    }

    /// Returns the storage name for the product `name`.
    pub fn asset_name(&self, name: &str) -> String {
        format!("{}-{name}", self.prefix)
    }

    /// Returns the path product `name` is written to.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", self.asset_name(name)))
    }

    fn write<T: Serialize>(&self, name: &str, record: &T) -> Result<PathBuf, SnowpackError> {
        let path = self.path(name);
        let tmp_path = path.with_extension("tmp");
        let mut wtr = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer(&mut wtr, record)?;
        wtr.flush()?;
        fs::rename(tmp_path, &path)?;
        Ok(path)
    }
}

impl ExportSink for DirSink {
    fn export_raster(
        &self,
        name: &str,
        raster: &Raster<f64>,
        footprint: &Footprint,
    ) -> Result<(), SnowpackError> {
        raster.check_dimensions(footprint.dimensions)?;
        let record = RasterRecord {
            name: self.asset_name(name),
            west: footprint.nw_corner.x,
            north: footprint.nw_corner.y,
            pixel_deg: footprint.pixel_deg,
            columns: footprint.dimensions.0,
            rows: footprint.dimensions.1,
            values: raster.iter().collect(),
        };
        let path = self.write(name, &record)?;
        info!(
            "exported {} with {} valid pixels to {path:?}",
            record.name,
            raster.valid_count()
        );
        Ok(())
    }

    fn export_table(&self, name: &str, rows: &[PixelRow]) -> Result<(), SnowpackError> {
        let path = self.write(name, &rows)?;
        info!("exported {} rows to {path:?}", rows.len());
        Ok(())
    }
}

/// Reads a raster previously written by [DirSink].
pub fn read_raster(path: &Path) -> Result<(Raster<f64>, Footprint), SnowpackError> {
    let record: RasterRecord = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let dimensions = (record.columns, record.rows);
    let valid = record.values.iter().map(Option::is_some).collect();
    let values = record.values.iter().map(|v| v.unwrap_or_default()).collect();
    let raster = Raster::from_parts(dimensions, values, valid)?;
    let footprint = Footprint {
        nw_corner: Coord {
            x: record.west,
            y: record.north,
        },
        pixel_deg: record.pixel_deg,
        dimensions,
    };
    Ok((raster, footprint))
}

#[cfg(test)]
mod tests {
    use super::{pixel_table, read_raster, DirSink, ExportSink, PixelRow};
    use crate::SnowpackError;
    use geo::geometry::Coord;
    use modis::{Footprint, ModisError, Raster};

    fn product() -> (Raster<f64>, Footprint) {
        let raster =
            Raster::from_parts((2, 2), vec![1.5, 0.0, 0.0, 42.0], vec![true, false, false, true])
                .unwrap();
        (raster, Footprint::tile(Coord { x: -72, y: 44 }, 2))
    }

    #[test]
    fn test_pixel_table() {
        let (raster, footprint) = product();
        let rows = pixel_table(&raster, &footprint).unwrap();
        assert_eq!(
            rows,
            vec![
                PixelRow {
                    index: 0,
                    value: 1.5,
                    lat: 44.75,
                    lon: -71.75
                },
                PixelRow {
                    index: 1,
                    value: 42.0,
                    lat: 44.25,
                    lon: -71.25
                },
            ]
        );
        let wrong = Footprint::tile(Coord { x: -72, y: 44 }, 3);
        assert!(pixel_table(&raster, &wrong).is_err());
    }

    #[test]
    fn test_read_raster_rejects_huge_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.json");
        let record = format!(
            r#"{{"name":"x","west":0.0,"north":1.0,"pixel_deg":1.0,"columns":{},"rows":2,"values":[null]}}"#,
            usize::MAX
        );
        std::fs::write(&path, record).unwrap();
        assert!(matches!(
            read_raster(&path),
            Err(SnowpackError::Modis(ModisError::TooLarge(_)))
        ));
    }

    #[test]
    fn test_dir_sink() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirSink::new(dir.path().join("out"), "burnSnow".to_string()).unwrap();
        let (raster, footprint) = product();
        sink.export_raster("SnowArea20001001to20191001", &raster, &footprint)
            .unwrap();
        let path = dir
            .path()
            .join("out")
            .join("burnSnow-SnowArea20001001to20191001.json");
        assert_eq!(sink.path("SnowArea20001001to20191001"), path);
        assert_eq!(read_raster(&path).unwrap(), (raster.clone(), footprint));

        let rows = pixel_table(&raster, &footprint).unwrap();
        sink.export_table("burnCSV-once", &rows).unwrap();
        let table: Vec<PixelRow> = serde_json::from_reader(
            std::fs::File::open(sink.path("burnCSV-once")).unwrap(),
        )
        .unwrap();
        assert_eq!(table, rows);
    }
}
