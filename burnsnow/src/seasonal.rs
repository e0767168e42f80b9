use crate::options::Seasonal;
use anyhow::{bail, Result};
use log::info;
use rayon::prelude::*;
use snowpack::{
    export::{read_raster, DirSink, ExportSink},
    persistence::{mean_persistence, seasonal_name, seasonal_snow_area},
    DayRange,
};

impl Seasonal {
    pub fn run(&self) -> Result<()> {
        let range = DayRange::new(self.start, self.end)?;
        let products = self
            .input
            .par_iter()
            .map(|path| read_raster(path))
            .collect::<Result<Vec<_>, _>>()?;
        let Some((_, footprint)) = products.first() else {
            bail!("no persistence products given");
        };
        let footprint = *footprint;
        if let Some((path, _)) = self
            .input
            .iter()
            .zip(&products)
            .find(|(_, (_, other))| *other != footprint)
        {
            bail!("{path:?} does not cover the same footprint as {:?}", self.input[0]);
        }

        let rasters: Vec<_> = products.into_iter().map(|(raster, _)| raster).collect();
        let mean = mean_persistence(&rasters)?;
        let area = seasonal_snow_area(&mean);
        info!(
            "seasonal snow area covers {} of {} pixels",
            area.valid_count(),
            area.len()
        );
        let sink = DirSink::new(self.output.out_dir.clone(), self.output.prefix.clone())?;
        sink.export_raster(&seasonal_name(&range), &area, &footprint)?;
        Ok(())
    }
}
