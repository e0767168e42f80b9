use crate::options::{BurnInput, BurnedOnce, NeverBurned, Output};
use anyhow::{bail, Result};
use log::info;
use snowpack::{
    burn::{
        burn_counts, burned_once, burned_once_name, good_burns, never_burned, never_burned_name,
        table_name,
    },
    export::{pixel_table, read_raster, DirSink, ExportSink},
    modis::{BurnGranule, Footprint, Raster},
    DayRange, GranuleDir, GranuleSource,
};

/// Burn granules of one tile and the snow area within it.
struct BurnContext {
    source: GranuleDir<BurnGranule>,
    history: DayRange,
    snow_area: Raster<f64>,
    footprint: Footprint,
}

impl BurnInput {
    fn open(&self) -> Result<BurnContext> {
        let history = DayRange::new(self.history_start, self.history_end)?;
        let source =
            GranuleDir::<BurnGranule>::new(self.burn_dir.clone(), self.tile.0, self.mode.into())?;
        let footprint = source.footprint();
        let (snow_area, area_footprint) = read_raster(&self.snow_area)?;
        if area_footprint != footprint {
            bail!(
                "snow area {:?} does not cover the burn granules in {:?}",
                self.snow_area,
                source.dir()
            );
        }
        Ok(BurnContext {
            source,
            history,
            snow_area,
            footprint,
        })
    }
}

impl Output {
    /// Writes `raster` and its pixel table.
    fn export(&self, name: &str, raster: &Raster<f64>, footprint: &Footprint) -> Result<()> {
        let sink = DirSink::new(self.out_dir.clone(), self.prefix.clone())?;
        sink.export_raster(name, raster, footprint)?;
        let rows = pixel_table(raster, footprint)?;
        sink.export_table(&table_name(name), &rows)?;
        Ok(())
    }
}

impl BurnedOnce {
    pub fn run(&self) -> Result<()> {
        let range = DayRange::new(self.start, self.end)?;
        let ctx = self.burns.open()?;
        let history = ctx
            .source
            .granules(ctx.history.start(), ctx.history.end())?;
        let counts = burn_counts(&history)?;
        let burns = good_burns(&ctx.source, range.start(), range.end())?;
        info!("{} burn granules in {}", burns.len(), range.label());
        let once = burned_once(&burns, &ctx.snow_area, &counts)?;
        self.output
            .export(&burned_once_name(&range), &once, &ctx.footprint)
    }
}

impl NeverBurned {
    pub fn run(&self) -> Result<()> {
        let ctx = self.burns.open()?;
        let history = ctx
            .source
            .granules(ctx.history.start(), ctx.history.end())?;
        info!(
            "{} burn granules in {}",
            history.len(),
            ctx.history.label()
        );
        let never = never_burned(&history, &ctx.snow_area)?.map(f64::from);
        self.output
            .export(&never_burned_name(&ctx.history), &never, &ctx.footprint)
    }
}
