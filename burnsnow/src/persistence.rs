use crate::{options::Persistence, progress};
use anyhow::Result;
use log::info;
use snowpack::{
    export::{DirSink, ExportSink},
    modis::{tile_name, SnowGranule},
    persistence::yearly_persistence,
    DayRange, GranuleDir, GranuleSource,
};

impl Persistence {
    pub fn run(&self) -> Result<()> {
        let range = DayRange::new(self.start, self.end)?;
        let source = GranuleDir::<SnowGranule>::new(
            self.snow_dir.clone(),
            self.tile.0,
            self.mode.into(),
        )?;
        let footprint = source.footprint();
        let sink = DirSink::new(self.output.out_dir.clone(), self.output.prefix.clone())?;

        let years = yearly_persistence(&source, range.start(), range.end(), self.basis.into())?;
        let pb = progress::bar(
            format!("Export snow persistence {}", tile_name(self.tile.0)),
            years.len() as u64,
        );
        for year in years {
            sink.export_raster(&year.name(), &year.raster, &footprint)?;
            pb.inc(1);
        }
        pb.finish();
        info!("persistence written to {:?}", self.output.out_dir);
        Ok(())
    }
}
