use anyhow::{anyhow, Error as AnyError};
use chrono::NaiveDate;
use clap::{Args, Parser, ValueEnum};
use geo::geometry::Coord;
use snowpack::{modis::parse_tile, persistence::Basis, ReadMode};
use std::{path::PathBuf, str::FromStr};

/// Snow persistence and burn products from MODIS granules.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub enum Cli {
    /// Compute snow persistence for every hydrological year in a
    /// range.
    Persistence(Persistence),

    /// Combine yearly persistence products into a seasonal snow area.
    Seasonal(Seasonal),

    /// Extract pixels of the snow area which burned exactly once.
    BurnedOnce(BurnedOnce),

    /// Extract pixels of the snow area which never burned.
    NeverBurned(NeverBurned),
}

/// Where products are written.
#[derive(Debug, Clone, Args)]
pub struct Output {
    /// Output directory.
    #[arg(short, long)]
    pub out_dir: PathBuf,

    /// Prefix prepended to every product name.
    #[arg(short, long, default_value = "burnSnow")]
    pub prefix: String,
}

#[derive(Debug, Clone, Args)]
pub struct Persistence {
    /// Directory containing daily `.snow` granules.
    #[arg(short, long)]
    pub snow_dir: PathBuf,

    /// Tile to process, e.g. "N44W072".
    #[arg(short, long)]
    pub tile: Tile,

    /// First day, inclusive ("yyyy-mm-dd").
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day, exclusive ("yyyy-mm-dd").
    #[arg(long)]
    pub end: NaiveDate,

    /// Days a persistence percentage is taken over.
    #[arg(short, long, value_enum, default_value_t = BasisArg::Valid)]
    pub basis: BasisArg,

    #[arg(short, long, value_enum, default_value_t = Mode::InMem)]
    pub mode: Mode,

    #[command(flatten)]
    pub output: Output,
}

#[derive(Debug, Clone, Args)]
pub struct Seasonal {
    /// First day covered by the inputs ("yyyy-mm-dd"), used in the
    /// product name.
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day covered by the inputs, exclusive.
    #[arg(long)]
    pub end: NaiveDate,

    #[command(flatten)]
    pub output: Output,

    /// Yearly persistence products.
    #[arg(required = true)]
    pub input: Vec<PathBuf>,
}

/// Burn granules and the snow area they are restricted to.
#[derive(Debug, Clone, Args)]
pub struct BurnInput {
    /// Directory containing monthly `.burn` granules.
    #[arg(short, long)]
    pub burn_dir: PathBuf,

    /// Tile to process, e.g. "N44W072".
    #[arg(short, long)]
    pub tile: Tile,

    /// Seasonal snow area product.
    #[arg(long)]
    pub snow_area: PathBuf,

    /// First day of the burn history used to count burns.
    #[arg(long)]
    pub history_start: NaiveDate,

    /// Last day of the burn history, exclusive.
    #[arg(long)]
    pub history_end: NaiveDate,

    #[arg(short, long, value_enum, default_value_t = Mode::InMem)]
    pub mode: Mode,
}

#[derive(Debug, Clone, Args)]
pub struct BurnedOnce {
    #[command(flatten)]
    pub burns: BurnInput,

    /// First day of burns to extract.
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day of burns to extract, exclusive.
    #[arg(long)]
    pub end: NaiveDate,

    #[command(flatten)]
    pub output: Output,
}

#[derive(Debug, Clone, Args)]
pub struct NeverBurned {
    #[command(flatten)]
    pub burns: BurnInput,

    #[command(flatten)]
    pub output: Output,
}

#[derive(Clone, Copy, Debug)]
pub struct Tile(pub Coord<i16>);

impl FromStr for Tile {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        parse_tile(s)
            .map(Self)
            .ok_or_else(|| anyhow!("not a valid tile name, expected e.g. N44W072"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Read granules with buffered IO.
    InMem,
    /// Memory map granules.
    MemMap,
}

impl From<Mode> for ReadMode {
    fn from(mode: Mode) -> ReadMode {
        match mode {
            Mode::InMem => ReadMode::InMem,
            Mode::MemMap => ReadMode::MemMap,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BasisArg {
    /// Days with a valid snow cover value.
    Valid,
    /// Every day of the hydrological year.
    All,
}

impl From<BasisArg> for Basis {
    fn from(basis: BasisArg) -> Basis {
        match basis {
            BasisArg::Valid => Basis::ValidDays,
            BasisArg::All => Basis::AllDays,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BasisArg, Cli, Mode};
    use clap::Parser;
    use geo::geometry::Coord;

    #[test]
    fn test_parse_persistence() {
        let cli = Cli::try_parse_from([
            "burnsnow",
            "persistence",
            "--snow-dir",
            "/data/snow",
            "--tile",
            "N44W072",
            "--start",
            "2018-10-01",
            "--end",
            "2019-10-01",
            "--out-dir",
            "/tmp/out",
            "--mode",
            "mem-map",
        ])
        .unwrap();
        let Cli::Persistence(args) = cli else {
            panic!("expected persistence subcommand");
        };
        assert_eq!(args.tile.0, Coord { x: -72, y: 44 });
        assert_eq!(args.mode, Mode::MemMap);
        assert_eq!(args.basis, BasisArg::Valid);
        assert_eq!(args.output.prefix, "burnSnow");
    }

    #[test]
    fn test_bad_tile_is_rejected() {
        let res = Cli::try_parse_from([
            "burnsnow",
            "never-burned",
            "--burn-dir",
            "/data/burn",
            "--tile",
            "44W072",
            "--snow-area",
            "area.json",
            "--history-start",
            "2000-10-01",
            "--history-end",
            "2020-10-01",
            "--out-dir",
            "/tmp/out",
        ]);
        assert!(res.is_err());
    }
}
