mod burned;
mod options;
mod persistence;
mod progress;
mod seasonal;

use anyhow::Result;
use clap::Parser;
use options::Cli;
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli {
        Cli::Persistence(persistence) => persistence.run(),
        Cli::Seasonal(seasonal) => seasonal.run(),
        Cli::BurnedOnce(burned_once) => burned_once.run(),
        Cli::NeverBurned(never_burned) => never_burned.run(),
    }
}
