use clap::Parser;
use std::path::PathBuf;
use warmstash_cache::config::DIR_ENV;
use warmstash_cache::{CacheConfig, FileCache};

mod commands;
mod logging;

use commands::Commands;

#[derive(Parser)]
#[command(name = "warmstash")]
#[command(about = "Inspect and maintain a warmstash cache directory", long_about = None)]
#[command(version)]
struct Cli {
    /// Cache root directory
    #[arg(long, env = DIR_ENV, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    logging::init()?;

    let cli = Cli::parse();

    let mut config = CacheConfig::from_env()?;
    if let Some(dir) = cli.dir {
        config.root = dir;
    }
    let cache = FileCache::new(config)?;

    cli.command.execute(&cache)
}
