use anyhow::Result;
use clap::Parser;
use log::info;

use cubelens::config::Cli;
use cubelens::pipeline;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config()?;
    let artifacts = pipeline::run(&config)?;

    info!(
        "analysis complete: {} files in {}",
        artifacts.files.len(),
        config.output_dir.display()
    );
    Ok(())
}
