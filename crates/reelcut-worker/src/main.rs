//! reelcut binary.

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};

use reelcut_media::{check_ffmpeg, check_ffprobe};
use reelcut_worker::{init_tracing, BatchDriver, Cli, PipelineConfig, PipelineServices};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env();
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;
    info!("Pipeline config: {:?}", config);

    let urls = cli.collect_urls().await.context("failed to read URLs")?;
    if urls.is_empty() {
        bail!("no URLs given; pass --url or --urls-file");
    }

    check_ffmpeg().context("ffmpeg is required")?;
    check_ffprobe().context("ffprobe is required")?;
    if config.background.is_some() && config.pick_background(0).await.is_none() {
        warn!("No background video found, clips will be padded with black");
    }

    let services = PipelineServices::from_config(&config);
    let driver = BatchDriver::new(config, services);
    let report = driver.run(urls).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.summary());
    }

    if report.outputs.is_empty() && !report.failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
