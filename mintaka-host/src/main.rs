//! Mintaka host — entry point.
//!
//! ```text
//! mintaka-host                  Run in the foreground
//! mintaka-host --config <path>  Load a custom config TOML
//! mintaka-host --gen-config     Write default config to stdout
//! mintaka-host --no-audio       Synthetic visualizer only
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mintaka_host::config::HostConfig;
use mintaka_host::service::HostService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mintaka-host", about = "Mintaka macropad OLED host")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "mintaka-host.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Disable audio capture.
    #[arg(long)]
    no_audio: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let (mut config, source) = HostConfig::load(&cli.config);
    if cli.no_audio {
        config.audio.enabled = false;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    source.log(&cli.config);

    info!("mintaka-host v{}", env!("CARGO_PKG_VERSION"));
    info!("device: {}", config.device.ids());
    info!("font: {}", config.screens.font);
    info!("media player: {}", config.screens.media_player);

    let service = HostService::new(config);
    let stop = service.stop_handle();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.cancel();
    });

    service.run().await?;

    Ok(())
}
