//! panelgate entry point.
//!
//! ```text
//! panelgate                      Run in the foreground
//! panelgate --config <path>      Load a custom config TOML
//! panelgate --gen-config         Write default config to stdout
//! panelgate --host <h> --port <p> Override the controller endpoint
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use panelgate::bridge::JsonLineBridge;
use panelgate::config::GatewayConfig;
use panelgate_core::Engine;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "panelgate", about = "Panel gateway for NetLinx-style controllers")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "panelgate.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Controller host, overriding the config file.
    #[arg(long)]
    host: Option<String>,

    /// Controller port, overriding the config file.
    #[arg(long)]
    port: Option<u16>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&GatewayConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config. Problems are reported once tracing is up.
    let loaded = GatewayConfig::read(&cli.config);
    let mut config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => GatewayConfig::default(),
    };
    if let Some(host) = cli.host {
        config.controller.host = host;
    }
    if let Some(port) = cli.port {
        config.controller.port = port;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match loaded {
        Ok(Some(_)) => info!("config: {}", cli.config.display()),
        Ok(None) => info!("no config at {}; using defaults", cli.config.display()),
        Err(e) => warn!("{e}; using defaults"),
    }

    let engine_config = config.to_engine_config()?;
    info!("panelgate v{}", env!("CARGO_PKG_VERSION"));
    info!("controller: {}:{}", engine_config.host, engine_config.port);
    info!("panel: {}:{}:{}", engine_config.device, engine_config.panel_port, engine_config.system);
    info!("assets: {}", engine_config.transfer.asset_root.display());

    let engine = Engine::new(engine_config, Arc::new(JsonLineBridge::new()));
    let handle = engine.handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        handle.shutdown();
    });

    if let Err(e) = engine.run().await {
        error!("engine stopped: {e}");
        return Err(e.into());
    }
    Ok(())
}
