//! camera-bridge server binary

mod api;
mod config;
mod context;
mod device;
mod hub;
mod state;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use common::{DeviceCommand, create_device_bridge, setup_logging};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "camera-bridge")]
#[command(author, version, about = "Bridge a local image sensor control process to network clients")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save the default configuration and exit
    #[arg(long)]
    save_config: bool,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Sensor control socket path override
    #[arg(long, value_name = "PATH")]
    socket_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = config::BridgeConfig::default();
        let path = config::BridgeConfig::default_path();
        config
            .save(&path)
            .context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let mut config = if args.config.is_some() {
        config::BridgeConfig::load(args.config.clone()).context("Failed to load configuration")?
    } else {
        config::BridgeConfig::load_or_default()
    };
    if let Some(path) = args.socket_path {
        config.device.socket_path = path;
    }

    let log_level = args.log_level.as_deref().unwrap_or(&config.server.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("camera-bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("Control socket: {}", config.device.socket_path.display());

    let (device, worker) = create_device_bridge();
    let worker_handle = device::spawn_device_worker(worker, config.device.clone());

    let store = Arc::new(state::StateStore::new());
    let (hub, _hub_task) = hub::spawn_hub(store.clone());

    let ctx = Arc::new(context::BridgeContext {
        store,
        hub,
        device: device.clone(),
        session_queue_depth: config.sessions.queue_depth,
        write_timeout: Duration::from_secs(config.sessions.write_timeout_secs),
    });

    let app = api::router(ctx.clone(), config.server.static_dir.as_deref());
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("Listening on http://{}", config.server.bind_addr);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {:#}", e);
        }
    });

    let pump = tokio::spawn(context::run_telemetry_pump(ctx.clone()));

    let result = tokio::select! {
        res = pump => {
            match res {
                Ok(Err(e)) => error!("Telemetry stream lost: {}", e),
                Ok(Ok(())) => error!("Telemetry pump exited unexpectedly"),
                Err(e) => error!("Telemetry pump panicked: {}", e),
            }
            Err(anyhow!("Device channel disconnected"))
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    };

    server.abort();
    let _ = device.send_command(DeviceCommand::Shutdown).await;
    match worker_handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Device worker exited with error: {}", e),
        Err(_) => error!("Device worker thread panicked"),
    }

    result
}
