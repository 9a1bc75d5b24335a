//! ErgCast Daemon - live erg telemetry over WebSocket
//!
//! Polls a Concept 2 erg, detects workouts and strokes, and broadcasts the
//! resulting events to every connected client as JSON text frames.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn, Level};

use ergcast_broadcaster::{stdout_subscriber, EventBroadcaster, WebSocketServer};
use ergcast_daemon::{
    DaemonConfig, DeliveryBackend, PipelineOutcome, SamplingLoop, WorkoutRecorder, SHUTDOWN_TEXT,
};
use ergcast_detect::Event;
use ergcast_device::{DeviceProvider, ReplayOptions, ReplayProvider, ScriptedProvider};

#[derive(Parser, Debug)]
#[command(name = "ergcast-daemon", version, about = "Stream live erg telemetry to WebSocket clients")]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Device poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Replay a recorded workout CSV instead of a physical erg
    #[arg(long, value_name = "CSV")]
    replay: Option<PathBuf>,

    /// Where events are delivered
    #[arg(long, value_enum)]
    delivery: Option<DeliveryBackend>,

    /// Export each finished workout as CSV
    #[arg(long)]
    export_csv: bool,

    /// Directory for exported workouts (implies --export-csv)
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut DaemonConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(delivery) = self.delivery {
            config.delivery = delivery;
        }
        if self.export_csv {
            config.export_csv = true;
        }
        if let Some(dir) = &self.export_dir {
            config.export_csv = true;
            config.export_dir = Some(dir.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout delivery stays clean JSON
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    info!("🚣 Starting ErgCast Daemon v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => DaemonConfig::load_from(path),
        None => DaemonConfig::load(),
    }
    .context("Failed to load configuration")?;
    cli.apply(&mut config);

    info!("📋 Configuration loaded from {}", config.config_path.display());
    info!("  - Poll interval: {} ms", config.poll_interval_ms);
    info!("  - Delivery: {}", config.delivery);

    let broadcaster = Arc::new(EventBroadcaster::new());

    let (server, stdout_writer) = match config.delivery {
        DeliveryBackend::Websocket => {
            let server = WebSocketServer::new(config.server_config(), Arc::clone(&broadcaster));
            let addr = server
                .start()
                .await
                .context("Failed to start WebSocket server")?;
            info!("🔌 Clients can connect to ws://{}", addr);
            (Some(server), None)
        }
        DeliveryBackend::Stdout => {
            let (subscriber, writer) = stdout_subscriber(config.subscriber_queue_capacity)
                .context("Failed to start stdout writer")?;
            broadcaster.subscribe(subscriber);
            (None, Some(writer))
        }
    };

    let provider: Box<dyn DeviceProvider> = match &cli.replay {
        Some(path) => Box::new(
            ReplayProvider::open_log(path, &ReplayOptions::default())
                .with_context(|| format!("Failed to load replay log {}", path.display()))?,
        ),
        // No USB transport is bundled; without a replay log there is nothing to find
        None => Box::new(ScriptedProvider::empty()),
    };

    let mut sampling = SamplingLoop::new(provider, Arc::clone(&broadcaster), config.poll_interval());
    if config.export_csv {
        let dir = config.workouts_dir().context("Failed to prepare export directory")?;
        info!("💾 Exporting workouts to {}", dir.display());
        sampling = sampling.with_recorder(WorkoutRecorder::new(dir));
    }

    let shutdown = sampling.shutdown_handle();
    let mut task = tokio::task::spawn_blocking(move || sampling.run());

    info!("🚀 ErgCast daemon ready!");

    let outcome = tokio::select! {
        result = &mut task => result.context("Sampling task panicked")?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            shutdown.store(true, Ordering::SeqCst);
            task.await.context("Sampling task panicked")?
        }
    };

    let outcome = match outcome {
        Ok(PipelineOutcome::NoDevice) => {
            warn!("No erg available");
            Ok(())
        }
        Ok(PipelineOutcome::Stopped) => Ok(()),
        Ok(PipelineOutcome::DeviceLost(reason)) => {
            error!("Erg connection lost: {}", reason);
            Ok(())
        }
        Err(e) => {
            error!("Sampling failed: {:#}", e);
            Err(e)
        }
    };

    if let Err(e) = broadcaster.publish(&Event::notice(SHUTDOWN_TEXT)) {
        warn!("Failed to publish shutdown notice: {}", e);
    }
    broadcaster.close_all();

    if let Some(server) = server {
        if let Err(e) = server.stop().await {
            warn!("Failed to stop WebSocket server: {}", e);
        }
    }

    // Let the writer thread flush what is still queued, including the notice above
    if let Some(writer) = stdout_writer {
        let flushed = tokio::task::spawn_blocking(move || writer.join());
        if tokio::time::timeout(config.server_config().send_timeout, flushed)
            .await
            .is_err()
        {
            warn!("stdout writer did not drain before exit");
        }
    }

    info!("👋 ErgCast daemon stopped");
    outcome
}
