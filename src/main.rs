//! facepaint - AR face overlay renderer
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use facepaint::{
    config::{Config, MediaPipeConfig},
    render::{HeadlessBackend, ImageTextureLoader},
    topology::Topology,
    tracking::{
        subprocess::{check_mediapipe_available, MpSubprocess},
        LandmarkDetector,
    },
    FacePaintSession, OverlayMode,
};

/// facepaint - face mask and accessory overlay driven by a landmark detector
#[derive(Parser, Debug)]
#[command(name = "facepaint", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Overlay mode at startup: "mask" or "dots" (overrides config)
    #[arg(short, long)]
    mode: Option<OverlayMode>,

    /// Mask catalog index at startup (overrides config)
    #[arg(long)]
    mask: Option<usize>,

    /// Attach the glasses accessory at startup
    #[arg(long)]
    accessory: bool,

    /// Do not launch the detector helper subprocess
    #[arg(long)]
    no_launch: bool,

    /// Launch native UI window
    #[cfg(feature = "native-ui")]
    #[arg(long)]
    ui: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", facepaint::NAME, facepaint::VERSION);

    let config = load_config(&args)?;

    info!("Canvas: {}x{}", config.canvas.width, config.canvas.height);
    info!("Overlay mode: {}", config.mode);
    info!(
        "Detector: {}:{} (auto-launch: {})",
        config.mediapipe.host, config.mediapipe.port, config.mediapipe.auto_launch
    );

    // Build tokio runtime manually so the main thread stays free for the UI event loop
    let runtime = tokio::runtime::Runtime::new()?;
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    if config.mediapipe.auto_launch && !args.no_launch {
        let mp_config = config.mediapipe.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        runtime.spawn(async move {
            if let Err(e) = supervise_helper(mp_config, shutdown_rx).await {
                error!("Detector helper error: {}", e);
            }
        });
    }

    let detector = runtime.block_on(facepaint::connect_detector(&config))?;
    let topology = runtime.block_on(async {
        tokio::select! {
            topology = facepaint::resolve_topology(&config, detector.as_ref()) => {
                topology.map_err(anyhow::Error::from)
            }
            _ = shutdown_signal() => Err(anyhow::anyhow!("Interrupted before the topology was ready")),
        }
    });
    let topology = match topology {
        Ok(topology) => topology,
        Err(e) => {
            let _ = shutdown_tx.send(());
            runtime.shutdown_timeout(Duration::from_secs(3));
            return Err(e);
        }
    };

    #[cfg(feature = "native-ui")]
    if args.ui {
        info!("Launching native UI window");

        // Session tasks are spawned from inside the eframe event loop
        let guard = runtime.enter();

        if let Err(e) = facepaint::ui::FacePaintApp::run(config, topology, detector) {
            error!("UI error: {}", e);
        }

        info!("UI window closed, shutting down");
        let _ = shutdown_tx.send(());
        drop(guard);

        runtime.shutdown_timeout(Duration::from_secs(3));
        return Ok(());
    }

    let result = runtime.block_on(run_headless(config, topology, detector));

    let _ = shutdown_tx.send(());
    runtime.shutdown_timeout(Duration::from_secs(3));

    info!("facepaint stopped");
    result
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(mask) = args.mask {
        config.initial_mask = mask;
    }
    if args.accessory {
        config.accessory.attach_on_start = true;
    }

    config.validate()?;
    Ok(config)
}

/// Drive a session without a window: paint at the configured rate until
/// Ctrl+C / SIGTERM.
async fn run_headless(
    config: Config,
    topology: Arc<Topology>,
    detector: Arc<dyn LandmarkDetector>,
) -> anyhow::Result<()> {
    let mut session = FacePaintSession::new(
        &config,
        topology,
        detector,
        Arc::new(ImageTextureLoader),
        Box::new(HeadlessBackend::new()),
    )?;
    session.set_mask_index(config.initial_mask)?;
    session.start()?;

    let period = Duration::from_secs_f64(1.0 / config.scheduler.paint_fps as f64);
    let mut paint = tokio::time::interval(period);
    paint.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut applied: u64 = 0;
    loop {
        tokio::select! {
            _ = paint.tick() => {
                match session.on_paint() {
                    Ok(report) => {
                        if report.applied.is_some() {
                            applied += 1;
                        }
                        for warning in &report.warnings {
                            warn!("{}", warning);
                        }
                    }
                    Err(e) if e.is_fatal() => {
                        error!("Session faulted: {}", e);
                        session.teardown();
                        return Err(e.into());
                    }
                    Err(e) => warn!("Paint failed: {}", e),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Applied {} frames", applied);
    session.teardown();
    Ok(())
}

/// Keep the detector helper subprocess alive until shutdown.
async fn supervise_helper(
    mp_config: MediaPipeConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let available = tokio::task::spawn_blocking(check_mediapipe_available)
        .await
        .unwrap_or(false);
    if !available {
        warn!("python3 with mediapipe not found; the detector helper will likely fail");
    }

    let mut helper = MpSubprocess::new(&mp_config);
    helper.start()?;

    let mut health = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = health.tick() => {
                if !helper.is_running() && mp_config.auto_restart {
                    info!(
                        "Detector helper exited, restarting in {}s",
                        mp_config.restart_delay_secs
                    );
                    tokio::time::sleep(Duration::from_secs(mp_config.restart_delay_secs)).await;
                    if let Err(e) = helper.start() {
                        error!("Failed to restart detector helper: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Detector helper shutting down");
                break;
            }
        }
    }

    helper.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
