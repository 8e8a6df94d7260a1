//! facepaint - AR face overlay renderer
//!
//! Renders a textured face mask (or a diagnostic wireframe/dot overlay) over a
//! stream of 3D face landmarks from an external detector:
//! - Landmark normalization and head pose estimation
//! - Deformable mask mesh with a translucent textured material
//! - Depth-scaled accessory anchored to the face
//! - Frame scheduling decoupled from the paint rate
//! - MediaPipe FaceMesh helper as landmark detector

pub mod accessory;
pub mod config;
mod delaunay;
pub mod error;
pub mod landmarks;
pub mod normalize;
pub mod overlay;
pub mod pose;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod topology;
pub mod tracking;

#[cfg(feature = "native-ui")]
pub mod ui;

pub use config::Config;
pub use error::{FacePaintError, Result};
pub use scheduler::{OverlayMode, RunState};
pub use session::{FacePaintSession, PaintReport, SessionWarning};

use std::sync::Arc;
use std::time::Duration;

use topology::Topology;
use tracking::{mediapipe::MpDetector, LandmarkDetector};

/// Load the configured topology asset, or calibrate one from the detector
/// when no asset is configured.
pub async fn resolve_topology(
    config: &Config,
    detector: &dyn LandmarkDetector,
) -> Result<Arc<Topology>> {
    let count = config.landmarks.count;
    let topology = match &config.landmarks.topology_path {
        Some(path) => Topology::from_file(count, path)?,
        None => {
            tracing::info!(
                "No topology asset configured, calibrating from the first detected face"
            );
            topology::calibrate(
                detector,
                count,
                Duration::from_millis(config.scheduler.tick_interval_ms),
                Duration::from_millis(config.landmarks.calibration_timeout_ms),
            )
            .await?
        }
    };
    Ok(Arc::new(topology))
}

/// Connect the configured landmark detector.
pub async fn connect_detector(config: &Config) -> Result<Arc<dyn LandmarkDetector>> {
    let detector = MpDetector::connect(&config.mediapipe).await?;
    Ok(Arc::new(detector))
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
