//! Tracking module
//!
//! The landmark detection boundary:
//! - `LandmarkDetector`, the request interface the frame scheduler drives
//! - MediaPipe FaceMesh helper client (JSON over UDP)
//! - Helper subprocess management

pub mod mediapipe;
pub mod subprocess;

use futures::future::BoxFuture;

use crate::error::TrackingError;

/// One detected face: landmark triples in pixel space
pub type RawFace = Vec<[f32; 3]>;

/// External face landmark detector.
///
/// Each call is one detection request against the current video frame and
/// resolves to zero or more faces. Completion time is not under the caller's
/// control.
pub trait LandmarkDetector: Send + Sync {
    fn estimate_faces(&self) -> BoxFuture<'_, Result<Vec<RawFace>, TrackingError>>;
}
