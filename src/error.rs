//! Error types for facepaint

use thiserror::Error;

/// Main error type for facepaint
#[derive(Error, Debug)]
pub enum FacePaintError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Landmark error: {0}")]
    Landmark(#[from] LandmarkError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl FacePaintError {
    /// Whether the session has to be reset before it can run again.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FacePaintError::Landmark(LandmarkError::CountMismatch { .. })
                | FacePaintError::Session(SessionError::Faulted(_))
        )
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors raised while building the mesh topology
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Failed to read topology asset: {0}")]
    ReadFile(String),

    #[error("Failed to parse topology asset: {0}")]
    Parse(String),

    #[error("Index buffer length {0} is not a multiple of 3")]
    RaggedIndices(usize),

    #[error("Face index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("Expected {expected} UV pairs, got {actual}")]
    UvCount { expected: usize, actual: usize },

    #[error("Expected {expected} base positions, got {actual}")]
    BasePositionCount { expected: usize, actual: usize },

    #[error("Topology has no vertices")]
    Empty,

    #[error("Landmarks do not span a surface: {0} triangles for {1} points")]
    Untriangulable(usize, usize),

    #[error("No face seen within {0} ms to calibrate the topology from")]
    CalibrationTimeout(u64),
}

/// Landmark frame errors
#[derive(Error, Debug)]
pub enum LandmarkError {
    /// The detector produced a different landmark count than the session was built for.
    #[error("Landmark count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Pose estimation errors (recoverable, the frame's rotation update is skipped)
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum PoseError {
    #[error("Degenerate pose input: zero-length vector")]
    Degenerate,
}

/// Landmark detector errors (MediaPipe helper transport and subprocess)
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Detector connection error: {0}")]
    Connection(String),

    #[error("Detector request timed out after {0} ms")]
    Timeout(u64),

    #[error("Detector response parse error: {0}")]
    Parse(String),

    #[error("Detector subprocess error: {0}")]
    Subprocess(String),
}

/// Rendering backend errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Mesh buffer length {actual} does not match {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("Render backend failure: {0}")]
    Backend(String),

    #[error("Failed to load accessory model: {0}")]
    AccessoryModel(String),
}

/// Mask texture loading errors
#[derive(Error, Debug, Clone)]
pub enum TextureError {
    #[error("Texture not found: {0}")]
    NotFound(String),

    #[error("Failed to decode texture {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Texture load task failed: {0}")]
    Task(String),
}

/// Session lifecycle errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session faulted and must be reset: {0}")]
    Faulted(String),

    #[error("Mask index {index} out of range ({count} masks)")]
    MaskIndex { index: usize, count: usize },
}

/// Result type alias for facepaint operations
pub type Result<T> = std::result::Result<T, FacePaintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_count_mismatch_and_fault_are_fatal() {
        let mismatch: FacePaintError = LandmarkError::CountMismatch {
            expected: 468,
            actual: 10,
        }
        .into();
        assert!(mismatch.is_fatal());

        let faulted: FacePaintError = SessionError::Faulted("count".to_string()).into();
        assert!(faulted.is_fatal());

        let timeout: FacePaintError = TrackingError::Timeout(500).into();
        assert!(!timeout.is_fatal());

        let calibration: FacePaintError = TopologyError::CalibrationTimeout(15_000).into();
        assert!(!calibration.is_fatal());
        assert!(calibration.to_string().contains("15000 ms"));
    }
}
