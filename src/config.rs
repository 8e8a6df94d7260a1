//! Configuration parsing and management for facepaint

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, FacePaintError};
use crate::scheduler::OverlayMode;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub canvas: CanvasConfig,
    pub scheduler: SchedulerConfig,
    pub landmarks: LandmarkConfig,
    pub normalize: NormalizeConfig,
    pub accessory: AccessoryConfig,
    /// Render path at startup ("mask" or "dots")
    pub mode: OverlayMode,
    /// Index into `masks` selected at startup
    pub initial_mask: usize,
    /// Mask catalog: display label + texture path
    pub masks: Vec<MaskEntry>,
    pub mediapipe: MediaPipeConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FacePaintError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, FacePaintError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, FacePaintError> {
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), FacePaintError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(invalid("canvas", "Canvas width and height must be greater than 0"));
        }

        if self.scheduler.tick_interval_ms == 0 {
            return Err(invalid(
                "scheduler.tick_interval_ms",
                "Tick interval must be greater than 0",
            ));
        }

        if self.scheduler.paint_fps == 0 {
            return Err(invalid("scheduler.paint_fps", "Paint rate must be greater than 0"));
        }

        let count = self.landmarks.count;
        if count == 0 {
            return Err(invalid("landmarks.count", "Landmark count must be greater than 0"));
        }

        if self.landmarks.topology_path.is_none() && self.landmarks.calibration_timeout_ms == 0 {
            return Err(invalid(
                "landmarks.calibration_timeout_ms",
                "Calibration timeout must be greater than 0 without a topology_path",
            ));
        }

        let indices = [
            ("landmarks.top", self.landmarks.top),
            ("landmarks.bottom", self.landmarks.bottom),
            ("landmarks.left", self.landmarks.left),
            ("landmarks.right", self.landmarks.right),
            ("accessory.anchor_index", self.accessory.anchor_index),
            ("accessory.depth_index", self.accessory.depth_index),
        ];
        for (field, index) in indices {
            if index >= count {
                return Err(invalid(
                    field,
                    &format!("Index {} out of range for {} landmarks", index, count),
                ));
            }
        }

        if self.accessory.shape_constant <= 0.0 {
            return Err(invalid(
                "accessory.shape_constant",
                "Shape constant must be greater than 0",
            ));
        }

        if self.masks.is_empty() {
            return Err(invalid("masks", "At least one mask entry is required"));
        }

        if self.initial_mask >= self.masks.len() {
            return Err(invalid(
                "initial_mask",
                &format!(
                    "Mask index {} out of range ({} masks)",
                    self.initial_mask,
                    self.masks.len()
                ),
            ));
        }

        if self.mediapipe.max_faces == 0 {
            return Err(invalid(
                "mediapipe.max_faces",
                "At least one face must be reported",
            ));
        }

        if self.mediapipe.auto_launch {
            let path = Path::new(&self.mediapipe.tracker_script);
            if !path.exists() {
                tracing::warn!(
                    "MediaPipe auto_launch enabled but tracker script not found at: {}",
                    self.mediapipe.tracker_script
                );
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> FacePaintError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Output canvas dimensions in pixels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Detection cadence and paint rate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval between detection requests
    pub tick_interval_ms: u64,
    /// Delay between `stop()` and the overlay being hidden
    pub hide_grace_ms: u64,
    /// Paint opportunities per second in headless mode
    pub paint_fps: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            hide_grace_ms: 100,
            paint_fps: 60,
        }
    }
}

/// Landmark topology and the landmarks used for pose estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkConfig {
    /// Landmarks per face (468 for MediaPipe FaceMesh)
    pub count: usize,
    /// JSON asset holding triangulation, UVs and the reference shape.
    /// When unset the topology is calibrated from the first detected face.
    pub topology_path: Option<PathBuf>,
    /// How long startup waits for a face to calibrate the topology from
    pub calibration_timeout_ms: u64,
    /// Forehead landmark
    pub top: usize,
    /// Chin landmark
    pub bottom: usize,
    /// Left cheek landmark
    pub left: usize,
    /// Right cheek landmark
    pub right: usize,
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            count: 468,
            topology_path: None,
            calibration_timeout_ms: 15_000,
            top: 10,
            bottom: 152,
            left: 234,
            right: 454,
        }
    }
}

/// Which landmark normalization a deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Fixed per-axis offset into the mesh's centred local space
    #[default]
    Offset,
    /// Correct for the render surface being offset from the video surface
    Canvas,
}

/// Landmark normalization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub mode: NormalizeMode,
    /// (dx, dy, dz) for `offset` mode
    pub offset: [f32; 3],
    /// Render surface offset from the video surface, in pixels
    pub canvas_left: f32,
    pub canvas_top: f32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            mode: NormalizeMode::Offset,
            offset: [-8.0, 220.0, -500.0],
            canvas_left: 0.0,
            canvas_top: 0.0,
        }
    }
}

/// Accessory (glasses) anchoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessoryConfig {
    /// Landmark the accessory node is placed on
    pub anchor_index: usize,
    /// Second landmark of the depth proxy pair
    pub depth_index: usize,
    /// k in `baseline_scale = c0^0.75 * k`
    pub shape_constant: f32,
    /// Attach the accessory as soon as the session is built
    pub attach_on_start: bool,
    /// Local position of the model under the anchor node
    pub model_offset: [f32; 3],
    /// Local XYZ euler rotation of the model under the anchor node
    pub model_rotation: [f32; 3],
    /// Optional GLB model rendered by the GPU backend
    pub model_path: Option<PathBuf>,
}

impl Default for AccessoryConfig {
    fn default() -> Self {
        Self {
            anchor_index: 168,
            depth_index: 1,
            shape_constant: 18.6,
            attach_on_start: false,
            model_offset: [-45.0, 63.0, 6.0],
            model_rotation: [
                0.0,
                1.35 + std::f32::consts::PI,
                2.0 * std::f32::consts::PI - 0.04,
            ],
            model_path: None,
        }
    }
}

/// One entry of the mask catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskEntry {
    /// Display label
    pub label: String,
    /// Texture image path
    pub texture: PathBuf,
}

/// MediaPipe FaceMesh helper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaPipeConfig {
    /// Address the helper answers detection requests on
    pub host: String,
    pub port: u16,
    /// Local address to bind for responses
    pub listen_address: String,
    /// Per-request timeout
    pub request_timeout_ms: u64,
    /// Auto-launch the Python helper subprocess
    pub auto_launch: bool,
    /// Path to the helper script
    pub tracker_script: String,
    /// Camera device index
    pub camera_device: u32,
    /// Camera capture width
    pub capture_width: u32,
    /// Camera capture height
    pub capture_height: u32,
    /// Camera capture FPS
    pub capture_fps: u32,
    /// Maximum number of faces to report
    pub max_faces: u32,
    /// Auto-restart subprocess on crash
    pub auto_restart: bool,
    /// Delay before restarting crashed subprocess (seconds)
    pub restart_delay_secs: u64,
}

impl Default for MediaPipeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 12347,
            listen_address: "127.0.0.1:0".to_string(),
            request_timeout_ms: 500,
            auto_launch: true,
            tracker_script: "scripts/facemesh_server.py".to_string(),
            camera_device: 0,
            capture_width: 640,
            capture_height: 480,
            capture_fps: 30,
            max_faces: 1,
            auto_restart: true,
            restart_delay_secs: 3,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("facepaint");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/facepaint");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/facepaint");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("facepaint");
        }
    }

    PathBuf::from(".")
}
