//! FaceMesh helper subprocess
//!
//! Launches the Python MediaPipe helper (`scripts/facemesh_server.py`) as a
//! child process with automatic cleanup on drop.

use tokio::process::{Child, Command};

use crate::config::MediaPipeConfig;
use crate::error::{FacePaintError, TrackingError};

/// Manages the MediaPipe FaceMesh helper subprocess
pub struct MpSubprocess {
    child: Option<Child>,
    config: MediaPipeConfig,
}

impl MpSubprocess {
    /// Create a new subprocess manager (does not start the process)
    pub fn new(config: &MediaPipeConfig) -> Self {
        Self {
            child: None,
            config: config.clone(),
        }
    }

    /// Arguments passed to the helper script
    pub fn args(&self) -> Vec<String> {
        vec![
            self.config.tracker_script.clone(),
            "--host".to_string(),
            self.config.host.clone(),
            "--port".to_string(),
            self.config.port.to_string(),
            "--camera".to_string(),
            self.config.camera_device.to_string(),
            "--width".to_string(),
            self.config.capture_width.to_string(),
            "--height".to_string(),
            self.config.capture_height.to_string(),
            "--fps".to_string(),
            self.config.capture_fps.to_string(),
            "--max-faces".to_string(),
            self.config.max_faces.to_string(),
        ]
    }

    /// Launch the helper subprocess.
    pub fn start(&mut self) -> Result<(), FacePaintError> {
        if self.is_running() {
            return Ok(());
        }

        let child = Command::new("python3")
            .args(self.args())
            .kill_on_drop(true)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| {
                TrackingError::Subprocess(format!(
                    "Failed to launch FaceMesh helper at '{}': {}",
                    self.config.tracker_script, e
                ))
            })?;

        tracing::info!(
            "FaceMesh helper started (pid: {:?}, camera: {}, port: {})",
            child.id(),
            self.config.camera_device,
            self.config.port,
        );

        self.child = Some(child);
        Ok(())
    }

    /// Check if the subprocess is still running (non-blocking)
    pub fn is_running(&mut self) -> bool {
        match &mut self.child {
            Some(child) => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    tracing::warn!("FaceMesh helper exited with: {}", status);
                    self.child = None;
                    false
                }
                Err(e) => {
                    tracing::error!("Failed to check FaceMesh helper status: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    /// Stop the subprocess by killing it
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::info!("Stopping FaceMesh helper (pid: {:?})", child.id());
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
    }
}

/// Check if the `mediapipe` Python package is available.
pub fn check_mediapipe_available() -> bool {
    match std::process::Command::new("python3")
        .args(["-c", "import mediapipe"])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
    {
        Ok(status) => status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_follow_config() {
        let config = MediaPipeConfig {
            port: 4000,
            max_faces: 2,
            camera_device: 1,
            ..Default::default()
        };
        let sub = MpSubprocess::new(&config);
        let args = sub.args();

        assert_eq!(args[0], config.tracker_script);
        let value_of = |flag: &str| {
            let i = args.iter().position(|a| a == flag).unwrap();
            args[i + 1].clone()
        };
        assert_eq!(value_of("--port"), "4000");
        assert_eq!(value_of("--max-faces"), "2");
        assert_eq!(value_of("--camera"), "1");
    }

    #[tokio::test]
    async fn test_not_running_before_start() {
        let mut sub = MpSubprocess::new(&MediaPipeConfig::default());
        assert!(!sub.is_running());
        sub.stop().await;
        assert!(!sub.is_running());
    }
}
