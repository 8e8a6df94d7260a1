//! Backend without a GPU. Tracks uploads and logs submissions; used when
//! running without a window.

use super::{RenderBackend, SceneView};
use crate::error::RenderError;

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    submissions: u64,
    position_uploads: u64,
    texture_version: u64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    pub fn position_uploads(&self) -> u64 {
        self.position_uploads
    }
}

impl RenderBackend for HeadlessBackend {
    fn init(&mut self, scene: &SceneView<'_>) -> Result<(), RenderError> {
        tracing::info!(
            "Headless renderer: {} vertices, {} faces",
            scene.mesh.topology().vertex_count(),
            scene.mesh.topology().face_count()
        );
        Ok(())
    }

    fn render(&mut self, scene: &SceneView<'_>) -> Result<(), RenderError> {
        if scene.mesh.positions_dirty() {
            self.position_uploads += 1;
        }
        if scene.material.texture_version != self.texture_version {
            self.texture_version = scene.material.texture_version;
            if let Some(tex) = &scene.material.texture {
                tracing::debug!("Headless texture upload: {}", tex.path.display());
            }
        }
        self.submissions += 1;

        if let Some(accessory) = scene.accessory {
            tracing::trace!(
                "Frame {}: accessory at {:?}, scale {:.3}",
                self.submissions,
                accessory.position,
                accessory.scale
            );
        }
        Ok(())
    }

    fn teardown(&mut self) {
        tracing::info!(
            "Headless renderer stopped: {} submissions, {} position uploads",
            self.submissions,
            self.position_uploads
        );
    }
}
