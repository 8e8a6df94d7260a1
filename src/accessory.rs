//! Accessory anchoring (glasses and similar props).
//!
//! The accessory node follows one landmark, rotates with the pose estimate and
//! scales with a depth proxy: the per-axis |Δy| between two landmarks. The first
//! frame after attaching records a baseline; later frames scale by
//! `sqrt(c / baseline_distance) * baseline_scale`, a damped response to noisy
//! depth.

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::config::AccessoryConfig;
use crate::error::PoseError;
use crate::landmarks::LandmarkFrame;
use crate::pose::PoseEstimate;

/// Depth distances at or below this cannot serve as a baseline
const MIN_BASELINE_DISTANCE: f32 = 1e-6;

/// Whether the accessory is part of the render graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessoryAttachment {
    #[default]
    Detached,
    Attached,
}

/// Baseline recorded on the first frame after attaching
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccessoryState {
    pub baseline_distance: Option<f32>,
    pub baseline_scale: Option<f32>,
}

impl AccessoryState {
    pub fn reset(&mut self) {
        self.baseline_distance = None;
        self.baseline_scale = None;
    }

    pub fn is_baselined(&self) -> bool {
        self.baseline_distance.is_some() && self.baseline_scale.is_some()
    }
}

/// World transform of the accessory for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessoryTransform {
    /// Anchor node position
    pub position: Vec3,
    /// Anchor node rotation
    pub rotation: Quat,
    /// Uniform scale of the model under the anchor node
    pub scale: f32,
    /// Fixed model placement under the anchor node
    pub model_offset: Vec3,
    pub model_rotation: Quat,
}

impl AccessoryTransform {
    /// `anchor * model`, with the depth scale applied to the model.
    pub fn matrix(&self) -> Mat4 {
        let anchor = Mat4::from_rotation_translation(self.rotation, self.position);
        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            self.model_rotation,
            self.model_offset,
        );
        anchor * model
    }
}

/// Keeps the accessory locked to the face's depth and orientation.
#[derive(Debug, Clone)]
pub struct AccessoryAnchor {
    attachment: AccessoryAttachment,
    state: AccessoryState,
    anchor_index: usize,
    depth_index: usize,
    shape_constant: f32,
    model_offset: Vec3,
    model_rotation: Quat,
    position: Vec3,
    rotation: Quat,
    scale: f32,
}

impl AccessoryAnchor {
    pub fn new(config: &AccessoryConfig) -> Self {
        let [rx, ry, rz] = config.model_rotation;
        Self {
            attachment: AccessoryAttachment::Detached,
            state: AccessoryState::default(),
            anchor_index: config.anchor_index,
            depth_index: config.depth_index,
            shape_constant: config.shape_constant,
            model_offset: Vec3::from(config.model_offset),
            model_rotation: Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: 1.0,
        }
    }

    /// Detached → Attached clears the baseline; attaching twice is a no-op.
    pub fn attach(&mut self) {
        if self.attachment == AccessoryAttachment::Detached {
            self.state.reset();
            self.attachment = AccessoryAttachment::Attached;
            tracing::info!("Accessory attached");
        }
    }

    pub fn detach(&mut self) {
        if self.attachment == AccessoryAttachment::Attached {
            self.attachment = AccessoryAttachment::Detached;
            tracing::info!("Accessory detached");
        }
    }

    pub fn attachment(&self) -> AccessoryAttachment {
        self.attachment
    }

    pub fn is_attached(&self) -> bool {
        self.attachment == AccessoryAttachment::Attached
    }

    pub fn state(&self) -> AccessoryState {
        self.state
    }

    /// Depth proxy between the two reference landmarks
    pub fn depth_distance(&self, frame: &LandmarkFrame) -> f32 {
        (frame.point(self.anchor_index).y - frame.point(self.depth_index).y).abs()
    }

    /// Update the accessory from a normalized frame.
    ///
    /// Returns `None` while detached. A degenerate pose holds the previous
    /// rotation; a zero depth distance before baselining holds the previous
    /// scale and retries on the next frame.
    pub fn on_frame(
        &mut self,
        frame: &LandmarkFrame,
        pose: Result<PoseEstimate, PoseError>,
    ) -> Option<AccessoryTransform> {
        if !self.is_attached() {
            return None;
        }

        self.position = frame.point(self.anchor_index);

        let c = self.depth_distance(frame);
        match (self.state.baseline_distance, self.state.baseline_scale) {
            (Some(distance), Some(scale)) => {
                self.scale = (c / distance).sqrt() * scale;
            }
            _ if c > MIN_BASELINE_DISTANCE => {
                let scale = c.powf(0.75) * self.shape_constant;
                self.state.baseline_distance = Some(c);
                self.state.baseline_scale = Some(scale);
                self.scale = scale;
                tracing::debug!("Accessory baseline: distance {:.3}, scale {:.3}", c, scale);
            }
            _ => {
                tracing::debug!("Accessory baseline skipped: zero depth distance");
            }
        }

        match pose {
            Ok(pose) => {
                self.rotation = Quat::from_euler(EulerRot::XYZ, pose.rx, pose.ry, pose.rz);
            }
            Err(e) => {
                tracing::debug!("Holding accessory rotation: {}", e);
            }
        }

        Some(self.transform())
    }

    /// Current transform, regardless of attachment
    pub fn transform(&self) -> AccessoryTransform {
        AccessoryTransform {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
            model_offset: self.model_offset,
            model_rotation: self.model_rotation,
        }
    }
}
