//! Landmark normalization into the renderer's coordinate space.

use glam::Vec3;

use crate::config::{NormalizeConfig, NormalizeMode};
use crate::landmarks::LandmarkFrame;

/// Maps detector coordinates into mesh space. Chosen once per deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalizer {
    /// `p + (dx, dy, dz)`
    Offset(Vec3),
    /// `(x - left / 2, y + top, z)`
    Canvas { left: f32, top: f32 },
}

impl Normalizer {
    pub fn from_config(config: &NormalizeConfig) -> Self {
        match config.mode {
            NormalizeMode::Offset => Self::Offset(Vec3::from(config.offset)),
            NormalizeMode::Canvas => Self::Canvas {
                left: config.canvas_left,
                top: config.canvas_top,
            },
        }
    }

    /// Normalize a single point
    pub fn apply(&self, p: Vec3) -> Vec3 {
        match *self {
            Self::Offset(offset) => p + offset,
            Self::Canvas { left, top } => Vec3::new(p.x - left / 2.0, p.y + top, p.z),
        }
    }

    /// Normalize every point of a frame
    pub fn frame(&self, frame: &LandmarkFrame) -> LandmarkFrame {
        frame.map(|p| self.apply(p))
    }
}
