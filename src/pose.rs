//! Head pose estimation from landmark pairs.
//!
//! Each axis is the unsigned angle between a 2D projection of a landmark
//! difference vector and the +Y unit vector, so every angle lies in [0, π].

use glam::Vec2;

use crate::config::LandmarkConfig;
use crate::error::PoseError;
use crate::landmarks::LandmarkFrame;

/// Squared length below which a vector counts as degenerate
const MIN_LENGTH_SQ: f32 = 1e-12;

/// Three rotation angles in radians, each in [0, π]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseEstimate {
    pub rx: f32,
    pub ry: f32,
    pub rz: f32,
}

impl PoseEstimate {
    pub fn to_array(self) -> [f32; 3] {
        [self.rx, self.ry, self.rz]
    }
}

/// `acos(v1 · v2 / (|v1| |v2|))`, or `PoseError::Degenerate` when either
/// vector has zero length or the lengths overflow `f32`.
pub fn angle_between(v1: Vec2, v2: Vec2) -> Result<f32, PoseError> {
    let len_sq = v1.length_squared() * v2.length_squared();
    if !len_sq.is_finite() || len_sq <= MIN_LENGTH_SQ {
        return Err(PoseError::Degenerate);
    }
    let cos = v1.dot(v2) / len_sq.sqrt();
    if !cos.is_finite() {
        return Err(PoseError::Degenerate);
    }
    // Rounding can push |cos| a hair past 1
    Ok(cos.clamp(-1.0, 1.0).acos())
}

/// Estimates head rotation from four fixed landmarks.
#[derive(Debug, Clone, Copy)]
pub struct PoseEstimator {
    top: usize,
    bottom: usize,
    left: usize,
    right: usize,
}

impl PoseEstimator {
    pub fn new(top: usize, bottom: usize, left: usize, right: usize) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn from_config(config: &LandmarkConfig) -> Self {
        Self::new(config.top, config.bottom, config.left, config.right)
    }

    pub fn estimate(&self, frame: &LandmarkFrame) -> Result<PoseEstimate, PoseError> {
        let top = frame.point(self.top);
        let bottom = frame.point(self.bottom);
        let left = frame.point(self.left);
        let right = frame.point(self.right);

        let rx = angle_between(Vec2::new(top.y - bottom.y, top.z - bottom.z), Vec2::Y)?;
        let ry = angle_between(Vec2::new(left.x - right.x, left.y - right.y), Vec2::Y)?;
        let rz = angle_between(Vec2::new(left.x - right.x, left.z - right.z), Vec2::Y)?;

        Ok(PoseEstimate { rx, ry, rz })
    }
}
