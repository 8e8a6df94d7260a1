//! Landmark frames produced by the detector.

use glam::Vec3;

use crate::error::LandmarkError;

/// One face's landmarks from one detection cycle.
///
/// Points are in the detector's pixel space until passed through a
/// [`Normalizer`](crate::normalize::Normalizer).
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    /// Issue order of the detection request that produced this frame
    generation: u64,
    points: Vec<Vec3>,
}

impl LandmarkFrame {
    /// Build a frame, rejecting any landmark count other than `expected`.
    pub fn new(
        generation: u64,
        points: Vec<Vec3>,
        expected: usize,
    ) -> Result<Self, LandmarkError> {
        if points.len() != expected {
            return Err(LandmarkError::CountMismatch {
                expected,
                actual: points.len(),
            });
        }
        Ok(Self { generation, points })
    }

    /// Build a frame from raw `[x, y, z]` triples as delivered by the detector.
    pub fn from_raw(
        generation: u64,
        raw: &[[f32; 3]],
        expected: usize,
    ) -> Result<Self, LandmarkError> {
        Self::new(generation, raw.iter().copied().map(Vec3::from).collect(), expected)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Landmark at `index`. Indices are validated against the landmark
    /// count at config time, so this panics only on programmer error.
    pub fn point(&self, index: usize) -> Vec3 {
        self.points[index]
    }

    /// Same generation, points mapped through `f`.
    pub fn map(&self, f: impl Fn(Vec3) -> Vec3) -> Self {
        Self {
            generation: self.generation,
            points: self.points.iter().map(|&p| f(p)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_count_accepted() {
        let frame = LandmarkFrame::from_raw(3, &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], 2).unwrap();
        assert_eq!(frame.generation(), 3);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.point(1), Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_count_mismatch_is_error() {
        let err = LandmarkFrame::from_raw(1, &[[0.0; 3]; 3], 4).unwrap_err();
        assert!(matches!(
            err,
            LandmarkError::CountMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_map_keeps_generation() {
        let frame = LandmarkFrame::from_raw(9, &[[1.0, 1.0, 1.0]], 1).unwrap();
        let mapped = frame.map(|p| p * 2.0);
        assert_eq!(mapped.generation(), 9);
        assert_eq!(mapped.point(0), Vec3::splat(2.0));
    }
}
