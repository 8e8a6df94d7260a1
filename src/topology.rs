//! Fixed face-mesh topology.
//!
//! The triangulation, per-vertex UVs and (optionally) a reference shape for the
//! detector's landmark model. Either loaded from a JSON data asset or
//! calibrated from the first face the detector reports, then shared
//! read-only by every consumer through an `Arc`.

use glam::{Vec2, Vec3};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::delaunay;
use crate::error::{FacePaintError, TopologyError};
use crate::landmarks::LandmarkFrame;
use crate::tracking::{LandmarkDetector, RawFace};

/// On-disk layout of the topology asset.
#[derive(Debug, Deserialize)]
struct TopologyAsset {
    /// Flat triangle index list
    indices: Vec<u32>,
    /// One [u, v] pair per vertex
    uvs: Vec<[f32; 2]>,
    /// Reference shape used before the first frame arrives
    #[serde(default)]
    base_positions: Vec<[f32; 3]>,
}

/// Immutable triangulation + UV layout over `vertex_count` landmarks.
#[derive(Debug, Clone)]
pub struct Topology {
    vertex_count: usize,
    indices: Vec<u32>,
    uvs: Vec<Vec2>,
    base_positions: Vec<Vec3>,
}

impl Topology {
    /// Build a topology, checking every face index against the vertex count.
    ///
    /// `base_positions` may be empty; when present it is centred on its
    /// bounding-box midpoint.
    pub fn new(
        vertex_count: usize,
        indices: Vec<u32>,
        uvs: Vec<Vec2>,
        base_positions: Vec<Vec3>,
    ) -> Result<Self, TopologyError> {
        if vertex_count == 0 {
            return Err(TopologyError::Empty);
        }
        if indices.len() % 3 != 0 {
            return Err(TopologyError::RaggedIndices(indices.len()));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(TopologyError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        if uvs.len() != vertex_count {
            return Err(TopologyError::UvCount {
                expected: vertex_count,
                actual: uvs.len(),
            });
        }
        if !base_positions.is_empty() && base_positions.len() != vertex_count {
            return Err(TopologyError::BasePositionCount {
                expected: vertex_count,
                actual: base_positions.len(),
            });
        }

        Ok(Self {
            vertex_count,
            indices,
            uvs,
            base_positions: center(base_positions),
        })
    }

    /// Parse the JSON topology asset
    pub fn from_json(vertex_count: usize, json: &str) -> Result<Self, FacePaintError> {
        let asset: TopologyAsset =
            serde_json::from_str(json).map_err(|e| TopologyError::Parse(e.to_string()))?;

        let uvs = asset.uvs.into_iter().map(Vec2::from).collect();
        let base = asset.base_positions.into_iter().map(Vec3::from).collect();

        Ok(Self::new(vertex_count, asset.indices, uvs, base)?)
    }

    /// Load the JSON topology asset from disk
    pub fn from_file<P: AsRef<Path>>(vertex_count: usize, path: P) -> Result<Self, FacePaintError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TopologyError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        let topology = Self::from_json(vertex_count, &contents)?;
        tracing::info!(
            "Loaded topology from {}: {} vertices, {} faces",
            path.as_ref().display(),
            topology.vertex_count,
            topology.face_count()
        );
        Ok(topology)
    }

    /// Build a topology from one detected face.
    ///
    /// Triangles are the Delaunay triangulation of the landmarks' image-plane
    /// positions, UVs are the positions scaled into the face's bounding box
    /// and the reference shape is the face itself.
    pub fn from_landmarks(points: &[Vec3]) -> Result<Self, TopologyError> {
        let flat: Vec<Vec2> = points.iter().map(|p| p.truncate()).collect();
        let triangles = delaunay::triangulate(&flat);
        if triangles.is_empty() {
            return Err(TopologyError::Untriangulable(0, points.len()));
        }

        let (min, max) = flat.iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        );
        let size = (max - min).max(Vec2::splat(f32::EPSILON));
        let uvs = flat.iter().map(|&p| (p - min) / size).collect();

        let indices = triangles.into_iter().flatten().collect();
        Self::new(points.len(), indices, uvs, points.to_vec())
    }

    /// Number of vertices (N)
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of triangle faces
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flat index buffer
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Iterate faces as index triplets
    pub fn faces(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|f| [f[0] as usize, f[1] as usize, f[2] as usize])
    }

    /// Per-vertex UVs
    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Centred reference shape (empty if the asset carried none)
    pub fn base_positions(&self) -> &[Vec3] {
        &self.base_positions
    }
}

/// Wait for the detector to report a face and build the topology from it.
///
/// Requests are retried every `retry` until `limit` runs out. Detector
/// errors and empty replies are retried; a face with the wrong landmark
/// count is an error.
pub async fn calibrate(
    detector: &dyn LandmarkDetector,
    vertex_count: usize,
    retry: Duration,
    limit: Duration,
) -> Result<Topology, FacePaintError> {
    let face = tokio::time::timeout(limit, first_face(detector, retry))
        .await
        .map_err(|_| TopologyError::CalibrationTimeout(limit.as_millis() as u64))?;

    let frame = LandmarkFrame::from_raw(0, &face, vertex_count)?;
    let topology = Topology::from_landmarks(frame.points())?;
    tracing::info!(
        "Calibrated topology from detected face: {} vertices, {} faces",
        topology.vertex_count(),
        topology.face_count()
    );
    Ok(topology)
}

async fn first_face(detector: &dyn LandmarkDetector, retry: Duration) -> RawFace {
    loop {
        match detector.estimate_faces().await {
            Ok(faces) => {
                if let Some(face) = faces.into_iter().next() {
                    return face;
                }
                tracing::debug!("No face yet, waiting to calibrate topology");
            }
            Err(e) => tracing::debug!("Calibration request failed: {}", e),
        }
        tokio::time::sleep(retry).await;
    }
}

/// Translate points so their bounding box is centred on the origin.
fn center(points: Vec<Vec3>) -> Vec<Vec3> {
    if points.is_empty() {
        return points;
    }
    let (min, max) = points.iter().fold(
        (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
        |(min, max), p| (min.min(*p), max.max(*p)),
    );
    let mid = (min + max) * 0.5;
    points.into_iter().map(|p| p - mid).collect()
}
