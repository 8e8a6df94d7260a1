//! Mask renderer.
//!
//! Owns the scene for one session: orthographic camera, hemisphere +
//! directional light, the translucent mask material and the indexed face mesh
//! whose position buffer is rewritten from every accepted landmark frame.
//! Drawing is delegated to a [`RenderBackend`].

pub mod camera;
pub mod headless;
pub mod texture;

#[cfg(feature = "native-ui")]
pub mod accessory_mesh;
#[cfg(feature = "native-ui")]
pub mod gpu;

use glam::Vec3;
use std::sync::Arc;

use crate::accessory::AccessoryTransform;
use crate::error::{RenderError, TextureError};
use crate::landmarks::LandmarkFrame;
use crate::topology::Topology;

pub use camera::OrthoCamera;
pub use headless::HeadlessBackend;
pub use texture::{ImageTextureLoader, MaskTexture, TextureLoader};

/// The drawing side of the renderer (GPU, or a stand-in).
pub trait RenderBackend {
    /// Build resources for the scene. Called once per session.
    fn init(&mut self, scene: &SceneView<'_>) -> Result<(), RenderError>;

    /// A new paint starts; the next submission replaces the previous image.
    /// Submissions after it within the same paint draw over each other.
    fn begin_frame(&mut self) {}

    /// Submit one frame of the current scene.
    fn render(&mut self, scene: &SceneView<'_>) -> Result<(), RenderError>;

    /// Release resources. Called once when the session is torn down.
    fn teardown(&mut self) {}
}

/// Borrowed view of everything a backend needs for one submission.
pub struct SceneView<'a> {
    pub camera: &'a OrthoCamera,
    pub lights: &'a SceneLights,
    pub material: &'a MaskMaterial,
    pub mesh: &'a MaskMesh,
    pub accessory: Option<&'a AccessoryTransform>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLight {
    pub sky_color: [f32; 3],
    pub ground_color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Unit vector pointing from the scene towards the light
    pub direction: Vec3,
}

/// Lights set once at session start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLights {
    pub hemisphere: HemisphereLight,
    pub directional: DirectionalLight,
}

impl SceneLights {
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let half_w = width as f32 * 0.5;
        let half_h = height as f32 * 0.5;
        Self {
            hemisphere: HemisphereLight {
                sky_color: [1.0, 1.0, 1.0],
                ground_color: [1.0, 1.0, 1.0],
                intensity: 0.2,
            },
            directional: DirectionalLight {
                color: [1.0, 1.0, 1.0],
                intensity: 1.0,
                direction: Vec3::new(half_w, half_h, -1000.0).normalize(),
            },
        }
    }
}

/// Phong-style material bound to the selected mask texture.
///
/// Transparent with depth writes off, so the accessory drawn after it still
/// depth-tests against the scene and composites over the translucent mask.
#[derive(Debug, Clone)]
pub struct MaskMaterial {
    pub texture: Option<MaskTexture>,
    /// Bumped every time a texture is bound
    pub texture_version: u64,
    pub specular: [f32; 3],
    pub shininess: f32,
    pub reflectivity: f32,
    pub transparent: bool,
    pub depth_write: bool,
    pub polygon_offset_units: f32,
}

impl Default for MaskMaterial {
    fn default() -> Self {
        let alpha = 0.4f32;
        let beta = 0.5f32;
        Self {
            texture: None,
            texture_version: 0,
            specular: [beta * 0.2; 3],
            shininess: 2.0f32.powf(alpha * 10.0),
            reflectivity: beta,
            transparent: true,
            depth_write: false,
            polygon_offset_units: -1.0,
        }
    }
}

/// Indexed face mesh. The position buffer is exactly 3N floats at all times.
#[derive(Debug, Clone)]
pub struct MaskMesh {
    topology: Arc<Topology>,
    positions: Vec<f32>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
    positions_dirty: bool,
    /// Bumped on every position rewrite
    version: u64,
}

impl MaskMesh {
    pub fn new(topology: Arc<Topology>) -> Self {
        let n = topology.vertex_count();

        let mut positions = vec![0.0; n * 3];
        for (i, p) in topology.base_positions().iter().enumerate() {
            positions[i * 3..i * 3 + 3].copy_from_slice(&p.to_array());
        }
        let uvs = topology.uvs().iter().flat_map(|uv| uv.to_array()).collect();

        let mut mesh = Self {
            topology,
            positions,
            normals: vec![0.0; n * 3],
            uvs,
            positions_dirty: true,
            version: 0,
        };
        mesh.compute_vertex_normals();
        mesh
    }

    /// Overwrite the position buffer from a normalized frame.
    pub fn write_positions(&mut self, frame: &LandmarkFrame) -> Result<(), RenderError> {
        let expected = self.positions.len();
        if frame.len() * 3 != expected {
            return Err(RenderError::BufferLength {
                expected,
                actual: frame.len() * 3,
            });
        }

        for (dst, p) in self.positions.chunks_exact_mut(3).zip(frame.points()) {
            dst.copy_from_slice(&p.to_array());
        }
        self.compute_vertex_normals();
        self.positions_dirty = true;
        self.version += 1;
        Ok(())
    }

    /// Area-weighted vertex normals
    fn compute_vertex_normals(&mut self) {
        let n = self.topology.vertex_count();
        let mut acc = vec![Vec3::ZERO; n];
        let pos = |i: usize| Vec3::from_slice(&self.positions[i * 3..i * 3 + 3]);

        for [a, b, c] in self.topology.faces() {
            let (pa, pb, pc) = (pos(a), pos(b), pos(c));
            let face_normal = (pc - pb).cross(pa - pb);
            acc[a] += face_normal;
            acc[b] += face_normal;
            acc[c] += face_normal;
        }

        for (dst, normal) in self.normals.chunks_exact_mut(3).zip(acc) {
            dst.copy_from_slice(&normal.normalize_or_zero().to_array());
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The mesh buffer: 3N floats
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    /// 2N floats, set once
    pub fn uvs(&self) -> &[f32] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        self.topology.indices()
    }

    /// Positions changed since the last submission
    pub fn positions_dirty(&self) -> bool {
        self.positions_dirty
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Result of completing a texture request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSwap {
    /// The texture is now bound
    Applied,
    /// A later request was issued; this result was discarded
    Stale,
}

/// Scene owner for the mask render path.
pub struct MeshRenderer {
    backend: Box<dyn RenderBackend>,
    camera: OrthoCamera,
    lights: SceneLights,
    material: MaskMaterial,
    mesh: MaskMesh,
    accessory: Option<AccessoryTransform>,
    active: bool,
    latest_texture_request: u64,
    render_count: u64,
}

impl MeshRenderer {
    /// Build the scene for a `width` x `height` canvas and initialize the backend.
    pub fn init(
        mut backend: Box<dyn RenderBackend>,
        topology: Arc<Topology>,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let camera = OrthoCamera::for_canvas(width, height);
        let lights = SceneLights::for_canvas(width, height);
        let material = MaskMaterial::default();
        let mesh = MaskMesh::new(topology);

        backend.init(&SceneView {
            camera: &camera,
            lights: &lights,
            material: &material,
            mesh: &mesh,
            accessory: None,
        })?;

        tracing::debug!(
            "Mesh renderer initialized: {}x{}, {} vertices",
            width,
            height,
            mesh.topology().vertex_count()
        );

        Ok(Self {
            backend,
            camera,
            lights,
            material,
            mesh,
            accessory: None,
            active: false,
            latest_texture_request: 0,
            render_count: 0,
        })
    }

    /// Frames are only accepted while active
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Rewrite the position buffer. Returns `Ok(false)` without touching the
    /// buffer while inactive.
    pub fn update_mesh(&mut self, frame: &LandmarkFrame) -> Result<bool, RenderError> {
        if !self.active {
            return Ok(false);
        }
        self.mesh.write_positions(frame)?;
        Ok(true)
    }

    /// Place (or remove) the accessory for the next submission
    pub fn set_accessory(&mut self, accessory: Option<AccessoryTransform>) {
        self.accessory = accessory;
    }

    /// Issue a texture request id. Only the most recent id can be applied.
    pub fn request_texture(&mut self) -> u64 {
        self.latest_texture_request += 1;
        self.latest_texture_request
    }

    /// Complete a texture request. Stale ids are discarded; failures keep the
    /// bound texture and are returned to the caller.
    pub fn complete_texture(
        &mut self,
        request: u64,
        result: Result<MaskTexture, TextureError>,
    ) -> Result<TextureSwap, TextureError> {
        if request != self.latest_texture_request {
            tracing::debug!(
                "Discarding stale texture request {} (latest {})",
                request,
                self.latest_texture_request
            );
            return Ok(TextureSwap::Stale);
        }

        let texture = result?;
        tracing::info!("Mask texture bound: {}", texture.path.display());
        self.material.texture = Some(texture);
        self.material.texture_version += 1;
        Ok(TextureSwap::Applied)
    }

    /// Start a paint. Faces rendered after this share one image.
    pub fn begin_frame(&mut self) {
        self.backend.begin_frame();
    }

    /// Submit the current scene once.
    pub fn render(&mut self) -> Result<(), RenderError> {
        let scene = SceneView {
            camera: &self.camera,
            lights: &self.lights,
            material: &self.material,
            mesh: &self.mesh,
            accessory: self.accessory.as_ref(),
        };
        self.backend.render(&scene)?;
        self.mesh.positions_dirty = false;
        self.render_count += 1;
        Ok(())
    }

    pub fn teardown(mut self) {
        self.backend.teardown();
        tracing::debug!("Mesh renderer torn down after {} renders", self.render_count);
    }

    pub fn camera(&self) -> &OrthoCamera {
        &self.camera
    }

    pub fn lights(&self) -> &SceneLights {
        &self.lights
    }

    pub fn material(&self) -> &MaskMaterial {
        &self.material
    }

    pub fn mesh(&self) -> &MaskMesh {
        &self.mesh
    }

    pub fn accessory(&self) -> Option<&AccessoryTransform> {
        self.accessory.as_ref()
    }

    pub fn render_count(&self) -> u64 {
        self.render_count
    }
}
