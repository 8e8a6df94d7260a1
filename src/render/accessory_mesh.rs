//! Accessory model loader (GLB) using the `gltf` crate.
//!
//! Flattens every primitive of the default scene into model space, baking the
//! node hierarchy's transforms into positions and normals.

use glam::{Mat3, Mat4, Vec3};
use std::path::Path;

use crate::error::RenderError;

/// Geometry for a single primitive, in model space.
#[derive(Debug, Clone)]
pub struct AccessoryPrimitive {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    /// Base color factor from the material (RGBA)
    pub base_color: [f32; 4],
}

impl AccessoryPrimitive {
    /// Apply a node transform to the geometry.
    fn baked(mut self, transform: Mat4) -> Self {
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        for p in &mut self.positions {
            *p = transform.transform_point3(*p);
        }
        for n in &mut self.normals {
            *n = (normal_matrix * *n).normalize_or_zero();
        }
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessoryModel {
    pub primitives: Vec<AccessoryPrimitive>,
}

impl AccessoryModel {
    /// Load a GLB/glTF file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let (document, buffers, _images) = gltf::import(path).map_err(|e| {
            RenderError::AccessoryModel(format!("{}: {}", path.display(), e))
        })?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| {
                RenderError::AccessoryModel(format!("{}: no scene", path.display()))
            })?;

        let mut model = AccessoryModel::default();
        for node in scene.nodes() {
            collect_node(&node, Mat4::IDENTITY, &buffers, &mut model.primitives);
        }

        if model.primitives.is_empty() {
            return Err(RenderError::AccessoryModel(format!(
                "{}: no drawable primitives",
                path.display()
            )));
        }

        tracing::info!(
            "Accessory model loaded: {} primitives, {} vertices",
            model.primitives.len(),
            model.vertex_count()
        );
        Ok(model)
    }

    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.positions.len()).sum()
    }
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<AccessoryPrimitive>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for prim in mesh.primitives() {
            if prim.mode() != gltf::mesh::Mode::Triangles {
                continue;
            }
            let reader = prim.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

            let positions: Vec<Vec3> = reader
                .read_positions()
                .map(|iter| iter.map(Vec3::from).collect())
                .unwrap_or_default();
            if positions.is_empty() {
                continue;
            }

            let normals: Vec<Vec3> = reader
                .read_normals()
                .map(|iter| iter.map(Vec3::from).collect())
                .unwrap_or_else(|| vec![Vec3::Z; positions.len()]);

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let base_color = prim.material().pbr_metallic_roughness().base_color_factor();

            out.push(
                AccessoryPrimitive {
                    positions,
                    normals,
                    indices,
                    base_color,
                }
                .baked(world),
            );
        }
    }

    for child in node.children() {
        collect_node(&child, world, buffers, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bake_translates_and_rotates() {
        let prim = AccessoryPrimitive {
            positions: vec![Vec3::new(1.0, 0.0, 0.0)],
            normals: vec![Vec3::X],
            indices: vec![0, 0, 0],
            base_color: [1.0; 4],
        };
        let transform = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0))
            * Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);

        let baked = prim.baked(transform);
        assert!((baked.positions[0] - Vec3::new(0.0, 6.0, 0.0)).length() < 1e-5);
        assert!((baked.normals[0] - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_missing_file() {
        let err = AccessoryModel::load("/nonexistent/glasses.glb").unwrap_err();
        assert!(matches!(err, RenderError::AccessoryModel(_)));
    }
}
