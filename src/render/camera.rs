//! Orthographic camera fixed to the output canvas.

use glam::{Mat4, Vec3};

/// Orthographic camera with zoom. Bounds are derived once from the canvas
/// size; left/right and top/bottom are deliberately swapped so detector pixel
/// coordinates (y down) land on screen the way the video shows them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoCamera {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    pub zoom: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl OrthoCamera {
    /// Camera for a `width` x `height` canvas, looking down +Z at the canvas centre.
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let half_w = width as f32 * 0.5;
        let half_h = height as f32 * 0.5;
        Self {
            left: half_w - 5.0,
            right: -half_w + 5.0,
            top: -half_h,
            bottom: half_h,
            near: 1.0,
            far: 1000.0,
            zoom: 2.0,
            position: Vec3::new(half_w, half_h, -1000.0),
            target: Vec3::new(half_w, half_h, 0.0),
        }
    }

    /// Projection with zoom applied around the frustum centre.
    pub fn projection(&self) -> Mat4 {
        let dx = (self.right - self.left) / (2.0 * self.zoom);
        let dy = (self.top - self.bottom) / (2.0 * self.zoom);
        let cx = (self.right + self.left) * 0.5;
        let cy = (self.top + self.bottom) * 0.5;

        Mat4::orthographic_rh(cx - dx, cx + dx, cy - dy, cy + dy, self.near, self.far)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// World point to normalized device coordinates
    pub fn project(&self, p: Vec3) -> Vec3 {
        self.view_projection().project_point3(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_canvas() {
        let cam = OrthoCamera::for_canvas(640, 480);
        assert_eq!(cam.left, 315.0);
        assert_eq!(cam.right, -315.0);
        assert_eq!(cam.top, -240.0);
        assert_eq!(cam.bottom, 240.0);
        assert_eq!(cam.position, Vec3::new(320.0, 240.0, -1000.0));
    }

    #[test]
    fn test_target_projects_to_centre() {
        let cam = OrthoCamera::for_canvas(640, 480);
        let ndc = cam.project(Vec3::new(320.0, 240.0, 0.0));
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);

        // Normalized landmarks sit around z = -500, mid-frustum
        let mid = cam.project(Vec3::new(320.0, 240.0, -500.0));
        assert!(mid.z > 0.0 && mid.z < 1.0);
    }

    #[test]
    fn test_zoom_and_orientation() {
        let cam = OrthoCamera::for_canvas(640, 480);
        // 10 px right of centre: visible half-width is 315 / 2 px after zoom
        let right = cam.project(Vec3::new(330.0, 240.0, 0.0));
        assert!((right.x - 10.0 / 157.5).abs() < 1e-4);
        // Pixel y grows downward on screen
        let below = cam.project(Vec3::new(320.0, 250.0, 0.0));
        assert!((below.y + 10.0 / 120.0).abs() < 1e-4);
    }
}
