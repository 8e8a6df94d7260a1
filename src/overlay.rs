//! Diagnostic dot/wireframe overlay.
//!
//! Strokes every topology triangle and plots a dot per landmark onto a 2D
//! drawing surface, in the detector's pixel space.

use glam::Vec2;
use std::sync::Arc;

use crate::landmarks::LandmarkFrame;
use crate::topology::Topology;

/// RGBA colour, 8 bits per channel
pub type Rgba = [u8; 4];

pub const STROKE_COLOR: Rgba = [128, 128, 128, 255];
pub const DOT_COLOR: Rgba = [0, 255, 255, 255];
pub const DOT_RADIUS: f32 = 1.0;

/// Minimal 2D drawing surface
pub trait DrawSurface {
    fn clear(&mut self);
    fn stroke_path(&mut self, points: &[Vec2], closed: bool, color: Rgba);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba);
}

/// One retained drawing command
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    Path {
        points: Vec<Vec2>,
        closed: bool,
        color: Rgba,
    },
    Circle {
        center: Vec2,
        radius: f32,
        color: Rgba,
    },
}

/// Retained surface: records shapes so a window can replay them every paint.
#[derive(Debug, Clone, Default)]
pub struct OverlayCanvas {
    shapes: Vec<OverlayShape>,
}

impl OverlayCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shapes(&self) -> &[OverlayShape] {
        &self.shapes
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Replay the recorded shapes onto another surface
    pub fn replay(&self, target: &mut dyn DrawSurface) {
        for shape in &self.shapes {
            match shape {
                OverlayShape::Path {
                    points,
                    closed,
                    color,
                } => target.stroke_path(points, *closed, *color),
                OverlayShape::Circle {
                    center,
                    radius,
                    color,
                } => target.fill_circle(*center, *radius, *color),
            }
        }
    }
}

impl DrawSurface for OverlayCanvas {
    fn clear(&mut self) {
        self.shapes.clear();
    }

    fn stroke_path(&mut self, points: &[Vec2], closed: bool, color: Rgba) {
        self.shapes.push(OverlayShape::Path {
            points: points.to_vec(),
            closed,
            color,
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        self.shapes.push(OverlayShape::Circle {
            center,
            radius,
            color,
        });
    }
}

/// Draws landmark frames as a wireframe plus dots.
#[derive(Debug, Clone)]
pub struct DebugOverlay {
    topology: Arc<Topology>,
}

impl DebugOverlay {
    pub fn new(topology: Arc<Topology>) -> Self {
        Self { topology }
    }

    /// Draw one face. Does not clear the surface.
    pub fn draw(&self, frame: &LandmarkFrame, surface: &mut dyn DrawSurface) {
        let xy = |i: usize| frame.point(i).truncate();

        for [a, b, c] in self.topology.faces() {
            surface.stroke_path(&[xy(a), xy(b), xy(c)], true, STROKE_COLOR);
        }

        for p in frame.points() {
            surface.fill_circle(p.truncate(), DOT_RADIUS, DOT_COLOR);
        }
    }
}
