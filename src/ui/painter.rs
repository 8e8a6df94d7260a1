//! `DrawSurface` over an egui painter, mapping canvas pixels into a screen rect.

use eframe::egui::{self, Color32, Pos2, Rect, Shape, Stroke};
use glam::Vec2;

use crate::overlay::{DrawSurface, Rgba};

pub struct PainterSurface<'a> {
    painter: &'a egui::Painter,
    rect: Rect,
    scale: f32,
}

impl<'a> PainterSurface<'a> {
    /// `rect` shows a canvas `canvas_width` pixels wide.
    pub fn new(painter: &'a egui::Painter, rect: Rect, canvas_width: u32) -> Self {
        Self {
            painter,
            rect,
            scale: rect.width() / canvas_width.max(1) as f32,
        }
    }

    fn to_screen(&self, p: Vec2) -> Pos2 {
        self.rect.min + egui::vec2(p.x, p.y) * self.scale
    }
}

fn color(rgba: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(rgba[0], rgba[1], rgba[2], rgba[3])
}

impl DrawSurface for PainterSurface<'_> {
    /// egui repaints from scratch every frame
    fn clear(&mut self) {}

    fn stroke_path(&mut self, points: &[Vec2], closed: bool, rgba: Rgba) {
        let points: Vec<Pos2> = points.iter().map(|p| self.to_screen(*p)).collect();
        let stroke = Stroke::new(1.0, color(rgba));
        let shape = if closed {
            Shape::closed_line(points, stroke)
        } else {
            Shape::line(points, stroke)
        };
        self.painter.add(shape);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, rgba: Rgba) {
        self.painter
            .circle_filled(self.to_screen(center), radius * self.scale, color(rgba));
    }
}
