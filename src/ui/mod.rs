//! Native egui UI for facepaint.
//!
//! Provides a desktop window with:
//! - Mask viewport (wgpu offscreen render blitted into egui)
//! - Dot/wireframe overlay drawn with the egui painter
//! - Start/stop, mode, mask and accessory controls
//!
//! Enabled via `--features native-ui`.

mod app;
mod painter;
mod viewport;

pub use app::FacePaintApp;
