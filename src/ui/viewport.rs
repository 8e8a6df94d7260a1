//! egui-wgpu `CallbackTrait` implementation for the mask viewport.
//!
//! The scene is rendered offscreen when the session applies a frame; `paint()`
//! only blits the latest result into the egui render pass.

use eframe::egui_wgpu;
use eframe::wgpu;
use std::sync::Arc;

use crate::render::gpu::GpuTarget;

/// Paint callback that blits the offscreen mask canvas.
pub struct MaskViewportCallback {
    pub target: Arc<GpuTarget>,
}

impl egui_wgpu::CallbackTrait for MaskViewportCallback {
    fn paint(
        &self,
        _info: eframe::egui::PaintCallbackInfo,
        render_pass: &mut wgpu::RenderPass<'static>,
        _callback_resources: &egui_wgpu::CallbackResources,
    ) {
        self.target.blit(render_pass);
    }
}
