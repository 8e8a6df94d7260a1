//! Main egui application: session controls and the overlay viewport.

use std::sync::Arc;

use eframe::egui;

use crate::config::Config;
use crate::error::FacePaintError;
use crate::render::gpu::{GpuBackend, GpuTarget};
use crate::render::ImageTextureLoader;
use crate::scheduler::{OverlayMode, RunState};
use crate::session::FacePaintSession;
use crate::topology::Topology;
use crate::tracking::LandmarkDetector;

use super::painter::PainterSurface;
use super::viewport::MaskViewportCallback;

/// The native egui application window.
pub struct FacePaintApp {
    session: Option<FacePaintSession>,
    /// Offscreen mask canvas, shared with the paint callback
    target: Option<Arc<GpuTarget>>,
    canvas_size: [u32; 2],
    mask_labels: Vec<String>,
    selected_mask: usize,
    /// Frames applied since launch
    applied_frames: u64,
    last_warning: Option<String>,
    /// Fatal session error or startup failure
    error: Option<String>,
}

impl FacePaintApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: &Config,
        topology: Arc<Topology>,
        detector: Arc<dyn LandmarkDetector>,
    ) -> Self {
        let mut app = Self {
            session: None,
            target: None,
            canvas_size: [config.canvas.width, config.canvas.height],
            mask_labels: config.masks.iter().map(|m| m.label.clone()).collect(),
            selected_mask: config.initial_mask,
            applied_frames: 0,
            last_warning: None,
            error: None,
        };

        if let Err(e) = app.init_session(cc, config, topology, detector) {
            tracing::error!("Failed to start session: {}", e);
            app.error = Some(e.to_string());
        }

        app
    }

    fn init_session(
        &mut self,
        cc: &eframe::CreationContext<'_>,
        config: &Config,
        topology: Arc<Topology>,
        detector: Arc<dyn LandmarkDetector>,
    ) -> Result<(), FacePaintError> {
        let render_state = cc.wgpu_render_state.as_ref().ok_or_else(|| {
            crate::error::RenderError::Backend("wgpu render state not available".to_string())
        })?;

        let backend = GpuBackend::new(
            render_state,
            config.canvas.width,
            config.canvas.height,
            config.accessory.model_path.clone(),
        );
        let target = backend.target();

        let mut session = FacePaintSession::new(
            config,
            topology,
            detector,
            Arc::new(ImageTextureLoader),
            Box::new(backend),
        )?;
        session.set_mask_index(config.initial_mask)?;
        session.start()?;

        self.target = Some(target);
        self.session = Some(session);
        Ok(())
    }

    /// Launch the native UI window. Blocks until the window is closed.
    pub fn run(
        config: Config,
        topology: Arc<Topology>,
        detector: Arc<dyn LandmarkDetector>,
    ) -> eframe::Result {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title("facepaint")
                .with_inner_size([
                    config.canvas.width as f32 + 220.0,
                    config.canvas.height as f32 + 40.0,
                ]),
            ..Default::default()
        };

        eframe::run_native(
            "facepaint",
            options,
            Box::new(move |cc| Ok(Box::new(Self::new(cc, &config, topology, detector)))),
        )
    }

    /// The paint opportunity: apply whatever the session has pending.
    fn paint_session(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.on_paint() {
            Ok(report) => {
                if report.applied.is_some() {
                    self.applied_frames += 1;
                }
                if let Some(warning) = report.warnings.last() {
                    self.last_warning = Some(warning.to_string());
                }
            }
            Err(e) => {
                self.error = Some(e.to_string());
            }
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        ui.horizontal(|ui| {
            let running = session.run_state() == RunState::Running;
            if ui.add_enabled(!running, egui::Button::new("Start")).clicked() {
                if let Err(e) = session.start() {
                    self.error = Some(e.to_string());
                }
            }
            if ui.add_enabled(running, egui::Button::new("Stop")).clicked() {
                session.stop();
            }
        });

        ui.separator();

        let mut mode = session.mode();
        ui.label("Mode");
        ui.radio_value(&mut mode, OverlayMode::MaskRender, "Mask");
        ui.radio_value(&mut mode, OverlayMode::DotOverlay, "Landmarks");
        if mode != session.mode() {
            session.set_mode(mode);
        }

        ui.separator();

        let before = self.selected_mask;
        let selected_text = self
            .mask_labels
            .get(self.selected_mask)
            .cloned()
            .unwrap_or_default();
        egui::ComboBox::from_label("Mask")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for (i, label) in self.mask_labels.iter().enumerate() {
                    ui.selectable_value(&mut self.selected_mask, i, label.as_str());
                }
            });
        if self.selected_mask != before {
            if let Err(e) = session.set_mask_index(self.selected_mask) {
                self.last_warning = Some(e.to_string());
            }
        }

        let mut attached = session.accessory_attachment()
            == crate::accessory::AccessoryAttachment::Attached;
        if ui.checkbox(&mut attached, "Glasses").changed() {
            if attached {
                session.attach_accessory();
            } else {
                session.detach_accessory();
            }
        }

        ui.separator();

        ui.label(format!("State: {:?}", session.run_state()));
        ui.label(format!("Frames: {}", self.applied_frames));
        let accessory = session.accessory_state();
        if let Some(scale) = accessory.baseline_scale {
            ui.label(format!("Glasses baseline: {:.2}", scale));
        }

        if session.is_faulted() {
            ui.separator();
            if ui.button("Reset").clicked() {
                session.reset();
                self.error = None;
            }
        }

        if let Some(ref warning) = self.last_warning {
            ui.separator();
            ui.colored_label(egui::Color32::YELLOW, warning);
        }
        if let Some(ref err) = self.error {
            ui.separator();
            ui.colored_label(egui::Color32::RED, err);
        }
    }

    fn viewport(&self, ui: &mut egui::Ui) {
        let [w, h] = self.canvas_size;
        let available = ui.available_size();
        let scale = (available.x / w as f32).min(available.y / h as f32).max(0.01);
        let (rect, _response) = ui.allocate_exact_size(
            egui::vec2(w as f32 * scale, h as f32 * scale),
            egui::Sense::hover(),
        );
        ui.painter().rect_filled(rect, 0.0, egui::Color32::from_gray(24));

        let Some(session) = self.session.as_ref() else {
            if let Some(ref err) = self.error {
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    err,
                    egui::FontId::default(),
                    egui::Color32::RED,
                );
            }
            return;
        };

        if !session.is_visible() {
            return;
        }

        match session.mode() {
            OverlayMode::MaskRender => {
                if let Some(target) = &self.target {
                    ui.painter().add(eframe::egui_wgpu::Callback::new_paint_callback(
                        rect,
                        MaskViewportCallback {
                            target: target.clone(),
                        },
                    ));
                }
            }
            OverlayMode::DotOverlay => {
                let painter = ui.painter_at(rect);
                let mut surface = PainterSurface::new(&painter, rect, w);
                session.overlay_canvas().replay(&mut surface);
            }
        }
    }
}

impl eframe::App for FacePaintApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.paint_session();

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.label("facepaint");
                ui.separator();
                ui.label("face overlay");
            });
        });

        egui::SidePanel::left("controls").show(ctx, |ui| {
            ui.heading("Controls");
            ui.separator();
            self.controls(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.viewport(ui);
        });

        // Repaint continuously for real-time updates
        ctx.request_repaint();
    }
}

impl Drop for FacePaintApp {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.teardown();
        }
    }
}
