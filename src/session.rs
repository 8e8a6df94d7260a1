//! Face paint session
//!
//! The caller-facing surface: `start`/`stop`, mode and mask selection and the
//! accessory toggle. Detection results are applied in [`FacePaintSession::on_paint`],
//! which the host calls at every paint opportunity; mesh writes and render
//! submissions happen there and nowhere else.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::accessory::{AccessoryAnchor, AccessoryAttachment, AccessoryState};
use crate::config::{Config, MaskEntry};
use crate::error::{FacePaintError, PoseError, SessionError, TextureError, TrackingError};
use crate::landmarks::LandmarkFrame;
use crate::normalize::Normalizer;
use crate::overlay::{DebugOverlay, DrawSurface, OverlayCanvas};
use crate::pose::PoseEstimator;
use crate::render::{
    MaskTexture, MeshRenderer, RenderBackend, TextureLoader, TextureSwap,
};
use crate::scheduler::{DetectionOutcome, FrameScheduler, OverlayMode, RunState};
use crate::topology::Topology;
use crate::tracking::{LandmarkDetector, RawFace};

type TextureResult = (u64, Result<MaskTexture, TextureError>);

/// Recoverable fault reported from a paint
#[derive(Debug)]
pub enum SessionWarning {
    /// The detection for this generation failed; the frame was skipped
    Detection {
        generation: u64,
        error: TrackingError,
    },
    /// Rotation update skipped for this frame
    DegeneratePose { generation: u64, error: PoseError },
    /// A mask texture failed to load; the bound texture was kept
    Texture(TextureError),
}

impl std::fmt::Display for SessionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionWarning::Detection { generation, error } => {
                write!(f, "detection {} failed: {}", generation, error)
            }
            SessionWarning::DegeneratePose { generation, error } => {
                write!(f, "frame {}: {}", generation, error)
            }
            SessionWarning::Texture(e) => write!(f, "{}", e),
        }
    }
}

/// What one paint did
#[derive(Debug, Default)]
pub struct PaintReport {
    /// Generation applied in this paint, if any
    pub applied: Option<u64>,
    /// Faces in the applied frame
    pub faces: usize,
    /// Mesh render submissions
    pub rendered: usize,
    /// The dot overlay canvas was redrawn
    pub overlay_drawn: bool,
    /// Outcomes drained but replaced by a newer one or discarded
    pub discarded: usize,
    /// A texture was bound
    pub texture_applied: bool,
    pub warnings: Vec<SessionWarning>,
}

pub struct FacePaintSession {
    expected_landmarks: usize,
    scheduler: FrameScheduler,
    outcomes: mpsc::UnboundedReceiver<DetectionOutcome>,
    normalizer: Normalizer,
    pose: PoseEstimator,
    renderer: MeshRenderer,
    overlay: DebugOverlay,
    canvas: OverlayCanvas,
    accessory: AccessoryAnchor,
    mode: OverlayMode,
    last_applied: u64,
    loader: Arc<dyn TextureLoader>,
    textures_tx: mpsc::UnboundedSender<TextureResult>,
    textures_rx: mpsc::UnboundedReceiver<TextureResult>,
    masks: Vec<MaskEntry>,
    mask_index: Option<usize>,
    fault: Option<String>,
}

impl FacePaintSession {
    /// Build the session's scene once. The topology's vertex count fixes the
    /// landmark count for the session's lifetime.
    pub fn new(
        config: &Config,
        topology: Arc<Topology>,
        detector: Arc<dyn LandmarkDetector>,
        loader: Arc<dyn TextureLoader>,
        backend: Box<dyn RenderBackend>,
    ) -> Result<Self, FacePaintError> {
        if topology.vertex_count() != config.landmarks.count {
            return Err(FacePaintError::Landmark(
                crate::error::LandmarkError::CountMismatch {
                    expected: config.landmarks.count,
                    actual: topology.vertex_count(),
                },
            ));
        }

        let renderer = MeshRenderer::init(
            backend,
            topology.clone(),
            config.canvas.width,
            config.canvas.height,
        )?;
        let (scheduler, outcomes) = FrameScheduler::new(detector, &config.scheduler);
        let (textures_tx, textures_rx) = mpsc::unbounded_channel();

        let mut accessory = AccessoryAnchor::new(&config.accessory);
        if config.accessory.attach_on_start {
            accessory.attach();
        }

        tracing::info!(
            "Session ready: {} landmarks, {} faces, {} masks",
            topology.vertex_count(),
            topology.face_count(),
            config.masks.len()
        );

        Ok(Self {
            expected_landmarks: topology.vertex_count(),
            scheduler,
            outcomes,
            normalizer: Normalizer::from_config(&config.normalize),
            pose: PoseEstimator::from_config(&config.landmarks),
            renderer,
            overlay: DebugOverlay::new(topology),
            canvas: OverlayCanvas::new(),
            accessory,
            mode: config.mode,
            last_applied: 0,
            loader,
            textures_tx,
            textures_rx,
            masks: config.masks.clone(),
            mask_index: None,
            fault: None,
        })
    }

    /// Stopped → Running in the current mode.
    pub fn start(&mut self) -> Result<(), FacePaintError> {
        if let Some(reason) = &self.fault {
            return Err(SessionError::Faulted(reason.clone()).into());
        }
        self.scheduler.start(self.mode);
        Ok(())
    }

    /// Running → Stopped; the overlay hides after the grace window.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Switch render path. Stops a running session; the caller restarts it.
    pub fn set_mode(&mut self, mode: OverlayMode) {
        if mode == self.mode {
            return;
        }
        if self.scheduler.run_state() == RunState::Running {
            self.scheduler.stop();
        }
        self.mode = mode;
        self.canvas.clear();
        self.renderer.set_active(false);
        tracing::info!("Overlay mode set to {}", mode);
    }

    /// Request the texture of catalog entry `index`. The load runs in the
    /// background; the last request issued wins. Returns the request id.
    pub fn set_mask_index(&mut self, index: usize) -> Result<u64, FacePaintError> {
        let entry = self.masks.get(index).ok_or(SessionError::MaskIndex {
            index,
            count: self.masks.len(),
        })?;
        let path: PathBuf = entry.texture.clone();
        let request = self.renderer.request_texture();
        self.mask_index = Some(index);

        tracing::info!("Loading mask '{}' ({})", entry.label, path.display());

        let load = self.loader.load(path);
        let tx = self.textures_tx.clone();
        tokio::spawn(async move {
            let result = load.await;
            let _ = tx.send((request, result));
        });
        Ok(request)
    }

    pub fn attach_accessory(&mut self) {
        self.accessory.attach();
    }

    pub fn detach_accessory(&mut self) {
        self.accessory.detach();
        self.renderer.set_accessory(None);
    }

    /// Apply pending work at a paint opportunity.
    ///
    /// Binds the newest completed texture request and applies the newest
    /// detection outcome that is newer than anything applied before and was
    /// produced for the current mode. A landmark count mismatch faults the
    /// session and is returned as an error.
    pub fn on_paint(&mut self) -> Result<PaintReport, FacePaintError> {
        let mut report = PaintReport::default();
        self.apply_textures(&mut report);

        let visible = self.scheduler.is_visible() && self.fault.is_none();
        self.renderer
            .set_active(visible && self.mode == OverlayMode::MaskRender);

        let mut newest: Option<(u64, Vec<RawFace>)> = None;
        while let Ok(outcome) = self.outcomes.try_recv() {
            if !visible || outcome.mode != self.mode || outcome.generation <= self.last_applied {
                tracing::debug!("Discarding detection {}", outcome.generation);
                report.discarded += 1;
                continue;
            }
            self.last_applied = outcome.generation;

            match outcome.result {
                Ok(faces) => {
                    if newest.replace((outcome.generation, faces)).is_some() {
                        report.discarded += 1;
                    }
                }
                Err(error) => {
                    tracing::warn!("Detection {} failed: {}", outcome.generation, error);
                    report.warnings.push(SessionWarning::Detection {
                        generation: outcome.generation,
                        error,
                    });
                }
            }
        }

        if let Some((generation, faces)) = newest {
            self.apply_frame(generation, &faces, &mut report)?;
        }
        Ok(report)
    }

    fn apply_textures(&mut self, report: &mut PaintReport) {
        while let Ok((request, result)) = self.textures_rx.try_recv() {
            match self.renderer.complete_texture(request, result) {
                Ok(TextureSwap::Applied) => report.texture_applied = true,
                Ok(TextureSwap::Stale) => {}
                Err(e) => {
                    tracing::warn!("Mask texture not applied: {}", e);
                    report.warnings.push(SessionWarning::Texture(e));
                }
            }
        }
    }

    fn apply_frame(
        &mut self,
        generation: u64,
        faces: &[RawFace],
        report: &mut PaintReport,
    ) -> Result<(), FacePaintError> {
        let frames = match faces
            .iter()
            .map(|face| LandmarkFrame::from_raw(generation, face, self.expected_landmarks))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(frames) => frames,
            Err(e) => {
                tracing::error!("Fatal landmark mismatch, session faulted: {}", e);
                self.fault = Some(e.to_string());
                self.scheduler.halt();
                self.renderer.set_active(false);
                return Err(e.into());
            }
        };

        report.applied = Some(generation);
        report.faces = frames.len();

        match self.mode {
            OverlayMode::MaskRender => {
                self.renderer.begin_frame();
                for raw in &frames {
                    let frame = self.normalizer.frame(raw);
                    let pose = self.pose.estimate(&frame);
                    if let Err(error) = pose {
                        tracing::debug!("Frame {}: {}", generation, error);
                        report
                            .warnings
                            .push(SessionWarning::DegeneratePose { generation, error });
                    }

                    if !self.renderer.update_mesh(&frame)? {
                        break;
                    }
                    let transform = self.accessory.on_frame(&frame, pose);
                    self.renderer.set_accessory(transform);
                    self.renderer.render()?;
                    report.rendered += 1;
                }
            }
            OverlayMode::DotOverlay => {
                self.canvas.clear();
                for raw in &frames {
                    self.overlay.draw(raw, &mut self.canvas);
                }
                report.overlay_drawn = true;
            }
        }
        Ok(())
    }

    /// Clear a fault and return to a stopped, hidden session. Pending
    /// detection outcomes are dropped and the accessory re-baselines.
    pub fn reset(&mut self) {
        self.scheduler.halt();
        while self.outcomes.try_recv().is_ok() {}
        self.last_applied = self.scheduler.current_generation();
        self.canvas.clear();
        self.renderer.set_active(false);
        self.renderer.set_accessory(None);
        if self.accessory.is_attached() {
            self.accessory.detach();
            self.accessory.attach();
        }
        if self.fault.take().is_some() {
            tracing::info!("Session reset after fault");
        }
    }

    pub fn teardown(mut self) {
        self.scheduler.halt();
        self.renderer.teardown();
        tracing::info!("Session torn down");
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn run_state(&self) -> RunState {
        self.scheduler.run_state()
    }

    /// Running, or within the grace window after a stop
    pub fn is_visible(&self) -> bool {
        self.scheduler.is_visible() && self.fault.is_none()
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn overlay_canvas(&self) -> &OverlayCanvas {
        &self.canvas
    }

    pub fn accessory_attachment(&self) -> AccessoryAttachment {
        self.accessory.attachment()
    }

    pub fn accessory_state(&self) -> AccessoryState {
        self.accessory.state()
    }

    pub fn renderer(&self) -> &MeshRenderer {
        &self.renderer
    }

    pub fn masks(&self) -> &[MaskEntry] {
        &self.masks
    }

    /// Catalog entry most recently requested
    pub fn mask_index(&self) -> Option<usize> {
        self.mask_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizeMode;
    use crate::render::tests::{square_topology, Recorded, RecordingBackend};
    use crate::scheduler::tests::FnDetector;
    use futures::future::{BoxFuture, FutureExt};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(16);

    fn square_face(z: f32) -> RawFace {
        vec![[0.0, 0.0, z], [1.0, 0.0, z], [1.0, 1.0, z], [0.0, 2.0, z]]
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.landmarks.count = 4;
        config.landmarks.top = 0;
        config.landmarks.bottom = 3;
        config.landmarks.left = 1;
        config.landmarks.right = 0;
        config.accessory.anchor_index = 3;
        config.accessory.depth_index = 0;
        config.normalize.mode = NormalizeMode::Offset;
        config.normalize.offset = [0.0, 0.0, 0.0];
        config.masks = vec![
            MaskEntry {
                label: "a".into(),
                texture: "a.png".into(),
            },
            MaskEntry {
                label: "b".into(),
                texture: "b.png".into(),
            },
        ];
        config
    }

    /// Loader whose per-path delay is scripted; unknown paths fail.
    struct DelayedLoader {
        delays: HashMap<PathBuf, Duration>,
    }

    impl TextureLoader for DelayedLoader {
        fn load(&self, path: PathBuf) -> BoxFuture<'static, Result<MaskTexture, TextureError>> {
            let delay = self.delays.get(&path).copied();
            async move {
                match delay {
                    Some(delay) => {
                        tokio::time::sleep(delay).await;
                        Ok(MaskTexture::new(path, 1, 1, vec![255; 4]))
                    }
                    None => Err(TextureError::NotFound(path.display().to_string())),
                }
            }
            .boxed()
        }
    }

    fn loader() -> Arc<DelayedLoader> {
        Arc::new(DelayedLoader {
            delays: HashMap::from([
                (PathBuf::from("a.png"), Duration::from_millis(80)),
                (PathBuf::from("b.png"), Duration::from_millis(10)),
            ]),
        })
    }

    fn session_with(
        config: &Config,
        detector: Arc<dyn LandmarkDetector>,
    ) -> (FacePaintSession, Arc<Mutex<Recorded>>) {
        let rec = Arc::new(Mutex::new(Recorded::default()));
        let session = FacePaintSession::new(
            config,
            square_topology(),
            detector,
            loader(),
            Box::new(RecordingBackend(rec.clone())),
        )
        .unwrap();
        (session, rec)
    }

    fn one_face(_: usize) -> Result<Vec<RawFace>, TrackingError> {
        Ok(vec![square_face(0.0)])
    }

    /// Let the detection loop deliver at least one outcome
    async fn settle() {
        tokio::time::sleep(TICK * 2).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_mask_mode_renders() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), one_face),
        );
        s.start().unwrap();
        settle().await;

        let report = s.on_paint().unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(report.faces, 1);
        assert!(!report.overlay_drawn);
        assert_eq!(rec.lock().unwrap().last_positions.len(), 12);
        assert!(s.overlay_canvas().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_applied_while_stopped() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), one_face),
        );
        settle().await;
        let report = s.on_paint().unwrap();
        assert!(report.applied.is_none());
        assert_eq!(rec.lock().unwrap().renders, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dot_mode_never_renders_mesh() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), one_face),
        );
        s.set_mode(OverlayMode::DotOverlay);
        s.start().unwrap();

        for _ in 0..5 {
            settle().await;
            let report = s.on_paint().unwrap();
            assert_eq!(report.rendered, 0);
        }
        assert_eq!(rec.lock().unwrap().renders, 0);
        // Two triangles plus four dots
        assert_eq!(s.overlay_canvas().shapes().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_switch_stops_and_needs_restart() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), one_face),
        );
        s.start().unwrap();
        settle().await;
        s.on_paint().unwrap();

        s.set_mode(OverlayMode::DotOverlay);
        assert_eq!(s.run_state(), RunState::Stopped);

        // Outcomes tagged for the old mode are dropped
        settle().await;
        let report = s.on_paint().unwrap();
        assert!(report.applied.is_none());
        assert!(s.overlay_canvas().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(s.on_paint().unwrap().applied.is_none());

        s.start().unwrap();
        settle().await;
        let report = s.on_paint().unwrap();
        assert!(report.overlay_drawn);
        assert_eq!(rec.lock().unwrap().renders, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_newest_outcome_applied() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), |call| {
                Ok(vec![square_face(call as f32)])
            }),
        );
        s.start().unwrap();
        tokio::time::sleep(TICK * 4).await;

        let report = s.on_paint().unwrap();
        assert_eq!(report.rendered, 1);
        assert!(report.discarded >= 1);
        let applied = report.applied.unwrap();

        // z of the applied frame equals its call index
        let z = rec.lock().unwrap().last_positions[2];
        assert_eq!(z, (applied - 1) as f32);
    }

    /// Detector whose first call is slow; every call answers with z = call index.
    struct SlowFirstCall {
        first: Duration,
        rest: Duration,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl LandmarkDetector for SlowFirstCall {
        fn estimate_faces(&self) -> BoxFuture<'_, Result<Vec<RawFace>, TrackingError>> {
            async move {
                let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                let delay = if call == 0 { self.first } else { self.rest };
                tokio::time::sleep(delay).await;
                Ok(vec![square_face(call as f32)])
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_result_after_restart_is_discarded() {
        let (mut s, rec) = session_with(
            &test_config(),
            Arc::new(SlowFirstCall {
                first: Duration::from_millis(100),
                rest: Duration::from_millis(2),
                calls: Default::default(),
            }),
        );
        s.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Call 0 (generation 1) is still in flight across the restart
        s.stop();
        s.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let first = s.on_paint().unwrap();
        assert_eq!(first.applied, Some(2));
        assert_eq!(rec.lock().unwrap().last_positions[2], 1.0);

        // Call 0 lands at t = 100 ms, after newer generations were applied
        tokio::time::sleep(Duration::from_millis(110)).await;
        let second = s.on_paint().unwrap();
        let applied = second.applied.unwrap();
        assert!(applied > 2);
        // Superseded generations 3..applied plus the late generation 1
        assert_eq!(second.discarded as u64, applied - 2);

        let z = rec.lock().unwrap().last_positions[2];
        assert_eq!(z, (applied - 1) as f32);
        assert_ne!(z, 0.0);
        assert_eq!(rec.lock().unwrap().renders, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detection_error_skips_frame() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), |call| {
                if call == 0 {
                    Err(TrackingError::Timeout(500))
                } else {
                    Ok(vec![square_face(0.0)])
                }
            }),
        );
        s.start().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let report = s.on_paint().unwrap();
        assert_eq!(report.rendered, 0);
        assert!(matches!(
            report.warnings.as_slice(),
            [SessionWarning::Detection { generation: 1, .. }]
        ));
        assert_eq!(rec.lock().unwrap().renders, 0);

        settle().await;
        assert_eq!(s.on_paint().unwrap().rendered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_mismatch_faults_session() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), |_| Ok(vec![vec![[0.0; 3]; 5]])),
        );
        s.start().unwrap();
        settle().await;

        let err = s.on_paint().unwrap_err();
        assert!(err.is_fatal());
        assert!(s.is_faulted());
        assert_eq!(s.run_state(), RunState::Stopped);
        assert!(!s.is_visible());
        assert_eq!(rec.lock().unwrap().renders, 0);

        let err = s.start().unwrap_err();
        assert!(matches!(
            err,
            FacePaintError::Session(SessionError::Faulted(_))
        ));

        s.reset();
        assert!(!s.is_faulted());
        assert!(s.start().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_frame_renders_within_grace() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(30), one_face),
        );
        s.start().unwrap();
        // First request issued at t=0, resolves at t=30
        tokio::time::sleep(Duration::from_millis(5)).await;
        s.stop();
        assert!(s.is_visible());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(s.on_paint().unwrap().rendered, 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!s.is_visible());
        assert!(s.on_paint().unwrap().applied.is_none());
        assert_eq!(rec.lock().unwrap().renders, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_issued_mask_wins() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), one_face),
        );
        // "a" resolves after "b"
        s.set_mask_index(0).unwrap();
        s.set_mask_index(1).unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(s.on_paint().unwrap().texture_applied);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!s.on_paint().unwrap().texture_applied);

        assert_eq!(
            s.renderer().material().texture.as_ref().unwrap().path,
            PathBuf::from("b.png")
        );
        assert_eq!(s.mask_index(), Some(1));

        s.start().unwrap();
        settle().await;
        s.on_paint().unwrap();
        assert_eq!(
            rec.lock().unwrap().last_texture.as_deref(),
            Some(std::path::Path::new("b.png"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_texture_failure_is_warning() {
        let mut config = test_config();
        config.masks.push(MaskEntry {
            label: "missing".into(),
            texture: "missing.png".into(),
        });
        let (mut s, _) = session_with(
            &config,
            FnDetector::new(Duration::from_millis(1), one_face),
        );
        s.set_mask_index(1).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        s.on_paint().unwrap();

        s.set_mask_index(2).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let report = s.on_paint().unwrap();
        assert!(matches!(
            report.warnings.as_slice(),
            [SessionWarning::Texture(TextureError::NotFound(_))]
        ));
        assert_eq!(
            s.renderer().material().texture.as_ref().unwrap().path,
            PathBuf::from("b.png")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_mask_index_out_of_range() {
        let (mut s, _) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), one_face),
        );
        let err = s.set_mask_index(9).unwrap_err();
        assert!(matches!(
            err,
            FacePaintError::Session(SessionError::MaskIndex { index: 9, count: 2 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accessory_follows_frames() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), one_face),
        );
        s.attach_accessory();
        s.start().unwrap();
        settle().await;
        s.on_paint().unwrap();

        let state = s.accessory_state();
        // |Δy| between landmark 3 and landmark 0
        assert_eq!(state.baseline_distance, Some(2.0));
        let transform = rec.lock().unwrap().last_accessory.unwrap();
        assert_eq!(transform.position, glam::Vec3::new(0.0, 2.0, 0.0));

        s.detach_accessory();
        assert_eq!(s.accessory_attachment(), AccessoryAttachment::Detached);
        settle().await;
        s.on_paint().unwrap();
        assert!(rec.lock().unwrap().last_accessory.is_none());

        s.attach_accessory();
        assert!(!s.accessory_state().is_baselined());
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiple_faces_render_each() {
        let (mut s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), |_| {
                Ok(vec![square_face(0.0), square_face(1.0)])
            }),
        );
        s.start().unwrap();
        settle().await;
        let report = s.on_paint().unwrap();
        assert_eq!(report.faces, 2);
        assert_eq!(report.rendered, 2);
        let rec = rec.lock().unwrap();
        // Both faces land in one image
        assert_eq!(rec.frames, 1);
        assert_eq!(rec.last_positions[2], 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_topology_count_must_match_config() {
        let mut config = test_config();
        config.landmarks.count = 468;
        let result = FacePaintSession::new(
            &config,
            square_topology(),
            FnDetector::new(Duration::from_millis(1), one_face),
            loader(),
            Box::new(RecordingBackend(Arc::new(Mutex::new(Recorded::default())))),
        );
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_reaches_backend() {
        let (s, rec) = session_with(
            &test_config(),
            FnDetector::new(Duration::from_millis(1), one_face),
        );
        s.teardown();
        assert!(rec.lock().unwrap().torn_down);
    }
}
