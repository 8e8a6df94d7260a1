//! Frame scheduler
//!
//! Drives detection at a fixed cadence, independent of the paint rate. A single
//! spawned task issues one request per tick and waits for it before taking the
//! next tick, so results leave the loop in issue order. Every result carries a
//! monotonically increasing generation and the overlay mode the loop was
//! started for; the paint side uses both to discard stale work.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::SchedulerConfig;
use crate::error::TrackingError;
use crate::tracking::{LandmarkDetector, RawFace};

/// Which render path consumes detection results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlayMode {
    #[default]
    #[serde(rename = "mask")]
    MaskRender,
    #[serde(rename = "dots")]
    DotOverlay,
}

impl FromStr for OverlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mask" | "maskrender" => Ok(OverlayMode::MaskRender),
            "dots" | "dotoverlay" => Ok(OverlayMode::DotOverlay),
            other => Err(format!("unknown mode '{}' (expected mask or dots)", other)),
        }
    }
}

impl std::fmt::Display for OverlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayMode::MaskRender => write!(f, "mask"),
            OverlayMode::DotOverlay => write!(f, "dots"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

/// One resolved detection request
#[derive(Debug)]
pub struct DetectionOutcome {
    pub generation: u64,
    pub mode: OverlayMode,
    pub result: Result<Vec<RawFace>, TrackingError>,
}

pub struct FrameScheduler {
    detector: Arc<dyn LandmarkDetector>,
    tick: Duration,
    grace: Duration,
    state: RunState,
    /// Shared with every loop so generations stay monotonic across restarts
    generation: Arc<AtomicU64>,
    cancel: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
    stopped_at: Option<Instant>,
    outcomes: mpsc::UnboundedSender<DetectionOutcome>,
}

impl FrameScheduler {
    /// Create a stopped scheduler and the receiving end of its outcome channel.
    pub fn new(
        detector: Arc<dyn LandmarkDetector>,
        config: &SchedulerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DetectionOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            detector,
            tick: Duration::from_millis(config.tick_interval_ms),
            grace: Duration::from_millis(config.hide_grace_ms),
            state: RunState::Stopped,
            generation: Arc::new(AtomicU64::new(0)),
            cancel: None,
            task: None,
            stopped_at: None,
            outcomes: tx,
        };
        (scheduler, rx)
    }

    /// Stopped → Running. Must be called inside a tokio runtime.
    pub fn start(&mut self, mode: OverlayMode) {
        if self.state == RunState::Running {
            return;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(detection_loop(
            self.detector.clone(),
            self.tick,
            mode,
            self.generation.clone(),
            self.outcomes.clone(),
            cancel_rx,
        ));

        self.cancel = Some(cancel_tx);
        self.task = Some(task);
        self.stopped_at = None;
        self.state = RunState::Running;
        tracing::info!("Frame scheduler started ({} mode, tick {:?})", mode, self.tick);
    }

    /// Running → Stopped. No further requests are issued; a request already in
    /// flight still completes and the hidden flag follows after the grace window.
    pub fn stop(&mut self) {
        if self.state == RunState::Stopped {
            return;
        }
        self.cancel_loop();
        // Detached: the loop exits on its own once its in-flight request resolves
        self.task = None;
        self.stopped_at = Some(Instant::now());
        self.state = RunState::Stopped;
        tracing::info!("Frame scheduler stopped");
    }

    /// Stop without a grace window and abort any request in flight.
    pub fn halt(&mut self) {
        self.cancel_loop();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.stopped_at = None;
        self.state = RunState::Stopped;
    }

    fn cancel_loop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(true);
        }
    }

    pub fn run_state(&self) -> RunState {
        self.state
    }

    /// Running, or stopped less than the grace window ago.
    pub fn is_visible(&self) -> bool {
        match (self.state, self.stopped_at) {
            (RunState::Running, _) => true,
            (RunState::Stopped, Some(at)) => at.elapsed() < self.grace,
            (RunState::Stopped, None) => false,
        }
    }

    /// Highest generation stamped so far
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.halt();
    }
}

async fn detection_loop(
    detector: Arc<dyn LandmarkDetector>,
    tick: Duration,
    mode: OverlayMode,
    generation: Arc<AtomicU64>,
    outcomes: mpsc::UnboundedSender<DetectionOutcome>,
    mut cancel: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancel.changed() => break,
        }
        if *cancel.borrow() {
            break;
        }

        let generation = generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = detector.estimate_faces().await;

        if let Err(e) = &result {
            tracing::debug!("Detection {} failed: {}", generation, e);
        }

        let outcome = DetectionOutcome {
            generation,
            mode,
            result,
        };
        if outcomes.send(outcome).is_err() {
            break;
        }
    }

    tracing::debug!("Detection loop exited");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::future::{BoxFuture, FutureExt};
    use std::sync::atomic::AtomicUsize;

    /// Detector answering call `n` (0-based) with `respond(n)` after `delay`,
    /// recording how many requests overlap.
    pub(crate) struct FnDetector<F> {
        delay: Duration,
        respond: F,
        pub calls: AtomicUsize,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl<F> FnDetector<F>
    where
        F: Fn(usize) -> Result<Vec<RawFace>, TrackingError> + Send + Sync,
    {
        pub(crate) fn new(delay: Duration, respond: F) -> Arc<Self> {
            Arc::new(Self {
                delay,
                respond,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }
    }

    impl<F> LandmarkDetector for FnDetector<F>
    where
        F: Fn(usize) -> Result<Vec<RawFace>, TrackingError> + Send + Sync,
    {
        fn estimate_faces(&self) -> BoxFuture<'_, Result<Vec<RawFace>, TrackingError>> {
            async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                (self.respond)(call)
            }
            .boxed()
        }
    }

    fn config(tick_ms: u64) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval_ms: tick_ms,
            hide_grace_ms: 100,
            paint_fps: 60,
        }
    }

    fn empty(_: usize) -> Result<Vec<RawFace>, TrackingError> {
        Ok(Vec::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_state() {
        let detector = FnDetector::new(Duration::from_millis(5), empty);
        let (mut sched, _rx) = FrameScheduler::new(detector, &config(16));

        assert_eq!(sched.run_state(), RunState::Stopped);
        assert!(!sched.is_visible());

        sched.start(OverlayMode::MaskRender);
        assert_eq!(sched.run_state(), RunState::Running);
        assert!(sched.is_visible());

        sched.stop();
        assert_eq!(sched.run_state(), RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_only_after_grace() {
        let detector = FnDetector::new(Duration::from_millis(5), empty);
        let (mut sched, _rx) = FrameScheduler::new(detector, &config(16));

        sched.start(OverlayMode::MaskRender);
        tokio::time::sleep(Duration::from_millis(50)).await;
        sched.stop();

        // Same tick as stop()
        assert!(sched.is_visible());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(sched.is_visible());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!sched.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_detector_never_overlaps() {
        // Detection takes 2.5 ticks
        let detector = FnDetector::new(Duration::from_millis(40), empty);
        let (mut sched, mut rx) = FrameScheduler::new(detector.clone(), &config(16));

        sched.start(OverlayMode::MaskRender);
        let mut generations = Vec::new();
        for _ in 0..6 {
            generations.push(rx.recv().await.unwrap().generation);
        }
        sched.stop();

        assert_eq!(generations, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(detector.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_requests_after_stop() {
        let detector = FnDetector::new(Duration::from_millis(10), empty);
        let (mut sched, mut rx) = FrameScheduler::new(detector.clone(), &config(16));

        sched.start(OverlayMode::DotOverlay);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.mode, OverlayMode::DotOverlay);
        sched.stop();

        let issued = detector.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(detector.calls.load(Ordering::SeqCst), issued);

        // At most the one in-flight request still reports
        let mut late = 0;
        while rx.try_recv().is_ok() {
            late += 1;
        }
        assert!(late <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_delivered_and_cadence_continues() {
        let detector = FnDetector::new(Duration::from_millis(1), |call| {
            if call == 0 {
                Err(TrackingError::Timeout(500))
            } else {
                Ok(vec![vec![[0.0; 3]]])
            }
        });
        let (mut sched, mut rx) = FrameScheduler::new(detector, &config(16));

        sched.start(OverlayMode::MaskRender);
        let first = rx.recv().await.unwrap();
        assert!(matches!(first.result, Err(TrackingError::Timeout(500))));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.result.unwrap().len(), 1);
        assert!(second.generation > first.generation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generations_monotonic_across_restart() {
        let detector = FnDetector::new(Duration::from_millis(1), empty);
        let (mut sched, mut rx) = FrameScheduler::new(detector, &config(16));

        sched.start(OverlayMode::MaskRender);
        let a = rx.recv().await.unwrap().generation;
        sched.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        while rx.try_recv().is_ok() {}

        sched.start(OverlayMode::MaskRender);
        let b = rx.recv().await.unwrap().generation;
        assert!(b > a);
        assert_eq!(sched.current_generation(), b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_hides_immediately() {
        let detector = FnDetector::new(Duration::from_millis(1), empty);
        let (mut sched, _rx) = FrameScheduler::new(detector, &config(16));

        sched.start(OverlayMode::MaskRender);
        sched.halt();
        assert!(!sched.is_visible());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("mask".parse::<OverlayMode>().unwrap(), OverlayMode::MaskRender);
        assert_eq!("Dots".parse::<OverlayMode>().unwrap(), OverlayMode::DotOverlay);
        assert!("wire".parse::<OverlayMode>().is_err());
    }
}
