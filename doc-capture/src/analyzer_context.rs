//! Per-process orchestration: wires the detection pipeline, temporal
//! tracker and capture state machine together, publishing both streams
//! from spec.md §6 via `ChangeTracker`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_change_tracker::ChangeTracker;
use parking_lot::RwLock;
use doc_geometry::Quad;
use doc_types::{Config, Detection, Frame, OwnedLumaFrame, Rotation};
use doc_vision::DetectionPipeline;
use image::RgbImage;

use crate::camera_control::CameraControl;
use crate::capture_state::CaptureState;
use crate::errors::Result;

/// Everything published to external consumers for one analyzed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionStreamEntry {
    pub normalized_corners: Option<[(f64, f64); 4]>,
    pub display_width: u32,
    pub display_height: u32,
    pub latency_ms: u64,
    pub confidence: f64,
    pub is_stable: bool,
    pub stability_progress: f64,
    pub is_partial_document: bool,
    pub is_tracked: bool,
}

impl Default for DetectionStreamEntry {
    fn default() -> Self {
        Self {
            normalized_corners: None,
            display_width: 0,
            display_height: 0,
            latency_ms: 0,
            confidence: 0.0,
            is_stable: false,
            stability_progress: 0.0,
            is_partial_document: false,
            is_tracked: false,
        }
    }
}

/// Orchestrates one analyzer instance: the detection pipeline, the
/// temporal tracker, warmup timing and the auto-capture predicate. Owns
/// the published state (`ChangeTracker`) for both the detection and
/// capture streams.
pub struct AnalyzerContext<C: CameraControl> {
    config: Config,
    pipeline: DetectionPipeline,
    tracker: doc_tracker::TemporalTracker,
    camera: C,
    detection_store: Arc<RwLock<ChangeTracker<DetectionStreamEntry>>>,
    capture_store: Arc<RwLock<ChangeTracker<CaptureState>>>,
    warmup_started_at: Instant,
    af_lock_requested: bool,
    af_locked: bool,
    frame_no: u64,
}

impl<C: CameraControl> AnalyzerContext<C> {
    pub fn new(config: Config, camera: C) -> Self {
        let pipeline = DetectionPipeline::new(config.strategy_time_budget_ms);
        Self {
            detection_store: Arc::new(RwLock::new(ChangeTracker::new(DetectionStreamEntry::default()))),
            capture_store: Arc::new(RwLock::new(ChangeTracker::new(CaptureState::Idle))),
            config,
            pipeline,
            tracker: doc_tracker::TemporalTracker::new(),
            camera,
            warmup_started_at: Instant::now(),
            af_lock_requested: false,
            af_locked: false,
            frame_no: 0,
        }
    }

    pub fn detection_store(&self) -> Arc<RwLock<ChangeTracker<DetectionStreamEntry>>> {
        self.detection_store.clone()
    }

    pub fn capture_store(&self) -> Arc<RwLock<ChangeTracker<CaptureState>>> {
        self.capture_store.clone()
    }

    /// Reset warmup, as happens on entering Idle after a completed
    /// capture or an error.
    pub fn restart_warmup(&mut self) {
        self.warmup_started_at = Instant::now();
    }

    fn warmup_elapsed(&self) -> bool {
        self.warmup_started_at.elapsed() >= Duration::from_millis(self.config.warmup_ms)
    }

    /// Process one incoming frame: runs detection (or reuses the last
    /// result per adaptive skip), updates the tracker, issues AF-lock
    /// requests, and evaluates the auto-capture predicate.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn process_frame(&mut self, frame: &Frame<'_>) -> Result<()> {
        let start = Instant::now();
        self.frame_no += 1;

        let owned = OwnedLumaFrame::from_frame(frame);
        let detection = match self.tracker.next_action() {
            doc_tracker::FrameAction::RunDetection => {
                self.pipeline.detect(frame, self.frame_no).map(|d| as_gated(d))
            }
            doc_tracker::FrameAction::Skip => None,
        };

        let gated = detection.map(|(quad, confidence, _partial)| (quad, confidence));
        let tracked_quad = self.tracker.observe(&owned, gated);
        let latency_ms = start.elapsed().as_millis() as u64;

        self.update_af_lock();

        let entry = DetectionStreamEntry {
            normalized_corners: tracked_quad.map(|q| q.normalized(frame.width as f64, frame.height as f64)),
            display_width: frame.width,
            display_height: frame.height,
            latency_ms,
            confidence: self.tracker.average_confidence(),
            is_stable: self.tracker.is_stable(),
            stability_progress: self.tracker.stability_progress(),
            is_partial_document: tracked_quad
                .map(|q| q.is_partial_document(frame.width as f64, frame.height as f64, 5.0))
                .unwrap_or(false),
            is_tracked: self.tracker.is_tracking(),
        };

        {
            let mut guard = self.detection_store.write();
            guard.modify(|store| *store = entry.clone());
        }

        if tracked_quad.is_none() {
            let _ = self.camera.cancel_af_lock();
            self.af_lock_requested = false;
            self.af_locked = false;
        }

        if self.should_auto_capture(&entry) {
            self.run_capture()?;
        }

        Ok(())
    }

    fn update_af_lock(&mut self) {
        if !self.af_lock_requested && self.tracker.stability_progress() >= 0.5 {
            if self.camera.request_af_lock((0.1, 0.1, 0.8, 0.8)).is_ok() {
                self.af_lock_requested = true;
                self.af_locked = true;
            }
        }
    }

    /// The auto-capture predicate from spec.md §5, evaluated atomically
    /// against this frame's tracker state.
    fn should_auto_capture(&self, entry: &DetectionStreamEntry) -> bool {
        self.config.auto_capture_enabled
            && entry.is_stable
            && entry.confidence >= self.config.auto_capture_confidence_threshold
            && self.capture_store.read().as_ref().is_idle()
            && self.warmup_elapsed()
            && self.af_locked
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn run_capture(&mut self) -> Result<()> {
        self.set_capture_state(CaptureState::Capturing);
        let start = Instant::now();

        let original = match self.camera.request_capture() {
            Ok(frame) => frame,
            Err(e) => {
                self.fail_capture(e.to_string());
                return Ok(());
            }
        };

        self.set_capture_state(CaptureState::Processing);

        let quad = {
            let guard = self.detection_store.read();
            guard.as_ref().normalized_corners
        };
        let Some(normalized) = quad else {
            self.fail_capture("no detected corners at capture time".to_string());
            return Ok(());
        };
        let corners = denormalize(normalized, original.width(), original.height());
        let shorter_side = original.width().min(original.height()) as f64;
        let Ok(quad) = Quad::from_unordered(corners, shorter_side) else {
            self.fail_capture("detected corners degenerated at full resolution".to_string());
            return Ok(());
        };

        let confidence = self.tracker.average_confidence();
        let latency_ms = start.elapsed().as_millis() as u64;

        if confidence < 0.65 {
            self.set_capture_state(CaptureState::LowConfidence {
                original,
                corners: quad,
                confidence,
            });
            return Ok(());
        }

        match doc_rectify::rectify(&original, &quad) {
            Ok(output) => {
                self.set_capture_state(CaptureState::Result {
                    original,
                    rectified: output.rectified,
                    latency_ms,
                    confidence,
                    corners: output.refined_quad,
                    auto_rotation_steps: output.auto_rotation_steps,
                });
            }
            Err(e) => self.fail_capture(e.to_string()),
        }
        Ok(())
    }

    fn fail_capture(&mut self, message: String) {
        self.set_capture_state(CaptureState::Error(message));
    }

    fn set_capture_state(&mut self, state: CaptureState) {
        let mut guard = self.capture_store.write();
        guard.modify(|s| *s = state);
    }
}

fn as_gated(detection: Detection) -> (Quad, f64, bool) {
    (detection.quad, detection.confidence, detection.is_partial_document)
}

fn denormalize(normalized: [(f64, f64); 4], width: u32, height: u32) -> [doc_geometry::Point; 4] {
    normalized.map(|(x, y)| doc_geometry::Point::new(x * width as f64, y * height as f64))
}

/// Supplies rotation info alongside a capture result to downstream
/// consumers that want to compose it with a prior manual rotation.
pub fn compose_with_manual_rotation(auto: Rotation, manual: Rotation) -> Rotation {
    auto.compose(manual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_control::RegionOfInterest;

    struct StubCamera {
        af_locks: u32,
    }

    impl CameraControl for StubCamera {
        fn request_af_lock(&mut self, _roi: RegionOfInterest) -> Result<()> {
            self.af_locks += 1;
            Ok(())
        }
        fn cancel_af_lock(&mut self) -> Result<()> {
            Ok(())
        }
        fn request_capture(&mut self) -> Result<RgbImage> {
            Ok(RgbImage::new(10, 10))
        }
    }

    #[test]
    fn auto_capture_is_suppressed_during_warmup() {
        let config = Config { warmup_ms: 10_000, ..Config::default() };
        let mut ctx = AnalyzerContext::new(config, StubCamera { af_locks: 0 });
        let entry = DetectionStreamEntry {
            is_stable: true,
            confidence: 0.9,
            ..Default::default()
        };
        ctx.af_locked = true;
        assert!(!ctx.should_auto_capture(&entry));
    }

    #[test]
    fn auto_capture_fires_once_all_conditions_hold() {
        let config = Config { warmup_ms: 0, ..Config::default() };
        let mut ctx = AnalyzerContext::new(config, StubCamera { af_locks: 0 });
        ctx.af_locked = true;
        std::thread::sleep(Duration::from_millis(5));
        let entry = DetectionStreamEntry {
            is_stable: true,
            confidence: 0.9,
            ..Default::default()
        };
        assert!(ctx.should_auto_capture(&entry));
    }
}
