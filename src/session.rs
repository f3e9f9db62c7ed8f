// One tracking session: the selection, the color model built from it, and the
// window the tracker carries from frame to frame.
//
// Both entry points take `&mut self`: pointer events and frame processing never
// run at the same time. A host that delivers events from another thread should
// put the session behind a single `Mutex`.
use std::fmt::Debug;

use log::{debug, info, warn};

use crate::backproject::likelihood_map;
use crate::camshift::{SkipReason, cam_shift};
use crate::config::TrackerConfig;
use crate::histogram::Histogram;
use crate::selection::{PointerEvent, PointerKind, RegionSelector, SelectionState};
use crate::types::{FrameBuffer, GrayImage, HsvImage, SelectionRect, TrackEllipse, TrackWindow};
use crate::vision::{crop_gray, crop_hsv, frame_to_hsv, in_range};

/// The color model of a selection. Replaced as a whole on every new selection.
#[derive(Clone, Debug)]
pub struct TrackModel {
    pub selection: SelectionRect,
    pub histogram: Histogram,
    /// HSV pixels of the selected region, kept for the ROI diagnostic view.
    pub roi: HsvImage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackStatus {
    /// No usable selection yet.
    Idle,
    Tracked,
    /// Tracking was attempted but produced nothing this frame; the previous
    /// window is kept for the next one.
    Skipped(SkipReason),
}

/// Everything one frame produced, for the display.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub index: u64,
    pub state: SelectionState,
    pub status: TrackStatus,
    pub ellipse: Option<TrackEllipse>,
    pub window: Option<TrackWindow>,
    pub mask: GrayImage,
    pub back_projection: Option<GrayImage>,
}

#[derive(Debug)]
pub struct TrackingSession {
    config: TrackerConfig,
    selector: RegionSelector,
    model: Option<TrackModel>,
    window: Option<TrackWindow>,
    lost: bool,
    frames: u64,
}

impl TrackingSession {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            selector: RegionSelector::new(),
            model: None,
            window: None,
            lost: false,
            frames: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> SelectionState {
        self.selector.state()
    }

    pub fn selector(&self) -> &RegionSelector {
        &self.selector
    }

    pub fn model(&self) -> Option<&TrackModel> {
        self.model.as_ref()
    }

    pub fn track_window(&self) -> Option<TrackWindow> {
        self.window
    }

    /// Feed one pointer event. A press always starts a new selection and
    /// drops the current model.
    pub fn handle_pointer<C: Debug>(&mut self, event: &PointerEvent<C>) -> SelectionState {
        if event.kind == PointerKind::Down {
            self.forget_target();
        }
        self.selector.handle(event)
    }

    /// Drop selection and model; wait for a new selection.
    pub fn clear(&mut self) {
        self.selector.reject();
        self.forget_target();
        info!("selection cleared");
    }

    fn forget_target(&mut self) {
        self.model = None;
        self.window = None;
        self.lost = false;
    }

    /// Run the per-frame pipeline: HSV + mask always; model build on a fresh
    /// selection; back-projection + CamShift while a model exists.
    pub fn process_frame(&mut self, frame: &FrameBuffer) -> FrameReport {
        self.frames += 1;
        self.selector.set_frame_size(frame.width, frame.height);

        let hsv = frame_to_hsv(frame);
        let mask = in_range(&hsv, self.config.saturation, self.config.value);

        if self.model.is_none() && self.selector.state() == SelectionState::Validated {
            self.build_model(&hsv, &mask);
        }

        let mut report = FrameReport {
            index: self.frames,
            state: self.selector.state(),
            status: TrackStatus::Idle,
            ellipse: None,
            window: self.window,
            mask,
            back_projection: None,
        };

        let (Some(model), Some(window)) = (&self.model, self.window) else {
            return report;
        };

        let back = likelihood_map(&hsv, &model.histogram, &report.mask);
        match cam_shift(&back, window, &self.config.term, &self.config.adaptive) {
            Ok(r) => {
                if self.lost {
                    info!("target reacquired at {:?}", r.window);
                    self.lost = false;
                }
                debug!(
                    "frame {}: {:?} after {} iterations (converged: {})",
                    self.frames, r.ellipse, r.iterations, r.converged
                );
                self.window = Some(r.window);
                self.selector.begin_tracking();
                report.status = TrackStatus::Tracked;
                report.ellipse = Some(r.ellipse);
                report.window = Some(r.window);
            }
            Err(reason) => {
                if !self.lost {
                    info!("target lost ({reason}); keeping window {window:?}");
                    self.lost = true;
                }
                debug!("frame {}: tracking skipped: {reason}", self.frames);
                report.status = TrackStatus::Skipped(reason);
            }
        }
        report.state = self.selector.state();
        report.back_projection = Some(back);
        report
    }

    fn build_model(&mut self, hsv: &HsvImage, mask: &GrayImage) {
        let Some(rect) = self.selector.selection() else {
            return;
        };
        let window = rect.to_window();
        if window.is_degenerate() {
            warn!("selection {rect:?} has no area; discarded");
            self.selector.reject();
            return;
        }
        // Validated against the frame the user dragged on; this one may be smaller.
        if !rect.fits_within(hsv.width, hsv.height) {
            warn!("selection {rect:?} no longer fits the {}x{} frame; discarded", hsv.width, hsv.height);
            self.selector.reject();
            return;
        }

        let roi = crop_hsv(hsv, &rect);
        let roi_mask = crop_gray(mask, &rect);
        let mut histogram = Histogram::from_roi(&roi, Some(&roi_mask), self.config.histogram_spec());
        if self.config.normalize_histogram {
            histogram = histogram.normalized(255.0);
        }
        info!(
            "model built from {:?}: {} of {} pixels counted, peak hue bin {:?}",
            rect,
            histogram.total(),
            roi.pixels.len(),
            histogram.peak_bin()
        );

        self.model = Some(TrackModel { selection: rect, histogram, roi });
        self.window = Some(window);
        self.lost = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: u32 = 0x00FF_0000;

    fn scene(x0: usize, y0: usize) -> FrameBuffer {
        let mut f = FrameBuffer::filled(100, 100, 0);
        f.fill_rect(x0, y0, x0 + 20, y0 + 20, RED);
        f
    }

    fn select(s: &mut TrackingSession, a: (i32, i32), b: (i32, i32)) {
        s.handle_pointer(&PointerEvent::down(a.0, a.1));
        s.handle_pointer(&PointerEvent::up(b.0, b.1));
    }

    #[test]
    fn idle_until_something_is_selected() {
        let mut s = TrackingSession::new(TrackerConfig::default());
        let r = s.process_frame(&scene(40, 40));
        assert_eq!(r.status, TrackStatus::Idle);
        assert!(r.back_projection.is_none());
        assert_eq!(r.mask.data.iter().filter(|&&m| m == 255).count(), 400);
    }

    #[test]
    fn first_tracked_frame_enters_tracking() {
        let mut s = TrackingSession::new(TrackerConfig::default());
        s.process_frame(&scene(40, 40));
        select(&mut s, (40, 40), (60, 60));
        assert_eq!(s.state(), SelectionState::Validated);

        let r = s.process_frame(&scene(40, 40));
        assert_eq!(r.status, TrackStatus::Tracked);
        assert_eq!(r.state, SelectionState::Tracking);
        let model = s.model().unwrap();
        assert_eq!(model.selection, SelectionRect { left: 40, top: 40, right: 60, bottom: 60 });
        assert_eq!(model.histogram.counts()[0], 400.0);
    }

    #[test]
    fn selection_outside_a_shrunken_frame_is_discarded() {
        let mut s = TrackingSession::new(TrackerConfig::default());
        s.process_frame(&scene(40, 40));
        select(&mut s, (60, 60), (100, 100));
        assert_eq!(s.state(), SelectionState::Validated);

        let r = s.process_frame(&FrameBuffer::filled(80, 80, RED));
        assert_eq!(r.status, TrackStatus::Idle);
        assert_eq!(r.state, SelectionState::Idle);
        assert!(s.model().is_none());
    }

    #[test]
    fn zero_area_selection_never_tracks() {
        let mut s = TrackingSession::new(TrackerConfig::default());
        s.process_frame(&scene(40, 40));
        select(&mut s, (40, 40), (40, 60));
        let r = s.process_frame(&scene(40, 40));
        assert_eq!(r.status, TrackStatus::Idle);
        assert_eq!(s.state(), SelectionState::Idle);
        assert!(s.model().is_none());
    }

    #[test]
    fn lost_target_keeps_the_window() {
        let mut s = TrackingSession::new(TrackerConfig::default());
        s.process_frame(&scene(40, 40));
        select(&mut s, (40, 40), (60, 60));
        s.process_frame(&scene(40, 40));
        let before = s.track_window();

        let r = s.process_frame(&FrameBuffer::filled(100, 100, 0));
        assert_eq!(r.status, TrackStatus::Skipped(SkipReason::ZeroWeight));
        assert_eq!(s.track_window(), before);
        assert_eq!(s.state(), SelectionState::Tracking);

        // Back in view: tracking resumes from the kept window.
        let r = s.process_frame(&scene(42, 41));
        assert_eq!(r.status, TrackStatus::Tracked);
    }

    #[test]
    fn new_press_drops_the_model() {
        let mut s = TrackingSession::new(TrackerConfig::default());
        s.process_frame(&scene(40, 40));
        select(&mut s, (40, 40), (60, 60));
        s.process_frame(&scene(40, 40));
        s.handle_pointer(&PointerEvent::down(5, 5));
        assert!(s.model().is_none());
        assert!(s.track_window().is_none());
        assert_eq!(s.process_frame(&scene(40, 40)).status, TrackStatus::Idle);
    }

    #[test]
    fn clear_returns_to_idle() {
        let mut s = TrackingSession::new(TrackerConfig::default());
        s.process_frame(&scene(40, 40));
        select(&mut s, (40, 40), (60, 60));
        s.process_frame(&scene(40, 40));
        s.clear();
        assert_eq!(s.state(), SelectionState::Idle);
        assert_eq!(s.process_frame(&scene(40, 40)).status, TrackStatus::Idle);
    }
}
