// tests/test_tracking.rs: Histogram, back-projection and CamShift on synthetic frames.

use camshift_tracker::backproject::{apply_mask, back_project, likelihood_map};
use camshift_tracker::camshift::{AdaptiveParams, SkipReason, TermCriteria, cam_shift, mean_shift};
use camshift_tracker::histogram::{Histogram, HistogramSpec};
use camshift_tracker::types::{FrameBuffer, GrayImage, SelectionRect, TrackWindow};
use camshift_tracker::vision::{crop_gray, crop_hsv, frame_to_hsv, in_range};

const WHITE: u32 = 0x00FF_FFFF;
const ORANGE: u32 = 0x00FF_8000;
const BLUE: u32 = 0x0000_40FF;

/// A `w` x `h` frame of `bg` with one solid `size` x `size` square of `color`.
fn square_scene(w: usize, h: usize, bg: u32, color: u32, x0: usize, y0: usize, size: usize) -> FrameBuffer {
    let mut f = FrameBuffer::filled(w, h, bg);
    f.fill_rect(x0, y0, x0 + size, y0 + size, color);
    f
}

fn solid_blob(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    for y in y0..y1 {
        for x in x0..x1 {
            img.set(x, y, 255);
        }
    }
    img
}

// ===== Histogram model =====

#[test]
fn histogram_is_a_pure_function_of_the_pixels() {
    let frame = square_scene(80, 60, BLUE, ORANGE, 20, 15, 25);
    let hsv = frame_to_hsv(&frame);
    let mask = in_range(&hsv, (60, 255), (32, 255));
    let rect = SelectionRect { left: 10, top: 10, right: 50, bottom: 45 };

    let build = || {
        Histogram::from_roi(
            &crop_hsv(&hsv, &rect),
            Some(&crop_gray(&mask, &rect)),
            HistogramSpec::default(),
        )
    };
    let first = build();
    for _ in 0..5 {
        assert_eq!(build(), first);
    }
    // Two colors in the ROI -> two populated bins, all ROI pixels counted.
    assert_eq!(first.counts().iter().filter(|&&c| c > 0.0).count(), 2);
    assert_eq!(first.total(), 40.0 * 35.0);
}

#[test]
fn masked_out_pixels_do_not_enter_the_model() {
    // Orange square on black: black fails the value threshold.
    let frame = square_scene(50, 50, 0, ORANGE, 10, 10, 10);
    let hsv = frame_to_hsv(&frame);
    let mask = in_range(&hsv, (60, 255), (32, 255));
    let rect = SelectionRect { left: 5, top: 5, right: 25, bottom: 25 };
    let hist = Histogram::from_roi(&crop_hsv(&hsv, &rect), Some(&crop_gray(&mask, &rect)), HistogramSpec::default());
    assert_eq!(hist.total(), 100.0);
}

// ===== Back-projection =====

#[test]
fn uniform_histogram_back_projects_to_the_mask() {
    let mut frame = square_scene(64, 48, 0x0010_1010, ORANGE, 5, 5, 20);
    frame.fill_rect(30, 20, 50, 40, BLUE);
    frame.fill_rect(0, 40, 64, 48, WHITE);
    let hsv = frame_to_hsv(&frame);
    let mask = in_range(&hsv, (60, 255), (32, 255));

    let ones = Histogram::from_counts(HistogramSpec::default(), vec![1.0; 180]).unwrap();
    let map = likelihood_map(&hsv, &ones, &mask);

    for (w, m) in map.data.iter().zip(&mask.data) {
        assert_eq!(*w, if *m == 255 { 1 } else { 0 });
    }
    // Dark background and white band are masked; orange + blue survive.
    assert_eq!(map.data.iter().filter(|&&w| w == 1).count(), 400 + 400);
}

#[test]
fn back_projection_highlights_the_model_color() {
    let frame = square_scene(60, 60, BLUE, ORANGE, 30, 30, 10);
    let hsv = frame_to_hsv(&frame);
    let rect = SelectionRect { left: 30, top: 30, right: 40, bottom: 40 };
    let hist = Histogram::from_roi(&crop_hsv(&hsv, &rect), None, HistogramSpec::default());

    let mut map = back_project(&hsv, &hist);
    let mask = in_range(&hsv, (60, 255), (32, 255));
    apply_mask(&mut map, &mask);

    assert_eq!(map.get(35, 35), 100);
    assert_eq!(map.get(5, 5), 0);
}

// ===== Mean shift / CamShift =====

#[test]
fn converges_on_the_blob_from_any_overlapping_start() {
    let prob = solid_blob(100, 100, 40, 40, 60, 60);
    let criteria = TermCriteria::default();
    let params = AdaptiveParams::default();

    for (x, y) in [(30, 30), (50, 50), (25, 45), (45, 22), (40, 40), (55, 30)] {
        let start = TrackWindow::new(x, y, 20, 20);
        let r = cam_shift(&prob, start, &criteria, &params)
            .unwrap_or_else(|e| panic!("start {start:?}: {e}"));

        assert!(r.iterations <= criteria.max_iterations);
        let (cx, cy) = r.ellipse.center;
        assert!((cx - 49.5).abs() <= 1.0 && (cy - 49.5).abs() <= 1.0, "start {start:?}: center {cx},{cy}");

        // Next window covers the blob without being much larger than it.
        let w = r.window;
        assert!(w.x <= 40 && w.y <= 40 && w.right() >= 60 && w.bottom() >= 60, "start {start:?}: {w:?}");
        assert!(w.width <= 30 && w.height <= 30, "start {start:?}: {w:?}");
    }
}

#[test]
fn mean_shift_stops_early_once_settled() {
    let prob = solid_blob(100, 100, 40, 40, 60, 60);
    let r = mean_shift(&prob, TrackWindow::new(30, 30, 20, 20), &TermCriteria::default()).unwrap();
    assert!(r.converged);
    assert!(r.iterations < 10, "took {} iterations", r.iterations);
    assert!((r.window.x - 40).abs() <= 1 && (r.window.y - 40).abs() <= 1, "{:?}", r.window);
}

#[test]
fn iteration_cap_is_respected() {
    // Long ramp of blobs: the window keeps finding more weight to the right.
    let mut prob = GrayImage::new(400, 40);
    for x in 0..400 {
        for y in 10..30 {
            prob.set(x, y, (x / 2).min(255) as u8);
        }
    }
    for cap in [1, 3, 10] {
        let c = TermCriteria { max_iterations: cap, epsilon: 1.0 };
        let r = mean_shift(&prob, TrackWindow::new(0, 10, 30, 20), &c).unwrap();
        assert!(r.iterations <= cap);
    }
}

#[test]
fn window_follows_a_moving_blob() {
    let params = AdaptiveParams::default();
    let criteria = TermCriteria::default();
    let mut window = TrackWindow::new(20, 20, 20, 20);

    for step in 0..10 {
        let x0 = 20 + step * 4;
        let y0 = 20 + step * 2;
        let prob = solid_blob(120, 100, x0, y0, x0 + 20, y0 + 20);
        let r = cam_shift(&prob, window, &criteria, &params).unwrap();
        let (cx, cy) = r.ellipse.center;
        assert!((cx - (x0 as f32 + 9.5)).abs() <= 1.0, "step {step}: cx {cx}");
        assert!((cy - (y0 as f32 + 9.5)).abs() <= 1.0, "step {step}: cy {cy}");
        window = r.window;
    }
}

#[test]
fn window_grows_with_the_object() {
    let params = AdaptiveParams::default();
    let prob = solid_blob(200, 200, 70, 70, 130, 130);
    // Seed much smaller than the object, inside it.
    let r = cam_shift(&prob, TrackWindow::new(90, 90, 20, 20), &TermCriteria::default(), &params).unwrap();
    assert!(r.window.width > 20 && r.window.height > 20, "{:?}", r.window);
}

#[test]
fn degenerate_windows_never_panic() {
    let prob = solid_blob(100, 100, 40, 40, 60, 60);
    let c = TermCriteria::default();
    let p = AdaptiveParams::default();
    for w in [
        TrackWindow::new(40, 40, 0, 20),
        TrackWindow::new(40, 40, 20, 0),
        TrackWindow::new(40, 40, -3, 20),
        TrackWindow::new(-50, -50, 20, 20),
        TrackWindow::new(100, 0, 20, 20),
    ] {
        assert_eq!(cam_shift(&prob, w, &c, &p), Err(SkipReason::DegenerateWindow), "{w:?}");
    }
}

#[test]
fn no_overlap_means_no_weight() {
    let prob = solid_blob(100, 100, 70, 70, 90, 90);
    let r = cam_shift(&prob, TrackWindow::new(0, 0, 20, 20), &TermCriteria::default(), &AdaptiveParams::default());
    assert_eq!(r, Err(SkipReason::ZeroWeight));
}
