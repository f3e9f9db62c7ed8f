// Mean shift and its continuously adaptive variant (CamShift) over a
// back-projection map.
//
// Mean shift slides a fixed-size window uphill on the weight map until the
// window's centroid stops moving. CamShift then looks at the second moments of
// the weights around the converged window to fit an oriented ellipse and to
// resize the window for the next frame.
use log::trace;
use serde::{Deserialize, Serialize};

use crate::types::{GrayImage, TrackEllipse, TrackWindow};

/// When to stop iterating: after `max_iterations`, or once the window moves by
/// less than `epsilon` pixels between two iterations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermCriteria {
    pub max_iterations: u32,
    pub epsilon: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self { max_iterations: 10, epsilon: 1.0 }
    }
}

/// Knobs of the adaptive resize step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveParams {
    /// Full axis length = `axis_scale` * standard deviation along that axis.
    /// 4.0 covers +-2 sigma.
    pub axis_scale: f64,
    /// Pixels added on every side of the ellipse's bounding box to form the next window.
    pub window_padding: i32,
    /// Pixels added on every side of the converged window before taking the
    /// second moments, so the ellipse can grow when the object gets bigger.
    pub search_margin: i32,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self { axis_scale: 4.0, window_padding: 1, search_margin: 10 }
    }
}

/// Why a frame produced no track. Both are recoverable: the caller keeps the
/// previous window and tries again on the next frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Window has zero width/height, or no part of it lies inside the image.
    DegenerateWindow,
    /// No weight at all under the window.
    ZeroWeight,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::DegenerateWindow => write!(f, "degenerate track window"),
            SkipReason::ZeroWeight => write!(f, "no weight under track window"),
        }
    }
}

/// Raw spatial moments up to second order of a weight map inside a window,
/// with coordinates relative to the window's top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
}

impl Moments {
    /// Accumulate moments of `img` over `window`, which must already be clipped
    /// to the image.
    pub fn of(img: &GrayImage, window: &TrackWindow) -> Self {
        let mut m = Moments::default();
        for dy in 0..window.height.max(0) as usize {
            let y = window.y as usize + dy;
            let row = &img.data[y * img.width + window.x as usize..][..window.width as usize];
            // Per-row sums first; keeps the f64 work per pixel small.
            let (mut s0, mut s1, mut s2) = (0u64, 0u64, 0u64);
            for (dx, &v) in row.iter().enumerate() {
                let v = v as u64;
                let dx = dx as u64;
                s0 += v;
                s1 += v * dx;
                s2 += v * dx * dx;
            }
            let (s0, s1, s2, dy) = (s0 as f64, s1 as f64, s2 as f64, dy as f64);
            m.m00 += s0;
            m.m10 += s1;
            m.m20 += s2;
            m.m01 += s0 * dy;
            m.m11 += s1 * dy;
            m.m02 += s0 * dy * dy;
        }
        m
    }

    pub fn is_empty(&self) -> bool {
        self.m00.abs() < f64::EPSILON
    }

    /// Weighted centroid, relative to the window origin.
    pub fn centroid(&self) -> (f64, f64) {
        (self.m10 / self.m00, self.m01 / self.m00)
    }

    /// Normalised central second moments (mu20, mu11, mu02) / m00, i.e. the
    /// weighted covariance of pixel positions.
    pub fn covariance(&self) -> (f64, f64, f64) {
        let (xc, yc) = self.centroid();
        (
            self.m20 / self.m00 - xc * xc,
            self.m11 / self.m00 - xc * yc,
            self.m02 / self.m00 - yc * yc,
        )
    }
}

/// Outcome of the mean-shift stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeanShift {
    pub window: TrackWindow,
    pub iterations: u32,
    /// True when the shift fell under epsilon before the iteration cap.
    pub converged: bool,
}

/// Move `window` to the local mode of `prob`. The window keeps its size
/// (except where it has to be clipped to the image).
pub fn mean_shift(
    prob: &GrayImage,
    window: TrackWindow,
    criteria: &TermCriteria,
) -> Result<MeanShift, SkipReason> {
    if window.is_degenerate() {
        return Err(SkipReason::DegenerateWindow);
    }

    let (img_w, img_h) = (prob.width as i32, prob.height as i32);
    let eps2 = criteria.epsilon * criteria.epsilon;
    let mut cur = window;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < criteria.max_iterations {
        let clipped = cur.clip(prob.width, prob.height);
        if clipped.is_degenerate() {
            return Err(SkipReason::DegenerateWindow);
        }
        iterations += 1;

        let m = Moments::of(prob, &clipped);
        if m.is_empty() {
            return Err(SkipReason::ZeroWeight);
        }

        let (cx, cy) = m.centroid();
        let nx = (clipped.x as f64 + cx - clipped.width as f64 * 0.5).round() as i32;
        let ny = (clipped.y as f64 + cy - clipped.height as f64 * 0.5).round() as i32;
        let nx = nx.clamp(0, (img_w - clipped.width).max(0));
        let ny = ny.clamp(0, (img_h - clipped.height).max(0));

        let (dx, dy) = (nx - clipped.x, ny - clipped.y);
        cur = TrackWindow::new(nx, ny, clipped.width, clipped.height);
        trace!("mean shift #{iterations}: {cur:?} moved ({dx},{dy})");

        if ((dx * dx + dy * dy) as f64) < eps2 {
            converged = true;
            break;
        }
    }

    Ok(MeanShift { window: cur, iterations, converged })
}

/// Outcome of a full CamShift step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CamShift {
    pub ellipse: TrackEllipse,
    /// Seed window for the next frame.
    pub window: TrackWindow,
    pub iterations: u32,
    pub converged: bool,
}

/// Mean shift followed by the orientation/size fit.
pub fn cam_shift(
    prob: &GrayImage,
    window: TrackWindow,
    criteria: &TermCriteria,
    params: &AdaptiveParams,
) -> Result<CamShift, SkipReason> {
    let ms = mean_shift(prob, window, criteria)?;

    let margin = params.search_margin.max(0);
    let search = TrackWindow::new(
        ms.window.x - margin,
        ms.window.y - margin,
        ms.window.width + 2 * margin,
        ms.window.height + 2 * margin,
    )
    .clip(prob.width, prob.height);
    if search.is_degenerate() {
        return Err(SkipReason::DegenerateWindow);
    }

    let m = Moments::of(prob, &search);
    if m.is_empty() {
        return Err(SkipReason::ZeroWeight);
    }

    let ellipse = fit_ellipse(&m, &search, params.axis_scale);

    let pad = params.window_padding.max(0);
    let b = ellipse.bounding_window();
    let next = TrackWindow::new(b.x - pad, b.y - pad, b.width + 2 * pad, b.height + 2 * pad)
        .clip(prob.width, prob.height);
    if next.is_degenerate() {
        return Err(SkipReason::DegenerateWindow);
    }

    Ok(CamShift {
        ellipse,
        window: next,
        iterations: ms.iterations,
        converged: ms.converged,
    })
}

/// Oriented ellipse from the eigen-decomposition of the weighted covariance.
fn fit_ellipse(m: &Moments, origin: &TrackWindow, axis_scale: f64) -> TrackEllipse {
    let (cx, cy) = m.centroid();
    let (a, b, c) = m.covariance();

    // Major-axis direction of [[a b] [b c]].
    let mut theta = 0.5 * (2.0 * b).atan2(a - c);
    let (sn, cs) = theta.sin_cos();
    let along = (cs * cs * a + 2.0 * cs * sn * b + sn * sn * c).max(0.0);
    let across = (sn * sn * a - 2.0 * cs * sn * b + cs * cs * c).max(0.0);

    let mut major = along.sqrt() * axis_scale;
    let mut minor = across.sqrt() * axis_scale;
    if major < minor {
        std::mem::swap(&mut major, &mut minor);
        theta += std::f64::consts::FRAC_PI_2;
    }

    let angle = theta.to_degrees().rem_euclid(180.0);

    TrackEllipse {
        center: ((origin.x as f64 + cx) as f32, (origin.y as f64 + cy) as f32),
        major: major as f32,
        minor: minor as f32,
        angle: angle as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(w: usize, h: usize) -> GrayImage {
        GrayImage::new(w, h)
    }

    fn with_block(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> GrayImage {
        let mut img = blank(w, h);
        for y in y0..y1 {
            for x in x0..x1 {
                img.set(x, y, 255);
            }
        }
        img
    }

    #[test]
    fn moments_of_a_square() {
        let img = with_block(10, 10, 2, 2, 6, 6);
        let m = Moments::of(&img, &TrackWindow::new(0, 0, 10, 10));
        assert_eq!(m.m00, 16.0 * 255.0);
        let (cx, cy) = m.centroid();
        assert!((cx - 3.5).abs() < 1e-9 && (cy - 3.5).abs() < 1e-9);
        let (a, b, c) = m.covariance();
        // Variance of 4 consecutive integers is (4^2 - 1) / 12.
        assert!((a - 1.25).abs() < 1e-9 && (c - 1.25).abs() < 1e-9);
        assert!(b.abs() < 1e-9);
    }

    #[test]
    fn zero_size_window_is_skipped() {
        let img = with_block(50, 50, 10, 10, 20, 20);
        let c = TermCriteria::default();
        assert_eq!(mean_shift(&img, TrackWindow::new(10, 10, 0, 5), &c), Err(SkipReason::DegenerateWindow));
        assert_eq!(
            cam_shift(&img, TrackWindow::new(10, 10, 5, 0), &c, &AdaptiveParams::default()),
            Err(SkipReason::DegenerateWindow)
        );
    }

    #[test]
    fn window_off_the_image_is_skipped() {
        let img = with_block(50, 50, 10, 10, 20, 20);
        let r = mean_shift(&img, TrackWindow::new(60, 60, 10, 10), &TermCriteria::default());
        assert_eq!(r, Err(SkipReason::DegenerateWindow));
    }

    #[test]
    fn empty_map_reports_zero_weight() {
        let img = blank(50, 50);
        let r = cam_shift(
            &img,
            TrackWindow::new(5, 5, 10, 10),
            &TermCriteria::default(),
            &AdaptiveParams::default(),
        );
        assert_eq!(r, Err(SkipReason::ZeroWeight));
    }

    #[test]
    fn stops_at_the_iteration_cap() {
        let img = with_block(200, 20, 150, 0, 200, 20);
        let c = TermCriteria { max_iterations: 2, epsilon: 1.0 };
        let r = mean_shift(&img, TrackWindow::new(135, 0, 20, 20), &c).unwrap();
        assert_eq!(r.iterations, 2);
    }

    #[test]
    fn already_centered_window_converges_in_one_step() {
        let img = with_block(100, 100, 40, 40, 60, 60);
        let r = mean_shift(&img, TrackWindow::new(40, 40, 20, 20), &TermCriteria::default()).unwrap();
        assert!(r.converged);
        assert_eq!(r.iterations, 1);
        assert_eq!(r.window, TrackWindow::new(40, 40, 20, 20));
    }

    #[test]
    fn elongated_blob_orientation() {
        // Wide bar: major axis horizontal.
        let img = with_block(100, 100, 20, 45, 80, 55);
        let r = cam_shift(
            &img,
            TrackWindow::new(30, 40, 40, 20),
            &TermCriteria::default(),
            &AdaptiveParams::default(),
        )
        .unwrap();
        let a = r.ellipse.angle;
        assert!(a < 5.0 || a > 175.0, "angle {a}");
        assert!(r.ellipse.major > r.ellipse.minor * 3.0);

        // Tall bar: major axis vertical.
        let img = with_block(100, 100, 45, 20, 55, 80);
        let r = cam_shift(
            &img,
            TrackWindow::new(40, 30, 20, 40),
            &TermCriteria::default(),
            &AdaptiveParams::default(),
        )
        .unwrap();
        assert!((r.ellipse.angle - 90.0).abs() < 5.0, "angle {}", r.ellipse.angle);
    }

    #[test]
    fn diagonal_blob_is_tilted() {
        // Thick diagonal line from top-left to bottom-right: y grows with x.
        let mut img = blank(100, 100);
        for i in 20..80 {
            for t in 0..4 {
                img.set(i, (i + t).min(99), 255);
            }
        }
        let r = cam_shift(
            &img,
            TrackWindow::new(30, 30, 40, 40),
            &TermCriteria::default(),
            &AdaptiveParams::default(),
        )
        .unwrap();
        assert!((r.ellipse.angle - 45.0).abs() < 5.0, "angle {}", r.ellipse.angle);
    }
}
