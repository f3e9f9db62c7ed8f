// Core types shared by the tracking pipeline and the window.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A frame filled with one packed color.
    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self { width, height, pixels: vec![color; width * height] }
    }

    /// Paint the half-open rectangle [x0,x1) x [y0,y1) with `color`, clipped to the frame.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, color: u32) {
        for y in y0.min(self.height)..y1.min(self.height) {
            let row = y * self.width;
            for x in x0.min(self.width)..x1.min(self.width) {
                self.pixels[row + x] = color;
            }
        }
    }
}

/// One 8-bit single-channel plane. Used for the S/V mask (0 or 255) and for the
/// back-projection map (per-pixel weight).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0; width * height] }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }
}

/// A pixel in the 8-bit HSV convention: hue in [0,180), saturation and value in [0,255].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HsvImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Hsv>,
}

impl HsvImage {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Hsv {
        self.pixels[y * self.width + x]
    }
}

/// A user selection in frame coordinates, stored as corners: left/top inclusive,
/// right/bottom exclusive. After validation `left <= right`, `top <= bottom` and
/// the rectangle lies inside the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl SelectionRect {
    /// Build from two arbitrary drag corners, fixing the corner order.
    pub fn from_corners((x1, y1): (i32, i32), (x2, y2): (i32, i32)) -> Self {
        Self {
            left: x1.min(x2),
            top: y1.min(y2),
            right: x1.max(x2),
            bottom: y1.max(y2),
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn fits_within(&self, frame_width: usize, frame_height: usize) -> bool {
        self.left >= 0
            && self.top >= 0
            && self.right as i64 <= frame_width as i64
            && self.bottom as i64 <= frame_height as i64
    }

    pub fn to_window(&self) -> TrackWindow {
        TrackWindow {
            x: self.left,
            y: self.top,
            width: self.width(),
            height: self.height(),
        }
    }
}

/// The tracker's search region (left, top, width, height).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackWindow {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl TrackWindow {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Zero (or negative) width/height: the tracker must not run on this window.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Intersection with the image rectangle [0,w) x [0,h). May be degenerate.
    pub fn clip(&self, width: usize, height: usize) -> TrackWindow {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(width as i32);
        let y1 = self.bottom().min(height as i32);
        TrackWindow::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }
}

/// Oriented ellipse fitted to the weighted region (the per-frame track result).
/// `major`/`minor` are full axis lengths; `angle` is the major axis direction in
/// degrees, measured from +x towards +y (image rows grow downward), in [0,180).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackEllipse {
    pub center: (f32, f32),
    pub major: f32,
    pub minor: f32,
    pub angle: f32,
}

impl TrackEllipse {
    /// Axis-aligned box around the ellipse, rounded outward to whole pixels.
    pub fn bounding_window(&self) -> TrackWindow {
        let a = self.major * 0.5;
        let b = self.minor * 0.5;
        let (sn, cs) = self.angle.to_radians().sin_cos();
        let half_w = ((a * cs).powi(2) + (b * sn).powi(2)).sqrt();
        let half_h = ((a * sn).powi(2) + (b * cs).powi(2)).sqrt();
        let x0 = (self.center.0 - half_w).floor() as i32;
        let y0 = (self.center.1 - half_h).floor() as i32;
        let x1 = (self.center.0 + half_w).ceil() as i32;
        let y1 = (self.center.1 + half_h).ceil() as i32;
        TrackWindow::new(x0, y0, x1 - x0, y1 - y0)
    }
}
