// Where frames come from. The tracker only needs an ordered stream of frames
// and a nominal rate to pace the display.
use std::collections::VecDeque;

use image::RgbImage;

use crate::error::Result;
use crate::types::FrameBuffer;

pub trait FrameSource {
    /// Next frame in order; `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<FrameBuffer>>;

    /// Nominal frames per second. Only used for pacing the window.
    fn fps(&self) -> f64;

    /// Size of the frames this source delivers.
    fn resolution(&self) -> (u32, u32);
}

/// Pack an RGB image into 0x00RRGGBB pixels.
pub fn rgb_to_frame(img: &RgbImage) -> FrameBuffer {
    let (w, h) = img.dimensions();
    let mut out = Vec::with_capacity((w as usize) * (h as usize));
    for pixel in img.pixels() {
        let r = pixel[0] as u32;
        let g = pixel[1] as u32;
        let b = pixel[2] as u32;
        out.push((r << 16) | (g << 8) | b);
    }
    FrameBuffer { width: w as usize, height: h as usize, pixels: out }
}

/// Frames held in memory. Handy for tests and for replaying captured frames.
pub struct VecSource {
    frames: VecDeque<FrameBuffer>,
    fps: f64,
    resolution: (u32, u32),
}

impl VecSource {
    pub fn new(frames: Vec<FrameBuffer>, fps: f64) -> Self {
        let resolution = frames
            .first()
            .map_or((0, 0), |f| (f.width as u32, f.height as u32));
        Self { frames: frames.into(), fps, resolution }
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<FrameBuffer>> {
        Ok(self.frames.pop_front())
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}
