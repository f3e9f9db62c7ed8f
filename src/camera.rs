// Opens a camera and converts its frames into buffers the tracker and the window
// can use. The stream is stopped when the `CameraCapture` is dropped.

use log::{info, warn};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

use crate::error::{Error, Result};
use crate::source::FrameSource;
use crate::types::FrameBuffer;

pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
    fps: u32,
}

impl CameraCapture {
    /// Open camera `index` asking for roughly `width` x `height`; the driver may
    /// pick a nearby format.
    pub fn new(index: u32, width: u32, height: u32) -> Result<Self> {
        // 1) Choose the device (0 = default webcam).
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,
        );
        // 2) Ask for RGB frames in the format closest to our request.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        // 3) Create the camera; fails when no such device exists.
        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::SourceUnavailable(format!("create camera {index}: {e}")))?;

        // 4) Start streaming.
        cam.open_stream()
            .map_err(|e| Error::SourceUnavailable(format!("open stream: {e}")))?;

        // 5) The stream might choose a slightly different resolution / rate.
        let actual = cam.resolution();
        let fps = cam.frame_rate();
        info!("camera {index} streaming {}x{} @ {fps} fps", actual.width(), actual.height());

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
            fps,
        })
    }
}

impl FrameSource for CameraCapture {
    /// Blocks until the camera delivers the next frame. A camera never runs dry,
    /// so this only ends the stream through an error.
    fn next_frame(&mut self) -> Result<Option<FrameBuffer>> {
        // 1) Grab the next raw frame (blocks until one arrives).
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::FrameRead(format!("fetch frame: {e}")))?;

        // 2) Decode whatever the driver delivered (YUYV, MJPEG, ...) into RGB.
        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::FrameRead(format!("decode RGB: {e}")))?;

        // 3) Pack as 0x00RRGGBB. nokhwa hands back its own `image` version's buffer,
        // so walk the pixels here instead of going through `rgb_to_frame`.
        let (w, h) = rgb_img.dimensions();
        let mut out = Vec::with_capacity((w as usize) * (h as usize));
        for (_x, _y, pixel) in rgb_img.enumerate_pixels() {
            let r = pixel[0] as u32;
            let g = pixel[1] as u32;
            let b = pixel[2] as u32;
            out.push((r << 16) | (g << 8) | b);
        }

        Ok(Some(FrameBuffer { width: w as usize, height: h as usize, pixels: out }))
    }

    fn fps(&self) -> f64 {
        if self.fps == 0 { 30.0 } else { self.fps as f64 }
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            warn!("stopping camera stream: {e}");
        }
    }
}
