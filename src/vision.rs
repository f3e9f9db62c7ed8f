// Per-pixel color work: RGB -> HSV, the saturation/value mask, ROI crops, and
// turning single-channel planes back into something the window can show.
use crate::types::{FrameBuffer, GrayImage, Hsv, HsvImage, SelectionRect};

/// Inclusive lower/upper bounds for one 8-bit channel.
pub type ChannelBounds = (u8, u8);

#[inline]
fn unpack(px: u32) -> (u8, u8, u8) {
    (((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8)
}

/// Convert one RGB sample to 8-bit HSV: V = max, S = 255 * (max - min) / max,
/// H = degrees / 2 so the full circle fits a byte as [0,180).
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = v - min;

    let s = if v > 0.0 { 255.0 * delta / v } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / delta
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    // 359.x degrees rounds to 180, which is outside the hue range; wrap it to 0.
    let h = ((h * 0.5).round() as u32 % 180) as u8;
    Hsv { h, s: s.round() as u8, v: v as u8 }
}

/// Convert a whole 0x00RRGGBB frame to HSV.
pub fn frame_to_hsv(frame: &FrameBuffer) -> HsvImage {
    let pixels = frame
        .pixels
        .iter()
        .map(|&px| {
            let (r, g, b) = unpack(px);
            rgb_to_hsv(r, g, b)
        })
        .collect();
    HsvImage { width: frame.width, height: frame.height, pixels }
}

/// 255 where saturation and value both fall inside their bounds, 0 elsewhere.
/// Hue is not constrained: the mask only removes pixels whose hue is unreliable
/// (too dark or too washed out).
pub fn in_range(hsv: &HsvImage, sat: ChannelBounds, val: ChannelBounds) -> GrayImage {
    let data = hsv
        .pixels
        .iter()
        .map(|p| {
            let ok = p.s >= sat.0 && p.s <= sat.1 && p.v >= val.0 && p.v <= val.1;
            if ok { 255 } else { 0 }
        })
        .collect();
    GrayImage { width: hsv.width, height: hsv.height, data }
}

/// Copy out the pixels under a validated selection.
pub fn crop_hsv(hsv: &HsvImage, rect: &SelectionRect) -> HsvImage {
    let (w, h) = (rect.width().max(0) as usize, rect.height().max(0) as usize);
    let mut pixels = Vec::with_capacity(w * h);
    for y in rect.top as usize..rect.top as usize + h {
        let row = y * hsv.width;
        pixels.extend_from_slice(&hsv.pixels[row + rect.left as usize..row + rect.left as usize + w]);
    }
    HsvImage { width: w, height: h, pixels }
}

pub fn crop_gray(img: &GrayImage, rect: &SelectionRect) -> GrayImage {
    let (w, h) = (rect.width().max(0) as usize, rect.height().max(0) as usize);
    let mut data = Vec::with_capacity(w * h);
    for y in rect.top as usize..rect.top as usize + h {
        let row = y * img.width;
        data.extend_from_slice(&img.data[row + rect.left as usize..row + rect.left as usize + w]);
    }
    GrayImage { width: w, height: h, data }
}

/// Gray plane -> 0x00VVVVVV so it can be pushed to a window.
pub fn gray_to_frame(img: &GrayImage) -> FrameBuffer {
    let pixels = img
        .data
        .iter()
        .map(|&v| {
            let v = v as u32;
            (v << 16) | (v << 8) | v
        })
        .collect();
    FrameBuffer { width: img.width, height: img.height, pixels }
}

/// Show raw H,S,V bytes as if they were R,G,B. This is what the ROI window
/// displays: a false-color picture of the model region in the tracker's space.
pub fn hsv_to_false_color(img: &HsvImage) -> FrameBuffer {
    let pixels = img
        .pixels
        .iter()
        .map(|p| ((p.h as u32) << 16) | ((p.s as u32) << 8) | p.v as u32)
        .collect();
    FrameBuffer { width: img.width, height: img.height, pixels }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_colors() {
        assert_eq!(rgb_to_hsv(255, 0, 0), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(0, 255, 0), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(0, 0, 255), Hsv { h: 120, s: 255, v: 255 });
    }

    #[test]
    fn grays_have_no_saturation() {
        assert_eq!(rgb_to_hsv(0, 0, 0), Hsv { h: 0, s: 0, v: 0 });
        assert_eq!(rgb_to_hsv(255, 255, 255), Hsv { h: 0, s: 0, v: 255 });
        assert_eq!(rgb_to_hsv(128, 128, 128).s, 0);
    }

    #[test]
    fn hue_stays_below_180() {
        // Nearly-red from the magenta side: ~359.x degrees.
        let p = rgb_to_hsv(255, 0, 1);
        assert!(p.h < 180);
    }

    #[test]
    fn mask_thresholds_are_inclusive() {
        let hsv = HsvImage {
            width: 4,
            height: 1,
            pixels: vec![
                Hsv { h: 10, s: 60, v: 32 },  // exactly on both lower bounds
                Hsv { h: 10, s: 59, v: 200 }, // too pale
                Hsv { h: 10, s: 200, v: 31 }, // too dark
                Hsv { h: 10, s: 255, v: 255 },
            ],
        };
        let m = in_range(&hsv, (60, 255), (32, 255));
        assert_eq!(m.data, vec![255, 0, 0, 255]);
    }

    #[test]
    fn crop_picks_the_right_pixels() {
        let mut frame = FrameBuffer::filled(6, 4, 0);
        frame.fill_rect(2, 1, 4, 3, 0x00FF0000);
        let hsv = frame_to_hsv(&frame);
        let roi = crop_hsv(&hsv, &SelectionRect { left: 2, top: 1, right: 4, bottom: 3 });
        assert_eq!((roi.width, roi.height), (2, 2));
        assert!(roi.pixels.iter().all(|p| p.v == 255 && p.s == 255));
    }
}
