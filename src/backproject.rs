// Back-projection: paint every pixel with the model's weight for its hue, then
// drop pixels the S/V mask rejects.
use crate::histogram::Histogram;
use crate::types::{GrayImage, HsvImage};

/// Lookup-table remap of the hue plane through `hist`. Weights are saturated to
/// the 0..=255 range of the output plane.
pub fn back_project(hsv: &HsvImage, hist: &Histogram) -> GrayImage {
    // 256 possible hue bytes -> precompute the remap once per frame.
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        *slot = hist.weight(v as u8).round().clamp(0.0, 255.0) as u8;
    }

    let data = hsv.pixels.iter().map(|p| lut[p.h as usize]).collect();
    GrayImage { width: hsv.width, height: hsv.height, data }
}

/// Zero every weight where the mask is 0 (bitwise AND with a 0/255 mask).
pub fn apply_mask(weights: &mut GrayImage, mask: &GrayImage) {
    debug_assert_eq!((weights.width, weights.height), (mask.width, mask.height));
    for (w, &m) in weights.data.iter_mut().zip(&mask.data) {
        *w &= m;
    }
}

/// Back-project and mask in one go; this is what the tracker consumes.
pub fn likelihood_map(hsv: &HsvImage, hist: &Histogram, mask: &GrayImage) -> GrayImage {
    let mut map = back_project(hsv, hist);
    apply_mask(&mut map, mask);
    map
}
