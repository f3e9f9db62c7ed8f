// Hue histogram of the selected region: the color model we look for in every
// following frame.
use crate::error::{Error, Result};
use crate::types::{GrayImage, HsvImage};

/// Bin layout of a one-channel histogram: `bins` equal-width buckets spanning
/// the half-open range [low, high).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistogramSpec {
    pub bins: usize,
    pub range: (f32, f32),
}

impl Default for HistogramSpec {
    fn default() -> Self {
        Self { bins: 180, range: (0.0, 180.0) }
    }
}

impl HistogramSpec {
    /// Bucket index for a channel value, or None when it falls outside the range.
    #[inline]
    pub fn bin_of(&self, value: u8) -> Option<usize> {
        let (lo, hi) = self.range;
        let v = value as f32;
        if v < lo || v >= hi {
            return None;
        }
        let idx = ((v - lo) * self.bins as f32 / (hi - lo)) as usize;
        Some(idx.min(self.bins - 1))
    }
}

/// Fixed-length hue distribution. Built once per selection and never mutated
/// afterwards; a new selection produces a new `Histogram`.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    spec: HistogramSpec,
    counts: Vec<f32>,
}

impl Histogram {
    /// Count hue values of `roi`, skipping pixels whose mask entry is 0 (when a
    /// mask is given). The mask must have the ROI's dimensions.
    ///
    /// The caller rejects zero-area selections before getting here; an empty ROI
    /// simply yields an all-zero histogram.
    pub fn from_roi(roi: &HsvImage, mask: Option<&GrayImage>, spec: HistogramSpec) -> Self {
        let mut counts = vec![0.0f32; spec.bins];
        if let Some(m) = mask {
            debug_assert_eq!((m.width, m.height), (roi.width, roi.height));
        }

        for (i, p) in roi.pixels.iter().enumerate() {
            if let Some(m) = mask {
                if m.data[i] == 0 {
                    continue;
                }
            }
            if let Some(b) = spec.bin_of(p.h) {
                counts[b] += 1.0;
            }
        }

        Self { spec, counts }
    }

    /// A histogram with the given bin values (mostly useful for tests and for
    /// loading a model from elsewhere). Fails when `counts` does not have one
    /// value per bin.
    pub fn from_counts(spec: HistogramSpec, counts: Vec<f32>) -> Result<Self> {
        if counts.len() != spec.bins {
            return Err(Error::config(format!(
                "histogram has {} values but {} bins",
                counts.len(),
                spec.bins
            )));
        }
        Ok(Self { spec, counts })
    }

    /// Min-max stretch of the bin values onto [0, `max`].
    pub fn normalized(&self, max: f32) -> Self {
        let lo = self.counts.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = self.counts.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let span = hi - lo;
        let counts = if span > 0.0 {
            self.counts.iter().map(|c| (c - lo) * max / span).collect()
        } else {
            vec![0.0; self.counts.len()]
        };
        Self { spec: self.spec, counts }
    }

    pub fn spec(&self) -> &HistogramSpec {
        &self.spec
    }

    pub fn counts(&self) -> &[f32] {
        &self.counts
    }

    /// Weight of the bin holding `value`; 0 outside the channel range.
    #[inline]
    pub fn weight(&self, value: u8) -> f32 {
        self.spec.bin_of(value).map_or(0.0, |b| self.counts[b])
    }

    pub fn total(&self) -> f32 {
        self.counts.iter().sum()
    }

    /// Index of the heaviest bin (first one on ties).
    pub fn peak_bin(&self) -> Option<usize> {
        self.counts
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, &c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ => Some((i, c)),
            })
            .map(|(i, _)| i)
    }
}
