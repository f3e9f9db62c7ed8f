// Command line + tracker configuration.
//
// Tracker knobs come from (lowest to highest priority): built-in defaults, an
// optional JSON file (`--config`), then individual command-line flags.
use std::path::{Path, PathBuf};

use clap::Parser;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::camshift::{AdaptiveParams, TermCriteria};
use crate::error::{Error, Result};
use crate::histogram::HistogramSpec;
use crate::vision::ChannelBounds;

#[derive(Parser, Debug, Clone)]
#[command(name = "camshift-tracker", about = "Select a region with the mouse and follow it by color")]
pub struct Args {
    /// Camera index to open (ignored when --frames is given)
    #[arg(long, default_value_t = 0)]
    pub camera: u32,
    /// Directory of numbered image files to play back instead of a camera
    #[arg(long, value_name = "DIR")]
    pub frames: Option<PathBuf>,
    /// Requested camera resolution
    #[arg(long, default_value_t = 640)]
    pub width: u32,
    #[arg(long, default_value_t = 480)]
    pub height: u32,
    /// Playback rate for --frames
    #[arg(long, default_value_t = 30.0)]
    pub fps: f64,

    /// JSON tracker configuration; flags below override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub sat_min: Option<u8>,
    #[arg(long)]
    pub val_min: Option<u8>,
    #[arg(long)]
    pub bins: Option<usize>,
    #[arg(long)]
    pub max_iter: Option<u32>,
    #[arg(long)]
    pub epsilon: Option<f64>,
    /// Stretch the hue histogram to 0..255 before back-projection
    #[arg(long)]
    pub normalize: bool,

    /// Do not open the ROI / BackProjection windows
    #[arg(long)]
    pub no_diagnostics: bool,
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub saturation: ChannelBounds,
    pub value: ChannelBounds,
    pub bins: usize,
    pub hue_range: (f32, f32),
    pub normalize_histogram: bool,
    pub term: TermCriteria,
    pub adaptive: AdaptiveParams,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let spec = HistogramSpec::default();
        Self {
            saturation: (60, 255),
            value: (32, 255),
            bins: spec.bins,
            hue_range: spec.range,
            normalize_histogram: false,
            term: TermCriteria::default(),
            adaptive: AdaptiveParams::default(),
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: TrackerConfig = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults, then `--config`, then flag overrides.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut cfg = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(v) = args.sat_min {
            cfg.saturation.0 = v;
        }
        if let Some(v) = args.val_min {
            cfg.value.0 = v;
        }
        if let Some(v) = args.bins {
            cfg.bins = v;
        }
        if let Some(v) = args.max_iter {
            cfg.term.max_iterations = v;
        }
        if let Some(v) = args.epsilon {
            cfg.term.epsilon = v;
        }
        if args.normalize {
            cfg.normalize_histogram = true;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bins == 0 {
            return Err(Error::config("bins must be at least 1"));
        }
        if !(self.hue_range.0 < self.hue_range.1) {
            return Err(Error::config(format!("empty hue range {:?}", self.hue_range)));
        }
        if self.saturation.0 > self.saturation.1 {
            return Err(Error::config(format!("inverted saturation bounds {:?}", self.saturation)));
        }
        if self.value.0 > self.value.1 {
            return Err(Error::config(format!("inverted value bounds {:?}", self.value)));
        }
        if self.term.max_iterations == 0 {
            return Err(Error::config("max_iterations must be at least 1"));
        }
        if !(self.term.epsilon >= 0.0) {
            return Err(Error::config(format!("epsilon must be >= 0, got {}", self.term.epsilon)));
        }
        if !(self.adaptive.axis_scale > 0.0) {
            return Err(Error::config("axis_scale must be positive"));
        }
        Ok(())
    }

    pub fn histogram_spec(&self) -> HistogramSpec {
        HistogramSpec { bins: self.bins, range: self.hue_range }
    }
}
