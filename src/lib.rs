// Color-based object tracker: pick a region with the mouse, then follow it with
// CamShift over a hue back-projection.
//
// Per frame: RGB -> HSV -> S/V mask -> back-projection of the selection's hue
// histogram -> mean shift + adaptive ellipse fit.

pub mod backproject;
pub mod camera;
pub mod camshift;
pub mod config;
pub mod draw;
pub mod error;
pub mod histogram;
pub mod pipeline;
pub mod selection;
pub mod sequence;
pub mod session;
pub mod source;
pub mod types;
pub mod vision;

pub use error::{Error, Result};
