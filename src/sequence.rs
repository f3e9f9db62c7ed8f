// Plays back a directory of still images as a video stream, in file-name order.
use std::path::{Path, PathBuf};

use image::ImageFormat;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::source::{FrameSource, rgb_to_frame};
use crate::types::FrameBuffer;

pub struct ImageSequence {
    files: Vec<PathBuf>,
    next: usize,
    fps: f64,
    width: u32,
    height: u32,
}

impl ImageSequence {
    pub fn open(dir: &Path, fps: f64) -> Result<Self> {
        if !(fps > 0.0) {
            return Err(Error::config(format!("fps must be positive, got {fps}")));
        }

        let entries = std::fs::read_dir(dir)
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", dir.display())))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", dir.display())))?
                .path();
            if path.is_file() && ImageFormat::from_path(&path).is_ok() {
                files.push(path);
            }
        }
        files.sort();

        let first = files
            .first()
            .ok_or_else(|| Error::SourceUnavailable(format!("no image files in {}", dir.display())))?;
        let (width, height) = image::image_dimensions(first)
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", first.display())))?;

        info!("playing {} frames {}x{} from {} @ {fps} fps", files.len(), width, height, dir.display());
        Ok(Self { files, next: 0, fps, width, height })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<FrameBuffer>> {
        let Some(path) = self.files.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        debug!("reading {}", path.display());

        let img = image::open(path)
            .map_err(|e| Error::FrameRead(format!("{}: {e}", path.display())))?
            .to_rgb8();
        if img.dimensions() != (self.width, self.height) {
            return Err(Error::FrameRead(format!(
                "{}: size {:?} differs from stream size {}x{}",
                path.display(),
                img.dimensions(),
                self.width,
                self.height
            )));
        }
        Ok(Some(rgb_to_frame(&img)))
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
