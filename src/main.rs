// What you SEE:
// • The "Video" window shows the camera (or --frames playback).
// • Drag with the left mouse button to select the object to follow.
// • A red ellipse follows the object; "ROI" and "BackProjection" windows show
//   the selected patch and where its colors are found in the frame.
// • C clears the selection. ESC (or closing the window) quits.

use std::io::stdout;

use camshift_tracker::camera::CameraCapture;
use camshift_tracker::config::{Args, TrackerConfig};
use camshift_tracker::draw::Drawer;
use camshift_tracker::pipeline::run;
use camshift_tracker::sequence::ImageSequence;
use camshift_tracker::session::TrackingSession;
use camshift_tracker::source::FrameSource;
use camshift_tracker::Result;
use clap::Parser;
use fern::Dispatch;
use log::{LevelFilter, info};

fn init_logging(level: LevelFilter) -> Result<()> {
    Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(stdout())
        .apply()?;
    Ok(())
}

fn open_source(args: &Args) -> Result<Box<dyn FrameSource>> {
    match &args.frames {
        Some(dir) => Ok(Box::new(ImageSequence::open(dir, args.fps)?)),
        None => Ok(Box::new(CameraCapture::new(args.camera, args.width, args.height)?)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level)?;

    let config = TrackerConfig::from_args(&args)?;
    info!("tracker config: {config:?}");

    // Source and windows are released when they go out of scope, on every path out of main.
    let mut source = open_source(&args)?;
    let (w, h) = source.resolution();
    let mut drawer = Drawer::new(w as usize, h as usize, source.fps(), !args.no_diagnostics)?;
    let mut session = TrackingSession::new(config);

    let summary = run(source.as_mut(), &mut drawer, &mut session)?;
    info!("{summary:?}");
    Ok(())
}
