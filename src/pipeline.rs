// The frame loop: pull a frame, apply the user's input, track, show. Strictly
// one frame at a time; frame N is fully shown before frame N+1 is requested.
use std::fmt::Debug;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::selection::PointerEvent;
use crate::session::{FrameReport, TrackStatus, TrackingSession};
use crate::source::FrameSource;
use crate::types::FrameBuffer;

/// Input gathered by the display between two frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserInput<C> {
    Pointer(PointerEvent<C>),
    ClearSelection,
    Stop,
}

/// Where frames and tracking results go, and where user input comes from.
pub trait DisplaySink {
    type Context: Debug;

    /// Input since the last call, in arrival order.
    fn poll_input(&mut self) -> Vec<UserInput<Self::Context>>;

    /// Show one processed frame. Called once per frame, after tracking.
    fn show(&mut self, frame: &FrameBuffer, report: &FrameReport, session: &TrackingSession) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The user asked to quit (Esc / window closed).
    UserStop,
    /// The source has no more frames.
    Exhausted,
    /// The source failed mid-stream; treated like the end of the stream.
    ReadFailure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub tracked: u64,
    pub stopped: StopReason,
}

/// Drive `session` until the user stops or the source ends. Only display
/// errors are returned; a failing source just ends the run.
pub fn run<S, D>(source: &mut S, sink: &mut D, session: &mut TrackingSession) -> Result<RunSummary>
where
    S: FrameSource + ?Sized,
    D: DisplaySink + ?Sized,
{
    let mut frames = 0;
    let mut tracked = 0;

    let stopped = loop {
        /* 1) Input first, so a selection made on frame N is used on frame N+1. */
        let mut stop = false;
        for input in sink.poll_input() {
            match input {
                UserInput::Pointer(ev) => {
                    session.handle_pointer(&ev);
                }
                UserInput::ClearSelection => session.clear(),
                UserInput::Stop => stop = true,
            }
        }
        if stop {
            break StopReason::UserStop;
        }

        /* 2) Next frame. A read failure ends the stream like exhaustion does. */
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break StopReason::Exhausted,
            Err(Error::FrameRead(e)) => {
                warn!("frame source failed: {e}");
                break StopReason::ReadFailure;
            }
            Err(e) => return Err(e),
        };

        /* 3) Mask, model, back-projection, CamShift. */
        let report = session.process_frame(&frame);
        frames += 1;
        if report.status == TrackStatus::Tracked {
            tracked += 1;
        }
        /* 4) Display. Visual: frame + ellipse, ROI and back-projection views. */
        sink.show(&frame, &report, session)?;
    };

    info!("stopped after {frames} frames ({tracked} tracked): {stopped:?}");
    Ok(RunSummary { frames, tracked, stopped })
}
