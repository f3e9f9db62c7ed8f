// Error type for the tracker. Every variant states *where* things went wrong.
// Selection rejections and lost tracks are not errors: they are reported through
// `SelectionState` and `SkipReason` and the loop keeps going.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The frame source (camera or image sequence) could not be opened.
    #[error("Frame source unavailable: {0}")]
    SourceUnavailable(String),

    /// Grabbing/decoding a frame failed mid-stream. The main loop treats this
    /// as the end of the stream.
    #[error("Frame read error: {0}")]
    FrameRead(String),

    #[error("Window init error: {0}")]
    WindowInit(String),

    #[error("Window update error: {0}")]
    WindowUpdate(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logger init error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
