use std::path::PathBuf;

/// Result alias that carries the custom [`LyricVideoError`] type.
pub type Result<T> = std::result::Result<T, LyricVideoError>;

/// Common error type for the core crate.
///
/// Missing image assets never show up here: [`crate::AssetStore`] swaps in a
/// placeholder sprite instead. A user quitting early is reported through
/// [`crate::FinishReason`] and [`crate::MarkingOutcome`] rather than as an
/// error.
#[derive(Debug, thiserror::Error)]
pub enum LyricVideoError {
    /// The audio track could not be opened or decoded. Without decoded audio
    /// there is no authoritative clock, so startup aborts.
    #[error("failed to load audio `{}`: {source}", path.display())]
    AudioLoad {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    /// The audio output device refused to open or start.
    #[error("audio playback failed: {0}")]
    Playback(String),
    /// Timed lyrics that are out of order, negative or not finite.
    #[error("invalid timeline: {0}")]
    InvalidTimeline(String),
    /// Configuration values that cannot drive a session.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Drawing surfaces or fonts the rasteriser cannot use.
    #[error("render failed: {0}")]
    Render(String),
    /// Rejected input to the analysis engine.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Free-form message for the binary's own checks.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Image(#[from] image::ImageError),
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
}

impl LyricVideoError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn playback<T: Into<String>>(msg: T) -> Self {
        Self::Playback(msg.into())
    }

    pub fn render<T: Into<String>>(msg: T) -> Self {
        Self::Render(msg.into())
    }
}

impl From<&str> for LyricVideoError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for LyricVideoError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
