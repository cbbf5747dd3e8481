use std::path::PathBuf;

/// Errors surfaced while setting up or driving a soundscape session.
///
/// Scheduler operations themselves never fail; everything here comes from
/// configuration, catalog validation or the audio backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to open audio output: {0}")]
    AudioOutput(String),

    #[error("cannot decode '{}': {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    #[error("catalog has {len} tracks, need more than {voices} to rotate")]
    CatalogTooSmall { len: usize, voices: usize },

    #[error("catalog has {catalog} tracks but {sounds} sounds were supplied")]
    SoundCountMismatch { catalog: usize, sounds: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("track {track} out of range (catalog has {len} tracks)")]
    TrackOutOfRange { track: usize, len: usize },

    #[error("soundscape runtime is no longer running")]
    RuntimeGone,
}

pub type Result<T> = std::result::Result<T, Error>;
