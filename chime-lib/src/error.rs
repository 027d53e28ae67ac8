//! Error types reported at the loader and output-device boundaries.
//!
//! Transient I/O failures during streamed playback never surface here; the
//! mixer absorbs them by exhausting the affected reference.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No usable audio output could be opened.
    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),

    /// The source cannot be expressed in the canonical PCM format.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The source contained no decodeable audio track.
    #[error("no decodeable audio track in {0}")]
    NoAudioTrack(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
}
