//! # Chime Audio Library
//!
//! This library provides a small software mixing engine for PCM audio.
//! Audio is loaded either fully into memory or streamed from a spool file,
//! registered with a mixer, and extracted as volume-scaled, clipped,
//! big-endian sample buffers for delivery to an output device.

pub mod constants;
mod decode;
pub mod effect;
pub mod engine;
pub mod error;
pub mod mixer;
pub mod output;
pub mod playback;
pub mod scheduler;
pub mod settings;
pub mod track;

pub use effect::Effect;
pub use engine::AudioEngine;
pub use error::EngineError;
pub use settings::EngineSettings;
pub use track::Track;
