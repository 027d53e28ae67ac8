//! The canonical PCM contract shared by the loader, mixer, and output device.
//!
//! Every registered playback reference yields samples already in this format;
//! no conversion happens inside the mixing path.

/// Sample rate of all mixed audio (Hz).
pub const SAMPLE_RATE: u32 = 44_100;

/// Bit depth of all mixed audio.
pub const BIT_DEPTH: u16 = 16;

/// Number of audio channels.
pub const CHANNELS: usize = 2;

/// Bytes per sample for one channel.
pub const BYTES_PER_SAMPLE: usize = (BIT_DEPTH / 8) as usize;

/// Bytes per frame (one sample for every channel, interleaved).
pub const FRAME_BYTES: usize = BYTES_PER_SAMPLE * CHANNELS;

/// Per-channel byte offset covered by one second of audio.
pub const BYTES_PER_CHANNEL_SECOND: f64 = SAMPLE_RATE as f64 * BYTES_PER_SAMPLE as f64;
