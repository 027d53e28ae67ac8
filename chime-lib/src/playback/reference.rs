//! Capability contracts between the mixer and loaded audio data.

use crate::constants::CHANNELS;

/// One decoded sample per channel.
pub type Frame = [i16; CHANNELS];

/// The mixer's interface to a persistent, continuously controllable resource.
///
/// All positions are per-channel byte offsets. Implementations keep their
/// mutable fields behind a single lock so a control-thread write can never
/// tear against a mixer-thread read.
pub trait TrackReference: Send + Sync {
    fn playing(&self) -> bool;

    fn set_playing(&self, playing: bool);

    fn looping(&self) -> bool;

    fn set_looping(&self, looping: bool);

    /// Current per-channel byte offset.
    fn position(&self) -> u64;

    /// Seek to a per-channel byte offset. Offsets at or past the end of the
    /// resource are silent no-ops.
    fn set_position(&self, position: u64);

    /// Wrap target used when the end of data is passed while looping.
    fn loop_position(&self) -> u64;

    /// Out-of-range offsets are silent no-ops.
    fn set_loop_position(&self, loop_position: u64);

    fn volume(&self) -> f64;

    /// Negative volumes are ignored; the prior volume is retained.
    fn set_volume(&self, volume: f64);

    /// Per-channel bytes remaining before exhaustion.
    fn bytes_available(&self) -> u64;

    /// Advance the position by `count` per-channel bytes, wrapping at the end
    /// of data if looping.
    fn skip_bytes(&self, count: u64);

    /// Read the next frame and advance the position. Only meaningful while
    /// `bytes_available()` is positive.
    fn next_frame(&self) -> Frame;

    /// Invalidate this reference and release any held resource. No reads may
    /// occur afterwards.
    fn dispose(&self);
}

/// The mixer's interface to one fire-and-forget playback of an effect.
///
/// Effect references play front to back exactly once; they carry no pause,
/// resume, or loop state. The `parent_id` ties every playback of the same
/// effect together for bulk cancellation.
pub trait EffectReference: Send + Sync {
    /// Identifier of the effect handle that spawned this playback.
    fn parent_id(&self) -> u32;

    fn volume(&self) -> f64;

    /// Per-channel bytes remaining before exhaustion.
    fn bytes_available(&self) -> u64;

    /// Advance the position by `count` per-channel bytes.
    fn skip_bytes(&self, count: u64);

    /// Read the next frame and advance the position.
    fn next_frame(&self) -> Frame;

    /// Invalidate this reference and release any held resource.
    fn dispose(&self);
}
