//! Playback references: live, mutable cursors over loaded audio resources.
//!
//! A reference is the mixer's only view of a resource's audio data. Two
//! variants exist for each reference kind: an in-memory variant backed by
//! per-channel byte buffers, and a streamed variant backed by a forward-only
//! spool file.

pub mod mem;
pub mod reference;
pub mod stream;

pub use reference::{EffectReference, Frame, TrackReference};
pub use stream::StreamInfo;
