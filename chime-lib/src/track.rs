//! The persistent playback handle.

use std::sync::Arc;

use log::debug;
use tempfile::TempPath;

use crate::constants::{BYTES_PER_CHANNEL_SECOND, BYTES_PER_SAMPLE};
use crate::mixer::Mixer;
use crate::playback::TrackReference;

/// A continuously controllable piece of audio.
///
/// Exactly one live reference backs each track; it is registered with the
/// mixer at load time and every control call below goes through it. Dropping
/// or unloading the track is the only way to stop that sharing.
pub struct Track {
    reference: Arc<dyn TrackReference>,
    mixer: Arc<Mixer>,
    // keeps a streamed track's spool file on disk until unload
    _spool: Option<Arc<TempPath>>,
}

impl Track {
    pub(crate) fn new(
        reference: Arc<dyn TrackReference>,
        mixer: Arc<Mixer>,
        spool: Option<Arc<TempPath>>,
    ) -> Self {
        Self {
            reference,
            mixer,
            _spool: spool,
        }
    }

    /// Start playback from the current position, looping if requested.
    pub fn play(&self, looping: bool) {
        self.reference.set_playing(true);
        self.reference.set_looping(looping);
    }

    /// Start playback at a given volume, looping if requested.
    pub fn play_with_volume(&self, looping: bool, volume: f64) {
        self.set_volume(volume);
        self.play(looping);
    }

    /// Stop playback and rewind to the beginning.
    pub fn stop(&self) {
        self.reference.set_playing(false);
        self.rewind();
    }

    /// Stop playback, keeping the current position.
    pub fn pause(&self) {
        self.reference.set_playing(false);
    }

    /// Continue playback from the current position.
    pub fn resume(&self) {
        self.reference.set_playing(true);
    }

    /// Seek back to the beginning.
    pub fn rewind(&self) {
        self.reference.set_position(0);
    }

    /// Seek to the loop position.
    pub fn rewind_to_loop_position(&self) {
        let loop_position = self.reference.loop_position();
        self.reference.set_position(loop_position);
    }

    pub fn playing(&self) -> bool {
        self.reference.playing()
    }

    /// Whether playback has exhausted the audio data. A looping track wraps
    /// inside the mixer instead of exhausting, so this stays false while the
    /// loop runs.
    pub fn done(&self) -> bool {
        self.reference.bytes_available() == 0
    }

    pub fn looping(&self) -> bool {
        self.reference.looping()
    }

    pub fn set_looping(&self, looping: bool) {
        self.reference.set_looping(looping);
    }

    /// Loop position as a sample-frame index.
    pub fn loop_position_by_frame(&self) -> u64 {
        self.reference.loop_position() / BYTES_PER_SAMPLE as u64
    }

    /// Loop position in seconds.
    pub fn loop_position_by_seconds(&self) -> f64 {
        self.reference.loop_position() as f64 / BYTES_PER_CHANNEL_SECOND
    }

    /// Set the loop position by sample-frame index. Out-of-range frames are
    /// silently ignored.
    pub fn set_loop_position_by_frame(&self, frame: u64) {
        self.reference
            .set_loop_position(frame * BYTES_PER_SAMPLE as u64);
    }

    /// Set the loop position in seconds. Negative or out-of-range values are
    /// silently ignored.
    pub fn set_loop_position_by_seconds(&self, seconds: f64) {
        if seconds >= 0.0 && seconds.is_finite() {
            self.reference
                .set_loop_position((seconds * BYTES_PER_CHANNEL_SECOND) as u64);
        }
    }

    pub fn volume(&self) -> f64 {
        self.reference.volume()
    }

    /// Negative volumes are ignored.
    pub fn set_volume(&self, volume: f64) {
        self.reference.set_volume(volume);
    }

    /// Unregister from the mixer and release the underlying resource.
    ///
    /// Consuming `self` guarantees the reference is never touched through
    /// this handle again; the mixer stops reading it before it is disposed.
    pub fn unload(self) {
        let reference = self.reference.clone();
        self.mixer.unregister_track(&reference);
        reference.dispose();
        debug!("track unloaded");
    }
}
