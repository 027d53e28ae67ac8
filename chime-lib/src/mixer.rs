//! The mixing engine: owns both reference sets and produces mixed output.

use std::sync::{Arc, Mutex};

use crate::constants::{CHANNELS, FRAME_BYTES};
use crate::playback::{EffectReference, TrackReference};

/// Mixes every registered playback reference into canonical-format buffers.
///
/// The persistent-track set and the one-shot-effect set live behind two
/// independent locks; no operation ever holds both except a mixing pass,
/// which acquires tracks first and then effects and keeps both for the
/// duration of the pass. Registrations and removals arriving mid-pass
/// therefore take effect starting the next pass.
pub struct Mixer {
    tracks: Mutex<Vec<Arc<dyn TrackReference>>>,
    effects: Mutex<Vec<Arc<dyn EffectReference>>>,
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            tracks: Mutex::new(Vec::new()),
            effects: Mutex::new(Vec::new()),
        }
    }

    /// Register a persistent reference for mixing.
    pub fn register_track(&self, track: Arc<dyn TrackReference>) {
        self.tracks.lock().unwrap().push(track);
    }

    /// Unregister a persistent reference. Cancellation is immediate: once
    /// this returns, the reference will never be read by a mixing pass again.
    pub fn unregister_track(&self, track: &Arc<dyn TrackReference>) {
        self.tracks
            .lock()
            .unwrap()
            .retain(|registered| !Arc::ptr_eq(registered, track));
    }

    /// Register one playback of an effect.
    pub fn register_effect(&self, effect: Arc<dyn EffectReference>) {
        self.effects.lock().unwrap().push(effect);
    }

    /// Remove every currently active playback spawned by `parent_id`.
    pub fn unregister_effects(&self, parent_id: u32) {
        self.effects
            .lock()
            .unwrap()
            .retain(|effect| effect.parent_id() != parent_id);
    }

    /// Unregister every persistent reference.
    pub fn clear_tracks(&self) {
        self.tracks.lock().unwrap().clear();
    }

    /// Unregister every effect playback.
    pub fn clear_effects(&self) {
        self.effects.lock().unwrap().clear();
    }

    /// Number of registered persistent references.
    pub fn track_count(&self) -> usize {
        self.tracks.lock().unwrap().len()
    }

    /// Number of active effect playbacks.
    pub fn effect_count(&self) -> usize {
        self.effects.lock().unwrap().len()
    }

    /// Fill `data` with mixed frames and return the number of bytes written,
    /// always a multiple of the frame size.
    ///
    /// Each frame accumulates every contributing reference per channel in
    /// floating point, saturate-clips the sums to 16-bit signed, and
    /// serializes them big-endian. Filling stops early once no reference
    /// contributes; the frames already written stand, and a partial fill is
    /// expected rather than an error. A reference that fails mid-read shows
    /// up here as exhausted and is simply dropped from mixing.
    pub fn read(&self, data: &mut [u8]) -> usize {
        let tracks = self.tracks.lock().unwrap();
        let mut effects = self.effects.lock().unwrap();

        let mut written = 0;
        for out in data.chunks_exact_mut(FRAME_BYTES) {
            // float accumulators avoid intermediate integer overflow
            let mut acc = [0.0f64; CHANNELS];
            let mut contributed = false;

            for track in tracks.iter() {
                if track.playing() && track.bytes_available() > 0 {
                    let frame = track.next_frame();
                    let volume = track.volume();
                    for (sum, sample) in acc.iter_mut().zip(frame) {
                        *sum += sample as f64 * volume;
                    }
                    contributed = true;
                }
            }

            // backwards so removal keeps the remaining indices stable
            for index in (0..effects.len()).rev() {
                let effect = &effects[index];
                if effect.bytes_available() > 0 {
                    let frame = effect.next_frame();
                    let volume = effect.volume();
                    for (sum, sample) in acc.iter_mut().zip(frame) {
                        *sum += sample as f64 * volume;
                    }
                    contributed = true;
                    if effect.bytes_available() == 0 {
                        effects.remove(index);
                    }
                } else {
                    effects.remove(index);
                }
            }

            if !contributed {
                break;
            }

            for (bytes, sum) in out.chunks_exact_mut(2).zip(acc) {
                let clipped = sum.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
                bytes.copy_from_slice(&clipped.to_be_bytes());
            }
            written += FRAME_BYTES;
        }

        written
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::mem::{MemEffectReference, MemTrackReference};

    /// Per-channel big-endian bytes holding `value` for every sample.
    fn constant_channel(value: i16, frames: usize) -> Arc<[u8]> {
        let bytes: Vec<u8> = std::iter::repeat(value.to_be_bytes())
            .take(frames)
            .flatten()
            .collect();
        bytes.into()
    }

    fn constant_track(value: i16, frames: usize) -> Arc<MemTrackReference> {
        Arc::new(MemTrackReference::new(
            constant_channel(value, frames),
            constant_channel(value, frames),
        ))
    }

    fn read_frames(mixer: &Mixer, frames: usize) -> Vec<i16> {
        let mut buf = vec![0u8; frames * FRAME_BYTES];
        let n = mixer.read(&mut buf);
        buf[..n]
            .chunks_exact(2)
            .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
            .collect()
    }

    #[test]
    fn silent_plus_scaled_track_mixes_to_expected_sample() {
        let mixer = Mixer::new();
        let a = constant_track(0, 1);
        let b = constant_track(1000, 1);
        a.set_playing(true);
        b.set_playing(true);
        b.set_volume(0.5);
        mixer.register_track(a);
        mixer.register_track(b);

        assert_eq!(read_frames(&mixer, 1), vec![500, 500]);
    }

    #[test]
    fn volume_scaling_is_linear() {
        for volume in [0.0, 0.25, 1.0, 1.5] {
            let mixer = Mixer::new();
            let track = constant_track(400, 1);
            track.set_playing(true);
            track.set_volume(volume);
            mixer.register_track(track);
            let expected = (400.0 * volume) as i16;
            assert_eq!(read_frames(&mixer, 1), vec![expected, expected]);
        }
    }

    #[test]
    fn clipping_saturates_to_sample_bounds() {
        let mixer = Mixer::new();
        for _ in 0..3 {
            let track = constant_track(20_000, 2);
            track.set_playing(true);
            mixer.register_track(track);
        }
        let loud = read_frames(&mixer, 1);
        assert_eq!(loud, vec![i16::MAX, i16::MAX]);

        let mixer = Mixer::new();
        for _ in 0..3 {
            let track = constant_track(-20_000, 2);
            track.set_playing(true);
            mixer.register_track(track);
        }
        assert_eq!(read_frames(&mixer, 1), vec![i16::MIN, i16::MIN]);
    }

    #[test]
    fn paused_tracks_do_not_contribute() {
        let mixer = Mixer::new();
        let playing = constant_track(100, 4);
        playing.set_playing(true);
        mixer.register_track(playing);
        let paused = constant_track(5000, 4);
        mixer.register_track(paused.clone());

        assert_eq!(read_frames(&mixer, 1), vec![100, 100]);
        assert_eq!(paused.bytes_available(), 8);
    }

    #[test]
    fn fill_stops_when_sources_run_dry() {
        let mixer = Mixer::new();
        let track = constant_track(100, 2);
        track.set_playing(true);
        mixer.register_track(track);

        let mut buf = vec![0u8; 5 * FRAME_BYTES];
        let written = mixer.read(&mut buf);
        assert_eq!(written, 2 * FRAME_BYTES);
    }

    #[test]
    fn one_frame_effect_contributes_once_then_auto_removes() {
        let mixer = Mixer::new();
        let effect = MemEffectReference::new(
            constant_channel(750, 1),
            constant_channel(750, 1),
            1.0,
            1,
        );
        mixer.register_effect(Arc::new(effect));

        assert_eq!(read_frames(&mixer, 1), vec![750, 750]);
        assert_eq!(mixer.effect_count(), 0);

        let mut buf = vec![0u8; FRAME_BYTES];
        assert_eq!(mixer.read(&mut buf), 0);
    }

    #[test]
    fn exhausted_effects_are_dropped_without_reading() {
        let mixer = Mixer::new();
        let spent = MemEffectReference::new(
            constant_channel(1, 1),
            constant_channel(1, 1),
            1.0,
            9,
        );
        spent.skip_bytes(2);
        mixer.register_effect(Arc::new(spent));
        let track = constant_track(10, 1);
        track.set_playing(true);
        mixer.register_track(track);

        assert_eq!(read_frames(&mixer, 1), vec![10, 10]);
        assert_eq!(mixer.effect_count(), 0);
    }

    #[test]
    fn parent_id_removal_takes_every_active_instance() {
        let mixer = Mixer::new();
        // one instance mid-playback, one freshly started
        let mid = Arc::new(MemEffectReference::new(
            constant_channel(10, 4),
            constant_channel(10, 4),
            1.0,
            7,
        ));
        mid.skip_bytes(4);
        let fresh = Arc::new(MemEffectReference::new(
            constant_channel(10, 4),
            constant_channel(10, 4),
            1.0,
            7,
        ));
        let other = Arc::new(MemEffectReference::new(
            constant_channel(10, 4),
            constant_channel(10, 4),
            1.0,
            8,
        ));
        mixer.register_effect(mid);
        mixer.register_effect(fresh);
        mixer.register_effect(other);

        mixer.unregister_effects(7);
        assert_eq!(mixer.effect_count(), 1);
    }

    #[test]
    fn unregistered_track_is_never_read_again() {
        let mixer = Mixer::new();
        let track = constant_track(100, 8);
        track.set_playing(true);
        mixer.register_track(track.clone());

        read_frames(&mixer, 1);
        let track_dyn: Arc<dyn TrackReference> = track.clone();
        mixer.unregister_track(&track_dyn);
        assert_eq!(mixer.track_count(), 0);

        let position = track.position();
        let mut buf = vec![0u8; 4 * FRAME_BYTES];
        mixer.read(&mut buf);
        assert_eq!(track.position(), position);
    }

    #[test]
    fn concurrent_registration_never_reads_removed_references() {
        use std::thread;

        let mixer = Arc::new(Mixer::new());
        let reader = {
            let mixer = Arc::clone(&mixer);
            thread::spawn(move || {
                let mut buf = vec![0u8; 16 * FRAME_BYTES];
                for _ in 0..200 {
                    mixer.read(&mut buf);
                }
            })
        };

        for round in 0..200 {
            let track = constant_track(50, 64);
            track.set_playing(true);
            track.set_looping(true);
            let track_dyn: Arc<dyn TrackReference> = track;
            mixer.register_track(Arc::clone(&track_dyn));
            mixer.unregister_track(&track_dyn);
            // disposal after removal must be invisible to the reader
            track_dyn.dispose();
            mixer.unregister_effects(round);
        }

        reader.join().unwrap();
        assert_eq!(mixer.track_count(), 0);
    }
}
