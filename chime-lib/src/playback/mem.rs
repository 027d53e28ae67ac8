//! In-memory playback references.
//!
//! Backed by fixed per-channel byte buffers, so seeking in either direction
//! is constant-time index arithmetic. The buffers themselves are shared
//! `Arc`s; they are freed once the owning handle and the mixer have both
//! dropped their references.

use std::sync::{Arc, Mutex};

use crate::constants::BYTES_PER_SAMPLE;
use crate::playback::reference::{EffectReference, Frame, TrackReference};

/// Decode one big-endian sample starting at `offset`.
fn sample_at(data: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([data[offset], data[offset + 1]])
}

#[derive(Debug)]
struct TrackState {
    playing: bool,
    looping: bool,
    loop_position: u64,
    position: u64,
}

/// Persistent reference over in-memory audio data.
#[derive(Debug)]
pub struct MemTrackReference {
    left: Arc<[u8]>,
    right: Arc<[u8]>,
    state: Mutex<TrackState>,
    volume: Mutex<f64>,
}

impl MemTrackReference {
    pub fn new(left: Arc<[u8]>, right: Arc<[u8]>) -> Self {
        debug_assert_eq!(left.len(), right.len());
        Self {
            left,
            right,
            state: Mutex::new(TrackState {
                playing: false,
                looping: false,
                loop_position: 0,
                position: 0,
            }),
            volume: Mutex::new(1.0),
        }
    }

    fn len(&self) -> u64 {
        self.left.len() as u64
    }
}

impl TrackReference for MemTrackReference {
    fn playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    fn set_playing(&self, playing: bool) {
        self.state.lock().unwrap().playing = playing;
    }

    fn looping(&self) -> bool {
        self.state.lock().unwrap().looping
    }

    fn set_looping(&self, looping: bool) {
        self.state.lock().unwrap().looping = looping;
    }

    fn position(&self) -> u64 {
        self.state.lock().unwrap().position
    }

    fn set_position(&self, position: u64) {
        let mut state = self.state.lock().unwrap();
        if position < self.len() {
            state.position = position;
        }
    }

    fn loop_position(&self) -> u64 {
        self.state.lock().unwrap().loop_position
    }

    fn set_loop_position(&self, loop_position: u64) {
        let mut state = self.state.lock().unwrap();
        if loop_position < self.len() {
            state.loop_position = loop_position;
        }
    }

    fn volume(&self) -> f64 {
        *self.volume.lock().unwrap()
    }

    fn set_volume(&self, volume: f64) {
        if volume >= 0.0 {
            *self.volume.lock().unwrap() = volume;
        }
    }

    fn bytes_available(&self) -> u64 {
        let state = self.state.lock().unwrap();
        self.len().saturating_sub(state.position)
    }

    fn skip_bytes(&self, count: u64) {
        let mut state = self.state.lock().unwrap();
        let len = self.len();
        let target = state.position + count;
        if state.looping && target >= len && len > state.loop_position {
            let span = len - state.loop_position;
            state.position = state.loop_position + (target - len) % span;
        } else {
            state.position = target.min(len);
        }
    }

    fn next_frame(&self) -> Frame {
        let mut state = self.state.lock().unwrap();
        let len = self.len();
        let offset = state.position as usize;
        if offset + BYTES_PER_SAMPLE > self.left.len() {
            return [0, 0];
        }
        let frame = [sample_at(&self.left, offset), sample_at(&self.right, offset)];
        state.position += BYTES_PER_SAMPLE as u64;
        // wrap if looping
        if state.looping && state.position >= len {
            state.position = state.loop_position;
        }
        frame
    }

    fn dispose(&self) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.position = self.len();
    }
}

/// One-shot reference over in-memory audio data.
///
/// A fresh instance is spawned per play invocation; the volume is fixed at
/// spawn time and the reference is dropped by the mixer once exhausted.
#[derive(Debug)]
pub struct MemEffectReference {
    left: Arc<[u8]>,
    right: Arc<[u8]>,
    parent_id: u32,
    volume: f64,
    position: Mutex<u64>,
}

impl MemEffectReference {
    pub fn new(left: Arc<[u8]>, right: Arc<[u8]>, volume: f64, parent_id: u32) -> Self {
        debug_assert_eq!(left.len(), right.len());
        Self {
            left,
            right,
            parent_id,
            volume: if volume >= 0.0 { volume } else { 1.0 },
            position: Mutex::new(0),
        }
    }

    fn len(&self) -> u64 {
        self.left.len() as u64
    }
}

impl EffectReference for MemEffectReference {
    fn parent_id(&self) -> u32 {
        self.parent_id
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn bytes_available(&self) -> u64 {
        let position = *self.position.lock().unwrap();
        self.len().saturating_sub(position)
    }

    fn skip_bytes(&self, count: u64) {
        let mut position = self.position.lock().unwrap();
        *position = (*position + count).min(self.len());
    }

    fn next_frame(&self) -> Frame {
        let mut position = self.position.lock().unwrap();
        let offset = *position as usize;
        if offset + BYTES_PER_SAMPLE > self.left.len() {
            return [0, 0];
        }
        let frame = [sample_at(&self.left, offset), sample_at(&self.right, offset)];
        *position += BYTES_PER_SAMPLE as u64;
        frame
    }

    fn dispose(&self) {
        *self.position.lock().unwrap() = self.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two frames per channel: samples 100, 200 on the left and 300, 400 on
    /// the right.
    fn two_frame_track() -> MemTrackReference {
        let left: Vec<u8> = [100i16, 200]
            .iter()
            .flat_map(|s| s.to_be_bytes())
            .collect();
        let right: Vec<u8> = [300i16, 400]
            .iter()
            .flat_map(|s| s.to_be_bytes())
            .collect();
        MemTrackReference::new(left.into(), right.into())
    }

    #[test]
    fn frames_read_in_order() {
        let track = two_frame_track();
        assert_eq!(track.next_frame(), [100, 300]);
        assert_eq!(track.next_frame(), [200, 400]);
        assert_eq!(track.bytes_available(), 0);
    }

    #[test]
    fn out_of_range_seeks_are_ignored() {
        let track = two_frame_track();
        track.set_position(2);
        track.set_position(4); // == length
        track.set_position(5);
        assert_eq!(track.position(), 2);
        track.set_loop_position(9);
        assert_eq!(track.loop_position(), 0);
    }

    #[test]
    fn negative_volume_is_ignored() {
        let track = two_frame_track();
        track.set_volume(0.25);
        track.set_volume(-1.0);
        assert_eq!(track.volume(), 0.25);
    }

    #[test]
    fn looping_wraps_to_loop_position() {
        let track = two_frame_track();
        track.set_looping(true);
        track.set_loop_position(2);
        track.next_frame();
        assert_eq!(track.next_frame(), [200, 400]);
        // wrapped to the loop position, not to zero
        assert_eq!(track.position(), 2);
        assert_eq!(track.next_frame(), [200, 400]);
    }

    #[test]
    fn skip_wraps_while_looping() {
        let track = two_frame_track();
        track.set_looping(true);
        track.set_loop_position(2);
        track.skip_bytes(7); // 0 + 7 -> 3 bytes past end, span 2 -> 2 + 1
        assert_eq!(track.position(), 3);
    }

    #[test]
    fn exhausted_track_stays_exhausted() {
        let track = two_frame_track();
        track.skip_bytes(10);
        assert_eq!(track.bytes_available(), 0);
        assert_eq!(track.next_frame(), [0, 0]);
        assert_eq!(track.bytes_available(), 0);
    }

    #[test]
    fn dispose_parks_at_end() {
        let track = two_frame_track();
        track.set_playing(true);
        track.dispose();
        assert!(!track.playing());
        assert_eq!(track.bytes_available(), 0);
    }

    #[test]
    fn effect_plays_front_to_back_once() {
        let left: Vec<u8> = 1000i16.to_be_bytes().to_vec();
        let right: Vec<u8> = (-1000i16).to_be_bytes().to_vec();
        let effect = MemEffectReference::new(left.into(), right.into(), 0.5, 7);
        assert_eq!(effect.parent_id(), 7);
        assert_eq!(effect.volume(), 0.5);
        assert_eq!(effect.next_frame(), [1000, -1000]);
        assert_eq!(effect.bytes_available(), 0);
    }

    #[test]
    fn effect_negative_volume_defaults_to_unity() {
        let data: Arc<[u8]> = Vec::new().into();
        let effect = MemEffectReference::new(data.clone(), data, -2.0, 1);
        assert_eq!(effect.volume(), 1.0);
    }
}
