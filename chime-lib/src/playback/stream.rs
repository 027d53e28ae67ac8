//! Streamed playback references.
//!
//! Backed by a forward-only reader over a spool file of interleaved
//! canonical frames. Forward seeks consume intervening bytes; a seek to an
//! earlier offset closes and reopens the file, then skips forward from zero.
//! There is no cheap backward-seek primitive; this trades memory for seek
//! latency. Any I/O failure exhausts the reference instead of propagating
//! out of the mixing pass.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::PathBuf;
use std::sync::Mutex;

use log::warn;

use crate::constants::{BYTES_PER_SAMPLE, CHANNELS, FRAME_BYTES};
use crate::playback::reference::{EffectReference, Frame, TrackReference};

const SKIP_BUF_BYTES: usize = 512;

/// Descriptor for constructing streamed references without loading the whole
/// resource into memory.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Spool file of interleaved canonical frames.
    pub path: PathBuf,
    /// Decoded length of one channel in bytes.
    pub bytes_per_channel: u64,
}

impl StreamInfo {
    pub fn new(path: PathBuf, bytes_per_channel: u64) -> Self {
        Self {
            path,
            bytes_per_channel,
        }
    }
}

/// Forward-only cursor shared by both streamed reference kinds.
///
/// `position` counts per-channel bytes; the spool file itself holds
/// `CHANNELS` times as many. `data` is `None` once the reference has been
/// disposed or has failed, which reads as exhaustion.
#[derive(Debug)]
struct StreamCursor {
    data: Option<BufReader<File>>,
    position: u64,
}

impl StreamCursor {
    fn open(info: &StreamInfo) -> std::io::Result<Self> {
        let file = File::open(&info.path)?;
        Ok(Self {
            data: Some(BufReader::new(file)),
            position: 0,
        })
    }

    /// Mark this cursor permanently exhausted and drop the open file.
    fn exhaust(&mut self, info: &StreamInfo) {
        self.position = info.bytes_per_channel;
        self.data = None;
    }

    /// Consume `count` per-channel bytes of stream data. End-of-stream and
    /// read failures exhaust the cursor rather than erroring.
    fn consume(&mut self, info: &StreamInfo, count: u64) {
        // per-channel count, so the interleaved stream holds more
        let mut remaining = count * CHANNELS as u64;
        let mut buf = [0u8; SKIP_BUF_BYTES];
        while remaining > 0 {
            let result = match self.data.as_mut() {
                Some(reader) => {
                    let len = remaining.min(buf.len() as u64) as usize;
                    reader.read(&mut buf[..len])
                }
                None => return,
            };
            match result {
                Ok(0) => {
                    self.exhaust(info);
                    return;
                }
                Ok(n) => remaining -= n as u64,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!("failed skipping stream bytes: {}", err);
                    self.exhaust(info);
                    return;
                }
            }
        }
        self.position += count;
    }

    /// Read one interleaved frame and advance by one per-channel sample.
    fn read_frame(&mut self, info: &StreamInfo) -> Frame {
        let mut buf = [0u8; FRAME_BYTES];
        let result = match self.data.as_mut() {
            Some(reader) => reader.read_exact(&mut buf),
            None => return [0, 0],
        };
        if let Err(err) = result {
            if err.kind() != ErrorKind::UnexpectedEof {
                warn!("failed reading stream frame: {}", err);
            }
            self.exhaust(info);
            return [0, 0];
        }
        self.position += BYTES_PER_SAMPLE as u64;
        [
            i16::from_be_bytes([buf[0], buf[1]]),
            i16::from_be_bytes([buf[2], buf[3]]),
        ]
    }

    /// Reopen the spool file and skip forward to `target` from zero.
    fn rewind_to(&mut self, info: &StreamInfo, target: u64) {
        self.data = None;
        match File::open(&info.path) {
            Ok(file) => {
                self.data = Some(BufReader::new(file));
                self.position = 0;
                self.consume(info, target);
            }
            Err(err) => {
                warn!("failed reopening stream {}: {}", info.path.display(), err);
                self.exhaust(info);
            }
        }
    }

    /// Seek to an absolute per-channel offset, cheap only when forward.
    fn seek_to(&mut self, info: &StreamInfo, target: u64) {
        if target >= self.position {
            self.consume(info, target - self.position);
        } else {
            self.rewind_to(info, target);
        }
    }

    fn bytes_available(&self, info: &StreamInfo) -> u64 {
        info.bytes_per_channel.saturating_sub(self.position)
    }
}

#[derive(Debug)]
struct StreamTrackState {
    cursor: StreamCursor,
    playing: bool,
    looping: bool,
    loop_position: u64,
    volume: f64,
}

impl StreamTrackState {
    /// Advance by `count` per-channel bytes, wrapping at the end of data when
    /// looping. Skips that land at or past the end while looping resolve to
    /// a position inside the loop, which may require a reopen.
    fn skip(&mut self, info: &StreamInfo, count: u64) {
        let end = info.bytes_per_channel;
        let target = self.cursor.position + count;
        if target >= end {
            if !self.looping {
                self.cursor.position = target.min(end);
                return;
            }
            let span = end - self.loop_position;
            let wrapped = if span > 0 {
                self.loop_position + (target - end) % span
            } else {
                self.loop_position
            };
            self.cursor.seek_to(info, wrapped);
            return;
        }
        self.cursor.consume(info, count);
    }
}

/// Persistent reference streaming from a spool file.
#[derive(Debug)]
pub struct StreamTrackReference {
    info: StreamInfo,
    state: Mutex<StreamTrackState>,
}

impl StreamTrackReference {
    pub fn new(info: StreamInfo) -> std::io::Result<Self> {
        let cursor = StreamCursor::open(&info)?;
        Ok(Self {
            info,
            state: Mutex::new(StreamTrackState {
                cursor,
                playing: false,
                looping: false,
                loop_position: 0,
                volume: 1.0,
            }),
        })
    }
}

impl TrackReference for StreamTrackReference {
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
        self.state.lock().unwrap().cursor.position
    }

    fn set_position(&self, position: u64) {
        let mut state = self.state.lock().unwrap();
        if position < self.info.bytes_per_channel {
            state.cursor.seek_to(&self.info, position);
        }
    }

    fn loop_position(&self) -> u64 {
        self.state.lock().unwrap().loop_position
    }

    fn set_loop_position(&self, loop_position: u64) {
        let mut state = self.state.lock().unwrap();
        if loop_position < self.info.bytes_per_channel {
            state.loop_position = loop_position;
        }
    }

    fn volume(&self) -> f64 {
        self.state.lock().unwrap().volume
    }

    fn set_volume(&self, volume: f64) {
        if volume >= 0.0 {
            self.state.lock().unwrap().volume = volume;
        }
    }

    fn bytes_available(&self) -> u64 {
        let state = self.state.lock().unwrap();
        state.cursor.bytes_available(&self.info)
    }

    fn skip_bytes(&self, count: u64) {
        let mut state = self.state.lock().unwrap();
        state.skip(&self.info, count);
    }

    fn next_frame(&self) -> Frame {
        let mut state = self.state.lock().unwrap();
        let frame = state.cursor.read_frame(&self.info);
        // wrap if looping
        if state.looping && state.cursor.position >= self.info.bytes_per_channel {
            let loop_position = state.loop_position;
            state.cursor.seek_to(&self.info, loop_position);
        }
        frame
    }

    fn dispose(&self) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.cursor.exhaust(&self.info);
    }
}

/// One-shot reference streaming from a spool file.
#[derive(Debug)]
pub struct StreamEffectReference {
    info: StreamInfo,
    parent_id: u32,
    volume: f64,
    cursor: Mutex<StreamCursor>,
}

impl StreamEffectReference {
    pub fn new(info: StreamInfo, volume: f64, parent_id: u32) -> std::io::Result<Self> {
        let cursor = StreamCursor::open(&info)?;
        Ok(Self {
            info,
            parent_id,
            volume: if volume >= 0.0 { volume } else { 1.0 },
            cursor: Mutex::new(cursor),
        })
    }
}

impl EffectReference for StreamEffectReference {
    fn parent_id(&self) -> u32 {
        self.parent_id
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn bytes_available(&self) -> u64 {
        self.cursor.lock().unwrap().bytes_available(&self.info)
    }

    fn skip_bytes(&self, count: u64) {
        let mut cursor = self.cursor.lock().unwrap();
        let available = cursor.bytes_available(&self.info);
        cursor.consume(&self.info, count.min(available));
    }

    fn next_frame(&self) -> Frame {
        self.cursor.lock().unwrap().read_frame(&self.info)
    }

    fn dispose(&self) {
        self.cursor.lock().unwrap().exhaust(&self.info);
    }
}
