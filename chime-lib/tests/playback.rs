//! End-to-end playback: decode a WAV fixture, mix it, and inspect the
//! delivered canonical-format bytes.

use std::io::Write;

use chime_lib::constants::FRAME_BYTES;
use chime_lib::output::{MemoryOutput, OutputDevice};
use chime_lib::scheduler::run_cycle;
use chime_lib::{AudioEngine, EngineSettings};

/// Write a 16-bit stereo 44.1 kHz WAV containing `frames` repetitions of the
/// given left/right samples.
fn write_wav(left: i16, right: i16, frames: u32) -> tempfile::TempPath {
    let mut file = tempfile::Builder::new()
        .suffix(".wav")
        .tempfile()
        .expect("create wav fixture");

    let data_len = frames * 4;
    let mut header = Vec::new();
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&(36 + data_len).to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes()); // PCM
    header.extend_from_slice(&2u16.to_le_bytes()); // stereo
    header.extend_from_slice(&44_100u32.to_le_bytes());
    header.extend_from_slice(&(44_100u32 * 4).to_le_bytes());
    header.extend_from_slice(&4u16.to_le_bytes());
    header.extend_from_slice(&16u16.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_len.to_le_bytes());
    file.write_all(&header).unwrap();

    for _ in 0..frames {
        file.write_all(&left.to_le_bytes()).unwrap();
        file.write_all(&right.to_le_bytes()).unwrap();
    }
    file.flush().unwrap();
    file.into_temp_path()
}

fn memory_engine() -> AudioEngine {
    AudioEngine::start_with_output(EngineSettings::manual(), || {
        Ok(Box::new(MemoryOutput::new()) as Box<dyn OutputDevice>)
    })
    .expect("start engine")
}

fn frames_of(pcm: &[u8]) -> Vec<(i16, i16)> {
    pcm.chunks_exact(FRAME_BYTES)
        .map(|frame| {
            (
                i16::from_be_bytes([frame[0], frame[1]]),
                i16::from_be_bytes([frame[2], frame[3]]),
            )
        })
        .collect()
}

#[test]
fn wav_track_plays_back_canonically() {
    let wav = write_wav(1000, -1000, 32);
    let engine = memory_engine();
    let track = engine.load_track(&wav).expect("load track");
    track.play(false);

    let mixer = engine.mixer();
    let mut output = MemoryOutput::new();
    let mut buf = vec![0u8; 64 * FRAME_BYTES];
    let read = run_cycle(&mixer, &mut output, &mut buf);

    assert_eq!(read, 32 * FRAME_BYTES);
    let frames = frames_of(output.data());
    assert_eq!(frames.len(), 32);
    assert!(frames.iter().all(|&frame| frame == (1000, -1000)));
}

#[test]
fn streamed_track_matches_the_memory_variant() {
    let wav = write_wav(1234, 4321, 16);
    let engine = memory_engine();

    let streamed = engine.load_track_streamed(&wav).expect("load streamed");
    streamed.play_with_volume(false, 0.5);

    let mixer = engine.mixer();
    let mut output = MemoryOutput::new();
    let mut buf = vec![0u8; 32 * FRAME_BYTES];
    run_cycle(&mixer, &mut output, &mut buf);

    let frames = frames_of(output.data());
    assert_eq!(frames.len(), 16);
    assert!(frames.iter().all(|&frame| frame == (617, 2160)));
}

#[test]
fn effect_playback_overlaps_and_auto_removes() {
    let wav = write_wav(800, 800, 4);
    let engine = memory_engine();
    let effect = engine.load_effect(&wav).expect("load effect");
    effect.play();
    effect.play();

    let mixer = engine.mixer();
    let mut output = MemoryOutput::new();
    let mut buf = vec![0u8; 8 * FRAME_BYTES];
    run_cycle(&mixer, &mut output, &mut buf);

    let frames = frames_of(output.data());
    assert_eq!(frames.len(), 4);
    assert!(frames.iter().all(|&frame| frame == (1600, 1600)));
    assert_eq!(mixer.effect_count(), 0);
}

#[test]
fn unloaded_track_no_longer_mixes() {
    let wav = write_wav(500, 500, 8);
    let engine = memory_engine();
    let track = engine.load_track(&wav).expect("load track");
    track.play(false);
    track.unload();

    let mixer = engine.mixer();
    let mut output = MemoryOutput::new();
    let mut buf = vec![0u8; 8 * FRAME_BYTES];
    assert_eq!(run_cycle(&mixer, &mut output, &mut buf), 0);
    engine.shutdown();
}
