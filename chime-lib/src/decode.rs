//! Symphonia-backed loader: converts encoded audio into the canonical PCM
//! contract.
//!
//! The mixing path never converts formats; everything that leaves this
//! module already satisfies the canonical sample rate, bit depth, channel
//! count, and byte order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::warn;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tempfile::TempPath;

use crate::constants::{CHANNELS, SAMPLE_RATE};
use crate::error::EngineError;
use crate::playback::StreamInfo;

/// Per-channel canonical audio produced by a load.
#[derive(Debug)]
pub struct DecodedAudio {
    pub left: Vec<u8>,
    pub right: Vec<u8>,
}

/// Build a Symphonia `FormatReader` for the given file path.
fn get_reader(path: &Path) -> Result<Box<dyn FormatReader>, EngineError> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    // Probe hint from the file extension, when there is one.
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    Ok(probed.format)
}

/// Build a decoder for the first decodeable audio track.
fn get_decoder(
    format: &dyn FormatReader,
    path: &Path,
) -> Result<(u32, Box<dyn Decoder>), EngineError> {
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::NoAudioTrack(path.display().to_string()))?;

    let dec_opts: DecoderOptions = Default::default();
    let decoder = symphonia::default::get_codecs().make(&track.codec_params, &dec_opts)?;

    // The canonical contract excludes resampling, so the source must already
    // run at the canonical rate.
    if let Some(rate) = track.codec_params.sample_rate {
        if rate != SAMPLE_RATE {
            return Err(EngineError::UnsupportedFormat(format!(
                "sample rate {} Hz (engine runs at {} Hz)",
                rate, SAMPLE_RATE
            )));
        }
    }

    Ok((track.id, decoder))
}

fn convert_signed_24bit(sample: i32) -> i16 {
    ((sample << 8 >> 8) >> 8) as i16
}

fn convert_unsigned_24bit(sample: u32) -> i16 {
    ((sample as i32 - (1 << 23)) >> 8) as i16
}

fn convert_float(sample: f64) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f64) as i16
}

/// Extract one channel from a decoded buffer as canonical 16-bit samples.
fn channel_samples(decoded: &AudioBufferRef<'_>, channel: usize) -> Vec<i16> {
    match decoded {
        AudioBufferRef::U8(buf) => buf
            .chan(channel)
            .iter()
            .map(|&s| ((s as i16 - 128) << 8))
            .collect(),
        AudioBufferRef::S8(buf) => buf.chan(channel).iter().map(|&s| (s as i16) << 8).collect(),
        AudioBufferRef::U16(buf) => buf
            .chan(channel)
            .iter()
            .map(|&s| (s as i32 - (1 << 15)) as i16)
            .collect(),
        AudioBufferRef::S16(buf) => buf.chan(channel).to_vec(),
        AudioBufferRef::U24(buf) => buf
            .chan(channel)
            .iter()
            .map(|s| convert_unsigned_24bit(s.0))
            .collect(),
        AudioBufferRef::S24(buf) => buf
            .chan(channel)
            .iter()
            .map(|s| convert_signed_24bit(s.0))
            .collect(),
        AudioBufferRef::U32(buf) => buf
            .chan(channel)
            .iter()
            .map(|&s| ((s as i64 - (1i64 << 31)) >> 16) as i16)
            .collect(),
        AudioBufferRef::S32(buf) => buf.chan(channel).iter().map(|&s| (s >> 16) as i16).collect(),
        AudioBufferRef::F32(buf) => buf
            .chan(channel)
            .iter()
            .map(|&s| convert_float(s as f64))
            .collect(),
        AudioBufferRef::F64(buf) => buf.chan(channel).iter().map(|&s| convert_float(s)).collect(),
    }
}

/// Decode an entire resource into equal-length per-channel canonical byte
/// buffers.
///
/// Mono sources are duplicated onto both channels; sources with no channel
/// signature or more than two channels are rejected.
pub fn load_pcm(path: &Path) -> Result<DecodedAudio, EngineError> {
    let mut format = get_reader(path)?;
    let (track_id, mut decoder) = get_decoder(format.as_ref(), path)?;

    let mut left: Vec<u8> = Vec::new();
    let mut right: Vec<u8> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // end of stream
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(err.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let channels = decoded.spec().channels.count();
                if channels == 0 || channels > CHANNELS {
                    return Err(EngineError::UnsupportedFormat(format!(
                        "{} channels (engine mixes {})",
                        channels, CHANNELS
                    )));
                }
                let left_samples = channel_samples(&decoded, 0);
                let right_samples = if channels > 1 {
                    channel_samples(&decoded, 1)
                } else {
                    left_samples.clone()
                };
                for sample in left_samples {
                    left.extend_from_slice(&sample.to_be_bytes());
                }
                for sample in right_samples {
                    right.extend_from_slice(&sample.to_be_bytes());
                }
            }
            Err(SymphoniaError::DecodeError(err)) => {
                // Decode errors are not fatal; skip the packet and move on.
                warn!("decode error: {}", err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    debug_assert_eq!(left.len(), right.len());
    Ok(DecodedAudio { left, right })
}

/// Decode a resource and spool it to a temporary file of interleaved
/// canonical frames for streamed playback.
///
/// Returns the stream descriptor plus the temp-file guard; the file is
/// removed once the guard drops, so the owning handle keeps it alive.
pub fn spool_stream(path: &Path) -> Result<(StreamInfo, TempPath), EngineError> {
    let decoded = load_pcm(path)?;

    let spool = tempfile::NamedTempFile::new()?;
    let mut writer = BufWriter::new(spool.as_file());
    for (left, right) in decoded
        .left
        .chunks_exact(2)
        .zip(decoded.right.chunks_exact(2))
    {
        writer.write_all(left)?;
        writer.write_all(right)?;
    }
    writer.flush()?;
    drop(writer);

    let spool_path = spool.into_temp_path();
    let info = StreamInfo::new(spool_path.to_path_buf(), decoded.left.len() as u64);
    Ok((info, spool_path))
}
