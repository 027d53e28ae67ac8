//! Output-device collaborators accepting canonical-format buffers.

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};

use crate::constants::{CHANNELS, SAMPLE_RATE};
use crate::error::EngineError;

/// Accepts canonical-format byte buffers for playback.
///
/// The engine never manages hardware lines directly; everything behind this
/// trait is a collaborator. Implementations need not be `Send`: the
/// self-driven scheduler constructs its device on the thread that will use
/// it.
pub trait OutputDevice {
    /// Deliver one buffer of mixed, big-endian frames.
    fn write(&mut self, pcm: &[u8]) -> Result<(), EngineError>;
}

/// Default output device playing through rodio.
pub struct RodioOutput {
    // keeps the underlying device stream alive for as long as the sink
    _stream: OutputStream,
    sink: Sink,
}

impl RodioOutput {
    /// Open the default system output.
    pub fn open() -> Result<Self, EngineError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|err| EngineError::OutputUnavailable(err.to_string()))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|err| EngineError::OutputUnavailable(err.to_string()))?;
        sink.play();
        Ok(Self {
            _stream: stream,
            sink,
        })
    }
}

impl OutputDevice for RodioOutput {
    fn write(&mut self, pcm: &[u8]) -> Result<(), EngineError> {
        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        self.sink
            .append(SamplesBuffer::new(CHANNELS as u16, SAMPLE_RATE, samples));
        Ok(())
    }
}

/// Output device capturing everything written to it.
///
/// Used by tests and dry runs in place of a hardware device.
#[derive(Debug, Default)]
pub struct MemoryOutput {
    data: Vec<u8>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }
}

impl OutputDevice for MemoryOutput {
    fn write(&mut self, pcm: &[u8]) -> Result<(), EngineError> {
        self.data.extend_from_slice(pcm);
        Ok(())
    }
}
