//! The engine context: owns the mixer, the scheduler, and the loaders.
//!
//! There is no global audio state. An [`AudioEngine`] is created explicitly
//! at startup, handles are loaded through it, and `shutdown` releases
//! everything it owns.

use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::decode;
use crate::effect::Effect;
use crate::error::EngineError;
use crate::mixer::Mixer;
use crate::output::{OutputDevice, RodioOutput};
use crate::playback::mem::MemTrackReference;
use crate::playback::stream::StreamTrackReference;
use crate::playback::TrackReference;
use crate::scheduler::{bytes_per_update, run_cycle, UpdateRunner};
use crate::settings::EngineSettings;
use crate::track::Track;

/// Caller-driven extraction state: the output device plus one update's worth
/// of buffer.
struct ManualCycle {
    output: Box<dyn OutputDevice>,
    buf: Vec<u8>,
}

/// A running audio system.
///
/// In auto-update mode a background [`UpdateRunner`] extracts mixed audio at
/// the configured rate; otherwise the caller drives extraction through
/// [`AudioEngine::update`]. Either way, all loaded handles share this
/// engine's mixer.
pub struct AudioEngine {
    mixer: Arc<Mixer>,
    settings: EngineSettings,
    runner: Option<UpdateRunner>,
    manual: Option<ManualCycle>,
}

impl AudioEngine {
    /// Start an engine playing through the default system output.
    pub fn start(settings: EngineSettings) -> Result<Self, EngineError> {
        Self::start_with_output(settings, || {
            RodioOutput::open().map(|output| Box::new(output) as Box<dyn OutputDevice>)
        })
    }

    /// Start an engine with a custom output device.
    ///
    /// `make_output` runs on the scheduler thread in auto-update mode and on
    /// the calling thread otherwise; in auto mode a failure to open the
    /// device is logged by the scheduler and the loop exits.
    pub fn start_with_output<F>(settings: EngineSettings, make_output: F) -> Result<Self, EngineError>
    where
        F: FnOnce() -> Result<Box<dyn OutputDevice>, EngineError> + Send + 'static,
    {
        let mixer = Arc::new(Mixer::new());
        let rate = settings.effective_update_rate();

        let (runner, manual) = if settings.auto_update {
            let runner = UpdateRunner::spawn(mixer.clone(), make_output, rate);
            (Some(runner), None)
        } else {
            let manual = ManualCycle {
                output: make_output()?,
                buf: vec![0u8; bytes_per_update(rate)],
            };
            (None, Some(manual))
        };

        debug!(
            "engine started ({} updates/s, auto_update={})",
            rate, settings.auto_update
        );
        Ok(Self {
            mixer,
            settings,
            runner,
            manual,
        })
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// The mixer all handles loaded through this engine register with.
    /// Exposed for callers that construct their own playback references.
    pub fn mixer(&self) -> Arc<Mixer> {
        self.mixer.clone()
    }

    /// Load a persistent track fully into memory.
    pub fn load_track(&self, path: impl AsRef<Path>) -> Result<Track, EngineError> {
        let decoded = decode::load_pcm(path.as_ref())?;
        let reference: Arc<dyn TrackReference> = Arc::new(MemTrackReference::new(
            decoded.left.into(),
            decoded.right.into(),
        ));
        self.mixer.register_track(reference.clone());
        Ok(Track::new(reference, self.mixer.clone(), None))
    }

    /// Load a persistent track streamed from a spool file instead of held in
    /// memory.
    pub fn load_track_streamed(&self, path: impl AsRef<Path>) -> Result<Track, EngineError> {
        let (info, spool) = decode::spool_stream(path.as_ref())?;
        let reference: Arc<dyn TrackReference> = Arc::new(StreamTrackReference::new(info)?);
        self.mixer.register_track(reference.clone());
        Ok(Track::new(
            reference,
            self.mixer.clone(),
            Some(Arc::new(spool)),
        ))
    }

    /// Load a sound effect fully into memory.
    pub fn load_effect(&self, path: impl AsRef<Path>) -> Result<Effect, EngineError> {
        let decoded = decode::load_pcm(path.as_ref())?;
        Ok(Effect::from_memory(
            decoded.left.into(),
            decoded.right.into(),
            self.mixer.clone(),
        ))
    }

    /// Load a sound effect streamed from a spool file. Each play opens its
    /// own reader over the spool.
    pub fn load_effect_streamed(&self, path: impl AsRef<Path>) -> Result<Effect, EngineError> {
        let (info, spool) = decode::spool_stream(path.as_ref())?;
        Ok(Effect::from_stream(
            info,
            Arc::new(spool),
            self.mixer.clone(),
        ))
    }

    /// Drive one extraction/delivery cycle explicitly. Only meaningful when
    /// the engine was started without auto-update; returns the number of
    /// bytes extracted.
    pub fn update(&mut self) -> usize {
        match self.manual.as_mut() {
            Some(manual) => run_cycle(&self.mixer, manual.output.as_mut(), &mut manual.buf),
            None => 0,
        }
    }

    /// Stop the update loop and unregister everything.
    pub fn shutdown(mut self) {
        if let Some(mut runner) = self.runner.take() {
            runner.stop();
        }
        self.mixer.clear_tracks();
        self.mixer.clear_effects();
        debug!("engine shut down");
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if let Some(mut runner) = self.runner.take() {
            runner.stop();
        }
    }
}
