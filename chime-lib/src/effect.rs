//! The one-shot playback handle.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use tempfile::TempPath;

use crate::mixer::Mixer;
use crate::playback::mem::MemEffectReference;
use crate::playback::stream::StreamEffectReference;
use crate::playback::{EffectReference, StreamInfo};

static NEXT_EFFECT_ID: AtomicU32 = AtomicU32::new(0);

fn next_effect_id() -> u32 {
    NEXT_EFFECT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Where an effect's playbacks draw their audio from.
enum EffectSource {
    Mem {
        left: Arc<[u8]>,
        right: Arc<[u8]>,
    },
    Stream {
        info: StreamInfo,
        // keeps the spool file on disk while the handle is loaded
        _spool: Arc<TempPath>,
    },
}

/// A fire-and-forget sound effect.
///
/// Every `play` spawns a fresh reference registered with the mixer, so
/// playbacks of the same effect overlap freely. The mixer removes each
/// playback on exhaustion; `stop` cancels all of them at once via the
/// effect's id.
pub struct Effect {
    source: EffectSource,
    id: u32,
    mixer: Arc<Mixer>,
}

impl Effect {
    pub(crate) fn from_memory(left: Arc<[u8]>, right: Arc<[u8]>, mixer: Arc<Mixer>) -> Self {
        Self {
            source: EffectSource::Mem { left, right },
            id: next_effect_id(),
            mixer,
        }
    }

    pub(crate) fn from_stream(info: StreamInfo, spool: Arc<TempPath>, mixer: Arc<Mixer>) -> Self {
        Self {
            source: EffectSource::Stream {
                info,
                _spool: spool,
            },
            id: next_effect_id(),
            mixer,
        }
    }

    /// Identifier shared by every playback this effect spawns.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Play this effect once at full volume.
    pub fn play(&self) {
        self.play_with_volume(1.0);
    }

    /// Play this effect once at the given volume. A streamed effect that
    /// fails to open its spool file logs the failure and drops the play.
    pub fn play_with_volume(&self, volume: f64) {
        let reference: Arc<dyn EffectReference> = match &self.source {
            EffectSource::Mem { left, right } => Arc::new(MemEffectReference::new(
                left.clone(),
                right.clone(),
                volume,
                self.id,
            )),
            EffectSource::Stream { info, .. } => {
                match StreamEffectReference::new(info.clone(), volume, self.id) {
                    Ok(reference) => Arc::new(reference),
                    Err(err) => {
                        warn!("failed to open stream for effect playback: {}", err);
                        return;
                    }
                }
            }
        };
        self.mixer.register_effect(reference);
    }

    /// Cancel every active playback of this effect in one call.
    pub fn stop(&self) {
        self.mixer.unregister_effects(self.id);
    }

    /// Cancel active playbacks and release the effect's resources.
    pub fn unload(self) {
        self.stop();
        debug!("effect {} unloaded", self.id);
    }
}
