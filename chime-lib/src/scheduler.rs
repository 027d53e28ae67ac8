//! The update scheduler: drives periodic extraction from the mixer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, warn};

use crate::constants::{FRAME_BYTES, SAMPLE_RATE};
use crate::error::EngineError;
use crate::mixer::Mixer;
use crate::output::OutputDevice;

/// How often the background loop re-checks the clock and the running flag.
/// Short polling sleeps trade a little CPU for bounded stop latency.
const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Bytes one extraction cycle asks the mixer for at the given rate.
pub fn bytes_per_update(update_rate: u32) -> usize {
    let frames = (SAMPLE_RATE / update_rate.max(1)).max(1) as usize;
    frames * FRAME_BYTES
}

/// Run one extraction/delivery cycle: pull a buffer from the mixer and hand
/// whatever was produced to the output device. Returns the bytes extracted.
pub fn run_cycle(mixer: &Mixer, output: &mut dyn OutputDevice, buf: &mut [u8]) -> usize {
    let read = mixer.read(buf);
    if read > 0 {
        if let Err(err) = output.write(&buf[..read]) {
            warn!("output device rejected a buffer: {}", err);
        }
    }
    read
}

/// Background loop extracting from a mixer at a fixed updates-per-second
/// rate.
///
/// The output device is constructed on the scheduler thread itself, matching
/// how audio output streams want to live on the thread that feeds them.
pub struct UpdateRunner {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl UpdateRunner {
    /// Spawn the update loop. `make_output` runs once on the new thread; if
    /// it fails, the loop exits immediately and the error is logged.
    pub fn spawn<F>(mixer: Arc<Mixer>, make_output: F, update_rate: u32) -> Self
    where
        F: FnOnce() -> Result<Box<dyn OutputDevice>, EngineError> + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = running.clone();

        let handle = thread::spawn(move || {
            let mut output = match make_output() {
                Ok(output) => output,
                Err(err) => {
                    error!("update loop could not open an output device: {}", err);
                    running_flag.store(false, Ordering::SeqCst);
                    return;
                }
            };

            let interval = Duration::from_secs(1) / update_rate.max(1);
            let mut buf = vec![0u8; bytes_per_update(update_rate)];
            let mut last_update: Option<Instant> = None;

            debug!("update loop started at {} updates/s", update_rate.max(1));
            while running_flag.load(Ordering::SeqCst) {
                let due = match last_update {
                    Some(at) => at.elapsed() >= interval,
                    None => true,
                };
                if due {
                    last_update = Some(Instant::now());
                    run_cycle(&mixer, output.as_mut(), &mut buf);
                }
                // give the CPU back to the OS for a bit
                thread::sleep(POLL_INTERVAL);
            }
            debug!("update loop stopped");
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Request the loop to stop and wait for it to exit. Idempotent; takes
    /// effect no later than the loop's next polling check.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("update loop thread panicked");
            }
        }
    }

    /// Whether the loop is still alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for UpdateRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
