use std::thread::sleep;
use std::time::{Duration, Instant};

use chime_lib::constants::{FRAME_BYTES, SAMPLE_RATE};
use chime_lib::output::{MemoryOutput, OutputDevice};
use chime_lib::{AudioEngine, EngineError, EngineSettings, Track};
use clap::ArgMatches;
use log::{error, info};

pub fn run(args: &ArgMatches) -> Result<i32, EngineError> {
    let file_path = args.get_one::<String>("INPUT").unwrap().clone();
    let looping = args.get_flag("loop");
    let stream = args.get_flag("stream");
    let dry_run = args.get_flag("dry-run");

    let volume = match args.get_one::<String>("volume").unwrap().parse::<f64>() {
        Ok(percent) if percent >= 0.0 => percent / 100.0,
        _ => {
            error!("--volume must be a non-negative number");
            return Ok(-1);
        }
    };
    let duration = match args.get_one::<String>("duration") {
        Some(raw) => match raw.parse::<f64>() {
            Ok(seconds) if seconds >= 0.0 => Some(seconds),
            _ => {
                error!("--duration must be a non-negative number of seconds");
                return Ok(-1);
            }
        },
        None => None,
    };
    let update_rate = match args.get_one::<String>("update-rate").unwrap().parse::<u32>() {
        Ok(rate) if rate > 0 => rate,
        _ => {
            error!("--update-rate must be a positive integer");
            return Ok(-1);
        }
    };

    if looping && dry_run && duration.is_none() {
        error!("--loop with --dry-run needs --duration to terminate");
        return Ok(-1);
    }

    let settings = EngineSettings {
        update_rate,
        auto_update: !dry_run,
    };

    if dry_run {
        run_dry(settings, &file_path, stream, looping, volume, duration)
    } else {
        run_live(settings, &file_path, stream, looping, volume, duration)
    }
}

fn load(engine: &AudioEngine, path: &str, stream: bool) -> Result<Track, EngineError> {
    if stream {
        engine.load_track_streamed(path)
    } else {
        engine.load_track(path)
    }
}

/// Mix into memory as fast as possible and report what was produced.
fn run_dry(
    settings: EngineSettings,
    file_path: &str,
    stream: bool,
    looping: bool,
    volume: f64,
    duration: Option<f64>,
) -> Result<i32, EngineError> {
    let mut engine = AudioEngine::start_with_output(settings, || {
        Ok(Box::new(MemoryOutput::new()) as Box<dyn OutputDevice>)
    })?;
    let track = load(&engine, file_path, stream)?;
    track.play_with_volume(looping, volume);

    let byte_limit =
        duration.map(|seconds| (seconds * SAMPLE_RATE as f64) as usize * FRAME_BYTES);
    let mut total = 0usize;
    loop {
        let extracted = engine.update();
        if extracted == 0 {
            break;
        }
        total += extracted;
        if let Some(limit) = byte_limit {
            if total >= limit {
                break;
            }
        }
    }

    let seconds = total as f64 / (SAMPLE_RATE as f64 * FRAME_BYTES as f64);
    println!("mixed {} frames ({:.2} s)", total / FRAME_BYTES, seconds);
    track.unload();
    engine.shutdown();
    Ok(0)
}

/// Play through the default audio device until the track finishes or the
/// requested duration elapses.
fn run_live(
    settings: EngineSettings,
    file_path: &str,
    stream: bool,
    looping: bool,
    volume: f64,
    duration: Option<f64>,
) -> Result<i32, EngineError> {
    let engine = AudioEngine::start(settings)?;
    let track = load(&engine, file_path, stream)?;
    track.play_with_volume(looping, volume);
    info!("playing {}", file_path);

    let started = Instant::now();
    loop {
        if let Some(seconds) = duration {
            if started.elapsed().as_secs_f64() >= seconds {
                break;
            }
        }
        if !looping && track.done() {
            break;
        }
        sleep(Duration::from_millis(50));
    }

    // let the device drain the last delivered buffer
    sleep(Duration::from_millis(200));
    track.unload();
    engine.shutdown();
    Ok(0)
}
