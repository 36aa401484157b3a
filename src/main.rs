//! emukit - headless session demo
//!
//! Runs the tone core for a few seconds with a simulated audio device thread
//! and a scripted input thread, then reports transport statistics.
//!
//! Usage: `emukit [ROM] [FRAMES]`

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ek_audio::AudioRenderer;
use ek_core::{logging, Config, System};
use ek_host::{EmulationCore, SessionIo, SessionRunner, ToneCore};
use ek_input::{CoreInput, EventProducer, InputDelta};

const DEFAULT_FRAMES: u64 = 180;
/// Bytes the simulated device asks for per callback: 10ms of 48kHz stereo i16
const CALLBACK_BYTES: usize = 480 * 4;

fn main() -> Result<()> {
    let config = Config::load().context("loading configuration")?;
    logging::init(&config.debug)?;

    tracing::info!("Starting emukit with {} {}", ToneCore::NAME, ToneCore::VERSION);

    let mut args = std::env::args().skip(1);
    let rom = match args.next() {
        Some(path) => PathBuf::from(path),
        None => demo_rom()?,
    };
    let frames = match args.next() {
        Some(n) => n.parse().context("FRAMES must be a number")?,
        None => DEFAULT_FRAMES,
    };
    let save = rom.with_extension("sav");

    let mut session = SessionRunner::<ToneCore>::new(System::Gb, config)?;
    let SessionIo { audio, input } = session.start(&rom, &save)?;
    session.connect_player(0)?;

    let running = Arc::new(AtomicBool::new(true));
    let audio_thread = audio
        .map(|renderer| spawn_audio(renderer, Arc::clone(&running)))
        .transpose()?;
    let epoch = Instant::now();
    let input_thread = spawn_input(input, epoch, session.frame_interval())?;

    let interval = session.frame_interval();
    for _ in 0..frames {
        let frame_start = Instant::now();
        session.step(epoch.elapsed().as_secs_f64())?;
        let elapsed = frame_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    let input = input_thread
        .join()
        .map_err(|_| anyhow::anyhow!("input thread panicked"))?;
    session.stop()?;
    running.store(false, Ordering::Release);

    if let Some(handle) = audio_thread {
        let renderer = handle
            .join()
            .map_err(|_| anyhow::anyhow!("audio thread panicked"))?;
        tracing::info!(
            "Audio: {} callbacks served, {} underruns, {} bytes dropped",
            renderer.callbacks(),
            renderer.underruns(),
            session.dropped_audio_bytes()
        );
    }
    tracing::info!(
        "Input: {} events delivered, {} dropped",
        session.events_delivered(),
        input.dropped()
    );
    tracing::info!("Ran {} frames, {} saves", session.frame_count(), session.save_count());

    Ok(())
}

/// Write a one-byte ROM to the temp directory
fn demo_rom() -> Result<PathBuf> {
    let path = std::env::temp_dir().join("emukit-demo.rom");
    std::fs::write(&path, [40u8]).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Simulated device callback thread
fn spawn_audio(
    mut renderer: AudioRenderer,
    running: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<AudioRenderer>> {
    let handle = thread::Builder::new()
        .name("audio".to_string())
        .spawn(move || {
            let mut out = [0u8; CALLBACK_BYTES];
            while running.load(Ordering::Acquire) {
                renderer.render(&mut out);
                thread::sleep(Duration::from_millis(10));
            }
            renderer
        })
        .context("spawning audio thread")?;
    Ok(handle)
}

/// Plays a short scale on player 0, one note every 20 frames
fn spawn_input(
    mut input: EventProducer,
    epoch: Instant,
    frame: Duration,
) -> Result<thread::JoinHandle<EventProducer>> {
    const SCALE: [CoreInput; 4] = [
        CoreInput::FACE_BUTTON_DOWN,
        CoreInput::FACE_BUTTON_RIGHT,
        CoreInput::FACE_BUTTON_LEFT,
        CoreInput::FACE_BUTTON_UP,
    ];

    let handle = thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            for (octave, dpad_y) in [(0, 0.0f32), (1, 1.0)] {
                let now = epoch.elapsed().as_secs_f64();
                input.enqueue(InputDelta::new(CoreInput::DPAD, 0.0, dpad_y, now), 0);
                for note in SCALE {
                    let now = epoch.elapsed().as_secs_f64();
                    input.enqueue(InputDelta::button(note, true, 0.0, now), 0);
                    thread::sleep(frame * 20);
                    let now = epoch.elapsed().as_secs_f64();
                    input.enqueue(InputDelta::button(note, false, 0.0, now), 0);
                }
                tracing::debug!("Finished scale in octave {}", octave);
            }
            input
        })
        .context("spawning input thread")?;
    Ok(handle)
}
