//! Session runner
//!
//! Ties one [`EmulationCore`] to the two transports:
//! - Audio: the core writes sample bytes through its bridge into the byte
//!   ring; the host's audio thread drains it with an [`AudioRenderer`].
//! - Input: the host's input thread enqueues deltas through an
//!   [`EventProducer`]; every `step` drains them into the core.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ek_audio::{AudioRenderer, ByteRingBuffer};
use ek_core::{Config, EmuError, Result, System};
use ek_input::{EventConsumer, EventProducer, EventRingQueue};

use crate::bridge::{BridgeStats, CoreBridge, NullBridge, RingAudioBridge};
use crate::protocol::EmulationCore;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// No game loaded
    Stopped,
    /// Game loaded and stepping
    Running,
    /// Game loaded, stepping suspended
    Paused,
}

impl RunnerState {
    fn name(&self) -> &'static str {
        match self {
            RunnerState::Stopped => "stopped",
            RunnerState::Running => "running",
            RunnerState::Paused => "paused",
        }
    }
}

/// Host-side ends of a started session's transports
#[derive(Debug)]
pub struct SessionIo {
    /// `None` when audio is disabled in the config
    pub audio: Option<AudioRenderer>,
    pub input: EventProducer,
}

/// Drives one core through its lifecycle
pub struct SessionRunner<C: EmulationCore> {
    config: Config,
    system: System,
    core: C,
    state: RunnerState,
    /// Present while a game is loaded
    input: Option<EventConsumer>,
    frame_count: u64,
    events_delivered: u64,
    stats: Arc<BridgeStats>,
}

impl<C: EmulationCore> SessionRunner<C> {
    /// Create the core for `system`
    pub fn new(system: System, config: Config) -> Result<Self> {
        if !C::systems().contains(&system) {
            return Err(EmuError::UnsupportedSystem(format!(
                "{} does not emulate {}",
                C::NAME,
                system
            )));
        }
        config.validate()?;

        let core = C::new(system).map_err(core_error)?;
        tracing::info!("Created {} {} core for {}", C::NAME, C::VERSION, system);

        Ok(Self {
            config,
            system,
            core,
            state: RunnerState::Stopped,
            input: None,
            frame_count: 0,
            events_delivered: 0,
            stats: Arc::new(BridgeStats::default()),
        })
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunnerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == RunnerState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == RunnerState::Stopped
    }

    pub fn system(&self) -> System {
        self.system
    }

    /// Frames stepped since the last `start`
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Input events handed to the core since the last `start`
    pub fn events_delivered(&self) -> u64 {
        self.events_delivered
    }

    /// Save notifications received from the core
    pub fn save_count(&self) -> u64 {
        self.stats.saves()
    }

    /// Audio bytes the core produced that did not fit in the ring
    pub fn dropped_audio_bytes(&self) -> u64 {
        self.stats.dropped_audio_bytes()
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut C {
        &mut self.core
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Seconds between frames at the core's desired rate
    pub fn frame_interval(&self) -> Duration {
        let rate = self.core.desired_frame_rate();
        if rate > 0.0 {
            Duration::from_secs_f64(1.0 / rate)
        } else {
            Duration::ZERO
        }
    }

    /// Load the game and begin running.
    ///
    /// Sizes both rings, hands the audio producer to the core and returns the
    /// ends the host threads drive.
    pub fn start(&mut self, rom: &Path, save: &Path) -> Result<SessionIo> {
        self.expect_state(RunnerState::Stopped)?;
        tracing::info!("Starting session: {}", rom.display());

        let players = self
            .config
            .input
            .max_players_override
            .unwrap_or_else(|| self.core.max_players());
        let queue = EventRingQueue::with_slots_per_player(
            players,
            self.config.input.slots_per_player as usize,
        )?;
        let (input_producer, input_consumer) = queue.split();
        tracing::debug!(
            "Input queue: {} players, {} slots",
            players,
            input_producer.capacity()
        );

        let (bridge, audio) = if self.config.audio.enable {
            let descriptor = self.core.audio_descriptor();
            let duration = Duration::from_millis(u64::from(self.config.audio.buffer_duration_ms));
            let (producer, consumer) = ByteRingBuffer::for_descriptor(&descriptor, duration)?.split();
            tracing::debug!(
                "Audio ring: {} bytes for {:?} at {} Hz, {} channels",
                producer.capacity(),
                descriptor.sample_format,
                descriptor.sample_rate,
                descriptor.channel_count
            );
            (
                Box::new(RingAudioBridge::new(producer, Arc::clone(&self.stats))) as Box<dyn CoreBridge>,
                Some(AudioRenderer::new(consumer)),
            )
        } else {
            tracing::info!("Audio disabled");
            (Box::new(NullBridge::new(Arc::clone(&self.stats))) as Box<dyn CoreBridge>, None)
        };

        self.core.start(rom, save, bridge).map_err(core_error)?;
        self.core.play();

        self.input = Some(input_consumer);
        self.frame_count = 0;
        self.events_delivered = 0;
        self.state = RunnerState::Running;

        Ok(SessionIo {
            audio,
            input: input_producer,
        })
    }

    /// Deliver pending input and emulate one frame
    pub fn step(&mut self, timestamp: f64) -> Result<()> {
        self.step_frame(timestamp, true)
    }

    /// Like [`Self::step`], telling the core the frame will not be shown
    pub fn step_without_render(&mut self, timestamp: f64) -> Result<()> {
        self.step_frame(timestamp, false)
    }

    fn step_frame(&mut self, timestamp: f64, will_render: bool) -> Result<()> {
        self.expect_state(RunnerState::Running)?;

        if let Some(input) = self.input.as_mut() {
            let core = &mut self.core;
            let delivered = input.dequeue(|delta, player| core.write_input(delta, player));
            self.events_delivered += delivered as u64;
        }

        self.core.step(timestamp, will_render);
        self.frame_count += 1;

        if self.frame_count % 600 == 0 {
            tracing::trace!(
                "Frame {}: {} input events delivered",
                self.frame_count,
                self.events_delivered
            );
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.expect_state(RunnerState::Running)?;
        tracing::info!("Pausing session");
        self.core.pause();
        self.state = RunnerState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.expect_state(RunnerState::Paused)?;
        tracing::info!("Resuming session");
        self.core.play();
        self.state = RunnerState::Running;
        Ok(())
    }

    /// Soft reset. Queued input is discarded.
    pub fn reset(&mut self) -> Result<()> {
        self.expect_loaded()?;
        tracing::info!("Resetting session");
        if let Some(input) = self.input.as_mut() {
            let discarded = input.dequeue(|_, _| {});
            tracing::debug!("Discarded {} queued input events", discarded);
        }
        self.core.reset();
        Ok(())
    }

    /// Unload the game. Stopping a stopped session does nothing.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == RunnerState::Stopped {
            return Ok(());
        }
        tracing::info!("Stopping session after {} frames", self.frame_count);
        self.core.stop();
        self.input = None;
        self.state = RunnerState::Stopped;
        Ok(())
    }

    pub fn connect_player(&mut self, port: u8) -> Result<()> {
        self.expect_loaded()?;
        self.core.player_connected(port);
        Ok(())
    }

    pub fn disconnect_player(&mut self, port: u8) -> Result<()> {
        self.expect_loaded()?;
        self.core.player_disconnected(port);
        Ok(())
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.expect_loaded()?;
        self.core.save(path).map_err(core_error)
    }

    pub fn save_state(&self, path: &Path) -> Result<()> {
        self.expect_loaded()?;
        tracing::info!("Saving state to {}", path.display());
        self.core.save_state(path).map_err(core_error)
    }

    pub fn load_state(&mut self, path: &Path) -> Result<()> {
        self.expect_loaded()?;
        tracing::info!("Loading state from {}", path.display());
        self.core.load_state(path).map_err(core_error)
    }

    fn expect_state(&self, expected: RunnerState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EmuError::InvalidState {
                expected: expected.name(),
                found: self.state.name(),
            })
        }
    }

    fn expect_loaded(&self) -> Result<()> {
        if self.state == RunnerState::Stopped {
            Err(EmuError::InvalidState {
                expected: "running or paused",
                found: self.state.name(),
            })
        } else {
            Ok(())
        }
    }
}

impl<C: EmulationCore> Drop for SessionRunner<C> {
    fn drop(&mut self) {
        if self.state != RunnerState::Stopped {
            self.core.stop();
        }
    }
}

fn core_error<E: std::error::Error>(e: E) -> EmuError {
    EmuError::Core(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::ToneCore;
    use ek_input::{CoreInput, InputDelta};

    fn rom(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("game.rom");
        std::fs::write(&path, [60u8]).unwrap();
        path
    }

    #[test]
    fn test_session_creation() {
        let session = SessionRunner::<ToneCore>::new(System::Gb, Config::default()).unwrap();
        assert!(session.is_stopped());
        assert_eq!(session.frame_count(), 0);
        assert_eq!(session.frame_interval(), Duration::from_secs_f64(1.0 / 60.0));

        let err = SessionRunner::<ToneCore>::new(System::Gba, Config::default());
        assert!(matches!(err, Err(EmuError::UnsupportedSystem(_))));
    }

    #[test]
    fn test_session_state_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SessionRunner::<ToneCore>::new(System::Nes, Config::default()).unwrap();

        assert!(matches!(session.step(0.0), Err(EmuError::InvalidState { .. })));
        assert!(session.pause().is_err());

        let _io = session.start(&rom(dir.path()), &dir.path().join("game.sav")).unwrap();
        assert!(session.is_running());
        assert!(session.start(&rom(dir.path()), &dir.path().join("game.sav")).is_err());

        session.step(0.0).unwrap();
        session.pause().unwrap();
        assert!(session.is_paused());
        assert!(session.step(1.0).is_err());

        session.resume().unwrap();
        session.step(1.0).unwrap();
        assert_eq!(session.frame_count(), 2);

        session.stop().unwrap();
        assert!(session.is_stopped());
        session.stop().unwrap();
        assert!(session.reset().is_err());
    }

    #[test]
    fn test_input_reaches_core_and_audio_reaches_host() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SessionRunner::<ToneCore>::new(System::Gb, Config::default()).unwrap();
        let SessionIo { audio, mut input } =
            session.start(&rom(dir.path()), &dir.path().join("game.sav")).unwrap();
        let mut renderer = audio.unwrap();

        // Two players with the default 64 slots each
        assert_eq!(input.capacity(), 2 * 64);
        assert_eq!(renderer.queued_bytes(), 0);

        input.enqueue(InputDelta::button(CoreInput::FACE_BUTTON_DOWN, true, 0.0, 0.0), 0);
        session.step(0.0).unwrap();
        assert_eq!(session.events_delivered(), 1);
        assert_eq!(session.core().frequency(), Some(280.0));

        let mut out = [0i16; 800 * 2];
        assert!(renderer.render_samples(&mut out));
        assert!(out.iter().any(|&s| s != 0));
        assert!(!renderer.render_samples(&mut out));
        assert_eq!(renderer.underruns(), 1);
    }

    #[test]
    fn test_audio_overrun_drops_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.audio.buffer_duration_ms = 20;
        let mut session = SessionRunner::<ToneCore>::new(System::Gb, config).unwrap();
        let io = session.start(&rom(dir.path()), &dir.path().join("game.sav")).unwrap();
        let renderer = io.audio.unwrap();

        // 20ms holds only one 16.7ms frame; the second is rejected whole.
        session.step(0.0).unwrap();
        session.step(1.0).unwrap();
        assert_eq!(renderer.queued_bytes(), 800 * 4);
        assert_eq!(session.dropped_audio_bytes(), 800 * 4);
    }

    #[test]
    fn test_audio_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.audio.enable = false;
        config.input.max_players_override = Some(4);
        config.input.slots_per_player = 8;

        let mut session = SessionRunner::<ToneCore>::new(System::Gb, config).unwrap();
        let io = session.start(&rom(dir.path()), &dir.path().join("game.sav")).unwrap();
        assert!(io.audio.is_none());
        assert_eq!(io.input.capacity(), 32);
        session.step(0.0).unwrap();
    }

    #[test]
    fn test_reset_discards_queued_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SessionRunner::<ToneCore>::new(System::Gb, Config::default()).unwrap();
        let mut io = session.start(&rom(dir.path()), &dir.path().join("game.sav")).unwrap();

        io.input.enqueue(InputDelta::button(CoreInput::FACE_BUTTON_UP, true, 0.0, 0.0), 0);
        session.reset().unwrap();
        session.step(0.0).unwrap();
        assert_eq!(session.events_delivered(), 0);
        assert_eq!(session.core().frequency(), None);
    }

    #[test]
    fn test_saves_and_states() {
        let dir = tempfile::tempdir().unwrap();
        let save = dir.path().join("game.sav");
        let state = dir.path().join("game.state");
        let mut session = SessionRunner::<ToneCore>::new(System::Gbc, Config::default()).unwrap();
        let _io = session.start(&rom(dir.path()), &save).unwrap();

        session.step(0.0).unwrap();
        session.save_state(&state).unwrap();
        session.step(1.0).unwrap();
        session.load_state(&state).unwrap();
        assert_eq!(session.core().frames(), 1);

        session.save(&save).unwrap();
        assert_eq!(session.save_count(), 1);

        std::fs::write(&state, b"bad").unwrap();
        assert!(matches!(session.load_state(&state), Err(EmuError::Core(_))));

        session.stop().unwrap();
        assert_eq!(session.save_count(), 2);
        assert!(session.save_state(&state).is_err());
    }
}
