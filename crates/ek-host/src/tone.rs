//! Square-wave reference core
//!
//! `ToneCore` has no real hardware behind it. Player 0's face buttons pick a
//! note, the dpad shifts it by an octave, and every frame produces one
//! frame's worth of 48 kHz stereo `i16` samples. The first ROM byte sets the
//! base pitch.

use std::fs;
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use ek_audio::{AudioDescriptor, SampleFormat};
use ek_core::{CoreFeatures, System};
use ek_input::{CoreInput, InputDelta};
use thiserror::Error;

use crate::bridge::CoreBridge;
use crate::protocol::{EmulationCore, PlayerConnectionBehavior};

const SAMPLE_RATE: f64 = 48_000.0;
const FRAME_RATE: f64 = 60.0;
const CHANNELS: u8 = 2;
const AMPLITUDE: i16 = 4_000;
const MAX_PLAYERS: u8 = 2;

/// Face buttons and the semitone each one plays, lowest first
const NOTES: [(CoreInput, i32); 4] = [
    (CoreInput::FACE_BUTTON_DOWN, 0),
    (CoreInput::FACE_BUTTON_RIGHT, 2),
    (CoreInput::FACE_BUTTON_LEFT, 4),
    (CoreInput::FACE_BUTTON_UP, 5),
];

#[derive(Error, Debug)]
pub enum ToneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ROM is empty")]
    EmptyRom,

    #[error("Save state is corrupt ({0} bytes)")]
    CorruptState(usize),

    #[error("System {0} is not supported")]
    UnsupportedSystem(System),
}

/// Everything a save state captures
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct ToneState {
    frames: u64,
    /// Position within the current square wave period, `[0, 1)`
    phase: f64,
    base_pitch: f64,
}

impl ToneState {
    fn is_valid(&self) -> bool {
        (0.0..1.0).contains(&self.phase) && self.base_pitch.is_finite() && self.base_pitch > 0.0
    }
}

/// Reference core producing a square wave
pub struct ToneCore {
    system: System,
    bridge: Option<Box<dyn CoreBridge>>,
    state: ToneState,
    held: CoreInput,
    octave: i32,
    paused: bool,
    /// Fractional audio frames carried into the next video frame
    remainder: f64,
    connected: u8,
    save_path: Option<PathBuf>,
    samples: Vec<i16>,
}

impl ToneCore {
    pub fn system(&self) -> System {
        self.system
    }

    pub fn frames(&self) -> u64 {
        self.state.frames
    }

    pub fn connected_players(&self) -> u32 {
        self.connected.count_ones()
    }

    pub fn is_started(&self) -> bool {
        self.bridge.is_some()
    }

    /// Pitch currently sounding, if any
    pub fn frequency(&self) -> Option<f64> {
        let semitone = NOTES
            .iter()
            .filter(|(input, _)| self.held.contains(*input))
            .map(|(_, semitone)| *semitone)
            .last()?;
        let offset = (semitone + 12 * self.octave) as f64 / 12.0;
        Some(self.state.base_pitch * offset.exp2())
    }

    fn face_buttons() -> CoreInput {
        NOTES
            .iter()
            .fold(CoreInput::empty(), |all, (input, _)| all | *input)
    }
}

impl EmulationCore for ToneCore {
    const ID: &'static str = "dev.emukit.tone";
    const NAME: &'static str = "Tone";
    const DEVELOPER: &'static str = "emukit";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");
    const SOURCE_CODE_REPOSITORY: &'static str = "https://github.com/emukit/emukit";

    type Error = ToneError;

    fn systems() -> &'static [System] {
        &[System::Gb, System::Gbc, System::Nes]
    }

    fn features(system: System) -> CoreFeatures {
        if Self::systems().contains(&system) {
            CoreFeatures::SAVING | CoreFeatures::SAVE_STATES | CoreFeatures::SOFT_RESETTING
        } else {
            CoreFeatures::empty()
        }
    }

    fn new(system: System) -> Result<Self, ToneError> {
        if !Self::systems().contains(&system) {
            return Err(ToneError::UnsupportedSystem(system));
        }
        Ok(Self {
            system,
            bridge: None,
            state: ToneState::zeroed(),
            held: CoreInput::empty(),
            octave: 0,
            paused: true,
            remainder: 0.0,
            connected: 0,
            save_path: None,
            samples: Vec::new(),
        })
    }

    fn player_connection_behavior(&self) -> PlayerConnectionBehavior {
        PlayerConnectionBehavior::Ports
    }

    fn max_players(&self) -> u8 {
        MAX_PLAYERS
    }

    fn desired_frame_rate(&self) -> f64 {
        FRAME_RATE
    }

    fn audio_descriptor(&self) -> AudioDescriptor {
        AudioDescriptor::new(SAMPLE_RATE, SampleFormat::Int16, CHANNELS)
    }

    fn start(
        &mut self,
        rom: &Path,
        save: &Path,
        bridge: Box<dyn CoreBridge>,
    ) -> Result<(), ToneError> {
        let rom_bytes = fs::read(rom)?;
        let first = *rom_bytes.first().ok_or(ToneError::EmptyRom)?;

        self.state = ToneState {
            frames: 0,
            phase: 0.0,
            base_pitch: 220.0 + f64::from(first),
        };
        if save.exists() {
            let bytes = fs::read(save)?;
            let frames: [u8; 8] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| ToneError::CorruptState(bytes.len()))?;
            self.state.frames = u64::from_le_bytes(frames);
            tracing::debug!("Restored {} frames from {}", self.state.frames, save.display());
        }

        self.save_path = Some(save.to_path_buf());
        self.bridge = Some(bridge);
        self.samples.reserve((SAMPLE_RATE / FRAME_RATE).ceil() as usize * CHANNELS as usize);
        tracing::info!(
            "Tone core started on {} at {:.1} Hz",
            self.system,
            self.state.base_pitch
        );
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(path) = self.save_path.take() {
            if let Err(e) = self.save(&path) {
                tracing::warn!("Failed to write save to {}: {}", path.display(), e);
            }
        }
        self.bridge = None;
        self.held = CoreInput::empty();
        self.paused = true;
        tracing::info!("Tone core stopped after {} frames", self.state.frames);
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn reset(&mut self) {
        self.state.phase = 0.0;
        self.held = CoreInput::empty();
        self.octave = 0;
        self.remainder = 0.0;
        tracing::debug!("Tone core reset");
    }

    fn save(&mut self, path: &Path) -> Result<(), ToneError> {
        fs::write(path, self.state.frames.to_le_bytes())?;
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.did_save();
        }
        Ok(())
    }

    fn save_state(&self, path: &Path) -> Result<(), ToneError> {
        fs::write(path, bytemuck::bytes_of(&self.state))?;
        Ok(())
    }

    fn load_state(&mut self, path: &Path) -> Result<(), ToneError> {
        let bytes = fs::read(path)?;
        let state: ToneState = bytemuck::try_pod_read_unaligned(&bytes)
            .map_err(|_| ToneError::CorruptState(bytes.len()))?;
        if !state.is_valid() {
            return Err(ToneError::CorruptState(bytes.len()));
        }
        self.state = state;
        Ok(())
    }

    fn step(&mut self, _timestamp: f64, _will_render: bool) {
        if self.paused {
            return;
        }
        let frequency = self.frequency();
        let Some(bridge) = self.bridge.as_mut() else {
            return;
        };

        self.remainder += SAMPLE_RATE / FRAME_RATE;
        let frames = self.remainder as usize;
        self.remainder -= frames as f64;

        self.samples.clear();
        for _ in 0..frames {
            let sample = match frequency {
                Some(hz) => {
                    let level = if self.state.phase < 0.5 { AMPLITUDE } else { -AMPLITUDE };
                    self.state.phase = (self.state.phase + hz / SAMPLE_RATE).fract();
                    level
                }
                None => 0,
            };
            self.samples.extend_from_slice(&[sample; CHANNELS as usize]);
        }
        bridge.write_audio_samples(bytemuck::cast_slice(&self.samples));
        self.state.frames += 1;
    }

    fn player_connected(&mut self, port: u8) {
        if port < MAX_PLAYERS {
            self.connected |= 1 << port;
            tracing::debug!("Player connected to port {}", port);
        }
    }

    fn player_disconnected(&mut self, port: u8) {
        if port < MAX_PLAYERS {
            self.connected &= !(1 << port);
            if port == 0 {
                self.held = CoreInput::empty();
            }
            tracing::debug!("Player disconnected from port {}", port);
        }
    }

    fn write_input(&mut self, delta: InputDelta, player: u8) {
        if player != 0 {
            return;
        }
        let face = delta.input & Self::face_buttons();
        if !face.is_empty() {
            self.held.set(face, delta.is_pressed());
        }
        if delta.input.contains(CoreInput::DPAD) && delta.use_y() {
            self.octave = if delta.is_up() {
                1
            } else if delta.is_down() {
                -1
            } else {
                0
            };
        }
    }
}
