//! Emulation core protocol
//!
//! A core is created for one [`System`], started with a ROM and a save path,
//! and then stepped once per video frame by the session runner. It talks
//! back to the host only through the [`CoreBridge`] it receives in `start`.

use std::path::Path;

use ek_audio::AudioDescriptor;
use ek_core::{CoreFeatures, System};
use ek_input::InputDelta;

use crate::bridge::CoreBridge;

/// How players are assigned to ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PlayerConnectionBehavior {
    /// Players take any free port and keep it when others leave
    Ports = 0,
    /// Players fill ports in order; a disconnect shifts later players down
    Linear = 1,
}

/// An emulation core driven by a [`SessionRunner`](crate::SessionRunner)
pub trait EmulationCore: Sized {
    /// Unique identifier, e.g. a reverse-domain bundle id
    const ID: &'static str;
    const NAME: &'static str;
    const DEVELOPER: &'static str;
    const VERSION: &'static str;
    const SOURCE_CODE_REPOSITORY: &'static str;

    type Error: std::error::Error + Send + Sync + 'static;

    /// Systems this core can emulate
    fn systems() -> &'static [System];

    /// Features available when emulating `system`
    fn features(system: System) -> CoreFeatures;

    /// Set up for `system`. No game is loaded yet.
    fn new(system: System) -> Result<Self, Self::Error>;

    /// Read before the game starts
    fn player_connection_behavior(&self) -> PlayerConnectionBehavior;

    /// Read before the game starts
    fn max_players(&self) -> u8;

    /// Frames per second the loaded game wants
    fn desired_frame_rate(&self) -> f64;

    /// Format of the bytes passed to [`CoreBridge::write_audio_samples`]
    fn audio_descriptor(&self) -> AudioDescriptor;

    /// Load the game. `save` may not exist yet; the core writes it there.
    fn start(
        &mut self,
        rom: &Path,
        save: &Path,
        bridge: Box<dyn CoreBridge>,
    ) -> Result<(), Self::Error>;

    /// Unload the game
    fn stop(&mut self);

    fn play(&mut self);

    fn pause(&mut self);

    /// Soft reset
    fn reset(&mut self);

    /// Write the battery save to `path`
    fn save(&mut self, path: &Path) -> Result<(), Self::Error>;

    fn save_state(&self, path: &Path) -> Result<(), Self::Error>;

    fn load_state(&mut self, path: &Path) -> Result<(), Self::Error>;

    /// Emulate one video frame
    fn step(&mut self, timestamp: f64, will_render: bool);

    fn player_connected(&mut self, port: u8);

    /// With [`PlayerConnectionBehavior::Linear`] `port` is always the last player
    fn player_disconnected(&mut self, port: u8);

    fn write_input(&mut self, delta: InputDelta, player: u8);
}
