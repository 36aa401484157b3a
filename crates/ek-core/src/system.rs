//! Emulated systems a core can declare support for

use serde::{Deserialize, Serialize};

/// Emulated system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u16)]
pub enum System {
    #[default]
    Unknown = 0,
    Gb = 1,
    Gbc = 2,
    Gba = 3,
    Nes = 4,
    Snes = 5,
}

impl System {
    /// Every system, in discriminant order
    pub const ALL: [System; 6] = [
        System::Unknown,
        System::Gb,
        System::Gbc,
        System::Gba,
        System::Nes,
        System::Snes,
    ];

    /// Width over height of the native screen
    pub fn screen_aspect_ratio(&self) -> f32 {
        match self {
            System::Gb | System::Gbc => 160.0 / 144.0,
            System::Gba => 3.0 / 2.0,
            System::Nes => 256.0 / 240.0,
            System::Snes => 8.0 / 7.0,
            System::Unknown => 1.0,
        }
    }

    pub fn from_raw(raw: u16) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

impl std::fmt::Display for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            System::Unknown => "Unknown",
            System::Gb => "Game Boy",
            System::Gbc => "Game Boy Color",
            System::Gba => "Game Boy Advance",
            System::Nes => "NES",
            System::Snes => "SNES",
        };
        f.write_str(name)
    }
}
