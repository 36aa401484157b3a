//! Optional capabilities a core advertises per system

use bitflags::bitflags;

bitflags! {
    /// Features a core supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CoreFeatures: u8 {
        /// Battery saves
        const SAVING         = 1 << 1;
        const CHEATS         = 1 << 2;
        const SAVE_STATES    = 1 << 3;
        const SOFT_RESETTING = 1 << 4;
        const HARD_RESETTING = 1 << 5;
    }
}
