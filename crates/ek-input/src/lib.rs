//! Input transport for emukit
//!
//! Moves player input deltas from the thread that captures them to the
//! emulation thread through a lock-free event queue.

pub mod input;
pub mod queue;

pub use input::{CoreInput, InputDelta};
pub use queue::{EventConsumer, EventProducer, EventRingQueue, InputEvent, SLOTS_PER_PLAYER};
