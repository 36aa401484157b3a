//! Audio transport for emukit
//!
//! Moves raw sample bytes from the emulation thread to the audio device
//! thread through a lock-free byte ring.

pub mod descriptor;
pub mod renderer;
pub mod ring_buffer;

pub use descriptor::{AudioDescriptor, SampleFormat};
pub use renderer::AudioRenderer;
pub use ring_buffer::{ByteConsumer, ByteProducer, ByteRingBuffer};
