//! Audio format description
//!
//! A core reports the format of the samples it writes so the host can size
//! the byte ring and configure the output device.

use std::time::Duration;

use ek_core::RingError;

/// PCM sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SampleFormat {
    Int16 = 0,
    Int32 = 1,
    Float32 = 2,
    Float64 = 3,
}

impl SampleFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::Int16 => 2,
            SampleFormat::Int32 | SampleFormat::Float32 => 4,
            SampleFormat::Float64 => 8,
        }
    }
}

/// Format of the samples a core produces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioDescriptor {
    /// Frames per second
    pub sample_rate: f64,
    pub sample_format: SampleFormat,
    pub channel_count: u8,
    /// Channels interleaved within each frame
    pub interleaved: bool,
}

impl AudioDescriptor {
    pub fn new(sample_rate: f64, sample_format: SampleFormat, channel_count: u8) -> Self {
        Self {
            sample_rate,
            sample_format,
            channel_count,
            interleaved: true,
        }
    }

    /// Bytes in one frame (one sample for every channel)
    pub fn bytes_per_frame(&self) -> usize {
        self.sample_format.bytes_per_sample() * self.channel_count as usize
    }

    /// Byte capacity holding `duration` of audio, rounded up to whole frames.
    ///
    /// Never less than one frame. Fails when the byte count does not fit in
    /// `usize` or the sample rate is not finite.
    pub fn ring_capacity(&self, duration: Duration) -> Result<usize, RingError> {
        let frames = (self.sample_rate * duration.as_secs_f64()).ceil();
        if frames.is_nan() || frames >= usize::MAX as f64 {
            return Err(RingError::CapacityOverflow(usize::MAX));
        }
        (frames as usize)
            .max(1)
            .checked_mul(self.bytes_per_frame().max(1))
            .ok_or(RingError::CapacityOverflow(usize::MAX))
    }
}
