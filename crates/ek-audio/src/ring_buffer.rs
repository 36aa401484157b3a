//! Byte ring buffer for audio samples
//!
//! A `ByteRingBuffer` can be used directly from one thread, or split into a
//! [`ByteProducer`] for the emulation thread and a [`ByteConsumer`] for the
//! audio device callback. Neither half is `Clone` and every transfer takes
//! `&mut self`, so there is always exactly one writer and one reader.
//!
//! Transfers are all-or-nothing: a read or write either moves the whole
//! slice or returns 0 without touching the ring.

use std::sync::Arc;
use std::time::Duration;

use ek_core::{RingError, SpscRing};

use crate::descriptor::AudioDescriptor;

/// Fixed-capacity circular buffer of raw bytes
#[derive(Debug)]
pub struct ByteRingBuffer {
    ring: Arc<SpscRing<u8>>,
}

impl ByteRingBuffer {
    /// Create a buffer holding up to `capacity` bytes
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        let ring = SpscRing::new(capacity, 0u8)?;
        tracing::debug!("Byte ring created with capacity {} bytes", capacity);
        Ok(Self { ring: Arc::new(ring) })
    }

    /// Create a buffer sized for `duration` of audio in the given format
    pub fn for_descriptor(
        descriptor: &AudioDescriptor,
        duration: Duration,
    ) -> Result<Self, RingError> {
        Self::new(descriptor.ring_capacity(duration)?)
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Bytes currently readable
    pub fn available_read(&self) -> usize {
        self.ring.available_read()
    }

    /// Bytes currently writable
    pub fn available_write(&self) -> usize {
        self.ring.available_write()
    }

    /// Fill `dst` completely, or read nothing. Returns the bytes moved.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        // SAFETY: `&mut self` on the unsplit buffer excludes every other
        // producer and consumer.
        unsafe { self.ring.pop_slice(dst) }
    }

    /// Write all of `src`, or nothing. Returns the bytes moved.
    pub fn write(&mut self, src: &[u8]) -> usize {
        // SAFETY: see `read`.
        unsafe { self.ring.push_slice(src) }
    }

    /// Discard all readable bytes and rewind to the start of storage
    pub fn clear(&mut self) {
        // SAFETY: see `read`.
        unsafe { self.ring.reset() };
        tracing::debug!("Byte ring cleared");
    }

    /// Split into a producer and a consumer half
    pub fn split(self) -> (ByteProducer, ByteConsumer) {
        let producer = ByteProducer {
            ring: Arc::clone(&self.ring),
        };
        let consumer = ByteConsumer { ring: self.ring };
        (producer, consumer)
    }

    /// Join two halves of the same buffer back together.
    ///
    /// Halves of different buffers are dropped and `ForeignHalf` is returned.
    pub fn reunite(producer: ByteProducer, consumer: ByteConsumer) -> Result<Self, RingError> {
        if !Arc::ptr_eq(&producer.ring, &consumer.ring) {
            return Err(RingError::ForeignHalf);
        }
        drop(producer);
        Ok(Self {
            ring: consumer.ring,
        })
    }
}

/// Writing half of a [`ByteRingBuffer`]
#[derive(Debug)]
pub struct ByteProducer {
    ring: Arc<SpscRing<u8>>,
}

impl ByteProducer {
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn available_read(&self) -> usize {
        self.ring.available_read()
    }

    pub fn available_write(&self) -> usize {
        self.ring.available_write()
    }

    /// Write all of `src`, or nothing. Returns the bytes moved.
    pub fn write(&mut self, src: &[u8]) -> usize {
        // SAFETY: this is the only producer handle of the ring, and
        // `&mut self` keeps it on one thread for the call.
        unsafe { self.ring.push_slice(src) }
    }
}

/// Reading half of a [`ByteRingBuffer`]
#[derive(Debug)]
pub struct ByteConsumer {
    ring: Arc<SpscRing<u8>>,
}

impl ByteConsumer {
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn available_read(&self) -> usize {
        self.ring.available_read()
    }

    pub fn available_write(&self) -> usize {
        self.ring.available_write()
    }

    /// Fill `dst` completely, or read nothing. Returns the bytes moved.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        // SAFETY: this is the only consumer handle of the ring, and
        // `&mut self` keeps it on one thread for the call.
        unsafe { self.ring.pop_slice(dst) }
    }

    /// Reset the ring through both halves.
    ///
    /// Holding both halves mutably proves neither side is mid-transfer.
    pub fn clear(&mut self, producer: &mut ByteProducer) -> Result<(), RingError> {
        if !Arc::ptr_eq(&self.ring, &producer.ring) {
            return Err(RingError::ForeignHalf);
        }
        // SAFETY: both halves are exclusively borrowed.
        unsafe { self.ring.reset() };
        tracing::debug!("Byte ring cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SampleFormat;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(ByteRingBuffer::new(0).unwrap_err(), RingError::ZeroCapacity);
    }

    #[test]
    fn test_descriptor_sizing() {
        let stereo = AudioDescriptor::new(48_000.0, SampleFormat::Int16, 2);
        let buffer = ByteRingBuffer::for_descriptor(&stereo, Duration::from_millis(10)).unwrap();
        assert_eq!(buffer.capacity(), 480 * 4);

        let broken = AudioDescriptor::new(f64::INFINITY, SampleFormat::Int16, 2);
        assert!(matches!(
            ByteRingBuffer::for_descriptor(&broken, Duration::from_millis(100)),
            Err(RingError::CapacityOverflow(_))
        ));
    }

    #[test]
    fn test_fresh_buffer_reads_nothing() {
        let mut buffer = ByteRingBuffer::new(32).unwrap();
        assert_eq!(buffer.available_read(), 0);
        assert_eq!(buffer.available_write(), 32);

        let mut dst = [0xAAu8; 4];
        assert_eq!(buffer.read(&mut dst), 0);
        assert_eq!(dst, [0xAA; 4]);
        assert_eq!(buffer.available_read(), 0);
        assert_eq!(buffer.available_write(), 32);
    }

    #[test]
    fn test_wraparound_sequence() {
        let mut buffer = ByteRingBuffer::new(8).unwrap();

        assert_eq!(buffer.write(b"ABCDE"), 5);
        assert_eq!(buffer.available_write(), 3);

        let mut first = [0u8; 3];
        assert_eq!(buffer.read(&mut first), 3);
        assert_eq!(&first, b"ABC");
        assert_eq!(buffer.available_write(), 6);

        assert_eq!(buffer.write(b"FGHIJK"), 6);
        assert_eq!(buffer.available_read(), 8);
        assert_eq!(buffer.available_write(), 0);

        let mut rest = [0u8; 8];
        assert_eq!(buffer.read(&mut rest), 8);
        assert_eq!(&rest, b"DEFGHIJK");
        assert_eq!(buffer.available_read(), 0);
    }

    #[test]
    fn test_oversize_transfers_change_nothing() {
        let mut buffer = ByteRingBuffer::new(8).unwrap();
        assert_eq!(buffer.write(b"0123456789"), 0);
        assert_eq!(buffer.available_read(), 0);

        assert_eq!(buffer.write(b"0123"), 4);
        assert_eq!(buffer.write(b"45678"), 0);
        assert_eq!(buffer.available_read(), 4);
        assert_eq!(buffer.available_write(), 4);

        let mut dst = [0u8; 5];
        assert_eq!(buffer.read(&mut dst), 0);
        assert_eq!(dst, [0; 5]);
        assert_eq!(buffer.available_read(), 4);

        let mut dst = [0u8; 4];
        assert_eq!(buffer.read(&mut dst), 4);
        assert_eq!(&dst, b"0123");
    }

    #[test]
    fn test_clear() {
        let mut buffer = ByteRingBuffer::new(8).unwrap();
        buffer.write(b"ABCDEF");
        let mut dst = [0u8; 2];
        buffer.read(&mut dst);

        buffer.clear();
        assert_eq!(buffer.available_read(), 0);
        assert_eq!(buffer.available_write(), 8);

        assert_eq!(buffer.write(b"XYZ"), 3);
        let mut dst = [0u8; 3];
        assert_eq!(buffer.read(&mut dst), 3);
        assert_eq!(&dst, b"XYZ");
    }

    #[test]
    fn test_split_halves() {
        let buffer = ByteRingBuffer::new(4).unwrap();
        let (mut producer, mut consumer) = buffer.split();

        assert_eq!(producer.write(&[1, 2, 3]), 3);
        assert_eq!(consumer.available_read(), 3);
        assert_eq!(producer.available_write(), 1);

        let mut dst = [0u8; 2];
        assert_eq!(consumer.read(&mut dst), 2);
        assert_eq!(dst, [1, 2]);

        consumer.clear(&mut producer).unwrap();
        assert_eq!(producer.available_read(), 0);
        assert_eq!(consumer.available_write(), 4);

        let buffer = ByteRingBuffer::reunite(producer, consumer).unwrap();
        assert_eq!(buffer.capacity(), 4);
    }

    #[test]
    fn test_foreign_halves_rejected() {
        let (mut producer_a, consumer_a) = ByteRingBuffer::new(4).unwrap().split();
        let (producer_b, mut consumer_b) = ByteRingBuffer::new(4).unwrap().split();

        producer_a.write(&[9]);
        assert_eq!(
            consumer_b.clear(&mut producer_a).unwrap_err(),
            RingError::ForeignHalf
        );
        assert_eq!(consumer_a.available_read(), 1);

        assert_eq!(
            ByteRingBuffer::reunite(producer_b, consumer_a).unwrap_err(),
            RingError::ForeignHalf
        );
    }
}
