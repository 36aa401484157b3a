//! Audio renderer
//!
//! Consumer side of the audio transport, driven by the platform's device
//! callback. Each callback asks for an exact number of bytes; the renderer
//! either delivers all of them from the ring or outputs silence.

use crate::ring_buffer::ByteConsumer;

/// Serves device callbacks from a [`ByteConsumer`]
#[derive(Debug)]
pub struct AudioRenderer {
    consumer: ByteConsumer,
    /// Callbacks served from the ring
    callbacks: u64,
    /// Callbacks that fell back to silence
    underruns: u64,
}

impl AudioRenderer {
    pub fn new(consumer: ByteConsumer) -> Self {
        Self {
            consumer,
            callbacks: 0,
            underruns: 0,
        }
    }

    /// Fill `out` from the ring. On underrun `out` is zeroed and false returned.
    pub fn render(&mut self, out: &mut [u8]) -> bool {
        if self.consumer.read(out) == out.len() {
            self.callbacks += 1;
            return true;
        }

        out.fill(0);
        self.underruns += 1;
        tracing::trace!(
            "Audio underrun: wanted {} bytes, {} available",
            out.len(),
            self.consumer.available_read()
        );
        false
    }

    /// Typed variant of [`Self::render`] for callbacks that hand out sample slices
    pub fn render_samples<T: bytemuck::Pod>(&mut self, out: &mut [T]) -> bool {
        self.render(bytemuck::cast_slice_mut(out))
    }

    /// Bytes waiting to be rendered
    pub fn queued_bytes(&self) -> usize {
        self.consumer.available_read()
    }

    pub fn callbacks(&self) -> u64 {
        self.callbacks
    }

    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    pub fn consumer_mut(&mut self) -> &mut ByteConsumer {
        &mut self.consumer
    }

    pub fn into_consumer(self) -> ByteConsumer {
        self.consumer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_buffer::ByteRingBuffer;

    #[test]
    fn test_render_full_request() {
        let (mut producer, consumer) = ByteRingBuffer::new(16).unwrap().split();
        let mut renderer = AudioRenderer::new(consumer);

        producer.write(&[1, 2, 3, 4, 5, 6]);
        let mut out = [0u8; 4];
        assert!(renderer.render(&mut out));
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(renderer.queued_bytes(), 2);
        assert_eq!(renderer.callbacks(), 1);
        assert_eq!(renderer.underruns(), 0);
    }

    #[test]
    fn test_underrun_outputs_silence() {
        let (mut producer, consumer) = ByteRingBuffer::new(16).unwrap().split();
        let mut renderer = AudioRenderer::new(consumer);

        producer.write(&[7, 7]);
        let mut out = [0xFFu8; 4];
        assert!(!renderer.render(&mut out));
        assert_eq!(out, [0; 4]);
        assert_eq!(renderer.underruns(), 1);
        // The short backlog stays queued for the next callback
        assert_eq!(renderer.queued_bytes(), 2);
    }

    #[test]
    fn test_render_samples() {
        let (mut producer, consumer) = ByteRingBuffer::new(64).unwrap().split();
        let mut renderer = AudioRenderer::new(consumer);

        let samples: [i16; 4] = [100, -100, 2000, -2000];
        producer.write(bytemuck::cast_slice(&samples));

        let mut out = [0i16; 4];
        assert!(renderer.render_samples(&mut out));
        assert_eq!(out, samples);
    }
}
