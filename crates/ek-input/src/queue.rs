//! Input event queue
//!
//! Fixed-capacity SPSC queue of [`InputEvent`] records. The producer never
//! blocks: when the queue is full the newest event is dropped. The consumer
//! drains a snapshot, so one `dequeue` call does a bounded amount of work no
//! matter how fast the producer keeps enqueueing.

use std::sync::Arc;

use ek_core::{RingError, SpscRing};

use crate::input::InputDelta;

/// Slots reserved per player by [`EventRingQueue::for_players`]
pub const SLOTS_PER_PLAYER: usize = 64;

/// One queued input delta and the player it belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub player: u8,
    pub delta: InputDelta,
}

impl InputEvent {
    /// Storage filler. Never delivered to a consumer.
    pub const EMPTY: Self = Self {
        player: u8::MAX,
        delta: InputDelta::ZERO,
    };
}

/// Fixed-capacity circular queue of input events
#[derive(Debug)]
pub struct EventRingQueue {
    ring: Arc<SpscRing<InputEvent>>,
    dropped: u64,
}

impl EventRingQueue {
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        let ring = SpscRing::new(capacity, InputEvent::EMPTY)?;
        tracing::debug!("Input queue created with {} slots", capacity);
        Ok(Self {
            ring: Arc::new(ring),
            dropped: 0,
        })
    }

    /// Queue with [`SLOTS_PER_PLAYER`] slots for each of `max_players`
    pub fn for_players(max_players: u8) -> Result<Self, RingError> {
        Self::with_slots_per_player(max_players, SLOTS_PER_PLAYER)
    }

    pub fn with_slots_per_player(max_players: u8, slots: usize) -> Result<Self, RingError> {
        let capacity = (max_players as usize)
            .checked_mul(slots)
            .ok_or(RingError::CapacityOverflow(usize::MAX))?;
        Self::new(capacity)
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn available_read(&self) -> usize {
        self.ring.available_read()
    }

    pub fn available_write(&self) -> usize {
        self.ring.available_write()
    }

    /// Queue `delta` for `player`, dropping it if the queue is full
    pub fn enqueue(&mut self, delta: InputDelta, player: u8) {
        // SAFETY: `&mut self` on the unsplit queue excludes every other
        // producer and consumer.
        let queued = unsafe { self.ring.push(InputEvent { player, delta }) };
        if !queued {
            record_drop(&mut self.dropped, player);
        }
    }

    /// Deliver the events queued at entry to `sink`, oldest first.
    ///
    /// Returns the number of events delivered.
    pub fn dequeue<F>(&mut self, mut sink: F) -> usize
    where
        F: FnMut(InputDelta, u8),
    {
        // SAFETY: see `enqueue`.
        unsafe { self.ring.drain(|event| sink(event.delta, event.player)) }
    }

    /// Events dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Discard all queued events
    pub fn clear(&mut self) {
        // SAFETY: see `enqueue`.
        unsafe { self.ring.reset() };
        tracing::debug!("Input queue cleared");
    }

    /// Split into a producer and a consumer half
    pub fn split(self) -> (EventProducer, EventConsumer) {
        let producer = EventProducer {
            ring: Arc::clone(&self.ring),
            dropped: self.dropped,
        };
        let consumer = EventConsumer { ring: self.ring };
        (producer, consumer)
    }

    /// Join two halves of the same queue back together.
    ///
    /// Halves of different queues are dropped and `ForeignHalf` is returned.
    pub fn reunite(producer: EventProducer, consumer: EventConsumer) -> Result<Self, RingError> {
        if !Arc::ptr_eq(&producer.ring, &consumer.ring) {
            return Err(RingError::ForeignHalf);
        }
        Ok(Self {
            ring: consumer.ring,
            dropped: producer.dropped,
        })
    }
}

fn record_drop(dropped: &mut u64, player: u8) {
    *dropped += 1;
    tracing::trace!("Input queue full, dropped event for player {}", player);
}

/// Enqueueing half of an [`EventRingQueue`]
#[derive(Debug)]
pub struct EventProducer {
    ring: Arc<SpscRing<InputEvent>>,
    dropped: u64,
}

impl EventProducer {
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn available_read(&self) -> usize {
        self.ring.available_read()
    }

    pub fn available_write(&self) -> usize {
        self.ring.available_write()
    }

    /// Queue `delta` for `player`, dropping it if the queue is full
    pub fn enqueue(&mut self, delta: InputDelta, player: u8) {
        // SAFETY: this is the only producer handle of the ring, and
        // `&mut self` keeps it on one thread for the call.
        let queued = unsafe { self.ring.push(InputEvent { player, delta }) };
        if !queued {
            record_drop(&mut self.dropped, player);
        }
    }

    /// Events dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Dequeueing half of an [`EventRingQueue`]
#[derive(Debug)]
pub struct EventConsumer {
    ring: Arc<SpscRing<InputEvent>>,
}

impl EventConsumer {
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn available_read(&self) -> usize {
        self.ring.available_read()
    }

    pub fn available_write(&self) -> usize {
        self.ring.available_write()
    }

    /// Deliver the events queued at entry to `sink`, oldest first.
    ///
    /// Events the producer adds while `sink` runs are left for the next call.
    /// Returns the number of events delivered.
    pub fn dequeue<F>(&mut self, mut sink: F) -> usize
    where
        F: FnMut(InputDelta, u8),
    {
        // SAFETY: this is the only consumer handle of the ring, and
        // `&mut self` keeps it on one thread for the call.
        unsafe { self.ring.drain(|event| sink(event.delta, event.player)) }
    }

    /// Reset the queue through both halves.
    pub fn clear(&mut self, producer: &mut EventProducer) -> Result<(), RingError> {
        if !Arc::ptr_eq(&self.ring, &producer.ring) {
            return Err(RingError::ForeignHalf);
        }
        // SAFETY: both halves are exclusively borrowed.
        unsafe { self.ring.reset() };
        tracing::debug!("Input queue cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::CoreInput;

    fn delta(id: u32) -> InputDelta {
        InputDelta::new(CoreInput::FACE_BUTTON_DOWN, 1.0, 0.0, id as f64)
    }

    fn collect(consumer: &mut EventConsumer) -> Vec<(u8, f64)> {
        let mut out = Vec::new();
        consumer.dequeue(|delta, player| out.push((player, delta.timestamp)));
        out
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(EventRingQueue::for_players(4).unwrap().capacity(), 256);
        assert_eq!(
            EventRingQueue::for_players(0).unwrap_err(),
            RingError::ZeroCapacity
        );
        assert_eq!(
            EventRingQueue::with_slots_per_player(2, 3).unwrap().capacity(),
            6
        );
    }

    #[test]
    fn test_oversized_queue_rejected() {
        let capacity = usize::MAX / 4;
        assert_eq!(
            EventRingQueue::new(capacity).unwrap_err(),
            RingError::CapacityOverflow(capacity)
        );
        assert!(matches!(
            EventRingQueue::with_slots_per_player(u8::MAX, usize::MAX / 8),
            Err(RingError::CapacityOverflow(_))
        ));
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = EventRingQueue::new(8).unwrap();
        queue.enqueue(delta(1), 0);
        queue.enqueue(delta(2), 1);
        queue.enqueue(delta(3), 0);

        let mut seen = Vec::new();
        let delivered = queue.dequeue(|delta, player| seen.push((player, delta.timestamp)));
        assert_eq!(delivered, 3);
        assert_eq!(seen, vec![(0, 1.0), (1, 2.0), (0, 3.0)]);
        assert_eq!(queue.available_read(), 0);
    }

    #[test]
    fn test_drop_newest_when_full() {
        let mut queue = EventRingQueue::new(2).unwrap();
        queue.enqueue(delta(1), 0);
        queue.enqueue(delta(2), 0);
        queue.enqueue(delta(3), 0);
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.available_read(), 2);

        let mut seen = Vec::new();
        queue.dequeue(|delta, _| seen.push(delta.timestamp));
        assert_eq!(seen, vec![1.0, 2.0]);
    }

    #[test]
    fn test_dequeue_is_a_snapshot() {
        let (mut producer, mut consumer) = EventRingQueue::new(4).unwrap().split();
        producer.enqueue(delta(1), 0);
        producer.enqueue(delta(2), 0);

        let mut seen = Vec::new();
        let delivered = consumer.dequeue(|d, _| {
            seen.push(d.timestamp);
            if d.timestamp == 1.0 {
                producer.enqueue(delta(3), 0);
            }
        });
        assert_eq!(delivered, 2);
        assert_eq!(seen, vec![1.0, 2.0]);
        assert_eq!(consumer.available_read(), 1);

        assert_eq!(collect(&mut consumer), vec![(0, 3.0)]);
    }

    #[test]
    fn test_sink_reuses_freed_slots_when_full() {
        // Full queue: each delivered event frees its slot before the sink runs.
        let (mut producer, mut consumer) = EventRingQueue::new(2).unwrap().split();
        producer.enqueue(delta(1), 0);
        producer.enqueue(delta(2), 0);

        let mut seen = Vec::new();
        consumer.dequeue(|d, _| {
            seen.push(d.timestamp);
            producer.enqueue(delta(d.timestamp as u32 + 10), 0);
        });
        assert_eq!(seen, vec![1.0, 2.0]);
        assert_eq!(producer.dropped(), 0);
        assert_eq!(collect(&mut consumer), vec![(0, 11.0), (0, 12.0)]);
    }

    #[test]
    fn test_sentinel_never_delivered() {
        let (mut producer, mut consumer) = EventRingQueue::new(1).unwrap().split();

        // Nothing queued yet: storage holds only the sentinel.
        assert!(collect(&mut consumer).is_empty());

        for round in 0..50u32 {
            producer.enqueue(delta(round), (round % 4) as u8);
            producer.enqueue(delta(round + 1000), 0);

            let events = collect(&mut consumer);
            assert_eq!(events, vec![((round % 4) as u8, round as f64)]);
            assert!(events.iter().all(|(player, _)| *player != InputEvent::EMPTY.player));
            assert!(collect(&mut consumer).is_empty());
        }
        assert_eq!(producer.dropped(), 50);
    }

    #[test]
    fn test_clear_and_reunite() {
        let queue = EventRingQueue::new(4).unwrap();
        let (mut producer, mut consumer) = queue.split();
        producer.enqueue(delta(1), 0);
        producer.enqueue(delta(2), 0);

        consumer.clear(&mut producer).unwrap();
        assert_eq!(consumer.available_read(), 0);
        assert!(collect(&mut consumer).is_empty());

        let mut queue = EventRingQueue::reunite(producer, consumer).unwrap();
        queue.enqueue(delta(5), 2);
        queue.clear();
        assert_eq!(queue.dequeue(|_, _| panic!("cleared queue delivered an event")), 0);
    }

    #[test]
    fn test_dropped_count_survives_split() {
        let mut queue = EventRingQueue::new(1).unwrap();
        queue.enqueue(delta(1), 0);
        queue.enqueue(delta(2), 0);

        let (mut producer, consumer) = queue.split();
        assert_eq!(producer.dropped(), 1);
        producer.enqueue(delta(3), 0);

        let queue = EventRingQueue::reunite(producer, consumer).unwrap();
        assert_eq!(queue.dropped(), 2);
    }
}
