//! Core-to-host bridge
//!
//! The only channel a running core has back to its host: audio samples go
//! into the byte ring, save notifications and rejected audio are counted in
//! [`BridgeStats`] that the session keeps a handle to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ek_audio::ByteProducer;

/// Callbacks available to a core after `start`
pub trait CoreBridge: Send {
    /// Queue raw sample bytes for playback. Returns the bytes accepted.
    fn write_audio_samples(&mut self, samples: &[u8]) -> usize;

    /// The core finished writing its save file
    fn did_save(&mut self);
}

/// Counters shared between a bridge and the session that created it
#[derive(Debug, Default)]
pub struct BridgeStats {
    saves: AtomicU64,
    dropped_audio_bytes: AtomicU64,
}

impl BridgeStats {
    /// Save notifications received from the core
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }

    /// Audio bytes rejected because the ring was full
    pub fn dropped_audio_bytes(&self) -> u64 {
        self.dropped_audio_bytes.load(Ordering::Relaxed)
    }

    fn record_save(&self) {
        self.saves.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Core reported save written");
    }
}

/// Bridge feeding the producer half of the audio byte ring
#[derive(Debug)]
pub struct RingAudioBridge {
    producer: ByteProducer,
    stats: Arc<BridgeStats>,
    overrunning: bool,
}

impl RingAudioBridge {
    pub fn new(producer: ByteProducer, stats: Arc<BridgeStats>) -> Self {
        Self {
            producer,
            stats,
            overrunning: false,
        }
    }
}

impl CoreBridge for RingAudioBridge {
    fn write_audio_samples(&mut self, samples: &[u8]) -> usize {
        let written = self.producer.write(samples);
        if written == 0 && !samples.is_empty() {
            self.stats
                .dropped_audio_bytes
                .fetch_add(samples.len() as u64, Ordering::Relaxed);
            if !self.overrunning {
                self.overrunning = true;
                tracing::warn!(
                    "Audio ring full, dropping {} bytes ({} free)",
                    samples.len(),
                    self.producer.available_write()
                );
            }
        } else if self.overrunning && written > 0 {
            self.overrunning = false;
            tracing::debug!(
                "Audio ring accepting samples again, {} bytes dropped so far",
                self.stats.dropped_audio_bytes()
            );
        }
        written
    }

    fn did_save(&mut self) {
        self.stats.record_save();
    }
}

/// Bridge used when audio output is disabled
#[derive(Debug)]
pub struct NullBridge {
    stats: Arc<BridgeStats>,
}

impl NullBridge {
    pub fn new(stats: Arc<BridgeStats>) -> Self {
        Self { stats }
    }
}

impl CoreBridge for NullBridge {
    /// Accepts and discards everything
    fn write_audio_samples(&mut self, samples: &[u8]) -> usize {
        samples.len()
    }

    fn did_save(&mut self) {
        self.stats.record_save();
    }
}
