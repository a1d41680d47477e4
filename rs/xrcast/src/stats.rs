//! Per-stream transmission accounting.
//!
//! Shard send failures never surface as errors, so this is the only place they are visible.

use std::sync::atomic::{AtomicU64, Ordering};

/// A sink for shard accounting.
///
/// Implementations should be fast and non-blocking (e.g., atomics).
pub trait Stats: Send + Sync + 'static {
	/// Record a shard handed to the transport, with its payload size.
	fn add_tx_shard(&self, bytes: u64);

	/// Record a shard the transport failed to send.
	fn add_lost_shard(&self);

	/// Record a completed frame.
	fn add_tx_frame(&self) {}
}

/// Default stats sink that does nothing.
#[derive(Default)]
pub struct NoopStats;

impl Stats for NoopStats {
	fn add_tx_shard(&self, _bytes: u64) {}
	fn add_lost_shard(&self) {}
}

/// Plain counters, readable at any time.
#[derive(Default, Debug)]
pub struct Counters {
	pub shards: AtomicU64,
	pub lost: AtomicU64,
	pub bytes: AtomicU64,
	pub frames: AtomicU64,
}

impl Counters {
	pub fn snapshot(&self) -> CountersSnapshot {
		CountersSnapshot {
			shards: self.shards.load(Ordering::Relaxed),
			lost: self.lost.load(Ordering::Relaxed),
			bytes: self.bytes.load(Ordering::Relaxed),
			frames: self.frames.load(Ordering::Relaxed),
		}
	}
}

impl Stats for Counters {
	fn add_tx_shard(&self, bytes: u64) {
		self.shards.fetch_add(1, Ordering::Relaxed);
		self.bytes.fetch_add(bytes, Ordering::Relaxed);
	}

	fn add_lost_shard(&self) {
		self.lost.fetch_add(1, Ordering::Relaxed);
	}

	fn add_tx_frame(&self) {
		self.frames.fetch_add(1, Ordering::Relaxed);
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
	pub shards: u64,
	pub lost: u64,
	pub bytes: u64,
	pub frames: u64,
}
