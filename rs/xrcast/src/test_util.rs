use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use xrcast_wire::Shard;

use crate::{ClockOffset, Transport, TransportError};

/// A transport that keeps everything it was asked to send.
#[derive(Default, Clone)]
pub struct Recorder {
	inner: Arc<Mutex<RecorderState>>,
}

#[derive(Default)]
struct RecorderState {
	shards: Vec<Shard>,
	events: Vec<String>,
	fail: HashSet<u32>,
	attempts: usize,
}

impl Recorder {
	/// Fail the shards with these indices, in every frame.
	pub fn fail_shards(&self, indices: impl IntoIterator<Item = u32>) {
		self.inner.lock().fail.extend(indices);
	}

	/// The shards that were sent successfully.
	pub fn shards(&self) -> Vec<Shard> {
		self.inner.lock().shards.clone()
	}

	pub fn events(&self) -> Vec<String> {
		self.inner.lock().events.clone()
	}

	pub fn attempts(&self) -> usize {
		self.inner.lock().attempts
	}
}

impl Transport for Recorder {
	fn send_stream(&self, shard: &Shard) -> Result<(), TransportError> {
		let mut state = self.inner.lock();
		state.attempts += 1;
		if state.fail.contains(&shard.shard_idx) {
			return Err(TransportError::Closed);
		}
		state.shards.push(shard.clone());
		Ok(())
	}

	fn dump_time(&self, event: &str, _frame: u64, _timestamp: i64, _stream: u8, _extra: &str) {
		self.inner.lock().events.push(event.to_string());
	}

	fn clock_offset(&self) -> ClockOffset {
		ClockOffset::default()
	}
}

/// A [Write] sink that can be inspected after it was handed out.
#[derive(Default, Clone)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
	pub fn contents(&self) -> Vec<u8> {
		self.0.lock().clone()
	}
}

impl Write for SharedBuf {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.0.lock().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}
