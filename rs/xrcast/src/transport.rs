use std::sync::Arc;

use xrcast_wire::Shard;

use crate::ClockOffset;

#[derive(Debug, thiserror::Error, Clone)]
pub enum TransportError {
	#[error("closed")]
	Closed,

	#[error("io error: {0}")]
	Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for TransportError {
	fn from(err: std::io::Error) -> Self {
		TransportError::Io(Arc::new(err))
	}
}

/// The session that delivers shards to the receiver.
///
/// Delivery is best-effort: a failed [Transport::send_stream] loses that shard and nothing else.
pub trait Transport: Send + Sync {
	/// Send one shard, synchronously.
	fn send_stream(&self, shard: &Shard) -> Result<(), TransportError>;

	/// Record a diagnostic timing event, in the local clock domain.
	fn dump_time(&self, _event: &str, _frame: u64, _timestamp: i64, _stream: u8, _extra: &str) {}

	/// The current translation to the receiver's clock domain.
	fn clock_offset(&self) -> ClockOffset;
}
