use std::net::{SocketAddr, UdpSocket};

use anyhow::Context;
use xrcast::wire::Shard;
use xrcast::wire::coding::Encode;
use xrcast::{ClockOffset, Transport, TransportError};

/// Sends each shard as one datagram.
pub struct UdpTransport {
	socket: UdpSocket,
	destination: SocketAddr,
}

impl UdpTransport {
	pub fn bind(bind: SocketAddr, destination: SocketAddr) -> anyhow::Result<Self> {
		let socket = UdpSocket::bind(bind).with_context(|| format!("failed to bind {bind}"))?;
		tracing::info!(local = %socket.local_addr()?, %destination, "sending shards");

		Ok(Self { socket, destination })
	}
}

impl Transport for UdpTransport {
	fn send_stream(&self, shard: &Shard) -> Result<(), TransportError> {
		let datagram = shard.encode_bytes();
		self.socket.send_to(&datagram, self.destination)?;
		Ok(())
	}

	fn dump_time(&self, event: &str, frame: u64, timestamp: i64, stream: u8, extra: &str) {
		tracing::trace!(event, frame, timestamp, stream, extra, "timing");
	}

	// No clock synchronization with the receiver.
	fn clock_offset(&self) -> ClockOffset {
		ClockOffset::default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::time::Duration;

	use bytes::Bytes;
	use xrcast::wire::coding::Decode;
	use xrcast::wire::{ShardFlags, ViewInfo};

	#[test]
	fn test_datagram() {
		let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
		receiver.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

		let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), receiver.local_addr().unwrap()).unwrap();

		let shard = Shard {
			stream_index: 1,
			frame_idx: 42,
			shard_idx: 0,
			flags: ShardFlags::START_OF_SLICE,
			view_info: Some(ViewInfo::default()),
			timing_info: None,
			payload: Bytes::from_static(b"slice"),
		};
		transport.send_stream(&shard).unwrap();

		let mut buf = [0u8; 2048];
		let size = receiver.recv(&mut buf).unwrap();
		let decoded = Shard::decode(&mut &buf[..size]).unwrap();
		assert_eq!(decoded, shard);
	}
}
