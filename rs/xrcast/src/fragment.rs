use std::io::Write;
use std::ops::RangeInclusive;
use std::sync::Arc;

use bytes::Bytes;
use xrcast_wire::{Shard, ShardFlags, TimingInfo, ViewInfo};

use crate::{ClockOffset, NoopStats, Stats, Transport, clock};

/// The shard payload budgets a stream can be configured with.
///
/// The first shard of a frame carries the [ViewInfo], and a receiver rejects payloads over [Shard::MAX_PAYLOAD].
pub const PAYLOAD_RANGE: RangeInclusive<usize> = (ViewInfo::ENCODED_LEN + 1)..=Shard::MAX_PAYLOAD;

/// Splits the encoded output of a frame into [Shard]s and hands them to the [Transport].
///
/// The fragmenter owns the shard template of its stream: [Fragmenter::begin_frame] resets it, then
/// every [Fragmenter::write] of the frame continues the shard numbering where the previous one stopped.
pub struct Fragmenter {
	stream_index: u8,
	max_payload: usize,

	// The template for the next shard.
	frame_idx: u64,
	shard_idx: u32,
	view_info: Option<ViewInfo>,

	timing: TimingInfo,
	clock: ClockOffset,

	dump: Option<Box<dyn Write + Send>>,
	stats: Arc<dyn Stats>,
}

impl Fragmenter {
	pub fn new(stream_index: u8) -> Self {
		Self {
			stream_index,
			max_payload: Shard::MAX_PAYLOAD,
			frame_idx: 0,
			shard_idx: 0,
			view_info: None,
			timing: TimingInfo::default(),
			clock: ClockOffset::default(),
			dump: None,
			stats: Arc::new(NoopStats),
		}
	}

	/// Override the payload budget of a shard, clamped to [PAYLOAD_RANGE].
	pub fn with_max_payload(mut self, max_payload: usize) -> Self {
		self.max_payload = max_payload.clamp(*PAYLOAD_RANGE.start(), *PAYLOAD_RANGE.end());
		self
	}

	/// Write every byte of the stream to the given sink, regardless of shard boundaries.
	pub fn with_dump(mut self, dump: Box<dyn Write + Send>) -> Self {
		self.dump = Some(dump);
		self
	}

	pub fn with_stats(mut self, stats: Arc<dyn Stats>) -> Self {
		self.stats = stats;
		self
	}

	pub fn frame_idx(&self) -> u64 {
		self.frame_idx
	}

	/// The index the next shard will get.
	pub fn next_shard(&self) -> u32 {
		self.shard_idx
	}

	pub fn timing(&self) -> &TimingInfo {
		&self.timing
	}

	/// Reset the template for a new frame.
	///
	/// `encode_begin` is a local timestamp.
	pub fn begin_frame(&mut self, frame_idx: u64, view_info: Option<ViewInfo>, clock: ClockOffset, encode_begin: i64) {
		self.frame_idx = frame_idx;
		self.shard_idx = 0;
		self.view_info = view_info;
		self.clock = clock;
		self.timing = TimingInfo {
			encode_begin: Some(clock.to_remote(encode_begin)),
			..Default::default()
		};
	}

	/// Record the end of the encode, as a local timestamp.
	pub fn encode_end(&mut self, timestamp: i64) {
		self.timing.encode_end = Some(self.clock.to_remote(timestamp));
	}

	/// Fragment one slice of the current frame.
	///
	/// `end_of_frame` is set for the last slice of the frame, whose last shard carries the timing.
	/// Transport errors lose the shard and are otherwise ignored.
	pub fn write(&mut self, data: Bytes, end_of_frame: bool, transport: &dyn Transport) {
		if end_of_frame {
			let now = self.clock.to_remote(clock::now());
			self.timing.send_end = Some(now);
			// The backend may have sent everything itself.
			self.timing.encode_end.get_or_insert(now);
		}

		self.dump(&data);

		if self.shard_idx == 0 {
			let now = clock::now();
			transport.dump_time("send_begin", self.frame_idx, now, self.stream_index, "");
			self.timing.send_begin = Some(self.clock.to_remote(now));
		}

		let mut flags = ShardFlags::START_OF_SLICE;
		let mut rest = data;

		while !rest.is_empty() {
			let budget = match self.view_info {
				Some(_) => self.max_payload - ViewInfo::ENCODED_LEN,
				None => self.max_payload,
			};
			let payload = rest.split_to(budget.min(rest.len()));

			let mut timing_info = None;
			if rest.is_empty() {
				flags |= ShardFlags::END_OF_SLICE;
				if end_of_frame {
					flags |= ShardFlags::END_OF_FRAME;
					timing_info = Some(self.timing);
				}
			}

			let shard = Shard {
				stream_index: self.stream_index,
				frame_idx: self.frame_idx,
				shard_idx: self.shard_idx,
				flags,
				view_info: self.view_info.take(),
				timing_info,
				payload,
			};

			match transport.send_stream(&shard) {
				Ok(()) => self.stats.add_tx_shard(shard.payload.len() as u64),
				Err(err) => {
					tracing::trace!(stream = self.stream_index, frame = self.frame_idx, shard = self.shard_idx, %err, "shard lost");
					self.stats.add_lost_shard();
				}
			}

			self.shard_idx += 1;
			flags = ShardFlags::NONE;
		}

		if end_of_frame {
			self.stats.add_tx_frame();
			transport.dump_time("send_end", self.frame_idx, clock::now(), self.stream_index, "");
		}
	}

	fn dump(&mut self, data: &[u8]) {
		let Some(dump) = self.dump.as_mut() else {
			return;
		};

		if let Err(err) = dump.write_all(data).and_then(|_| dump.flush()) {
			tracing::warn!(stream = self.stream_index, %err, "failed to dump video, closing dump");
			self.dump = None;
		}
	}
}
