use std::fmt;
use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use xrcast_wire::{Shard, ViewInfo};

use crate::backend::{Backend, CommandHandle, EncodeRequest, ImageHandle, Slices};
use crate::{
	AsyncSender, Error, Fragmenter, IDR_THROTTLE, IdrThrottle, NoopStats, SendTarget, Slots, Stats, StreamId, Transport,
	clock,
};

/// The fragmenter of a stream, shared between the encode path and the sender worker.
pub(crate) struct Outbound {
	stream_index: u8,
	state: Mutex<OutboundState>,
}

struct OutboundState {
	fragmenter: Fragmenter,

	// The session of the frame being sent.
	transport: Option<Arc<dyn Transport>>,
}

impl Outbound {
	fn new(stream_index: u8, fragmenter: Fragmenter) -> Self {
		Self {
			stream_index,
			state: Mutex::new(OutboundState {
				fragmenter,
				transport: None,
			}),
		}
	}

	fn begin_frame(&self, transport: Arc<dyn Transport>, frame_idx: u64, view_info: ViewInfo, encode_begin: i64) {
		let mut state = self.state.lock();
		let clock = transport.clock_offset();
		state.fragmenter.begin_frame(frame_idx, Some(view_info), clock, encode_begin);
		state.transport = Some(transport);
	}

	fn encode_end(&self, timestamp: i64) {
		self.state.lock().fragmenter.encode_end(timestamp);
	}

	pub(crate) fn write(&self, data: Bytes, end_of_frame: bool) {
		let mut state = self.state.lock();
		let Some(transport) = state.transport.clone() else {
			tracing::warn!(stream = self.stream_index, "write outside of a frame, dropping");
			return;
		};

		state.fragmenter.write(data, end_of_frame, transport.as_ref());
	}
}

impl SendTarget for Outbound {
	fn transmit(&self, data: Bytes) {
		self.write(data, true);
	}
}

pub struct EncoderOptions {
	/// Send the last output of each frame from this worker instead of the encode path.
	pub sender: Option<Arc<AsyncSender>>,

	/// Receives the raw bitstream.
	pub dump: Option<Box<dyn Write + Send>>,

	pub max_payload: usize,

	pub stats: Arc<dyn Stats>,

	/// The minimum number of frames between honored keyframe requests.
	pub idr_interval: u64,
}

impl Default for EncoderOptions {
	fn default() -> Self {
		Self {
			sender: None,
			dump: None,
			max_payload: Shard::MAX_PAYLOAD,
			stats: Arc::new(NoopStats),
			idr_interval: IDR_THROTTLE,
		}
	}
}

/// One encoded stream: a backend paced by [Slots], with keyframe throttling and fragmentation.
///
/// Methods take `&self`, so presentation and encode can be driven from different threads.
/// Dropping the encoder waits until its queued sends completed.
pub struct Encoder {
	stream_index: u8,
	backend: Mutex<Box<dyn Backend>>,
	slots: Slots,
	idr: IdrThrottle,
	outbound: Arc<Outbound>,
	sender: Option<(Arc<AsyncSender>, StreamId)>,
}

impl Encoder {
	pub fn new(stream_index: u8, backend: Box<dyn Backend>, options: EncoderOptions) -> Self {
		let mut fragmenter = Fragmenter::new(stream_index)
			.with_max_payload(options.max_payload)
			.with_stats(options.stats);
		if let Some(dump) = options.dump {
			fragmenter = fragmenter.with_dump(dump);
		}

		let slots = Slots::new(backend.slots());
		let sender = options.sender.map(|sender| {
			let id = sender.register();
			(sender, id)
		});

		Self {
			stream_index,
			backend: Mutex::new(backend),
			slots,
			idr: IdrThrottle::new(options.idr_interval),
			outbound: Arc::new(Outbound::new(stream_index, fragmenter)),
			sender,
		}
	}

	pub fn stream_index(&self) -> u8 {
		self.stream_index
	}

	/// Whether the last output of each frame is sent from the shared worker.
	pub fn is_async(&self) -> bool {
		self.sender.is_some()
	}

	pub fn slots(&self) -> &Slots {
		&self.slots
	}

	/// Ask for a keyframe, see [IdrThrottle::request].
	pub fn request_keyframe(&self) {
		self.idr.request();
	}

	pub fn last_keyframe(&self) -> Option<u64> {
		self.idr.last_idr()
	}

	/// Submit a rendered image, blocking while every slot is still being encoded.
	///
	/// Returns the slot the image was presented into.
	pub fn present(&self, image: ImageHandle, commands: CommandHandle) -> Result<usize, Error> {
		let slot = self.slots.acquire();

		match self.backend.lock().present(image, commands, slot) {
			Ok(()) => {
				self.slots.commit();
				tracing::trace!(stream = self.stream_index, slot, "presented");
				Ok(slot)
			}
			Err(err) => {
				self.slots.abort(slot);
				tracing::warn!(stream = self.stream_index, slot, %err, "present failed");
				Err(Error::Present(Arc::new(err)))
			}
		}
	}

	/// Encode the oldest presented slot and send the result.
	///
	/// The slot is released whether or not the backend succeeded.
	pub fn encode(&self, transport: &Arc<dyn Transport>, view_info: ViewInfo, frame_idx: u64) -> Result<(), Error> {
		let slot = self.slots.encode_slot().map_err(|slot| Error::NotPresented { slot })?;

		// The previous frame must be gone before the shard template is reused.
		if let Some((sender, id)) = &self.sender {
			sender.wait_idle(*id);
		}

		let res = self.encode_frame(transport, view_info, frame_idx, slot);
		self.slots.complete();
		res
	}

	fn encode_frame(
		&self,
		transport: &Arc<dyn Transport>,
		view_info: ViewInfo,
		frame_idx: u64,
		slot: usize,
	) -> Result<(), Error> {
		let requested = self.idr.is_requested();
		let idr = self.idr.decide(frame_idx);
		if requested && !idr {
			tracing::debug!(stream = self.stream_index, frame = frame_idx, "keyframe request throttled");
		}
		let extra = match idr {
			true => ",idr",
			false => ",p",
		};

		let encode_begin = clock::now();
		transport.dump_time("encode_begin", frame_idx, encode_begin, self.stream_index, extra);
		self.outbound.begin_frame(transport.clone(), frame_idx, view_info, encode_begin);

		let request = EncodeRequest {
			idr,
			target_time: view_info.display_time,
			slot,
			frame_idx,
		};

		let output = {
			let mut backend = self.backend.lock();
			let mut slices = Slices::new(&self.outbound);
			backend.encode(request, &mut slices)
		};

		let data = match output {
			Ok(data) => data,
			Err(err) => {
				tracing::warn!(stream = self.stream_index, frame = frame_idx, slot, %err, "encode failed");
				return Err(Error::Encode(Arc::new(err)));
			}
		};

		let encode_end = clock::now();
		transport.dump_time("encode_end", frame_idx, encode_end, self.stream_index, extra);

		let Some(data) = data.filter(|data| !data.is_empty()) else {
			tracing::trace!(stream = self.stream_index, frame = frame_idx, "frame dropped by backend");
			return Ok(());
		};

		self.outbound.encode_end(encode_end);

		match &self.sender {
			Some((sender, id)) => sender.push(*id, self.outbound.clone(), data),
			None => self.outbound.write(data, true),
		}

		Ok(())
	}
}

impl fmt::Debug for Encoder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Encoder")
			.field("stream_index", &self.stream_index)
			.field("async", &self.is_async())
			.field("slots", &self.slots.count())
			.finish_non_exhaustive()
	}
}

impl Drop for Encoder {
	fn drop(&mut self) {
		// Queued sends reference this stream's fragmenter and session.
		if let Some((sender, id)) = &self.sender {
			sender.wait_idle(*id);
		}
	}
}
