//! The seam between the pipeline and the encode paths.
//!
//! A [Backend] does two things: accept a rendered image for a slot, and encode that slot.
//! Everything else (pacing, keyframe policy, fragmentation, sending) is handled by [crate::Encoder].

mod caps;
mod registry;
mod synthetic;

pub use caps::*;
pub use registry::*;
pub use synthetic::*;

use bytes::Bytes;

use crate::encoder::Outbound;

/// The number of slots of a backend that doesn't say otherwise.
pub const DEFAULT_SLOTS: usize = 2;

/// A raw GPU image handle, owned by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u64);

/// A raw handle to the command buffer the presentation is recorded into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommandHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeRequest {
	/// Code this frame as a keyframe.
	pub idr: bool,

	/// When the frame is expected on the display, in nanoseconds.
	pub target_time: i64,

	/// The slot that was presented.
	pub slot: usize,

	pub frame_idx: u64,
}

/// One encode path.
///
/// The pipeline never calls a backend concurrently with itself.
pub trait Backend: Send {
	/// Record the copy/conversion of `image` into `slot`.
	///
	/// This must not wait for network or encode completion.
	fn present(&mut self, image: ImageHandle, commands: CommandHandle, slot: usize) -> anyhow::Result<()>;

	/// Encode the image presented in `request.slot`.
	///
	/// Intermediate slices may be emitted through `slices` while encoding; the returned bytes are
	/// the last output of the frame. `None` means the frame was dropped on purpose (e.g., warm-up).
	fn encode(&mut self, request: EncodeRequest, slices: &mut Slices<'_>) -> anyhow::Result<Option<Bytes>>;

	/// The number of images that can be in flight.
	fn slots(&self) -> usize {
		DEFAULT_SLOTS
	}

	/// Whether the last output of a frame is sent from the shared sender worker.
	fn async_send(&self) -> bool {
		true
	}
}

/// Where a [Backend] emits intermediate slices of the frame being encoded.
///
/// Each slice is fragmented and sent immediately, before [Backend::encode] returns.
pub struct Slices<'a> {
	sink: SliceSink<'a>,
	count: usize,
}

enum SliceSink<'a> {
	Outbound(&'a Outbound),
	Collect(Vec<Bytes>),
}

impl<'a> Slices<'a> {
	pub(crate) fn new(outbound: &'a Outbound) -> Self {
		Self {
			sink: SliceSink::Outbound(outbound),
			count: 0,
		}
	}

	/// Keep the slices instead of sending them, for driving a backend by hand.
	pub fn collect() -> Self {
		Self {
			sink: SliceSink::Collect(Vec::new()),
			count: 0,
		}
	}

	pub fn push(&mut self, data: Bytes) {
		self.count += 1;
		match &mut self.sink {
			SliceSink::Outbound(outbound) => outbound.write(data, false),
			SliceSink::Collect(slices) => slices.push(data),
		}
	}

	/// The number of slices pushed so far.
	pub fn count(&self) -> usize {
		self.count
	}

	/// The collected slices, empty unless created with [Slices::collect].
	pub fn into_collected(self) -> Vec<Bytes> {
		match self.sink {
			SliceSink::Outbound(_) => Vec::new(),
			SliceSink::Collect(slices) => slices,
		}
	}
}
