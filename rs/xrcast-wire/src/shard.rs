use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use bytes::Bytes;

use crate::coding::{Decode, DecodeError, Encode};

/// Boundary flags carried by each [Shard].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShardFlags(u8);

impl ShardFlags {
	pub const NONE: Self = Self(0);

	/// The first shard of a slice.
	pub const START_OF_SLICE: Self = Self(1 << 0);

	/// The last shard of a slice.
	pub const END_OF_SLICE: Self = Self(1 << 1);

	/// The last shard of a frame, carrying the [TimingInfo].
	pub const END_OF_FRAME: Self = Self(1 << 2);

	const ALL: u8 = Self::START_OF_SLICE.0 | Self::END_OF_SLICE.0 | Self::END_OF_FRAME.0;

	pub const fn bits(self) -> u8 {
		self.0
	}

	pub const fn from_bits(bits: u8) -> Option<Self> {
		match bits & !Self::ALL {
			0 => Some(Self(bits)),
			_ => None,
		}
	}

	pub const fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}

	pub const fn is_empty(self) -> bool {
		self.0 == 0
	}
}

impl BitOr for ShardFlags {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}

impl BitOrAssign for ShardFlags {
	fn bitor_assign(&mut self, rhs: Self) {
		self.0 |= rhs.0;
	}
}

impl fmt::Debug for ShardFlags {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut names = Vec::new();
		if self.contains(Self::START_OF_SLICE) {
			names.push("START_OF_SLICE");
		}
		if self.contains(Self::END_OF_SLICE) {
			names.push("END_OF_SLICE");
		}
		if self.contains(Self::END_OF_FRAME) {
			names.push("END_OF_FRAME");
		}
		write!(f, "ShardFlags({})", names.join(" | "))
	}
}

/// The pose of one eye, in the receiver's reference space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
	/// Quaternion, `[x, y, z, w]`.
	pub orientation: [f32; 4],
	/// Position in meters, `[x, y, z]`.
	pub position: [f32; 3],
}

impl Encode for Pose {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.orientation.encode(w);
		self.position.encode(w);
	}
}

impl Decode for Pose {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			orientation: Decode::decode(r)?,
			position: Decode::decode(r)?,
		})
	}
}

/// The field of view of one eye, as angles in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fov {
	pub left: f32,
	pub right: f32,
	pub up: f32,
	pub down: f32,
}

impl Encode for Fov {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.left.encode(w);
		self.right.encode(w);
		self.up.encode(w);
		self.down.encode(w);
	}
}

impl Decode for Fov {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			left: f32::decode(r)?,
			right: f32::decode(r)?,
			up: f32::decode(r)?,
			down: f32::decode(r)?,
		})
	}
}

/// Per-frame display information, sent once in the first shard of a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewInfo {
	/// The predicted display time of the frame, in nanoseconds.
	///
	/// This is also the target presentation time handed to the encoder.
	pub display_time: i64,
	pub pose: [Pose; 2],
	pub fov: [Fov; 2],
}

impl ViewInfo {
	/// The serialized size, which shard 0 gives up from its payload budget.
	pub const ENCODED_LEN: usize = 8 + 2 * (4 * 4 + 3 * 4) + 2 * (4 * 4);
}

impl Encode for ViewInfo {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.display_time.encode(w);
		self.pose.encode(w);
		self.fov.encode(w);
	}
}

impl Decode for ViewInfo {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			display_time: i64::decode(r)?,
			pose: Decode::decode(r)?,
			fov: Decode::decode(r)?,
		})
	}
}

/// Latency breakdown of a frame, in the receiver's clock domain (nanoseconds).
///
/// Attached to the shard flagged [ShardFlags::END_OF_FRAME].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingInfo {
	pub encode_begin: Option<i64>,
	pub encode_end: Option<i64>,
	pub send_begin: Option<i64>,
	pub send_end: Option<i64>,
}

impl TimingInfo {
	fn fields(&self) -> [Option<i64>; 4] {
		[self.encode_begin, self.encode_end, self.send_begin, self.send_end]
	}
}

impl Encode for TimingInfo {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		// One presence bit per field, then only the present values.
		let fields = self.fields();
		let mask = fields
			.iter()
			.enumerate()
			.fold(0u8, |mask, (i, field)| mask | ((field.is_some() as u8) << i));
		mask.encode(w);

		for value in fields.into_iter().flatten() {
			value.encode(w);
		}
	}
}

impl Decode for TimingInfo {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let mask = u8::decode(r)?;
		if mask & !0x0f != 0 {
			return Err(DecodeError::InvalidValue);
		}

		let mut fields = [None; 4];
		for (i, field) in fields.iter_mut().enumerate() {
			if mask & (1 << i) != 0 {
				*field = Some(i64::decode(r)?);
			}
		}

		let [encode_begin, encode_end, send_begin, send_end] = fields;
		Ok(Self {
			encode_begin,
			encode_end,
			send_begin,
			send_end,
		})
	}
}

/// One network datagram worth of an encoded frame.
///
/// Shards of a frame are numbered from zero, across every slice of that frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shard {
	pub stream_index: u8,
	pub frame_idx: u64,
	pub shard_idx: u32,
	pub flags: ShardFlags,

	/// Only present on shard 0.
	pub view_info: Option<ViewInfo>,

	/// Only present on the shard flagged [ShardFlags::END_OF_FRAME].
	pub timing_info: Option<TimingInfo>,

	pub payload: Bytes,
}

impl Shard {
	/// The default payload budget of a shard.
	pub const MAX_PAYLOAD: usize = 1400;
}

impl Encode for Shard {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.stream_index.encode(w);
		self.frame_idx.encode(w);
		self.shard_idx.encode(w);
		self.flags.bits().encode(w);
		self.view_info.encode(w);
		self.timing_info.encode(w);

		// The payload runs to the end of the datagram.
		w.put_slice(&self.payload);
	}
}

impl Decode for Shard {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let stream_index = u8::decode(r)?;
		let frame_idx = u64::decode(r)?;
		let shard_idx = u32::decode(r)?;
		let bits = u8::decode(r)?;
		let flags = ShardFlags::from_bits(bits).ok_or(DecodeError::InvalidFlags(bits))?;
		let view_info = Option::<ViewInfo>::decode(r)?;
		let timing_info = Option::<TimingInfo>::decode(r)?;

		let size = r.remaining();
		if size > Self::MAX_PAYLOAD {
			return Err(DecodeError::PayloadTooLarge(size));
		}
		let payload = r.copy_to_bytes(size);

		Ok(Self {
			stream_index,
			frame_idx,
			shard_idx,
			flags,
			view_info,
			timing_info,
			payload,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn view_info() -> ViewInfo {
		ViewInfo {
			display_time: 1_234_567_890,
			pose: [
				Pose {
					orientation: [0.0, 0.0, 0.0, 1.0],
					position: [-0.032, 1.6, 0.0],
				},
				Pose {
					orientation: [0.0, 0.0, 0.0, 1.0],
					position: [0.032, 1.6, 0.0],
				},
			],
			fov: [
				Fov {
					left: -0.9,
					right: 0.8,
					up: 0.9,
					down: -0.95,
				},
				Fov {
					left: -0.8,
					right: 0.9,
					up: 0.9,
					down: -0.95,
				},
			],
		}
	}

	#[test]
	fn test_view_info_len() {
		assert_eq!(view_info().encode_bytes().len(), ViewInfo::ENCODED_LEN);
	}

	#[test]
	fn test_first_shard_round_trip() {
		let shard = Shard {
			stream_index: 1,
			frame_idx: 42,
			shard_idx: 0,
			flags: ShardFlags::START_OF_SLICE,
			view_info: Some(view_info()),
			timing_info: None,
			payload: Bytes::from_static(b"\x00\x00\x00\x01\x67"),
		};

		let mut encoded = shard.encode_bytes();
		let decoded = Shard::decode(&mut encoded).unwrap();
		assert_eq!(decoded, shard);
	}

	#[test]
	fn test_last_shard_partial_timing() {
		let shard = Shard {
			stream_index: 0,
			frame_idx: 7,
			shard_idx: 3,
			flags: ShardFlags::END_OF_SLICE | ShardFlags::END_OF_FRAME,
			view_info: None,
			timing_info: Some(TimingInfo {
				encode_begin: Some(100),
				encode_end: None,
				send_begin: Some(300),
				send_end: Some(400),
			}),
			payload: Bytes::from_static(b"tail"),
		};

		let mut encoded = shard.encode_bytes();
		// header + view presence + timing presence/mask + 3 values + payload
		assert_eq!(encoded.len(), 1 + 8 + 4 + 1 + 1 + 1 + 1 + 3 * 8 + 4);

		let decoded = Shard::decode(&mut encoded).unwrap();
		assert_eq!(decoded.timing_info, shard.timing_info);
		assert_eq!(decoded.payload, shard.payload);
	}

	#[test]
	fn test_rejects_unknown_flags() {
		#[rustfmt::skip]
		let invalid = vec![
			0x00, // stream
			0, 0, 0, 0, 0, 0, 0, 1, // frame
			0, 0, 0, 0, // shard
			0x08, // INVALID: unknown flag bit
			0x00, 0x00,
		];

		let mut buf = Bytes::from(invalid);
		assert_eq!(Shard::decode(&mut buf), Err(DecodeError::InvalidFlags(0x08)));
	}

	#[test]
	fn test_truncated_header() {
		let mut buf = Bytes::from_static(&[0x00, 0x00, 0x01]);
		assert_eq!(Shard::decode(&mut buf), Err(DecodeError::Short));
	}

	#[test]
	fn test_flags() {
		let mut flags = ShardFlags::START_OF_SLICE;
		flags |= ShardFlags::END_OF_SLICE;

		assert!(flags.contains(ShardFlags::START_OF_SLICE));
		assert!(flags.contains(ShardFlags::END_OF_SLICE));
		assert!(!flags.contains(ShardFlags::END_OF_FRAME));
		assert_eq!(ShardFlags::from_bits(flags.bits()), Some(flags));
		assert!(ShardFlags::NONE.is_empty());
	}
}
