//! # xrcast-wire: video shard wire format
//!
//! An encoded video frame is too large for a single datagram, so it is split into [Shard]s.
//! Each shard is a small fixed header followed by up to [Shard::MAX_PAYLOAD] bytes of bitstream.
//!
//! Per frame:
//! - Shard indices start at 0 and increase by one, across every slice of the frame.
//! - Shard 0 carries the [ViewInfo], at the cost of [ViewInfo::ENCODED_LEN] payload bytes.
//! - The first and last shard of a slice are flagged [ShardFlags::START_OF_SLICE] and [ShardFlags::END_OF_SLICE].
//! - The last shard of the frame is flagged [ShardFlags::END_OF_FRAME] and carries the [TimingInfo].
//!
//! All integers are big-endian. The payload runs to the end of the datagram.

mod shard;

pub mod coding;

pub use shard::*;
