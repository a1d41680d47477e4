use std::sync::LazyLock;
use std::time::Instant;

static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

/// The local monotonic clock, in nanoseconds since the first call in this process.
pub fn now() -> i64 {
	EPOCH.elapsed().as_nanos() as i64
}

/// Translates local monotonic timestamps into the receiver's clock domain.
///
/// Provided by the [crate::Transport], which keeps it synchronized with the receiver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockOffset {
	/// Nanoseconds to add to a local timestamp.
	pub offset: i64,
}

impl ClockOffset {
	pub const fn new(offset: i64) -> Self {
		Self { offset }
	}

	pub const fn to_remote(self, local: i64) -> i64 {
		local.saturating_add(self.offset)
	}
}
