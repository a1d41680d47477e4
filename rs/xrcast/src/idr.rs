use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// The minimum number of frames between two honored keyframes.
pub const IDR_THROTTLE: u64 = 100;

/// Decides whether a keyframe request is honored now or deferred.
///
/// Requests arriving in bursts (one per lost packet, one per reconnecting decoder...) would otherwise
/// produce a keyframe storm. A deferred request stays armed until it can be honored.
#[derive(Debug)]
pub struct IdrThrottle {
	requested: AtomicBool,
	last: Mutex<Option<u64>>,
	interval: u64,
}

impl IdrThrottle {
	pub fn new(interval: u64) -> Self {
		Self {
			requested: AtomicBool::new(false),
			last: Mutex::new(None),
			interval,
		}
	}

	/// Ask for a keyframe. Multiple requests before the next keyframe coalesce into one.
	pub fn request(&self) {
		self.requested.store(true, Ordering::Release);
	}

	pub fn is_requested(&self) -> bool {
		self.requested.load(Ordering::Acquire)
	}

	/// The last frame coded as a keyframe.
	pub fn last_idr(&self) -> Option<u64> {
		*self.last.lock()
	}

	/// Returns true if `frame` must be coded as a keyframe.
	pub fn decide(&self, frame: u64) -> bool {
		if !self.requested.swap(false, Ordering::AcqRel) {
			return false;
		}

		let mut last = self.last.lock();
		if last.is_some_and(|last| frame < last.saturating_add(self.interval)) {
			// Too soon, try again on a later frame.
			self.requested.store(true, Ordering::Release);
			return false;
		}

		*last = Some(frame);
		true
	}
}

impl Default for IdrThrottle {
	fn default() -> Self {
		Self::new(IDR_THROTTLE)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_no_request() {
		let idr = IdrThrottle::default();
		assert!(!idr.decide(0));
		assert!(!idr.decide(1000));
		assert_eq!(idr.last_idr(), None);
	}

	#[test]
	fn test_first_request_honored() {
		let idr = IdrThrottle::default();
		idr.request();
		assert!(idr.decide(3));
		assert_eq!(idr.last_idr(), Some(3));
		assert!(!idr.is_requested());
	}

	#[test]
	fn test_requests_coalesce() {
		let idr = IdrThrottle::default();
		idr.request();
		idr.request();
		idr.request();
		assert!(idr.decide(0));
		assert!(!idr.decide(1000));
	}

	#[test]
	fn test_throttled_request_is_rearmed() {
		let idr = IdrThrottle::default();
		idr.request();
		assert!(idr.decide(10));

		idr.request();
		for frame in 11..110 {
			assert!(!idr.decide(frame), "frame {frame} should be a delta frame");
			assert!(idr.is_requested());
		}

		assert!(idr.decide(110));
		assert_eq!(idr.last_idr(), Some(110));
		assert!(!idr.is_requested());
	}

	#[test]
	fn test_spacing_under_constant_requests() {
		let idr = IdrThrottle::default();
		let mut honored = Vec::new();

		for frame in 0..1000 {
			idr.request();
			if idr.decide(frame) {
				honored.push(frame);
			}
		}

		assert_eq!(honored.first(), Some(&0));
		for pair in honored.windows(2) {
			assert!(pair[1] - pair[0] >= IDR_THROTTLE);
		}
		assert_eq!(honored.len(), 10);
	}
}
