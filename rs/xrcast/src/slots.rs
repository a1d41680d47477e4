use parking_lot::{Condvar, Mutex};

/// Pacing between presentation and encode across a fixed number of in-flight slots.
///
/// Each slot goes `free -> acquired -> presented -> free`. Presentation and encode walk the slots
/// round-robin with separate cursors; a slot cannot be presented again until its encode
/// completed, which bounds the presentation cursor to N slots ahead of the encode cursor.
///
/// A slot is only encodable once its presentation was [Slots::commit]ted, so an encode racing
/// an in-flight presentation sees the slot as not presented.
///
/// [Slots::acquire] is meant to be called from a single context, as is [Slots::encode_slot].
#[derive(Debug)]
pub struct Slots {
	state: Mutex<SlotState>,
	freed: Condvar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
	Free,
	Acquired,
	Presented,
}

#[derive(Debug)]
struct SlotState {
	slots: Vec<Slot>,
	next_present: usize,
	next_encode: usize,
}

impl Slots {
	pub fn new(count: usize) -> Self {
		Self {
			state: Mutex::new(SlotState {
				slots: vec![Slot::Free; count.max(1)],
				next_present: 0,
				next_encode: 0,
			}),
			freed: Condvar::new(),
		}
	}

	pub fn count(&self) -> usize {
		self.state.lock().slots.len()
	}

	/// Whether the slot is being presented or waits for its encode.
	pub fn is_busy(&self, slot: usize) -> bool {
		self.state.lock().slots.get(slot).is_some_and(|slot| *slot != Slot::Free)
	}

	/// Wait until the next slot to present is free, then reserve it.
	///
	/// The presentation cursor only moves once the presentation is [Slots::commit]ted.
	pub fn acquire(&self) -> usize {
		let mut state = self.state.lock();
		let slot = state.next_present;
		while state.slots[slot] != Slot::Free {
			self.freed.wait(&mut state);
		}
		state.slots[slot] = Slot::Acquired;
		slot
	}

	/// The presentation of the acquired slot was submitted; it can now be encoded.
	pub fn commit(&self) {
		let mut state = self.state.lock();
		let slot = state.next_present;
		if state.slots[slot] == Slot::Acquired {
			state.slots[slot] = Slot::Presented;
			state.next_present = (slot + 1) % state.slots.len();
		}
	}

	/// The presentation of the acquired slot failed; release it without moving the cursor.
	pub fn abort(&self, slot: usize) {
		let mut state = self.state.lock();
		if state.slots.get(slot) == Some(&Slot::Acquired) {
			state.slots[slot] = Slot::Free;
			self.freed.notify_all();
		}
	}

	/// The slot to encode next, if its presentation was committed.
	pub fn encode_slot(&self) -> Result<usize, usize> {
		let state = self.state.lock();
		let slot = state.next_encode;
		match state.slots[slot] {
			Slot::Presented => Ok(slot),
			_ => Err(slot),
		}
	}

	/// The encode of the current slot finished, successfully or not.
	///
	/// Frees the slot, wakes a blocked [Slots::acquire] and moves the encode cursor.
	/// Only call this after [Slots::encode_slot] returned the slot.
	pub fn complete(&self) -> usize {
		let mut state = self.state.lock();
		let slot = state.next_encode;
		state.slots[slot] = Slot::Free;
		state.next_encode = (slot + 1) % state.slots.len();
		self.freed.notify_all();
		slot
	}
}
