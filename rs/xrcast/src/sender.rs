use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use crate::Error;

// How long the worker sleeps without a wake-up, so it notices shutdown.
const IDLE_WAKE: Duration = Duration::from_millis(100);

/// Something the sender worker transmits on behalf of a stream.
pub trait SendTarget: Send + Sync {
	/// Transmit the final output of a frame.
	fn transmit(&self, data: Bytes);
}

/// Identifies the stream owning queued items, see [AsyncSender::wait_idle].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

struct Pending {
	stream: StreamId,
	target: Arc<dyn SendTarget>,
	data: Bytes,
}

#[derive(Default)]
struct Queue {
	pending: VecDeque<Pending>,
	closed: bool,
	next_id: u64,
}

#[derive(Default)]
struct Shared {
	queue: Mutex<Queue>,
	changed: Condvar,
}

/// A background worker transmitting frames for every stream, in enqueue order.
///
/// Items of one stream are sent in the order they were pushed. Items of different streams
/// interleave in enqueue order, so one stream's network I/O overlaps with another's encode.
///
/// Dropping the last handle stops the worker: items still queued are discarded and every
/// [AsyncSender::wait_idle] caller is released.
pub struct AsyncSender {
	shared: Arc<Shared>,
	worker: Option<JoinHandle<()>>,
}

impl AsyncSender {
	pub fn spawn() -> Result<Arc<Self>, Error> {
		let shared = Arc::new(Shared::default());

		let worker = {
			let shared = shared.clone();
			std::thread::Builder::new()
				.name("xrcast-send".into())
				.spawn(move || Self::run(&shared))
				.map_err(|err| Error::Spawn(Arc::new(err)))?
		};

		tracing::debug!("sender started");

		Ok(Arc::new(Self {
			shared,
			worker: Some(worker),
		}))
	}

	/// Allocate an identity for a new stream.
	pub fn register(&self) -> StreamId {
		let mut queue = self.shared.queue.lock();
		let id = StreamId(queue.next_id);
		queue.next_id += 1;
		id
	}

	pub fn push(&self, stream: StreamId, target: Arc<dyn SendTarget>, data: Bytes) {
		let mut queue = self.shared.queue.lock();
		queue.pending.push_back(Pending { stream, target, data });
		self.shared.changed.notify_all();
	}

	/// The number of queued items belonging to `stream`, including the one being sent.
	pub fn pending(&self, stream: StreamId) -> usize {
		let queue = self.shared.queue.lock();
		queue.pending.iter().filter(|item| item.stream == stream).count()
	}

	/// Block until no queued item belongs to `stream`.
	pub fn wait_idle(&self, stream: StreamId) {
		let mut queue = self.shared.queue.lock();
		while !queue.closed && queue.pending.iter().any(|item| item.stream == stream) {
			self.shared.changed.wait_for(&mut queue, IDLE_WAKE);
		}
	}

	fn run(shared: &Shared) {
		loop {
			let (target, data) = {
				let mut queue = shared.queue.lock();
				if queue.closed {
					break;
				}

				match queue.pending.front() {
					Some(item) => (item.target.clone(), item.data.clone()),
					None => {
						shared.changed.wait_for(&mut queue, IDLE_WAKE);
						continue;
					}
				}
			};

			// Only this thread pops, so the front is still the item being sent.
			if !data.is_empty() {
				target.transmit(data);
			}

			let mut queue = shared.queue.lock();
			queue.pending.pop_front();
			shared.changed.notify_all();
		}

		let mut queue = shared.queue.lock();
		let dropped = queue.pending.len();
		queue.pending.clear();
		shared.changed.notify_all();

		tracing::debug!(dropped, "sender stopped");
	}
}

impl Drop for AsyncSender {
	fn drop(&mut self) {
		{
			let mut queue = self.shared.queue.lock();
			queue.closed = true;
			self.shared.changed.notify_all();
		}

		if let Some(worker) = self.worker.take() {
			// A target could release the last handle from the worker itself.
			if worker.thread().id() != std::thread::current().id() {
				let _ = worker.join();
			}
		}
	}
}

/// The construction point of the [AsyncSender] shared by all streams.
///
/// The worker is spawned on first use and lives as long as a stream holds a handle to it.
/// Clones share the same worker.
#[derive(Clone, Default)]
pub struct SharedSender {
	current: Arc<Mutex<Weak<AsyncSender>>>,
}

impl SharedSender {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self) -> Result<Arc<AsyncSender>, Error> {
		let mut current = self.current.lock();
		if let Some(sender) = current.upgrade() {
			return Ok(sender);
		}

		let sender = AsyncSender::spawn()?;
		*current = Arc::downgrade(&sender);
		Ok(sender)
	}

	/// Whether a worker is currently alive.
	pub fn is_running(&self) -> bool {
		self.current.lock().strong_count() > 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::sync::mpsc;

	#[derive(Default)]
	struct Log {
		sent: Mutex<Vec<(char, Bytes)>>,
	}

	struct Target {
		name: char,
		log: Arc<Log>,
		delay: Duration,
	}

	impl SendTarget for Target {
		fn transmit(&self, data: Bytes) {
			std::thread::sleep(self.delay);
			self.log.sent.lock().push((self.name, data));
		}
	}

	fn target(name: char, log: &Arc<Log>, delay: Duration) -> Arc<dyn SendTarget> {
		Arc::new(Target {
			name,
			log: log.clone(),
			delay,
		})
	}

	#[test]
	fn test_per_stream_order() {
		let sender = AsyncSender::spawn().unwrap();
		let log = Arc::new(Log::default());

		let a = sender.register();
		let b = sender.register();
		assert_ne!(a, b);

		let ta = target('a', &log, Duration::from_millis(5));
		let tb = target('b', &log, Duration::ZERO);

		sender.push(a, ta.clone(), Bytes::from_static(b"a1"));
		sender.push(b, tb.clone(), Bytes::from_static(b"b1"));
		sender.push(a, ta.clone(), Bytes::from_static(b"a2"));
		sender.push(b, tb.clone(), Bytes::from_static(b"b2"));

		sender.wait_idle(a);
		sender.wait_idle(b);

		let sent = log.sent.lock().clone();
		let a_items: Vec<_> = sent.iter().filter(|(n, _)| *n == 'a').map(|(_, d)| d.clone()).collect();
		let b_items: Vec<_> = sent.iter().filter(|(n, _)| *n == 'b').map(|(_, d)| d.clone()).collect();
		assert_eq!(a_items, vec![Bytes::from_static(b"a1"), Bytes::from_static(b"a2")]);
		assert_eq!(b_items, vec![Bytes::from_static(b"b1"), Bytes::from_static(b"b2")]);
	}

	#[test]
	fn test_wait_idle() {
		let sender = AsyncSender::spawn().unwrap();
		let log = Arc::new(Log::default());
		let slow = sender.register();
		let other = sender.register();

		let t = target('s', &log, Duration::from_millis(20));
		for i in 0..3u8 {
			sender.push(slow, t.clone(), Bytes::from(vec![i]));
		}

		// Nothing queued for this one.
		sender.wait_idle(other);

		sender.wait_idle(slow);
		assert_eq!(sender.pending(slow), 0);
		assert_eq!(log.sent.lock().len(), 3);
	}

	#[test]
	fn test_shutdown_discards_and_releases_waiters() {
		let sender = AsyncSender::spawn().unwrap();
		let log = Arc::new(Log::default());
		let stream = sender.register();

		// Long enough that the queue is still full when the sender is dropped.
		let t = target('x', &log, Duration::from_millis(200));
		for i in 0..10u8 {
			sender.push(stream, t.clone(), Bytes::from(vec![i]));
		}

		let shared = sender.shared.clone();
		let (tx, rx) = mpsc::channel();
		let waiter = std::thread::spawn(move || {
			let mut queue = shared.queue.lock();
			while !queue.pending.is_empty() {
				shared.changed.wait_for(&mut queue, IDLE_WAKE);
			}
			tx.send(queue.pending.len()).unwrap();
		});

		drop(sender);
		assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(0));
		waiter.join().unwrap();

		assert!(log.sent.lock().len() < 10);
	}

	#[test]
	fn test_shared_sender_lifetime() {
		let shared = SharedSender::new();
		assert!(!shared.is_running());

		let first = shared.get().unwrap();
		let second = shared.get().unwrap();
		assert!(Arc::ptr_eq(&first, &second));
		assert!(shared.is_running());

		drop(first);
		drop(second);
		assert!(!shared.is_running());

		// A new worker is spawned on the next use.
		let third = shared.get().unwrap();
		assert!(shared.is_running());
		drop(third);
	}
}
