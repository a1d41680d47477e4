use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use xrcast::wire::ViewInfo;
use xrcast::{CommandHandle, Encoder, ImageHandle, Transport, clock};

/// Drives one encoder like a renderer would: a render thread presents at the frame rate, and an
/// encode thread encodes whatever was presented.
pub struct Stream {
	pub encoder: Arc<Encoder>,
	pub transport: Arc<dyn Transport>,
	pub fps: f32,
	pub frames: Option<u64>,
	pub keyframe_interval: u64,
	pub running: Arc<AtomicBool>,
}

impl Stream {
	pub fn spawn(self, tasks: &mut JoinSet<anyhow::Result<()>>) {
		// Presentation is bounded by the slots, not by this channel.
		let (tx, rx) = mpsc::sync_channel(self.encoder.slots().count());
		let this = Arc::new(self);

		let render = this.clone();
		tasks.spawn_blocking(move || render.render(tx));
		tasks.spawn_blocking(move || this.encode(rx));
	}

	fn render(&self, frames: mpsc::SyncSender<(u64, ViewInfo)>) -> anyhow::Result<()> {
		let stream = self.encoder.stream_index();
		let period = Duration::from_secs_f64(1.0 / self.fps as f64);

		let mut frame = 0;
		let mut next = Instant::now();

		while self.running.load(Ordering::Relaxed) && self.frames.is_none_or(|max| frame < max) {
			let slot = self.encoder.present(ImageHandle(frame), CommandHandle(frame))?;
			tracing::trace!(stream, frame, slot, "rendered");

			// Predicted two frames ahead, like a compositor would.
			let view = ViewInfo {
				display_time: clock::now() + 2 * period.as_nanos() as i64,
				..Default::default()
			};

			if frames.send((frame, view)).is_err() {
				break;
			}

			frame += 1;
			next += period;
			if let Some(wait) = next.checked_duration_since(Instant::now()) {
				std::thread::sleep(wait);
			}
		}

		tracing::debug!(stream, frames = frame, "render stopped");
		Ok(())
	}

	fn encode(&self, frames: mpsc::Receiver<(u64, ViewInfo)>) -> anyhow::Result<()> {
		let stream = self.encoder.stream_index();

		for (frame, view) in frames {
			let keyframe = match self.keyframe_interval {
				0 => frame == 0,
				interval => frame % interval == 0,
			};
			if keyframe {
				self.encoder.request_keyframe();
			}

			// A lost frame is recovered by the receiver asking for a keyframe.
			if let Err(err) = self.encoder.encode(&self.transport, view, frame) {
				tracing::warn!(stream, frame, %err, "frame lost");
			}
		}

		tracing::debug!(stream, "encode stopped");
		Ok(())
	}
}
