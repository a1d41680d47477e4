mod config;
mod log;
mod stream;
mod udp;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tokio::task::JoinSet;
use xrcast::{Counters, Registry, StreamOptions, Transport};

use config::*;
use log::*;
use stream::*;
use udp::*;

/// Stream synthetic XR video over UDP.
#[derive(Parser, Clone)]
#[command(name = "xrcast", version)]
pub struct Cli {
	#[command(flatten)]
	log: Log,

	#[command(flatten)]
	config: Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	cli.log.init();

	let config = cli.config;
	let streams = config.streams()?;

	let caps = xrcast::video_capabilities(&streams)?;
	tracing::info!(profiles = ?caps.profiles, usage = caps.usage.bits(), "video capabilities");

	let transport: Arc<dyn Transport> = Arc::new(UdpTransport::bind(config.bind, config.destination)?);
	let stats = Arc::new(Counters::default());

	let registry = Registry::new();
	tracing::info!(available = ?registry.available(), "backends");

	let options = StreamOptions {
		dump_video: config.dump_video.clone(),
		max_payload: config.max_payload,
		stats: stats.clone(),
		..Default::default()
	};

	let running = Arc::new(AtomicBool::new(true));
	let mut tasks = JoinSet::new();

	for (index, settings) in streams.iter().enumerate() {
		let encoder = registry.create(settings, index as u8, &options)?;

		Stream {
			encoder: Arc::new(encoder),
			transport: transport.clone(),
			fps: settings.fps,
			frames: config.frames,
			keyframe_interval: config.keyframe_interval,
			running: running.clone(),
		}
		.spawn(&mut tasks);
	}

	let mut interrupted = false;
	loop {
		tokio::select! {
			res = tasks.join_next() => match res {
				Some(res) => res??,
				None => break,
			},
			res = tokio::signal::ctrl_c(), if !interrupted => {
				res?;
				tracing::info!("interrupted, stopping streams");
				running.store(false, Ordering::Relaxed);
				interrupted = true;
			}
		}
	}

	let total = stats.snapshot();
	tracing::info!(
		frames = total.frames,
		shards = total.shards,
		lost = total.lost,
		bytes = total.bytes,
		"done"
	);

	Ok(())
}
