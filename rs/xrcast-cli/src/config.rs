use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use xrcast::wire::Shard;
use xrcast::{BackendKind, Codec, EncoderSettings, PAYLOAD_RANGE};

#[derive(Args, Clone, Debug)]
pub struct Config {
	/// A TOML file listing the streams, replacing the stream flags below.
	#[arg(long, env = "XRCAST_CONFIG")]
	pub config: Option<PathBuf>,

	/// Where shards are sent.
	#[arg(long, env = "XRCAST_DESTINATION", default_value = "127.0.0.1:9944")]
	pub destination: SocketAddr,

	/// The local address to send from.
	#[arg(long, env = "XRCAST_BIND", default_value = "0.0.0.0:0")]
	pub bind: SocketAddr,

	/// Dump each stream's bitstream to `<prefix>-<stream>.<codec>`.
	#[arg(long, env = "XRCAST_DUMP_VIDEO")]
	pub dump_video: Option<PathBuf>,

	/// Stop after this many frames per stream, or run until interrupted.
	#[arg(long)]
	pub frames: Option<u64>,

	/// Request a keyframe every N frames, simulating loss reports. 0 only requests the first one.
	#[arg(long, default_value_t = 0)]
	pub keyframe_interval: u64,

	/// The payload budget of a shard, at most the largest payload a receiver accepts.
	#[arg(long, default_value_t = Shard::MAX_PAYLOAD)]
	pub max_payload: usize,

	#[command(flatten)]
	pub stream: StreamArgs,
}

/// Identical streams configured from the command line.
#[derive(Args, Clone, Debug)]
pub struct StreamArgs {
	/// The number of streams (one per eye, typically).
	#[arg(long, default_value_t = 2)]
	pub streams: u8,

	#[arg(long, default_value_t = BackendKind::Synthetic)]
	pub backend: BackendKind,

	#[arg(long, default_value_t = Codec::H264)]
	pub codec: Codec,

	#[arg(long, default_value_t = 1920)]
	pub width: u32,

	#[arg(long, default_value_t = 1080)]
	pub height: u32,

	#[arg(long, default_value_t = 90.0)]
	pub fps: f32,

	/// In bits per second.
	#[arg(long, default_value_t = 50_000_000)]
	pub bitrate: u64,
}

impl StreamArgs {
	fn settings(&self) -> EncoderSettings {
		EncoderSettings {
			backend: self.backend,
			codec: self.codec,
			width: self.width,
			height: self.height,
			fps: self.fps,
			bitrate: self.bitrate,
		}
	}
}

/// The content of the file given with `--config`.
///
/// ```toml
/// [[stream]]
/// backend = "nvenc"
/// codec = "h265"
///
/// [[stream]]
/// backend = "synthetic"
/// bitrate = 20000000
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StreamsFile {
	pub stream: Vec<EncoderSettings>,
}

impl StreamsFile {
	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
		let file: Self = toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
		Ok(file)
	}
}

impl Config {
	/// The settings of every stream, indexed by stream index.
	pub fn streams(&self) -> anyhow::Result<Vec<EncoderSettings>> {
		anyhow::ensure!(
			PAYLOAD_RANGE.contains(&self.max_payload),
			"max payload must be within {}..={} bytes, got {}",
			PAYLOAD_RANGE.start(),
			PAYLOAD_RANGE.end(),
			self.max_payload
		);

		let streams = match &self.config {
			Some(path) => StreamsFile::load(path)?.stream,
			None => vec![self.stream.settings(); self.stream.streams as usize],
		};

		anyhow::ensure!(!streams.is_empty(), "no streams configured");
		anyhow::ensure!(streams.len() <= u8::MAX as usize + 1, "too many streams: {}", streams.len());

		for (index, settings) in streams.iter().enumerate() {
			anyhow::ensure!(settings.fps > 0.0, "stream {index}: invalid frame rate {}", settings.fps);
		}

		Ok(streams)
	}
}
