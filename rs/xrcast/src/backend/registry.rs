use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use xrcast_wire::Shard;

use super::{Backend, Synthetic};
use crate::{
	BackendKind, Codec, Encoder, EncoderOptions, EncoderSettings, Error, NoopStats, PAYLOAD_RANGE, SharedSender, Stats,
};

/// Constructs the backend of one encode path.
pub trait Provider: Send + Sync {
	fn create(&self, settings: &EncoderSettings) -> anyhow::Result<Box<dyn Backend>>;
}

impl<F> Provider for F
where
	F: Fn(&EncoderSettings) -> anyhow::Result<Box<dyn Backend>> + Send + Sync,
{
	fn create(&self, settings: &EncoderSettings) -> anyhow::Result<Box<dyn Backend>> {
		self(settings)
	}
}

fn synthetic(settings: &EncoderSettings) -> anyhow::Result<Box<dyn Backend>> {
	Ok(Box::new(Synthetic::new(settings)?))
}

/// Options shared by every stream created from a [Registry].
#[derive(Clone)]
pub struct StreamOptions {
	/// Where streams get their sender worker.
	pub sender: SharedSender,

	/// Dump each stream's raw bitstream to `<prefix>-<stream index>.<codec>`.
	pub dump_video: Option<PathBuf>,

	/// The shard payload budget, within [PAYLOAD_RANGE].
	pub max_payload: usize,

	pub stats: Arc<dyn Stats>,
}

impl Default for StreamOptions {
	fn default() -> Self {
		Self {
			sender: SharedSender::new(),
			dump_video: None,
			max_payload: Shard::MAX_PAYLOAD,
			stats: Arc::new(NoopStats),
		}
	}
}

/// The path of the raw bitstream dump of a stream.
pub fn dump_path(prefix: &Path, stream_index: u8, codec: Codec) -> PathBuf {
	let mut file = prefix.as_os_str().to_owned();
	file.push(format!("-{}.{}", stream_index, codec.extension()));
	PathBuf::from(file)
}

/// The encode paths available to this process, and the factory of [Encoder]s.
///
/// A path is available when its cargo feature is enabled and a [Provider] was registered for it.
/// The synthetic backend is always registered.
pub struct Registry {
	providers: HashMap<BackendKind, Arc<dyn Provider>>,
}

impl Registry {
	pub fn new() -> Self {
		let mut registry = Self {
			providers: HashMap::new(),
		};

		registry.register(BackendKind::Synthetic, synthetic);

		registry
	}

	/// Register (or replace) the provider of an encode path.
	pub fn register<P: Provider + 'static>(&mut self, kind: BackendKind, provider: P) {
		self.providers.insert(kind, Arc::new(provider));
	}

	/// Whether streams can be created with this backend and codec.
	pub fn check(&self, backend: BackendKind, codec: Codec) -> Result<(), Error> {
		if !backend.is_enabled() {
			return Err(Error::UnsupportedBackend(backend));
		}

		if !backend.supports(codec) {
			return Err(Error::UnsupportedCodec { backend, codec });
		}

		if !self.providers.contains_key(&backend) {
			return Err(Error::UnsupportedBackend(backend));
		}

		Ok(())
	}

	/// The backends streams can be created with.
	pub fn available(&self) -> Vec<BackendKind> {
		BackendKind::ALL
			.into_iter()
			.filter(|kind| kind.is_enabled() && self.providers.contains_key(kind))
			.collect()
	}

	/// Create the encoder of one stream.
	pub fn create(&self, settings: &EncoderSettings, stream_index: u8, options: &StreamOptions) -> Result<Encoder, Error> {
		self.check(settings.backend, settings.codec)?;

		if !PAYLOAD_RANGE.contains(&options.max_payload) {
			return Err(Error::InvalidPayload(options.max_payload));
		}

		let provider = self
			.providers
			.get(&settings.backend)
			.ok_or(Error::UnsupportedBackend(settings.backend))?;

		let backend = provider.create(settings).map_err(|err| {
			tracing::warn!(stream = stream_index, backend = %settings.backend, %err, "failed to create backend");
			Error::BackendInit(Arc::new(err))
		})?;

		let sender = match backend.async_send() {
			true => Some(options.sender.get()?),
			false => None,
		};

		let dump: Option<Box<dyn Write + Send>> = match &options.dump_video {
			Some(prefix) => {
				let path = dump_path(prefix, stream_index, settings.codec);
				let file = File::create(&path).map_err(|err| Error::Dump(Arc::new(err)))?;
				tracing::info!(stream = stream_index, path = %path.display(), "dumping video");
				Some(Box::new(BufWriter::new(file)))
			}
			None => None,
		};

		tracing::info!(
			stream = stream_index,
			backend = %settings.backend,
			codec = %settings.codec,
			width = settings.width,
			height = settings.height,
			fps = settings.fps,
			"created encoder"
		);

		Ok(Encoder::new(
			stream_index,
			backend,
			EncoderOptions {
				sender,
				dump,
				max_payload: options.max_payload,
				stats: options.stats.clone(),
				..Default::default()
			},
		))
	}
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}
