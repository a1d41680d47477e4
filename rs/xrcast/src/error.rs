use std::sync::Arc;

use crate::{BackendKind, Codec};

#[derive(Debug, thiserror::Error, Clone)]
pub enum Error {
	#[error("backend not enabled: {0}")]
	UnsupportedBackend(BackendKind),

	#[error("{codec} not supported by {backend}")]
	UnsupportedCodec { backend: BackendKind, codec: Codec },

	#[error("backend init failed: {0}")]
	BackendInit(Arc<anyhow::Error>),

	#[error("present failed: {0}")]
	Present(Arc<anyhow::Error>),

	#[error("encode failed: {0}")]
	Encode(Arc<anyhow::Error>),

	#[error("slot {slot} was not presented")]
	NotPresented { slot: usize },

	#[error("invalid payload budget: {0} bytes")]
	InvalidPayload(usize),

	#[error("dump error: {0}")]
	Dump(Arc<std::io::Error>),

	#[error("failed to spawn sender: {0}")]
	Spawn(Arc<std::io::Error>),
}

impl Error {
	/// Configuration errors abort stream startup, everything else is per-frame.
	pub fn is_configuration(&self) -> bool {
		matches!(
			self,
			Error::UnsupportedBackend(_)
				| Error::UnsupportedCodec { .. }
				| Error::BackendInit(_)
				| Error::InvalidPayload(_)
				| Error::Dump(_)
				| Error::Spawn(_)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::io;

	#[test]
	fn test_configuration() {
		assert!(Error::Spawn(Arc::new(io::Error::other("no threads"))).is_configuration());
		assert!(Error::InvalidPayload(64).is_configuration());
		assert!(Error::UnsupportedBackend(BackendKind::Nvenc).is_configuration());

		assert!(!Error::NotPresented { slot: 1 }.is_configuration());
		assert!(!Error::Encode(Arc::new(anyhow::anyhow!("encoder hung"))).is_configuration());
	}
}
