use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Args, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
	/// The default log level, overridden per target by `RUST_LOG`.
	#[arg(id = "log-level", long = "log-level", default_value = "info", env = "XRCAST_LOG_LEVEL")]
	pub level: String,
}

impl Default for Log {
	fn default() -> Self {
		Self { level: "info".into() }
	}
}

impl Log {
	pub fn level(&self) -> LevelFilter {
		self.level.parse().unwrap_or(LevelFilter::INFO)
	}

	pub fn init(&self) {
		let filter = EnvFilter::builder()
			.with_default_directive(self.level().into())
			.from_env_lossy();

		tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(std::io::stderr)
			.init();
	}
}
