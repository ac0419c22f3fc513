//! Logging setup for binaries.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Tracing subscriber configuration.
///
/// `RUST_LOG` directives take priority over the level given here.
#[derive(Clone, Debug, clap::Args)]
pub struct Log {
	/// The default log level.
	#[arg(id = "log-level", long = "log-level", env = "FRAMEPIPE_LOG_LEVEL", default_value = "info")]
	pub level: Level,
}

impl Default for Log {
	fn default() -> Self {
		Self { level: Level::INFO }
	}
}

impl Log {
	/// Install a global fmt subscriber; does nothing if one is already installed.
	pub fn init(&self) {
		let filter = EnvFilter::builder()
			.with_default_directive(self.level.into())
			.from_env_lossy();

		let res = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(std::io::stderr)
			.with_thread_names(true)
			.try_init();

		if res.is_err() {
			tracing::debug!("tracing subscriber already installed");
		}
	}
}
