use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber. `RUST_LOG` wins over the configured filter.
///
/// With `to_stderr` off, events are still filtered but written nowhere, which keeps
/// the dashboard's alternate screen clean.
pub fn init_logging(config_filter: Option<&str>, to_stderr: bool) {
	let filter = std::env::var("RUST_LOG")
		.ok()
		.or_else(|| config_filter.map(str::to_string))
		.unwrap_or_else(|| DEFAULT_FILTER.to_string());

	let writer = if to_stderr {
		BoxMakeWriter::new(std::io::stderr)
	} else {
		BoxMakeWriter::new(std::io::sink)
	};

	// a second init (tests, repeated calls) keeps the first subscriber
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
		.with_writer(writer)
		.compact()
		.try_init();
}
