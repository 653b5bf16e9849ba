use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Install the JSON subscriber on stderr, filtered by `filter`
/// (e.g. `taskforge=info`).
///
/// `log` records from dependencies are bridged into tracing as well. Calling
/// this more than once keeps the first subscriber.
pub fn init_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .json()
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .try_init();
}
