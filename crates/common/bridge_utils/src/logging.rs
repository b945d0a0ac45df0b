use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Initialize a `tracing_subscriber`
///
/// Reports all the log events sent either with the `log` crate or the `tracing` crate.
///
/// The `RUST_LOG` environment variable takes precedence, if set.
/// Otherwise, if `debug` is `false` then only `error!`, `warn!` and `info!` are reported,
/// and if `debug` is `true` then `debug!` events are reported too.
pub fn initialise_tracing_subscriber(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_timer(UtcTime::rfc_3339())
        .with_env_filter(filter)
        .init();
}
