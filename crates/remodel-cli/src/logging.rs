//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Install the global subscriber, logging to stderr
///
/// `--debug` forces the `debug` level; otherwise `RUST_LOG` is honoured with
/// `info` as the fallback.
pub(crate) fn init(debug: bool, json: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
