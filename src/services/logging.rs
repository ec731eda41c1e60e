//! Diagnostic logging setup.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber, writing to stderr so stdout stays free for
/// the message protocol.
///
/// With `debug` off the level is pinned to `info` and `RUST_LOG` is ignored;
/// with it on, `RUST_LOG` may override the `debug` default. Calling this more
/// than once is harmless.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
