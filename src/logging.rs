//! Tracing subscriber setup for embedding applications.

/// Initializes a stderr tracing subscriber honoring `RUST_LOG`.
///
/// Defaults to the `warn` level when `RUST_LOG` is unset. Safe to call
/// more than once; later calls are ignored.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}
