use tracing_subscriber::EnvFilter;

/// Send structured events to stderr so stdout stays free for reports.
/// `RUST_LOG` overrides the default `expenses=info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("expenses=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
