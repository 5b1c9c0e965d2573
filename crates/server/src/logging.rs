//! Structured logging init, matching the teacher's `tracing` +
//! `tracing-subscriber` pairing: an `EnvFilter` sourced from `RUST_LOG`
//! (default `info`), with an explicit `--log-level` flag taking priority.

pub fn init(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
