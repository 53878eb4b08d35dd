use env_logger::{Builder, Env, Target};

/// Logs go to stderr so stdout only carries command output. `RUST_LOG`
/// overrides the default `info` filter.
pub fn init_logging() {
    let _ = builder().try_init();
}

fn builder() -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.target(Target::Stderr).format_timestamp_secs();
    builder
}
