//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    // A second call is a no-op rather than a panic.
    let _ = env_logger::Builder::from_default_env().try_init();
}

/// Initialize the logging system with an explicit filter such as `"info"` or
/// `"scene_runtime=debug"`. `RUST_LOG`, when set, takes precedence.
pub fn init_with_filter(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
