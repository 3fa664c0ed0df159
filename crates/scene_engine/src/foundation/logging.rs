//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with a fallback filter
///
/// `RUST_LOG` still wins when set. Calling this more than once is harmless;
/// only the first logger is installed.
pub fn init_with_level(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}
