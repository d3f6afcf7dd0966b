use env_logger::Builder;
use log::LevelFilter;
use std::str::FromStr;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test logging once per test binary.
///
/// Only errors are shown unless LOG_LEVEL names another level
/// (`LOG_LEVEL=debug cargo test`).
pub fn init_test_logging() {
    INIT.call_once(|| {
        let level = std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|level| LevelFilter::from_str(&level).ok())
            .unwrap_or(LevelFilter::Error);

        // try_init: another harness may already have installed a logger
        let _ = Builder::from_default_env()
            .filter_level(level)
            .is_test(true)
            .try_init();
    });
}
