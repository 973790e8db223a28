pub use asset_gestalt::*;

/// Install the process logger, debug level for the asset crates and warn for everything else.
/// `RUST_LOG` overrides the defaults. Returns false if a logger was already installed
pub fn init_logging() -> bool
{
    #[cfg(debug_assertions)]
    let default_log_levels = (log::LevelFilter::Warn, log::LevelFilter::Debug);
    #[cfg(not(debug_assertions))]
    let default_log_levels = (log::LevelFilter::Warn, log::LevelFilter::Info);

    colog::basic_builder()
        .filter_level(default_log_levels.0)
        .filter_module("gestalt", default_log_levels.1)
        .filter_module("asset_gestalt", default_log_levels.1)
        .parse_default_env()
        .try_init()
        .is_ok()
}
