//! Logging bootstrap.

use log::LevelFilter;

/// Map `-v` count and `--quiet` to a level filter.
pub fn level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install env_logger at the level for `verbose` and `quiet`.
///
/// Safe to call more than once; later calls leave the first logger in
/// place.
pub fn init(verbose: u8, quiet: bool) {
    let _ = env_logger::Builder::new()
        .filter_level(level(verbose, quiet))
        .format_timestamp(None)
        .try_init();
}
