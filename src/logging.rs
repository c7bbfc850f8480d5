//! Logging configuration for the crucible orchestrator
//!
//! Initialization helpers over the `log` and `env_logger` crates. Levels are
//! used as follows:
//!
//! - `warn!` - skipped references, degraded behavior
//! - `info!` - pipeline milestones (module loads, invocations)
//! - `debug!` - per-stage detail (emitted byte counts, log entries)
//!
//! Set `RUST_LOG` to control output at runtime, e.g. `RUST_LOG=debug` or
//! `RUST_LOG=crucible::service=debug`.

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging at the default level (Warn).
///
/// Only initializes once; subsequent calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Initialize logging at a specific level.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {} - {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}

/// Initialize logging from the `RUST_LOG` environment variable, defaulting
/// to Warn when unset.
pub fn init_from_env() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Initialize logging for tests. Safe to call from every test.
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}
