//! Logging initialization.
//!
//! Logs always go to stderr; stdout carries reports and JSON output.
//! `RUST_LOG` overrides the level chosen from config and flags.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Pick the effective level: `--verbose` forces debug unless the config
/// already asks for trace; unknown config levels fall back to info.
pub fn resolve_level(config_level: &str, verbose: bool) -> &'static str {
    let configured = LEVELS
        .iter()
        .copied()
        .find(|l| l.eq_ignore_ascii_case(config_level.trim()))
        .unwrap_or("info");
    if verbose && configured != "trace" {
        "debug"
    } else {
        configured
    }
}

/// Install the global subscriber, pretty or JSON.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("prism={level},prism_core={level},warn")));

    let json_layer = json_format.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let pretty_layer = (!json_format).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_ansi(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .init();
}

/// Initialize from the `[logging]` section with CLI overrides.
pub fn init_from_config(config: &prism_core::Config, verbose: bool, json_logs: bool) {
    let level = resolve_level(&config.logging.level, verbose);
    let json_format = json_logs || config.logging.format.eq_ignore_ascii_case("json");
    init(level, json_format);
}
