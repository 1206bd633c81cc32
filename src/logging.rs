//! Logging initialization for the two binaries.
//!
//! Library code never initializes logging itself; only `src/bin/*.rs` calls
//! [`init`]. Level is controlled by a verbosity count (`-v`/`-q` flags) with
//! a `LINKER_LOG` environment variable as a fallback, mirroring the
//! grounding crate's env-var-driven logger. A `json:` level prefix
//! (`LINKER_LOG=json:debug`, or bare `json` for info) switches to a
//! structured JSON sink, the same prefix convention the grounding crate
//! uses for its own dual plain/JSON logger — built here on `env_logger`'s
//! custom formatter rather than a second `log::Log` implementation, since
//! `env_logger` already owns level filtering and output for both shapes.

use std::io::Write;

use log::{LevelFilter, Record};

/// Resolve a verbosity delta (`-v` occurrences minus `-q` occurrences) and
/// the `LINKER_LOG` environment variable into a single level and sink
/// format, then install `env_logger` as the global logger.
pub fn init(verbosity: i32) {
    let (use_json, level) = match std::env::var("LINKER_LOG") {
        Ok(raw) => resolve_env(&raw),
        Err(_) => (false, level_from_verbosity(verbosity)),
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if use_json {
        builder.format(format_json);
    } else {
        builder.format_timestamp_millis();
    }
    builder.init();
}

fn resolve_env(raw: &str) -> (bool, LevelFilter) {
    match raw.strip_prefix("json:") {
        Some(rest) => (true, parse_level(rest)),
        None if raw.eq_ignore_ascii_case("json") => (true, LevelFilter::Info),
        None => (false, parse_level(raw)),
    }
}

fn format_json(buf: &mut env_logger::fmt::Formatter, record: &Record<'_>) -> std::io::Result<()> {
    let entry = serde_json::json!({
        "timestamp": buf.timestamp_millis().to_string(),
        "level": record.level().to_string().to_lowercase(),
        "message": record.args().to_string(),
        "target": record.target(),
    });
    writeln!(buf, "{entry}")
}

fn level_from_verbosity(verbosity: i32) -> LevelFilter {
    match verbosity {
        i32::MIN..=-1 => LevelFilter::Error,
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn parse_level(s: &str) -> LevelFilter {
    match s.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    }
}
