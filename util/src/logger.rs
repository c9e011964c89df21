//! Logger setup
//!
//! Every executable logs to stdout with coloured level tags and to a plain text log file inside its
//! session directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use colored::{ColoredString, Colorize};
use fern::FormatCallback;
use log::{info, Level, Record};
use std::{
    fmt::{Arguments, Display},
    str::FromStr,
};
use thiserror::Error;

use crate::session::{self, Session};

pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Log level must be `INFO` or more verbose, got `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Unrecognised log level `{0}`")]
    UnknownLogLevel(String),

    #[error("Could not open the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("Could not install the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Install the global logger.
///
/// `min_level` must be `Info` or more verbose since the planner lifecycle is logged at `Info`. May
/// only be called once per process.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let stdout = fern::Dispatch::new()
        .format(|out, message, record| {
            write_record(out, message, record, coloured_tag(record.level()))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            write_record(out, message, record, plain_tag(record.level()))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .level_for("zmq", LevelFilter::Info)
        .chain(stdout)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised at {:?}", min_level);
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log file: {:?}", session.log_file_path);

    Ok(())
}

/// Parse a log level from a parameter string such as `"debug"` or `"TRACE"`.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerInitError> {
    LevelFilter::from_str(level.trim())
        .map_err(|_| LoggerInitError::UnknownLogLevel(level.to_string()))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Write one log line, with the target only shown at debug and trace.
fn write_record<T: Display>(out: FormatCallback, message: &Arguments, record: &Record, tag: T) {
    let elapsed_s = session::get_elapsed_seconds();

    if record.level() > Level::Info {
        out.finish(format_args!("[{:10.4} {}] {}: {}", elapsed_s, tag, record.target(), message))
    } else {
        out.finish(format_args!("[{:10.4} {}] {}", elapsed_s, tag, message))
    }
}

fn coloured_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info => "INF".normal(),
        Level::Warn => "WRN".yellow(),
        Level::Error => "ERR".red().bold(),
    }
}

fn plain_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_level(" TRACE ").unwrap(), LevelFilter::Trace);
        assert!(matches!(parse_level("loud"), Err(LoggerInitError::UnknownLogLevel(_))));
    }

    #[test]
    fn test_tags_match() {
        for level in [Level::Trace, Level::Debug, Level::Info, Level::Warn, Level::Error].iter() {
            assert!(coloured_tag(*level).to_string().contains(plain_tag(*level)));
        }
    }
}
