//  LOGGING.rs
//    by Lut99
//
//  Created:
//    17 Oct 2026, 09:40:13
//  Last edited:
//    17 Oct 2026, 15:44:50
//  Auto updated?
//    Yes
//
//  Description:
//!   Sets up the process-wide logger.
//

use std::error::Error as StdError;
use std::str::FromStr;

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;


/***** ERRORS *****/
/// Defines errors that occur when configuring the logger.
#[derive(Debug, Error)]
pub enum Error {
    /// The given level is not a level.
    #[error("Illegal log level {raw:?} (expected one of 'trace', 'debug', 'info', 'warn' or 'error')")]
    IllegalLevel { raw: String },
    /// The given format is not a format.
    #[error("Illegal log format {raw:?} (expected one of 'console' or 'json')")]
    IllegalFormat { raw: String },
    /// A logger was already installed.
    #[error("Failed to install logger")]
    Init {
        #[source]
        err: Box<dyn 'static + Send + Sync + StdError>,
    },
}





/***** LIBRARY *****/
/// The shapes in which log lines can be written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogFormat {
    /// Human-readable lines.
    Console,
    /// One JSON object per line.
    Json,
}
impl FromStr for LogFormat {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console" => Ok(Self::Console),
            "json" => Ok(Self::Json),
            raw => Err(Error::IllegalFormat { raw: raw.into() }),
        }
    }
}



/// Parses a log level as given on the command line.
///
/// # Errors
/// This function errors if `raw` is not one of `trace`, `debug`, `info`, `warn` or `error`.
pub fn parse_level(raw: &str) -> Result<LevelFilter, Error> {
    match raw.to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        _ => Err(Error::IllegalLevel { raw: raw.into() }),
    }
}

/// Installs the process-wide logger.
///
/// Directives in `RUST_LOG` take precedence over `level`.
///
/// # Arguments
/// - `level`: The default level, as given on the command line.
/// - `format`: The [`LogFormat`], as given on the command line.
///
/// # Errors
/// This function errors if `level` or `format` are illegal, or if a logger was already installed.
pub fn configure(level: &str, format: &str) -> Result<(), Error> {
    let level: LevelFilter = parse_level(level)?;
    let format: LogFormat = format.parse()?;
    let filter: EnvFilter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Console => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|err| Error::Init { err })
}





/***** TESTS *****/
