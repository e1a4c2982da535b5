use std::path::PathBuf;
use thiserror::Error;

/// Errors at the driver boundary: file I/O and argument validation, never
/// a Monke-language error (those stay `Value::Error`, spec §7).
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("could not read {0}: {1}")]
    ReadFile(PathBuf, #[source] std::io::Error),

    #[error("could not read from stdin: {0}")]
    ReadStdin(#[source] std::io::Error),
}
