//! Command handlers. Each returns a process exit code: 0 success, 1 error.

pub mod generate;
pub mod init;
pub mod tabulate;

use tracing::error;

/// Report an error on stderr and in the log; returns exit code 1.
pub(crate) fn fail(context: &str, err: impl std::fmt::Display) -> i32 {
    error!("{}: {}", context, err);
    eprintln!("Error: {}", err);
    1
}
