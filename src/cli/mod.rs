#![forbid(unsafe_code)]

//! Library side of the `genebank` command-line tool.
//!
//! Each command is a plain function taking a config struct and returning a
//! serializable report, so the binary only parses flags and prints.

mod build;
mod inspect;
mod logging;
mod search;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::IndexError;

pub use build::{
    default_output_path, run_build, run_build_with_progress, BuildConfig, BuildReport,
};
pub use inspect::{run_dump, run_stats, run_verify};
pub use logging::{init_logging, level_directive};
pub use search::{run_search, run_search_with, SearchConfig, SearchHit, SearchReport};

/// Process exit status for a successful run.
pub const EXIT_OK: i32 = 0;
/// Bad invocation.
pub const EXIT_USAGE: i32 = 1;
/// Read or write failure.
pub const EXIT_IO: i32 = 2;
/// Degree below the accepted range.
pub const EXIT_DEGREE: i32 = 3;
/// Key length outside `1..=31`.
pub const EXIT_KEY_LENGTH: i32 = 4;
/// An input file does not exist.
pub const EXIT_NOT_FOUND: i32 = 404;

/// Error type for command-line operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid invocation.
    #[error("{0}")]
    Usage(String),
    /// A required input file is missing.
    #[error("{}: no such file", .0.display())]
    NotFound(PathBuf),
    /// Index failure.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Usage(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Usage(value)
    }
}

impl CliError {
    /// Exit status reported to the shell for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => EXIT_USAGE,
            CliError::NotFound(_) => EXIT_NOT_FOUND,
            CliError::Index(IndexError::InvalidDegree(_)) => EXIT_DEGREE,
            CliError::Index(IndexError::InvalidKeyLength(_)) => EXIT_KEY_LENGTH,
            CliError::Index(IndexError::InvalidKey(_)) => EXIT_USAGE,
            CliError::Index(err) if err.is_not_found() => EXIT_NOT_FOUND,
            CliError::Index(_) => EXIT_IO,
            CliError::Io(err) if err.kind() == io::ErrorKind::NotFound => EXIT_NOT_FOUND,
            CliError::Io(_) => EXIT_IO,
        }
    }
}

/// Fails with [`CliError::NotFound`] unless `path` is an existing file.
pub(crate) fn require_file(path: &std::path::Path) -> Result<(), CliError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::NotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(CliError::from("bad flag").exit_code(), 1);
        assert_eq!(CliError::NotFound("x.gbk".into()).exit_code(), 404);
        assert_eq!(CliError::from(IndexError::InvalidDegree(-2)).exit_code(), 3);
        assert_eq!(
            CliError::from(IndexError::InvalidKeyLength(40)).exit_code(),
            4
        );
        assert_eq!(
            CliError::from(IndexError::Corruption("bad block".into())).exit_code(),
            2
        );
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(CliError::from(IndexError::Io(missing)).exit_code(), 404);
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "no");
        assert_eq!(CliError::from(denied).exit_code(), 2);
    }

    #[test]
    fn not_found_message_names_the_file() {
        let err = CliError::NotFound("data/test0.gbk".into());
        assert_eq!(err.to_string(), "data/test0.gbk: no such file");
    }
}
