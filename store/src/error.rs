// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::PathBuf;

use almanac_ical::ErrorKind;

/// Errors raised by component sets.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing storage failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Stored data or a gauge literal could not be handled.
    #[error(transparent)]
    Ical(#[from] almanac_ical::Error),

    /// The database rejected an operation.
    #[cfg(any(feature = "sqlite", feature = "sqlite-unbundled"))]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The database schema could not be brought up to date.
    #[cfg(any(feature = "sqlite", feature = "sqlite-unbundled"))]
    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// The database stayed busy through every retry.
    #[cfg(any(feature = "sqlite", feature = "sqlite-unbundled"))]
    #[error("gave up after {attempts} attempts: {source}")]
    Deadlock {
        /// Number of attempts made
        attempts: u32,
        /// Error of the last attempt
        #[source]
        source: sqlx::Error,
    },

    /// A change was committed to a set opened read-only.
    #[error("set {} is read-only", .0.display())]
    ReadOnly(PathBuf),

    /// Another handle holds the lock on the set.
    #[error("set {} is locked by another handle", .0.display())]
    Locked(PathBuf),

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The caller passed an argument the set cannot act on.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// The requested set kind is not compiled into this build.
    #[error("{0} is not available in this build")]
    Unimplemented(&'static str),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ical(err) => err.kind(),
            Self::Config(_) | Self::BadArgument(_) => ErrorKind::BadArgument,
            Self::Unimplemented(_) => ErrorKind::Unimplemented,
            Self::Io { .. } | Self::ReadOnly(_) | Self::Locked(_) => ErrorKind::FileError,
            #[cfg(any(feature = "sqlite", feature = "sqlite-unbundled"))]
            Self::Database(_) | Self::Migrate(_) | Self::Deadlock { .. } => ErrorKind::FileError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_ical_taxonomy() {
        let io = StoreError::io("/tmp/x.ics", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(io.kind(), ErrorKind::FileError);
        assert!(io.to_string().starts_with("I/O error on /tmp/x.ics"));

        let parse = StoreError::from(almanac_ical::Error::malformed("bad"));
        assert_eq!(parse.kind(), ErrorKind::MalformedData);

        assert_eq!(
            StoreError::Unimplemented("transactional sets").kind(),
            ErrorKind::Unimplemented
        );
        assert_eq!(
            StoreError::ReadOnly(PathBuf::from("a.ics")).kind(),
            ErrorKind::FileError
        );
    }
}
