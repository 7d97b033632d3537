// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy shared by the data model, the parser and the stores.

use std::ops::Range;

/// Category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// Text does not conform to a value, property or component grammar.
    MalformedData,

    /// The caller passed an invalid handle, index or argument.
    BadArgument,

    /// Storage I/O failed.
    FileError,

    /// The requested storage kind or operation is not available in this build.
    Unimplemented,

    /// An invariant inside the library was violated.
    Internal,
}

/// Errors returned by this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed input data.
    #[error("malformed data: {message}")]
    MalformedData {
        /// Description of the problem
        message: String,
        /// Byte range in the source text, when known
        span: Option<Range<usize>>,
    },

    /// Invalid argument from the caller.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Storage I/O failure.
    #[error("file error: {0}")]
    FileError(String),

    /// Operation not available in this build.
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// Library defect.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a [`Error::MalformedData`] without source location.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedData {
            message: message.into(),
            span: None,
        }
    }

    /// Creates a [`Error::MalformedData`] pointing at `span` in the source.
    pub fn malformed_at(message: impl Into<String>, span: Range<usize>) -> Self {
        Self::MalformedData {
            message: message.into(),
            span: Some(span),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedData { .. } => ErrorKind::MalformedData,
            Self::BadArgument(_) => ErrorKind::BadArgument,
            Self::FileError(_) => ErrorKind::FileError,
            Self::Unimplemented(_) => ErrorKind::Unimplemented,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Byte range of the offending input, if the error came from parsing.
    #[must_use]
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            Self::MalformedData { span, .. } => span.clone(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::FileError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_displays_kebab_case() {
        assert_eq!(ErrorKind::MalformedData.to_string(), "malformed-data");
        assert_eq!(ErrorKind::FileError.as_ref(), "file-error");
    }

    #[test]
    fn error_reports_kind_and_span() {
        let err = Error::malformed_at("bad date", 3..11);
        assert_eq!(err.kind(), ErrorKind::MalformedData);
        assert_eq!(err.span(), Some(3..11));
        assert_eq!(err.to_string(), "malformed data: bad date");

        let err = Error::BadArgument("no such component".to_string());
        assert_eq!(err.kind(), ErrorKind::BadArgument);
        assert_eq!(err.span(), None);
    }
}
