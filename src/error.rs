// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use strum_macros::AsRefStr;

use std::fmt;
use std::io;

/// The crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Any error produced by this crate.
///
/// Errors fall into three groups: the caller handed in invalid input
/// ([`ValidationError`]), the caller operated on a value whose lifecycle
/// forbids the operation ([`StateError`]), or the underlying buffer/file
/// access failed ([`Error::Io`]). All errors are reported synchronously at
/// the violating call; no operation is ever partially applied.
#[derive(Debug)]
pub enum Error {
    Validation(ValidationError),
    State(StateError),
    Io(io::Error),
}

impl From<ValidationError> for Error {
    fn from(error: ValidationError) -> Self {
        Error::Validation(error)
    }
}

impl From<StateError> for Error {
    fn from(error: StateError) -> Self {
        Error::State(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(error) => error.fmt(f),
            Error::State(error) => error.fmt(f),
            Error::Io(error) => write!(f, "io error: {error}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            _ => None,
        }
    }
}

/// The caller violated an input contract.
#[derive(Clone, Debug, PartialEq, Eq, AsRefStr)]
pub enum ValidationError {
    /// A header was given an empty list of values.
    EmptyHeaderValue,

    /// A status code outside the `100..=599` range.
    ///
    /// ## Example:
    /// ```text
    /// response.with_status(99, None)
    /// ```
    InvalidStatusCode(u16),

    /// The URI string could not be split into its components, e.g. an
    /// authority marker with an empty authority and no path, or a port
    /// that is not a decimal number below 65536.
    InvalidUri(String),

    /// `Stream::read` was asked for zero bytes.
    ZeroReadLength,

    /// `UploadedFile::move_to` was given an empty target path.
    EmptyMoveTarget,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHeaderValue => f.write_str("header value must be non-empty"),
            Self::InvalidStatusCode(code) => write!(f, "invalid HTTP status code: {code}"),
            Self::InvalidUri(input) => write!(f, "unable to parse URI: \"{input}\""),
            Self::ZeroReadLength => f.write_str("length must be positive"),
            Self::EmptyMoveTarget => f.write_str("target path must be non-empty"),
        }
    }
}

/// The value's lifecycle forbids the requested operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr)]
pub enum StateError {
    /// The stream's handle has been released through `detach` or `close`.
    StreamDetached,

    /// The stream's handle was opened without read capability.
    StreamNotReadable,

    /// The stream's handle was opened without write capability.
    StreamNotWritable,

    /// The stream's handle does not support repositioning.
    StreamNotSeekable,

    /// The uploaded file has already been moved; the move is one-shot.
    UploadAlreadyMoved,

    /// The uploaded file carries a non-success error code.
    UploadFailed,

    /// The uploaded file has neither a stream nor a backing path.
    UploadUnavailable,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StreamDetached => "stream is detached",
            Self::StreamNotReadable => "stream is not readable",
            Self::StreamNotWritable => "stream is not writable",
            Self::StreamNotSeekable => "stream is not seekable",
            Self::UploadAlreadyMoved => "uploaded file has already been moved",
            Self::UploadFailed => "cannot access upload that carries an error code",
            Self::UploadUnavailable => "no stream or file available",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(ValidationError::EmptyHeaderValue.to_string(), "header value must be non-empty");
        assert_eq!(ValidationError::InvalidStatusCode(42).to_string(), "invalid HTTP status code: 42");
        assert_eq!(StateError::StreamDetached.to_string(), "stream is detached");
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(StateError::UploadAlreadyMoved.as_ref(), "UploadAlreadyMoved");
        assert_eq!(ValidationError::ZeroReadLength.as_ref(), "ZeroReadLength");
    }
}
