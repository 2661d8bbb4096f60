// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt;

/// The protocol version carried by a message.
///
/// `Http11` is the default for every constructed message.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpVersion {
    Http09,
    Http10,
    #[default]
    Http11,
    Http2,
    Http3,
}

impl HttpVersion {
    /// The version number without the `HTTP/` prefix, e.g. `"1.1"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http09 => "0.9",
            Self::Http10 => "1.0",
            Self::Http11 => "1.1",
            Self::Http2 => "2",
            Self::Http3 => "3",
        }
    }

    /// Parse a version from a protocol string such as `"HTTP/1.1"`, or from
    /// the bare version number `"1.1"`. The major-only and `major.0` forms
    /// of HTTP/2 and HTTP/3 are both accepted.
    #[must_use]
    pub fn from_protocol(value: &str) -> Option<HttpVersion> {
        let version = value.strip_prefix("HTTP/").unwrap_or(value);
        match version {
            "0.9" => Some(Self::Http09),
            "1.0" => Some(Self::Http10),
            "1.1" => Some(Self::Http11),
            "2" | "2.0" => Some(Self::Http2),
            "3" | "3.0" => Some(Self::Http3),
            _ => None,
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
