// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The standard reason-phrase table and the status-code range check.
//!
//! Status codes are carried as plain `u16` values so that in-range codes
//! without a registered phrase (e.g. `599`) stay representable; such codes
//! default to an empty reason phrase.
//!
//! # References
//! * [RFC 9110 - Section 15. Status Codes](https://httpwg.org/specs/rfc9110.html#status.codes)
//! * [IANA HTTP Status Code Registry](https://www.iana.org/assignments/http-status-codes/http-status-codes.xhtml)

use phf::phf_map;

static REASON_PHRASES: phf::Map<u16, &'static str> = phf_map!(
    100u16 => "Continue",
    101u16 => "Switching Protocols",
    102u16 => "Processing",
    103u16 => "Early Hints",

    200u16 => "OK",
    201u16 => "Created",
    202u16 => "Accepted",
    203u16 => "Non-Authoritative Information",
    204u16 => "No Content",
    205u16 => "Reset Content",
    206u16 => "Partial Content",
    207u16 => "Multi-Status",
    208u16 => "Already Reported",
    226u16 => "IM Used",

    300u16 => "Multiple Choices",
    301u16 => "Moved Permanently",
    302u16 => "Found",
    303u16 => "See Other",
    304u16 => "Not Modified",
    305u16 => "Use Proxy",
    307u16 => "Temporary Redirect",
    308u16 => "Permanent Redirect",

    400u16 => "Bad Request",
    401u16 => "Unauthorized",
    402u16 => "Payment Required",
    403u16 => "Forbidden",
    404u16 => "Not Found",
    405u16 => "Method Not Allowed",
    406u16 => "Not Acceptable",
    407u16 => "Proxy Authentication Required",
    408u16 => "Request Timeout",
    409u16 => "Conflict",
    410u16 => "Gone",
    411u16 => "Length Required",
    412u16 => "Precondition Failed",
    413u16 => "Content Too Large",
    414u16 => "URI Too Long",
    415u16 => "Unsupported Media Type",
    416u16 => "Range Not Satisfiable",
    417u16 => "Expectation Failed",
    418u16 => "I'm a Teapot",
    421u16 => "Misdirected Request",
    422u16 => "Unprocessable Content",
    423u16 => "Locked",
    424u16 => "Failed Dependency",
    425u16 => "Too Early",
    426u16 => "Upgrade Required",
    428u16 => "Precondition Required",
    429u16 => "Too Many Requests",
    431u16 => "Request Header Fields Too Large",
    451u16 => "Unavailable For Legal Reasons",

    500u16 => "Internal Server Error",
    501u16 => "Not Implemented",
    502u16 => "Bad Gateway",
    503u16 => "Service Unavailable",
    504u16 => "Gateway Timeout",
    505u16 => "HTTP Version Not Supported",
    506u16 => "Variant Also Negotiates",
    507u16 => "Insufficient Storage",
    508u16 => "Loop Detected",
    510u16 => "Not Extended",
    511u16 => "Network Authentication Required",
);

/// Returns the registered reason phrase for `code`, if any.
#[must_use]
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    REASON_PHRASES.get(&code).copied()
}

/// Returns whether `code` lies in the valid `100..=599` range.
#[must_use]
pub fn is_valid_code(code: u16) -> bool {
    (100..=599).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(200, Some("OK"))]
    #[case(404, Some("Not Found"))]
    #[case(418, Some("I'm a Teapot"))]
    #[case(511, Some("Network Authentication Required"))]
    #[case(599, None)]
    #[case(218, None)]
    #[test]
    fn test_reason_phrase(#[case] code: u16, #[case] expected: Option<&str>) {
        assert_eq!(reason_phrase(code), expected);
    }

    #[rstest]
    #[case(99, false)]
    #[case(100, true)]
    #[case(599, true)]
    #[case(600, false)]
    #[case(0, false)]
    #[test]
    fn test_is_valid_code(#[case] code: u16, #[case] expected: bool) {
        assert_eq!(is_valid_code(code), expected);
    }
}
