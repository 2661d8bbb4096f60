// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Byte classifications for the URI component grammar, and the
//! percent-encoder built on top of them.
//!
//! # References
//! * [RFC 3986 - Section 2. Characters](https://www.rfc-editor.org/rfc/rfc3986.html#section-2)

use std::borrow::Cow;

/// ```text
/// unreserved     = ALPHA / DIGIT / "-" / "." / "_" / "~"
/// ```
#[inline]
fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// ```text
/// sub-delims     = "!" / "$" / "&" / "'" / "(" / ")"
///                / "*" / "+" / "," / ";" / "="
/// ```
#[inline]
fn is_sub_delim(byte: u8) -> bool {
    matches!(byte, b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'=')
}

/// Is the byte allowed, unencoded, inside a path component?
///
/// `pchar` plus the segment separator, so a whole path can be classified in
/// one pass. Percent signs are handled separately by [`percent_encode`].
///
/// ```text
/// pchar          = unreserved / pct-encoded / sub-delims / ":" / "@"
/// ```
#[inline]
pub fn is_path_character(byte: u8) -> bool {
    is_unreserved(byte) || is_sub_delim(byte) || matches!(byte, b':' | b'@' | b'/')
}

/// Is the byte allowed, unencoded, inside a query or fragment component?
///
/// ```text
/// query          = *( pchar / "/" / "?" )
/// fragment       = *( pchar / "/" / "?" )
/// ```
#[inline]
pub fn is_query_or_fragment_character(byte: u8) -> bool {
    is_path_character(byte) || byte == b'?'
}

#[inline]
fn is_hex_digit(byte: u8) -> bool {
    byte.is_ascii_hexdigit()
}

/// Percent-encode every byte of `input` that `is_allowed` rejects.
///
/// A `%` that already introduces a valid `%XX` triple is copied through
/// verbatim, so feeding a canonically encoded component back in is the
/// identity transformation. A bare or malformed `%` is itself encoded.
pub fn percent_encode(input: &str, is_allowed: fn(u8) -> bool) -> Cow<'_, str> {
    let bytes = input.as_bytes();

    let needs_encoding = |index: usize, byte: u8| {
        if byte == b'%' {
            !(index + 2 < bytes.len() && is_hex_digit(bytes[index + 1]) && is_hex_digit(bytes[index + 2]))
        } else {
            !is_allowed(byte)
        }
    };

    if !bytes.iter().enumerate().any(|(index, byte)| needs_encoding(index, *byte)) {
        return Cow::Borrowed(input);
    }

    let mut encoded = String::with_capacity(input.len() + 8);
    for (index, byte) in bytes.iter().enumerate() {
        if needs_encoding(index, *byte) {
            encoded.push_str(&format!("%{byte:02X}"));
        } else {
            encoded.push(*byte as char);
        }
    }

    Cow::Owned(encoded)
}
