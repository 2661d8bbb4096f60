// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt;

use phf::phf_map;

/// A request method token.
///
/// Methods are case-sensitive, as per
/// [RFC 9110 - Section 9.1](https://www.rfc-editor.org/rfc/rfc9110.html#section-9.1-5):
/// > The method token is case-sensitive because it might be used as a
/// > gateway to object-based systems with case-sensitive method names.
///
/// Only the exact uppercase registered tokens map onto the named variants;
/// every other token, including differently-cased spellings, round-trips
/// unchanged through [`Method::Other`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Other(String),
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

static METHOD_MAP: phf::Map<&'static str, Method> = phf_map!(
    "CONNECT" => Method::Connect,
    "DELETE" => Method::Delete,
    "GET" => Method::Get,
    "HEAD" => Method::Head,
    "OPTIONS" => Method::Options,
    "PATCH" => Method::Patch,
    "POST" => Method::Post,
    "PUT" => Method::Put,
    "TRACE" => Method::Trace,
);

impl Method {
    /// The method in its wire form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Other(token) => token,
            Self::Connect => "CONNECT",
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Method {
    fn from(value: &str) -> Self {
        match METHOD_MAP.get(value) {
            Some(method) => method.clone(),
            None => Method::Other(value.to_string()),
        }
    }
}

impl From<String> for Method {
    fn from(value: String) -> Self {
        match METHOD_MAP.get(value.as_str()) {
            Some(method) => method.clone(),
            None => Method::Other(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_map_matches_wire_form() {
        for (token, method) in METHOD_MAP.entries() {
            assert_eq!(*token, method.as_str(), "mismatched entry: \"{token}\"");
        }
    }

    #[rstest]
    #[case("GET", Method::Get)]
    #[case("get", Method::Other(String::from("get")))]
    #[case("Post", Method::Other(String::from("Post")))]
    #[case("POST", Method::Post)]
    #[case("PATCH", Method::Patch)]
    #[case("PURGE", Method::Other(String::from("PURGE")))]
    #[test]
    fn test_case_sensitivity(#[case] input: &str, #[case] expected: Method) {
        assert_eq!(Method::from(input), expected);
        assert_eq!(Method::from(input).as_str(), input);
    }
}
