// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use crate::{
    status,
    HeaderMap,
    HttpVersion,
    Message,
    MessageHead,
    Result,
    Stream,
    ValidationError,
};

/// An immutable response.
///
/// The status code must lie in `100..=599`. When no reason phrase is
/// supplied it defaults from the standard phrase table; codes without a
/// registered phrase get the empty string.
#[derive(Clone, Debug)]
pub struct Response {
    head: MessageHead,
    status: u16,
    reason: String,
}

impl Message for Response {
    fn head(&self) -> &MessageHead {
        &self.head
    }

    fn with_head(&self, head: MessageHead) -> Self {
        Response {
            head,
            status: self.status,
            reason: self.reason.clone(),
        }
    }
}

impl Response {
    /// A response with no headers, a lazily-defaulted empty body, and
    /// protocol version 1.1.
    pub fn new(code: u16) -> Result<Response> {
        Response::with_parts(code, HeaderMap::new(), None, HttpVersion::default(), None)
    }

    /// Fully parameterized construction. An empty or absent `reason`
    /// defaults from the phrase table.
    pub fn with_parts(
        code: u16,
        headers: HeaderMap,
        body: Option<Stream>,
        version: HttpVersion,
        reason: Option<&str>,
    ) -> Result<Response> {
        if !status::is_valid_code(code) {
            return Err(ValidationError::InvalidStatusCode(code).into());
        }

        Ok(Response {
            head: MessageHead::new(version, headers, body),
            status: code,
            reason: resolve_reason(code, reason),
        })
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }

    /// Replace the status line. Returns an equal value when both the code
    /// and the resolved reason already match.
    pub fn with_status(&self, code: u16, reason: Option<&str>) -> Result<Response> {
        if !status::is_valid_code(code) {
            return Err(ValidationError::InvalidStatusCode(code).into());
        }

        let reason = resolve_reason(code, reason);

        if code == self.status && reason == self.reason {
            return Ok(self.clone());
        }

        let mut new = self.clone();
        new.status = code;
        new.reason = reason;
        Ok(new)
    }
}

fn resolve_reason(code: u16, reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => reason.to_string(),
        _ => status::reason_phrase(code).unwrap_or("").to_string(),
    }
}
