// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use once_cell::sync::OnceCell;

use crate::{
    HeaderMap,
    HeaderValue,
    HttpVersion,
    Result,
    Stream,
};

/// The state every message kind shares: protocol version, headers, body.
///
/// Embedded by value inside [`crate::Request`], [`crate::Response`] and
/// [`crate::ServerRequest`]; cloning it is the shallow copy-on-write step,
/// so the body stream is shared between a value and its derivations until
/// one of them replaces it.
#[derive(Clone, Debug, Default)]
pub struct MessageHead {
    pub(crate) version: HttpVersion,
    pub(crate) headers: HeaderMap,
    body: OnceCell<Stream>,
}

impl MessageHead {
    pub(crate) fn new(version: HttpVersion, headers: HeaderMap, body: Option<Stream>) -> MessageHead {
        MessageHead {
            version,
            headers,
            body: match body {
                Some(stream) => OnceCell::from(stream),
                None => OnceCell::new(),
            },
        }
    }

    /// The body stream, lazily defaulted to an empty in-memory stream the
    /// first time it is asked for.
    pub(crate) fn body(&self) -> &Stream {
        self.body.get_or_init(|| Stream::create(Vec::new()))
    }

    pub(crate) fn body_if_set(&self) -> Option<&Stream> {
        self.body.get()
    }

    pub(crate) fn set_body(&mut self, body: Stream) {
        self.body = OnceCell::from(body);
    }
}

/// The operations shared by every message kind.
///
/// Implementors provide access to their [`MessageHead`] and a way to
/// rebuild themselves around a modified head; everything else is derived.
/// All `with_*` methods are copy-on-write: the receiver is never touched,
/// and the returned value is fully independent except for the body stream,
/// which stays shared until replaced.
pub trait Message: Clone {
    fn head(&self) -> &MessageHead;

    /// Rebuild this value around `head`, keeping every non-message field.
    #[must_use]
    fn with_head(&self, head: MessageHead) -> Self;

    fn protocol_version(&self) -> HttpVersion {
        self.head().version
    }

    /// Returns an equal value when `version` already matches.
    #[must_use]
    fn with_protocol_version(&self, version: HttpVersion) -> Self {
        if version == self.head().version {
            return self.clone();
        }

        let mut head = self.head().clone();
        head.version = version;
        self.with_head(head)
    }

    fn headers(&self) -> &HeaderMap {
        &self.head().headers
    }

    fn has_header(&self, name: &str) -> bool {
        self.head().headers.contains(name)
    }

    /// The ordered values for `name`; empty when absent, never an error.
    fn header(&self, name: &str) -> &[String] {
        self.head().headers.get(name)
    }

    /// The values for `name` joined with `", "`; empty when absent.
    fn header_line(&self, name: &str) -> String {
        self.head().headers.get_line(name)
    }

    /// Replace `name` (case-insensitively) with `value`, remembering the
    /// newly supplied casing.
    fn with_header(&self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Result<Self> {
        let mut head = self.head().clone();
        head.headers.set(name, value)?;
        Ok(self.with_head(head))
    }

    /// Append `value` onto `name`, preserving the stored casing and value
    /// order; equivalent to [`Message::with_header`] when absent.
    fn with_added_header(&self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Result<Self> {
        let mut head = self.head().clone();
        head.headers.append(name, value)?;
        Ok(self.with_head(head))
    }

    /// Remove `name` (case-insensitively); returns an equal value when the
    /// header is absent.
    #[must_use]
    fn without_header(&self, name: &str) -> Self {
        if !self.head().headers.contains(name) {
            return self.clone();
        }

        let mut head = self.head().clone();
        head.headers.remove(name);
        self.with_head(head)
    }

    /// The body stream. Lazily defaults to an empty in-memory stream.
    fn body(&self) -> &Stream {
        self.head().body()
    }

    /// Replace the body; returns an equal value when `body` is the same
    /// stream instance already attached.
    #[must_use]
    fn with_body(&self, body: Stream) -> Self {
        if let Some(current) = self.head().body_if_set() {
            if current.same_instance(&body) {
                return self.clone();
            }
        }

        let mut head = self.head().clone();
        head.set_body(body);
        self.with_head(head)
    }
}
