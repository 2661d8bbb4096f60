// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::borrow::Cow;

use crate::{
    HeaderMap,
    HttpVersion,
    Message,
    MessageHead,
    Method,
    Stream,
    Uri,
};

/// An immutable client-side request.
///
/// Construction synthesizes a `Host` header from the URI when none was
/// supplied, keeping it first in header iteration order. Evolution happens
/// exclusively through `with_*` methods, each returning a new value.
#[derive(Clone, Debug)]
pub struct Request {
    head: MessageHead,
    method: Method,
    /// Empty means "derive the target from the URI".
    request_target: String,
    uri: Uri,
}

impl Message for Request {
    fn head(&self) -> &MessageHead {
        &self.head
    }

    fn with_head(&self, head: MessageHead) -> Self {
        Request {
            head,
            method: self.method.clone(),
            request_target: self.request_target.clone(),
            uri: self.uri.clone(),
        }
    }
}

impl Request {
    /// A request with no headers, a lazily-defaulted empty body, and
    /// protocol version 1.1.
    #[must_use]
    pub fn new(method: impl Into<Method>, uri: Uri) -> Request {
        Request::with_parts(method, uri, HeaderMap::new(), None, HttpVersion::default())
    }

    /// Fully parameterized construction. `headers` is the initial bulk set;
    /// `Host` is synthesized from `uri` only when the set carries none.
    #[must_use]
    pub fn with_parts(
        method: impl Into<Method>,
        uri: Uri,
        headers: HeaderMap,
        body: Option<Stream>,
        version: HttpVersion,
    ) -> Request {
        let mut request = Request {
            head: MessageHead::new(version, headers, body),
            method: method.into(),
            request_target: String::new(),
            uri,
        };

        if !request.head.headers.contains("host") && !request.uri.host().is_empty() {
            request.update_host_from_uri();
        }

        request
    }

    /// Derive the `Host` header from the current URI and force it to the
    /// front of the iteration order. No-op when the URI has no host.
    fn update_host_from_uri(&mut self) {
        let host = self.uri.host();
        if host.is_empty() {
            return;
        }

        let host = match self.uri.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        // A host derived from an already-normalized URI cannot be an empty
        // value list, so this cannot fail.
        let _ = self.head.headers.insert_first("Host", host);
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns an equal value when `method` already matches.
    #[must_use]
    pub fn with_method(&self, method: impl Into<Method>) -> Request {
        let method = method.into();
        if method == self.method {
            return self.clone();
        }

        let mut new = self.clone();
        new.method = method;
        new
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Replace the URI. The `Host` header is re-derived from the new URI
    /// unless `preserve_host` is set and a `Host` header already exists.
    #[must_use]
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Request {
        let keep_host = preserve_host && self.head.headers.contains("host");

        let mut new = self.clone();
        new.uri = uri;

        if !keep_host {
            new.update_host_from_uri();
        }

        new
    }

    /// The explicit override verbatim when one was set; otherwise the URI
    /// path (defaulting to `/`) plus `?query` when the query is non-empty.
    #[must_use]
    pub fn request_target(&self) -> Cow<'_, str> {
        if !self.request_target.is_empty() {
            return Cow::Borrowed(&self.request_target);
        }

        let path = self.uri.path();
        let query = self.uri.query();

        if query.is_empty() {
            if path.is_empty() {
                return Cow::Borrowed("/");
            }
            return Cow::Borrowed(path);
        }

        let path = if path.is_empty() { "/" } else { path };
        Cow::Owned(format!("{path}?{query}"))
    }

    /// Returns an equal value when `target` already matches.
    #[must_use]
    pub fn with_request_target(&self, target: impl Into<String>) -> Request {
        let target = target.into();
        if target == self.request_target {
            return self.clone();
        }

        let mut new = self.clone();
        new.request_target = target;
        new
    }
}
