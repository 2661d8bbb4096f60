// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::borrow::Cow;
use std::sync::Arc;

use hashbrown::HashMap;
use serde_json::{Map, Value};

use crate::{
    HeaderMap,
    HttpVersion,
    Message,
    MessageHead,
    Method,
    Request,
    Stream,
    UploadedFile,
    Uri,
};

/// Flat string maps captured from the serving environment.
pub type ServerParams = HashMap<String, String>;
pub type CookieParams = HashMap<String, String>;

/// Structured parameter maps (query strings may nest).
pub type ParamMap = Map<String, Value>;

/// The decoded request body, when a decoder ran.
///
/// `Option<ParsedBody>` is the full domain: `None` when nothing was
/// decoded, `Form` for key-value form fields, `Structured` for any other
/// deserialized representation.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedBody {
    Form(ParamMap),
    Structured(Value),
}

/// The normalized uploaded-files tree: files at the leaves, lists for
/// multi-file fields, maps for named groupings.
#[derive(Clone, Debug)]
pub enum UploadedFiles {
    File(Arc<UploadedFile>),
    List(Vec<UploadedFiles>),
    Map(HashMap<String, UploadedFiles>),
}

impl UploadedFiles {
    /// The file at this node, when it is a leaf.
    #[must_use]
    pub fn as_file(&self) -> Option<&Arc<UploadedFile>> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }
}

/// An immutable server-side request: a [`Request`] plus the environment
/// captured when it was received.
///
/// Server parameters are fixed at construction. Cookies, query parameters,
/// uploaded files and the parsed body are replaced wholesale through their
/// `with_*` methods; attributes are free-form per-request annotations where
/// a stored [`Value::Null`] stays distinguishable from an absent key.
#[derive(Clone, Debug)]
pub struct ServerRequest {
    request: Request,
    server_params: ServerParams,
    cookie_params: CookieParams,
    query_params: ParamMap,
    uploaded_files: HashMap<String, UploadedFiles>,
    parsed_body: Option<ParsedBody>,
    attributes: HashMap<String, Value>,
}

impl Message for ServerRequest {
    fn head(&self) -> &MessageHead {
        self.request.head()
    }

    fn with_head(&self, head: MessageHead) -> Self {
        ServerRequest {
            request: self.request.with_head(head),
            ..self.clone()
        }
    }
}

impl ServerRequest {
    /// A server request with every captured collection empty.
    #[must_use]
    pub fn new(method: impl Into<Method>, uri: Uri) -> ServerRequest {
        ServerRequest::with_parts(method, uri, HeaderMap::new(), None, HttpVersion::default(), ServerParams::new())
    }

    /// Fully parameterized construction; cookies, query parameters,
    /// uploaded files, parsed body and attributes start empty and are
    /// attached through their `with_*` methods.
    #[must_use]
    pub fn with_parts(
        method: impl Into<Method>,
        uri: Uri,
        headers: HeaderMap,
        body: Option<Stream>,
        version: HttpVersion,
        server_params: ServerParams,
    ) -> ServerRequest {
        ServerRequest {
            request: Request::with_parts(method, uri, headers, body, version),
            server_params,
            cookie_params: CookieParams::new(),
            query_params: ParamMap::new(),
            uploaded_files: HashMap::new(),
            parsed_body: None,
            attributes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    #[must_use]
    pub fn with_method(&self, method: impl Into<Method>) -> ServerRequest {
        ServerRequest {
            request: self.request.with_method(method),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    #[must_use]
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> ServerRequest {
        ServerRequest {
            request: self.request.with_uri(uri, preserve_host),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn request_target(&self) -> Cow<'_, str> {
        self.request.request_target()
    }

    #[must_use]
    pub fn with_request_target(&self, target: impl Into<String>) -> ServerRequest {
        ServerRequest {
            request: self.request.with_request_target(target),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn server_params(&self) -> &ServerParams {
        &self.server_params
    }

    #[must_use]
    pub fn cookie_params(&self) -> &CookieParams {
        &self.cookie_params
    }

    #[must_use]
    pub fn with_cookie_params(&self, cookies: CookieParams) -> ServerRequest {
        ServerRequest {
            cookie_params: cookies,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn query_params(&self) -> &ParamMap {
        &self.query_params
    }

    #[must_use]
    pub fn with_query_params(&self, query: ParamMap) -> ServerRequest {
        ServerRequest {
            query_params: query,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn uploaded_files(&self) -> &HashMap<String, UploadedFiles> {
        &self.uploaded_files
    }

    #[must_use]
    pub fn with_uploaded_files(&self, uploaded_files: HashMap<String, UploadedFiles>) -> ServerRequest {
        ServerRequest {
            uploaded_files,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn parsed_body(&self) -> Option<&ParsedBody> {
        self.parsed_body.as_ref()
    }

    #[must_use]
    pub fn with_parsed_body(&self, parsed_body: Option<ParsedBody>) -> ServerRequest {
        ServerRequest {
            parsed_body,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    /// `Some` for any stored value, including an explicitly stored
    /// [`Value::Null`]; `None` only when the key is truly absent.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Like [`ServerRequest::attribute`], but substituting `default` only
    /// on absence.
    #[must_use]
    pub fn attribute_or<'a>(&'a self, name: &str, default: &'a Value) -> &'a Value {
        self.attributes.get(name).unwrap_or(default)
    }

    #[must_use]
    pub fn with_attribute(&self, name: impl Into<String>, value: Value) -> ServerRequest {
        let mut new = self.clone();
        new.attributes.insert(name.into(), value);
        new
    }

    /// Batch replacement; an empty batch returns an equal value without
    /// copying the attribute map a second time.
    #[must_use]
    pub fn with_attributes(&self, attributes: impl IntoIterator<Item = (String, Value)>) -> ServerRequest {
        let mut attributes = attributes.into_iter().peekable();
        if attributes.peek().is_none() {
            return self.clone();
        }

        let mut new = self.clone();
        new.attributes.extend(attributes);
        new
    }

    /// Returns an equal value when the attribute is absent.
    #[must_use]
    pub fn without_attribute(&self, name: &str) -> ServerRequest {
        if !self.attributes.contains_key(name) {
            return self.clone();
        }

        let mut new = self.clone();
        new.attributes.remove(name);
        new
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ServerRequest {
        ServerRequest::new("GET", Uri::parse("http://example.com/path").unwrap())
    }

    #[test]
    fn test_construction_defaults_are_empty() {
        let request = request();

        assert!(request.server_params().is_empty());
        assert!(request.cookie_params().is_empty());
        assert!(request.query_params().is_empty());
        assert!(request.uploaded_files().is_empty());
        assert!(request.parsed_body().is_none());
        assert!(request.attributes().is_empty());
    }

    #[test]
    fn test_server_params_fixed_at_construction() {
        let mut server = ServerParams::new();
        server.insert("REMOTE_ADDR".to_string(), "10.0.0.1".to_string());

        let request = ServerRequest::with_parts(
            "GET",
            Uri::parse("http://example.com").unwrap(),
            HeaderMap::new(),
            None,
            HttpVersion::default(),
            server,
        );

        assert_eq!(request.server_params().get("REMOTE_ADDR").map(String::as_str), Some("10.0.0.1"));
    }

    #[test]
    fn test_with_cookie_params_is_copy_on_write() {
        let original = request();

        let mut cookies = CookieParams::new();
        cookies.insert("session".to_string(), "abc".to_string());
        let derived = original.with_cookie_params(cookies);

        assert!(original.cookie_params().is_empty());
        assert_eq!(derived.cookie_params().get("session").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_with_query_params_is_independent_of_uri() {
        let original = request();

        let mut query = ParamMap::new();
        query.insert("page".to_string(), json!("2"));
        let derived = original.with_query_params(query);

        assert!(original.query_params().is_empty());
        assert_eq!(derived.query_params().get("page"), Some(&json!("2")));
        assert_eq!(derived.uri().path(), "/path");
    }

    #[test]
    fn test_with_parsed_body() {
        let mut form = ParamMap::new();
        form.insert("username".to_string(), json!("john"));

        let original = request();
        let derived = original.with_parsed_body(Some(ParsedBody::Form(form)));

        assert!(original.parsed_body().is_none());
        match derived.parsed_body() {
            Some(ParsedBody::Form(fields)) => assert_eq!(fields.get("username"), Some(&json!("john"))),
            other => panic!("unexpected parsed body: {other:?}"),
        }

        let cleared = derived.with_parsed_body(None);
        assert!(cleared.parsed_body().is_none());
        assert!(derived.parsed_body().is_some());
    }

    #[test]
    fn test_uploaded_files_tree() {
        let upload = Arc::new(UploadedFile::from_stream(
            Stream::create("data"),
            Some(4),
            crate::UploadError::Ok,
            Some("a.txt".to_string()),
            None,
        ));

        let mut tree = HashMap::new();
        tree.insert("attachment".to_string(), UploadedFiles::File(upload.clone()));

        let derived = request().with_uploaded_files(tree);

        let leaf = derived.uploaded_files().get("attachment").and_then(UploadedFiles::as_file);
        assert!(leaf.is_some_and(|file| Arc::ptr_eq(file, &upload)));
    }

    #[test]
    fn test_attribute_absent_vs_explicit_null() {
        let request = request().with_attribute("explicit", Value::Null);

        assert_eq!(request.attribute("explicit"), Some(&Value::Null));
        assert_eq!(request.attribute("missing"), None);

        let default = json!("fallback");
        assert_eq!(request.attribute_or("explicit", &default), &Value::Null);
        assert_eq!(request.attribute_or("missing", &default), &default);
    }

    #[test]
    fn test_attribute_modifications_are_copy_on_write() {
        let base = request();
        let one = base.with_attribute("a", json!(1));
        let two = one.with_attribute("b", json!(2));
        let removed = two.without_attribute("a");

        assert!(base.attributes().is_empty());
        assert_eq!(one.attribute("a"), Some(&json!(1)));
        assert_eq!(one.attribute("b"), None);
        assert_eq!(two.attribute("b"), Some(&json!(2)));
        assert_eq!(removed.attribute("a"), None);
        assert_eq!(removed.attribute("b"), Some(&json!(2)));
    }

    #[test]
    fn test_without_absent_attribute_returns_equal_value() {
        let base = request().with_attribute("keep", json!(true));
        let same = base.without_attribute("missing");

        assert_eq!(same.attribute("keep"), Some(&json!(true)));
    }

    #[test]
    fn test_with_attributes_batch() {
        let base = request();
        let derived = base.with_attributes([
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!(2)),
        ]);

        assert_eq!(derived.attribute("a"), Some(&json!(1)));
        assert_eq!(derived.attribute("b"), Some(&json!(2)));

        let unchanged = derived.with_attributes([]);
        assert_eq!(unchanged.attributes().len(), 2);
    }

    #[test]
    fn test_inherits_request_and_message_behavior() {
        let request = request()
            .with_header("X-Trace", "abc").unwrap()
            .with_method("POST");

        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.header_line("x-trace"), "abc");
        assert_eq!(request.header_line("host"), "example.com");
        assert_eq!(request.request_target(), "/path");

        let retargeted = request.with_request_target("*");
        assert_eq!(retargeted.request_target(), "*");
        assert_eq!(request.request_target(), "/path");
    }

    #[test]
    fn test_with_uri_updates_host_like_request() {
        let base = request();
        let moved = base.with_uri(Uri::parse("http://other.example:8080/x").unwrap(), false);

        assert_eq!(moved.header_line("host"), "other.example:8080");
        assert_eq!(base.header_line("host"), "example.com");
    }
}
