// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Builds a [`ServerRequest`] out of an explicit environment snapshot.
//!
//! Nothing here reads process-global state: the transport layer collects
//! whatever its environment provides into an [`EnvSnapshot`] and hands it
//! over. Key names follow the common CGI/server conventions
//! (`REQUEST_METHOD`, `HTTP_*`, `SERVER_PROTOCOL`, ...).

use std::path::PathBuf;
use std::sync::Arc;

use hashbrown::HashMap;
use tracing::debug;

use crate::{
    CookieParams,
    HeaderMap,
    HttpVersion,
    Message,
    Method,
    ParamMap,
    ParsedBody,
    Result,
    ServerParams,
    ServerRequest,
    Stream,
    UploadError,
    UploadedFile,
    UploadedFiles,
    Uri,
};

/// Everything the transport layer captured about one incoming request.
#[derive(Clone, Debug, Default)]
pub struct EnvSnapshot {
    /// Server and CGI parameters (`REQUEST_METHOD`, `HTTP_*`, ...).
    pub server: ServerParams,
    /// Decoded query-string parameters.
    pub query: ParamMap,
    /// Decoded form fields of the request body, when the transport decoded
    /// any; attached as the parsed body only for form POSTs.
    pub form: ParamMap,
    /// Request cookies.
    pub cookies: CookieParams,
    /// Raw upload descriptors, not yet normalized.
    pub files: Vec<(String, RawUploads)>,
    /// The raw body stream.
    pub body: Option<Stream>,
}

/// One node of the raw uploaded-files tree as delivered by the transport.
#[derive(Clone, Debug)]
pub enum RawUploads {
    /// An already-built file; passed through untouched.
    File(Arc<UploadedFile>),
    /// A descriptor leaf, possibly batching several files in parallel
    /// per-field lists.
    Spec(UploadSpec),
    /// A named grouping of further entries.
    Group(Vec<(String, RawUploads)>),
}

/// The per-field data of one descriptor leaf.
///
/// When a form submits several files under one name, transports commonly
/// deliver *parallel* lists: `tmp_path` holds a list of paths while `size`,
/// `error` and the client fields each hold a same-indexed list. The
/// normalizer zips those back into one [`UploadedFile`] per index.
#[derive(Clone, Debug, Default)]
pub struct UploadSpec {
    pub tmp_path: SpecField<PathBuf>,
    pub size: SpecField<Option<u64>>,
    pub error: SpecField<UploadError>,
    pub client_filename: SpecField<Option<String>>,
    pub client_media_type: SpecField<Option<String>>,
}

/// A scalar field value, or a parallel list of them.
#[derive(Clone, Debug)]
pub enum SpecField<T> {
    One(T),
    Many(Vec<SpecField<T>>),
}

impl<T: Default> Default for SpecField<T> {
    fn default() -> Self {
        SpecField::One(T::default())
    }
}

impl<T: Clone> SpecField<T> {
    /// The scalar value, or `fallback` when this field holds a list while
    /// its sibling `tmp_path` does not.
    fn scalar(&self, fallback: T) -> T {
        match self {
            SpecField::One(value) => value.clone(),
            SpecField::Many(_) => fallback,
        }
    }

    /// The list element at `index`, or `fallback` for a scalar or
    /// short-listed field.
    fn at(&self, index: usize, fallback: T) -> SpecField<T> {
        match self {
            SpecField::Many(values) => values.get(index).cloned().unwrap_or(SpecField::One(fallback)),
            SpecField::One(_) => SpecField::One(fallback),
        }
    }
}

/// Build a [`ServerRequest`] from `snapshot`.
///
/// The URI is reconstructed from the server parameters, headers are
/// extracted from the `HTTP_*`/`CONTENT_*` keys, uploads are normalized,
/// and the form fields become the parsed body only when the method is
/// `POST` and the content type is a form encoding.
pub fn from_snapshot(snapshot: EnvSnapshot) -> Result<ServerRequest> {
    let method: Method = snapshot.server.get("REQUEST_METHOD").map(String::as_str).unwrap_or("GET").into();
    let uri = uri_from_server(&snapshot.server)?;
    let headers = extract_headers(&snapshot.server)?;
    let version = extract_protocol(&snapshot.server);
    let is_post = method == Method::Post;

    let request = ServerRequest::with_parts(method, uri, headers, snapshot.body, version, snapshot.server)
        .with_cookie_params(snapshot.cookies)
        .with_query_params(snapshot.query)
        .with_uploaded_files(normalize_files(snapshot.files));

    let request = if is_post && has_form_content_type(&request) {
        request.with_parsed_body(Some(ParsedBody::Form(snapshot.form)))
    } else {
        request
    };

    debug!(
        method = %request.method(),
        target = %request.request_target(),
        "assembled server request from environment snapshot"
    );

    Ok(request)
}

fn has_form_content_type(request: &ServerRequest) -> bool {
    let content_type = request.header_line("content-type");
    content_type.contains("application/x-www-form-urlencoded") || content_type.contains("multipart/form-data")
}

fn uri_from_server(server: &ServerParams) -> Result<Uri> {
    let https = server.get("HTTPS").map(String::as_str).unwrap_or("");
    let scheme = if !https.is_empty() && https != "off" { "https" } else { "http" };
    let mut uri = Uri::new().with_scheme(scheme);

    if let Some(http_host) = server.get("HTTP_HOST") {
        match http_host.rsplit_once(':') {
            Some((host, port)) if port.bytes().all(|byte| byte.is_ascii_digit()) => {
                uri = uri.with_host(host);
                if let Ok(port) = port.parse::<u16>() {
                    uri = uri.with_port(Some(port));
                }
            }
            _ => uri = uri.with_host(http_host),
        }
    } else if let Some(server_name) = server.get("SERVER_NAME") {
        uri = uri.with_host(server_name);
        if let Some(port) = server.get("SERVER_PORT").and_then(|port| port.parse::<u16>().ok()) {
            uri = uri.with_port(Some(port));
        }
    }

    let request_uri = server.get("REQUEST_URI").map(String::as_str).unwrap_or("/");
    let without_fragment = request_uri.split('#').next().unwrap_or(request_uri);
    let (path, embedded_query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    };

    uri = uri.with_path(if path.is_empty() { "/" } else { path });

    match server.get("QUERY_STRING") {
        Some(query) => uri = uri.with_query(query),
        None => {
            if let Some(query) = embedded_query {
                uri = uri.with_query(query);
            }
        }
    }

    Ok(uri)
}

/// `HTTP_FOO_BAR` keys become `FOO-BAR` headers, casing untouched;
/// `CONTENT_TYPE` and `CONTENT_LENGTH` arrive without the prefix.
fn extract_headers(server: &ServerParams) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (key, value) in server {
        if let Some(name) = key.strip_prefix("HTTP_") {
            headers.set(name.replace('_', "-"), value.as_str())?;
        } else if key == "CONTENT_TYPE" {
            headers.set("Content-Type", value.as_str())?;
        } else if key == "CONTENT_LENGTH" {
            headers.set("Content-Length", value.as_str())?;
        }
    }

    Ok(headers)
}

fn extract_protocol(server: &ServerParams) -> HttpVersion {
    server
        .get("SERVER_PROTOCOL")
        .and_then(|protocol| HttpVersion::from_protocol(protocol))
        .unwrap_or_default()
}

/// Normalize a raw upload tree into a same-shaped tree of
/// [`UploadedFile`] values.
#[must_use]
pub fn normalize_files(files: Vec<(String, RawUploads)>) -> HashMap<String, UploadedFiles> {
    files
        .into_iter()
        .map(|(name, entry)| (name, normalize_entry(entry)))
        .collect()
}

fn normalize_entry(entry: RawUploads) -> UploadedFiles {
    match entry {
        RawUploads::File(file) => UploadedFiles::File(file),
        RawUploads::Group(children) => UploadedFiles::Map(
            children
                .into_iter()
                .map(|(name, child)| (name, normalize_entry(child)))
                .collect(),
        ),
        RawUploads::Spec(spec) => normalize_spec(spec),
    }
}

fn normalize_spec(spec: UploadSpec) -> UploadedFiles {
    match spec.tmp_path {
        SpecField::One(path) => {
            let file = UploadedFile::from_path(
                path,
                spec.size.scalar(None),
                spec.error.scalar(UploadError::Ok),
                spec.client_filename.scalar(None),
                spec.client_media_type.scalar(None),
            );

            UploadedFiles::File(Arc::new(file))
        }
        SpecField::Many(paths) => UploadedFiles::List(
            paths
                .into_iter()
                .enumerate()
                .map(|(index, tmp_path)| {
                    normalize_spec(UploadSpec {
                        tmp_path,
                        size: spec.size.at(index, None),
                        error: spec.error.at(index, UploadError::NoFile),
                        client_filename: spec.client_filename.at(index, None),
                        client_media_type: spec.client_media_type.at(index, None),
                    })
                })
                .collect(),
        ),
    }
}
