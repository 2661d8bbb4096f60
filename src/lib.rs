// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Immutable HTTP message values.
//!
//! This crate contains the in-memory data model HTTP client, server and
//! middleware code exchange: requests, responses, server-side requests,
//! URIs, body streams and uploaded files. It deliberately contains no
//! transport: sockets, TLS and wire framing belong to the caller.
//!
//! Every message-like value is evolved exclusively through `with_*`
//! methods. A `with_*` call never mutates its receiver; it returns a new,
//! independent value with exactly the requested change applied, so values
//! can be handed between components without shared mutable state. The only
//! deliberately shared resources are the body [`Stream`] (clones of one
//! stream view one handle) and an [`UploadedFile`]'s one-shot move flag.

pub mod creator;
pub mod error;
pub mod header_map;
pub mod message;
pub mod method;
pub mod request;
pub mod response;
pub mod server_request;
pub mod status;
pub mod stream;
pub mod syntax;
pub mod uploaded_file;
pub mod uri;
pub mod version;

pub use creator::{from_snapshot, normalize_files, EnvSnapshot, RawUploads, SpecField, UploadSpec};
pub use error::{Error, Result, StateError, ValidationError};
pub use header_map::{HeaderMap, HeaderValue};
pub use message::{Message, MessageHead};
pub use method::Method;
pub use request::Request;
pub use response::Response;
pub use server_request::{
    CookieParams,
    ParamMap,
    ParsedBody,
    ServerParams,
    ServerRequest,
    UploadedFiles,
};
pub use stream::{Handle, OpenMode, Stream, StreamMetadata};
pub use uploaded_file::{UploadError, UploadedFile};
pub use uri::Uri;
pub use version::HttpVersion;
