// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! End-to-end exercises of the message model: a form POST assembled from an
//! environment snapshot, and a request/response exchange evolved through
//! copy-on-write operations.

use busta::{
    from_snapshot,
    EnvSnapshot,
    HeaderMap,
    HttpVersion,
    Message,
    Method,
    ParamMap,
    ParsedBody,
    Request,
    Response,
    Stream,
    Uri,
};

use serde_json::json;

fn server_params(pairs: &[(&str, &str)]) -> busta::ServerParams {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn form_post_round_trip() {
    let mut form = ParamMap::new();
    form.insert("username".to_string(), json!("john"));

    let mut query = ParamMap::new();
    query.insert("q".to_string(), json!("1"));

    let mut cookies = busta::CookieParams::new();
    cookies.insert("session".to_string(), "abc".to_string());

    let snapshot = EnvSnapshot {
        server: server_params(&[
            ("REQUEST_METHOD", "POST"),
            ("HTTP_HOST", "example.com"),
            ("REQUEST_URI", "/path?q=1"),
            ("CONTENT_TYPE", "application/x-www-form-urlencoded"),
            ("SERVER_PROTOCOL", "HTTP/1.1"),
        ]),
        query,
        form,
        cookies,
        body: Some(Stream::create("username=john")),
        ..EnvSnapshot::default()
    };

    let request = from_snapshot(snapshot).unwrap();

    assert_eq!(request.method(), &Method::Post);
    assert_eq!(request.uri().to_string(), "http://example.com/path?q=1");
    assert_eq!(request.request_target(), "/path?q=1");
    assert_eq!(request.protocol_version(), HttpVersion::Http11);
    assert_eq!(request.header_line("host"), "example.com");

    // The parsed body comes from the form fields; query and cookies stay
    // whatever was explicitly supplied, independent of it.
    match request.parsed_body() {
        Some(ParsedBody::Form(fields)) => assert_eq!(fields.get("username"), Some(&json!("john"))),
        other => panic!("unexpected parsed body: {other:?}"),
    }
    assert_eq!(request.query_params().get("q"), Some(&json!("1")));
    assert_eq!(request.cookie_params().get("session").map(String::as_str), Some("abc"));

    // Middleware annotates the request without disturbing the original.
    let annotated = request.with_attribute("route", json!("profile"));
    assert!(request.attribute("route").is_none());
    assert_eq!(annotated.attribute("route"), Some(&json!("profile")));
}

#[test]
fn request_response_exchange() {
    let request = Request::with_parts(
        "GET",
        Uri::parse("http://example.com:8080/items?page=2").unwrap(),
        HeaderMap::from_pairs([("Accept", "application/json")]).unwrap(),
        None,
        HttpVersion::default(),
    );

    assert_eq!(request.header_line("host"), "example.com:8080");
    assert_eq!(request.request_target(), "/items?page=2");

    let forwarded = request
        .with_uri(Uri::parse("https://internal.example/items?page=2").unwrap(), false)
        .with_added_header("Accept", "text/html").unwrap();

    assert_eq!(forwarded.header_line("host"), "internal.example");
    assert_eq!(forwarded.header_line("accept"), "application/json, text/html");
    assert_eq!(request.header_line("host"), "example.com:8080");
    assert_eq!(request.header_line("accept"), "application/json");

    let body = Stream::create("{\"items\":[]}");
    let response = Response::new(200).unwrap()
        .with_header("Content-Type", "application/json").unwrap()
        .with_body(body.clone());

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.reason_phrase(), "OK");
    assert!(response.body().same_instance(&body));

    let not_found = response.with_status(404, None).unwrap();
    assert_eq!(not_found.reason_phrase(), "Not Found");
    assert_eq!(not_found.header_line("content-type"), "application/json");
    assert_eq!(response.status_code(), 200);

    assert_eq!(not_found.body().to_string(), "{\"items\":[]}");
}

#[test]
fn detached_stream_is_terminal_across_holders() {
    let body = Stream::create("payload");
    let response = Response::new(200).unwrap().with_body(body.clone());
    let derived = response.with_status(202, None).unwrap();

    let handle = body.detach();
    assert!(handle.is_some());

    assert!(!derived.body().is_readable());
    assert_eq!(derived.body().to_string(), "");
    assert_eq!(derived.body().get_size(), None);
}
