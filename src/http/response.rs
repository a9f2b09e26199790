use bytes::Bytes;
use http_body_util::Full;
use hyper::{StatusCode, header};

use super::Response;


fn plain(status: StatusCode, body: impl Into<Bytes>) -> Response {
    hyper::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=UTF-8")
        .body(Full::new(body.into()))
        .unwrap()
}

pub(super) fn no_content() -> Response {
    hyper::Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::default())
        .unwrap()
}

pub(super) fn bad_request(msg: Option<&str>) -> Response {
    let body = match msg {
        Some(s) => Bytes::from(s.to_owned()),
        None => Bytes::from_static(b"Bad request"),
    };
    plain(StatusCode::BAD_REQUEST, body)
}

pub(super) fn not_found() -> Response {
    plain(StatusCode::NOT_FOUND, "404 Not found")
}

pub(super) fn method_not_allowed() -> Response {
    plain(StatusCode::METHOD_NOT_ALLOWED, "405 Method not allowed")
}

pub(super) fn payload_too_large() -> Response {
    plain(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload too large")
}

pub(super) fn internal_server_error() -> Response {
    plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

pub(super) fn length_required() -> Response {
    plain(StatusCode::LENGTH_REQUIRED, "411 Length required")
}
