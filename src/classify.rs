//! Turns a finished [`Exchange`] into the result fields of a request.
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::{
    codec::{self, STATUS_LINE},
    transport::{Exchange, TransportError},
    types::{HeaderMap, ResponseBody},
};

static JSON_CONTENT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^application/json").unwrap());

/// The outcome of one exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Response body, decoded if it is JSON
    pub response: ResponseBody,
    /// Outbound headers as they were sent, including the request line
    pub request_headers: HeaderMap,
    /// Received headers, including the status line
    pub response_headers: HeaderMap,
    /// Transport-level failure
    pub transport_error: Option<TransportError>,
    /// Numeric status code, `0` without a response
    pub http_status_code: u16,
    /// Whether the status code is in the 4xx or 5xx range
    pub http_error: bool,
    /// The status line if `http_error` is set, empty otherwise
    pub http_error_message: String,
    /// Whether the exchange failed in any way
    pub error: bool,
    /// Transport error code, else the HTTP status on an HTTP error, else `0`
    pub error_code: u32,
    /// Transport error message, else `http_error_message`
    pub error_message: String,
}

/// Classify a finished exchange.
///
/// The buffered response is split into headers and body. A JSON body is
/// decoded when the response declares `application/json`; if decoding fails
/// the text is kept as is.
#[must_use]
pub fn classify(exchange: &Exchange) -> Classification {
    let raw = String::from_utf8_lossy(&exchange.raw);

    let request_headers = if exchange.header_out.is_empty() {
        HeaderMap::new()
    } else {
        codec::parse_request_headers(&exchange.header_out)
    };

    let (response_headers, body) = match codec::split_response(&raw) {
        Some((head, body)) => (codec::parse_response_headers(head), body),
        None => (HeaderMap::new(), &*raw),
    };

    let response = decode(&response_headers, body);

    let http_status_code = exchange.status_code;
    let http_error = matches!(http_status_code / 100, 4 | 5);
    let http_error_message = if http_error {
        response_headers.get(STATUS_LINE).cloned().unwrap_or_default()
    } else {
        String::new()
    };

    let transport_error = exchange.error.clone();
    let (error_code, error_message) = match &transport_error {
        Some(e) => (e.code.code(), e.message.clone()),
        None if http_error => (u32::from(http_status_code), http_error_message.clone()),
        None => (0, String::new()),
    };

    Classification {
        response,
        request_headers,
        response_headers,
        error: transport_error.is_some() || http_error,
        transport_error,
        http_status_code,
        http_error,
        http_error_message,
        error_code,
        error_message,
    }
}

fn decode(headers: &HeaderMap, body: &str) -> ResponseBody {
    let is_json = headers
        .get("Content-Type")
        .is_some_and(|content_type| JSON_CONTENT_TYPE.is_match(content_type));
    if !is_json {
        return ResponseBody::Raw(body.to_string());
    }
    match serde_json::from_str(body) {
        Ok(value) => ResponseBody::Json(value),
        Err(e) => {
            debug!("Keeping undecodable JSON body as text: {e}");
            ResponseBody::Raw(body.to_string())
        }
    }
}
