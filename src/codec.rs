//! Parsing of raw HTTP header blocks.
//!
//! A header block is the part of a message before the first empty line: a
//! request or status line followed by `Name: Value` lines, separated by
//! CRLF.
use std::sync::LazyLock;

use regex::Regex;

use crate::types::HeaderMap;

/// Key under which the request line of an outbound block is stored.
pub const REQUEST_LINE: &str = "Request-Line";
/// Key under which the status line of a response block is stored.
pub const STATUS_LINE: &str = "Status-Line";

/// Separates the header block from the body.
const BOUNDARY: &str = "\r\n\r\n";

/// Matches the status line of an informational `100` response.
static CONTINUE_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^HTTP/\d(?:\.\d)?\s+100\b").unwrap());

/// Split a raw header block into its first line and its headers.
///
/// Empty lines are skipped. Every line after the first is split on its first
/// colon, and both halves are trimmed. A repeated header name has its value
/// appended to the existing one, separated by a comma. An empty block
/// yields an empty first line and no headers.
#[must_use]
pub fn parse_block(raw: &str) -> (String, HeaderMap) {
    let mut lines = raw.split("\r\n").filter(|line| !line.is_empty());
    let first_line = lines.next().unwrap_or_default().to_string();

    let mut headers = HeaderMap::new();
    for line in lines {
        let (name, value) = line.split_once(':').unwrap_or((line, ""));
        let (name, value) = (name.trim(), value.trim());
        match headers.get_mut(name) {
            Some(existing) => {
                existing.push(',');
                existing.push_str(value);
            }
            None => {
                headers.insert(name, value.to_string());
            }
        }
    }

    (first_line, headers)
}

/// Parse an outbound header block.
///
/// The request line is stored under [`REQUEST_LINE`], ahead of the headers.
#[must_use]
pub fn parse_request_headers(raw: &str) -> HeaderMap {
    with_first_line(REQUEST_LINE, raw)
}

/// Parse a response header block.
///
/// The status line is stored under [`STATUS_LINE`], ahead of the headers.
#[must_use]
pub fn parse_response_headers(raw: &str) -> HeaderMap {
    with_first_line(STATUS_LINE, raw)
}

fn with_first_line(key: &str, raw: &str) -> HeaderMap {
    let (first_line, headers) = parse_block(raw);
    let mut map = HeaderMap::new();
    map.insert(key, first_line);
    for (name, value) in &headers {
        map.insert(name, value.clone());
    }
    map
}

/// Split a buffered response into its header block and body.
///
/// Returns `None` if the response contains no header block at all. An
/// interim `100 Continue` block in front of the final one is skipped.
#[must_use]
pub fn split_response(raw: &str) -> Option<(&str, &str)> {
    let (head, body) = raw.split_once(BOUNDARY)?;
    if CONTINUE_STATUS.is_match(head) {
        if let Some(split) = body.split_once(BOUNDARY) {
            return Some(split);
        }
    }
    Some((head, body))
}
