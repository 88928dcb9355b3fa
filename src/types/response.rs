use std::fmt::Display;

use serde_json::Value;

/// Body of a completed request.
///
/// A body is decoded into [`ResponseBody::Json`] only when the response
/// declares a JSON content type and the text actually parses. Otherwise the
/// text is kept untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Undecoded response text
    Raw(String),
    /// Decoded JSON document
    Json(Value),
}

impl ResponseBody {
    /// The raw text, if the body was not decoded
    #[must_use]
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            ResponseBody::Raw(text) => Some(text),
            ResponseBody::Json(_) => None,
        }
    }

    /// The decoded document, if the body was JSON
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        ResponseBody::Raw(String::new())
    }
}

impl Display for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Raw(text) => f.write_str(text),
            ResponseBody::Json(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let raw = ResponseBody::Raw("{\"a\":1}".into());
        assert_eq!(raw.as_raw(), Some("{\"a\":1}"));
        assert_eq!(raw.as_json(), None);

        let decoded = ResponseBody::Json(json!({"a": 1}));
        assert_eq!(decoded.as_raw(), None);
        assert_eq!(decoded.as_json().and_then(|v| v["a"].as_i64()), Some(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(ResponseBody::default().to_string(), "");
        assert_eq!(ResponseBody::Json(json!([1, 2])).to_string(), "[1,2]");
    }
}
