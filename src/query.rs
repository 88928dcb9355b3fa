//! Form and query string encoding for [`Fields`].
//!
//! Two flavours exist because servers expect different shapes:
//! [`build_query`] produces a classic form encoding with indexed list keys,
//! [`build_multi_query`] produces the bracketed encoding used for nested
//! `POST` bodies, where list items are sent as `name[]`.
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::types::{Field, Fields};

/// Characters left untouched by form encoding (`+` is used for spaces).
const FORM: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Characters left untouched by raw percent encoding.
const RAW: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Form-encode `input`; spaces become `+`.
pub(crate) fn form_encode(input: &str) -> String {
    utf8_percent_encode(input, FORM)
        .to_string()
        .replace("%20", "+")
}

/// Percent-encode `input`; spaces become `%20`.
pub(crate) fn raw_encode(input: &str) -> String {
    utf8_percent_encode(input, RAW).to_string()
}

/// Encode `fields` as a query string.
///
/// Nested values use bracketed keys, lists are indexed (`a[0]=x`), and
/// empty lists or maps are left out entirely.
///
/// ```
/// use volley::{query::build_query, Fields};
///
/// let fields = Fields::new().text("foo", "bar baz").list("ids", ["1", "2"]);
/// assert_eq!(build_query(&fields), "foo=bar+baz&ids%5B0%5D=1&ids%5B1%5D=2");
/// ```
#[must_use]
pub fn build_query(fields: &Fields) -> String {
    let mut pairs = Vec::new();
    for (name, value) in fields.iter() {
        collect_pairs(&mut pairs, name.to_string(), value);
    }
    pairs.join("&")
}

fn collect_pairs(pairs: &mut Vec<String>, key: String, value: &Field) {
    match value {
        Field::Text(text) => pairs.push(format!("{}={}", form_encode(&key), form_encode(text))),
        Field::File(path) => pairs.push(format!(
            "{}={}",
            form_encode(&key),
            form_encode(&path.to_string_lossy())
        )),
        Field::List(items) => {
            for (position, item) in items.iter().enumerate() {
                collect_pairs(pairs, format!("{key}[{position}]"), item);
            }
        }
        Field::Map(fields) => {
            for (name, item) in fields.iter() {
                collect_pairs(pairs, format!("{key}[{name}]"), item);
            }
        }
    }
}

/// Encode possibly nested `fields` for a form body.
///
/// Keys are form-encoded and values percent-encoded. Scalars inside a list
/// are sent as `name[]=value`, containers inside a list keep their index,
/// and an empty list or map is sent as `name=`.
#[must_use]
pub fn build_multi_query(fields: &Fields) -> String {
    fields
        .iter()
        .map(|(name, value)| encode_nested(name, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_nested(key: &str, value: &Field) -> String {
    match value {
        Field::Text(text) => format!("{}={}", form_encode(key), raw_encode(text)),
        Field::File(path) => format!(
            "{}={}",
            form_encode(key),
            raw_encode(&path.to_string_lossy())
        ),
        Field::List(items) if items.is_empty() => format!("{}=", form_encode(key)),
        Field::Map(fields) if fields.is_empty() => format!("{}=", form_encode(key)),
        Field::List(items) => items
            .iter()
            .enumerate()
            .map(|(position, item)| match item {
                Field::List(_) | Field::Map(_) => encode_nested(&format!("{key}[{position}]"), item),
                Field::Text(_) | Field::File(_) => encode_nested(&format!("{key}[]"), item),
            })
            .collect::<Vec<_>>()
            .join("&"),
        Field::Map(fields) => fields
            .iter()
            .map(|(name, item)| encode_nested(&format!("{key}[{name}]"), item))
            .collect::<Vec<_>>()
            .join("&"),
    }
}

/// Serialise cookies into a `Cookie` header value.
pub(crate) fn build_cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", form_encode(name), form_encode(value)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Append `query` to `url`, unless it is empty.
pub(crate) fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_build_query_flat() {
        let fields = Fields::new().text("key", "value").text("test", "delete");
        assert_eq!(build_query(&fields), "key=value&test=delete");
    }

    #[test]
    fn test_build_query_nested() {
        let fields = Fields::new()
            .text("username", "myusername")
            .map(
                "more_data",
                Fields::new()
                    .text("param1", "something")
                    .map("another", Fields::new().text("extra", "level")),
            )
            .list("empty", Vec::<&str>::new());

        assert_eq!(
            build_query(&fields),
            "username=myusername&more_data%5Bparam1%5D=something\
             &more_data%5Banother%5D%5Bextra%5D=level"
        );
    }

    #[test]
    fn test_build_multi_query_associative() {
        let fields = Fields::new()
            .text("username", "myusername")
            .text("password", "mypassword")
            .map(
                "more_data",
                Fields::new()
                    .text("param1", "something")
                    .text("param2", "other thing")
                    .field("param3", 123)
                    .field("param4", 2.75),
            );

        assert_eq!(
            build_multi_query(&fields),
            "username=myusername&password=mypassword\
             &more_data%5Bparam1%5D=something&more_data%5Bparam2%5D=other%20thing\
             &more_data%5Bparam3%5D=123&more_data%5Bparam4%5D=2.75"
        );
    }

    #[test]
    fn test_build_multi_query_list() {
        let fields = Fields::new()
            .text("key", "file")
            .list("file", ["wibble", "wubble", "wobble"]);

        assert_eq!(
            build_multi_query(&fields),
            "key=file&file%5B%5D=wibble&file%5B%5D=wubble&file%5B%5D=wobble"
        );
    }

    #[test]
    fn test_build_multi_query_empty_containers() {
        let fields = Fields::new().text("foo", "bar").map(
            "baz",
            Fields::new()
                .map("qux", Fields::new())
                .text("wibble", "wobble"),
        );

        assert_eq!(
            build_multi_query(&fields),
            "foo=bar&baz%5Bqux%5D=&baz%5Bwibble%5D=wobble"
        );
    }

    #[rstest]
    #[case("a b", "a+b", "a%20b")]
    #[case("a~b", "a%7Eb", "a~b")]
    #[case("x-y_z.w", "x-y_z.w", "x-y_z.w")]
    #[case("ä", "%C3%A4", "%C3%A4")]
    fn test_encodings(#[case] input: &str, #[case] form: &str, #[case] raw: &str) {
        assert_eq!(form_encode(input), form);
        assert_eq!(raw_encode(input), raw);
    }

    #[test]
    fn test_cookie_header() {
        let cookies = vec![
            ("mycookie".to_string(), "yum".to_string()),
            ("other".to_string(), "a b".to_string()),
        ];
        assert_eq!(build_cookie_header(&cookies), "mycookie=yum; other=a+b");
    }

    #[rstest]
    #[case("http://x/", "", "http://x/")]
    #[case("http://x/", "a=1", "http://x/?a=1")]
    #[case("http://x/?b=2", "a=1", "http://x/?b=2&a=1")]
    fn test_append_query(#[case] url: &str, #[case] query: &str, #[case] expected: &str) {
        assert_eq!(append_query(url, query), expected);
    }
}
