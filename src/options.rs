//! The per-request option store handed to a [`Transport`](crate::transport::Transport).
//!
//! Every setting of a request, from the target URL to the timeout, ends up as
//! one entry in [`Options`]. The typed setters on
//! [`Request`](crate::Request) are conveniences on top of
//! [`Request::set_option`](crate::Request::set_option), which stays available
//! as an escape hatch.
use std::{collections::BTreeMap, fmt::Display, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::types::BasicAuthCredentials;

/// Identifier of a single transport setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum TransportOption {
    /// Target URL, including the query string
    Url,
    /// Method override, e.g. `PATCH` or `DELETE`
    CustomRequest,
    /// Reset the method to `GET`
    HttpGet,
    /// Use `POST`
    Post,
    /// Request body, see [`Body`]
    PostFields,
    /// Use `PUT`
    Put,
    /// Local file uploaded as the body of a `PUT`
    InFile,
    /// `User-Agent` header
    UserAgent,
    /// Additional header lines in the form `Name: Value`
    HttpHeader,
    /// `Referer` header
    Referer,
    /// `Cookie` header
    Cookie,
    /// File cookies are read from
    CookieFile,
    /// File cookies are written to when the request is closed
    CookieJar,
    /// Basic auth credentials
    UserPwd,
    /// Log the exchange at `info` level
    Verbose,
    /// Capture the outbound header block
    HeaderOut,
    /// Include the response header block in the buffered response
    Header,
    /// Buffer the response instead of writing it to stdout
    ReturnTransfer,
    /// Timeout for the whole exchange
    Timeout,
    /// Timeout for establishing the connection
    ConnectTimeout,
    /// Follow `Location` headers
    FollowLocation,
    /// Maximum number of redirects followed
    MaxRedirs,
    /// Verify the peer's TLS certificate
    SslVerifyPeer,
}

impl TransportOption {
    /// Options which must stay enabled, because classification of the
    /// response depends on them.
    pub const REQUIRED: [TransportOption; 3] = [
        TransportOption::HeaderOut,
        TransportOption::Header,
        TransportOption::ReturnTransfer,
    ];

    /// Whether this option must stay enabled
    #[must_use]
    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    /// Whether this option describes *what* is requested rather than *how*.
    ///
    /// These are the target, the method and the body. They are never copied
    /// from a batch parent onto its children.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(
            self,
            TransportOption::Url
                | TransportOption::CustomRequest
                | TransportOption::HttpGet
                | TransportOption::Post
                | TransportOption::Put
                | TransportOption::PostFields
                | TransportOption::InFile
        )
    }

    /// Stable, human-readable name of the option
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TransportOption::Url => "url",
            TransportOption::CustomRequest => "custom_request",
            TransportOption::HttpGet => "http_get",
            TransportOption::Post => "post",
            TransportOption::PostFields => "post_fields",
            TransportOption::Put => "put",
            TransportOption::InFile => "in_file",
            TransportOption::UserAgent => "user_agent",
            TransportOption::HttpHeader => "http_header",
            TransportOption::Referer => "referer",
            TransportOption::Cookie => "cookie",
            TransportOption::CookieFile => "cookie_file",
            TransportOption::CookieJar => "cookie_jar",
            TransportOption::UserPwd => "user_pwd",
            TransportOption::Verbose => "verbose",
            TransportOption::HeaderOut => "header_out",
            TransportOption::Header => "header",
            TransportOption::ReturnTransfer => "return_transfer",
            TransportOption::Timeout => "timeout",
            TransportOption::ConnectTimeout => "connect_timeout",
            TransportOption::FollowLocation => "follow_location",
            TransportOption::MaxRedirs => "max_redirs",
            TransportOption::SslVerifyPeer => "ssl_verify_peer",
        }
    }
}

impl Display for TransportOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request body as the transport sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Sent verbatim
    Raw(String),
    /// Sent as `multipart/form-data`
    Form(Vec<FormPart>),
}

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    /// A plain text part
    Text {
        /// Field name
        name: String,
        /// Field value
        value: String,
    },
    /// A file read from disk when the request is sent
    File {
        /// Field name
        name: String,
        /// Path of the uploaded file
        path: PathBuf,
    },
}

/// Value of a [`TransportOption`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// A switch
    Bool(bool),
    /// A count or size
    Int(u64),
    /// A string, such as a URL or a header value
    Text(String),
    /// A list of strings, such as header lines
    List(Vec<String>),
    /// A duration
    Duration(Duration),
    /// A request body
    Body(Body),
    /// Basic auth credentials
    Auth(BasicAuthCredentials),
}

impl OptionValue {
    /// Whether the value is exactly `Bool(true)`
    #[must_use]
    pub const fn is_true(&self) -> bool {
        matches!(self, OptionValue::Bool(true))
    }
}

impl Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{value}"),
            OptionValue::Int(value) => write!(f, "{value}"),
            OptionValue::Text(value) => write!(f, "{value:?}"),
            OptionValue::List(values) => write!(f, "{values:?}"),
            OptionValue::Duration(value) => write!(f, "{value:?}"),
            OptionValue::Body(Body::Raw(raw)) => write!(f, "body of {} bytes", raw.len()),
            OptionValue::Body(Body::Form(parts)) => write!(f, "form with {} parts", parts.len()),
            // never print the password
            OptionValue::Auth(credentials) => write!(f, "credentials for {}", credentials.username),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<u64> for OptionValue {
    fn from(value: u64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<PathBuf> for OptionValue {
    fn from(value: PathBuf) -> Self {
        OptionValue::Text(value.to_string_lossy().into_owned())
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(values: Vec<String>) -> Self {
        OptionValue::List(values)
    }
}

impl From<Duration> for OptionValue {
    fn from(value: Duration) -> Self {
        OptionValue::Duration(value)
    }
}

impl From<Body> for OptionValue {
    fn from(body: Body) -> Self {
        OptionValue::Body(body)
    }
}

impl From<BasicAuthCredentials> for OptionValue {
    fn from(credentials: BasicAuthCredentials) -> Self {
        OptionValue::Auth(credentials)
    }
}

/// Advisory signal raised when a required option is set to anything other
/// than `true`.
///
/// The value is still stored. Classification of the response will most
/// likely be wrong afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Option `{option}` must stay enabled, but was set to {value}")]
pub struct RequiredOptionWarning {
    /// The overridden option
    pub option: TransportOption,
    /// The value it was set to
    pub value: OptionValue,
}

/// Ordered store of transport options. Last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options(BTreeMap<TransportOption, OptionValue>);

impl Options {
    /// Create an empty option store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an option store with every required option enabled
    #[must_use]
    pub fn with_required() -> Self {
        let mut options = Self::new();
        for option in TransportOption::REQUIRED {
            options.0.insert(option, OptionValue::Bool(true));
        }
        options
    }

    /// Set `option` to `value`, replacing any previous value.
    ///
    /// Returns a warning if a required option is set to anything other than
    /// `true`. The value is stored either way.
    pub fn set(
        &mut self,
        option: TransportOption,
        value: impl Into<OptionValue>,
    ) -> Option<RequiredOptionWarning> {
        let value = value.into();
        let warning = (option.is_required() && !value.is_true()).then(|| RequiredOptionWarning {
            option,
            value: value.clone(),
        });
        self.0.insert(option, value);
        warning
    }

    /// The value of `option`, if set
    #[must_use]
    pub fn get(&self, option: TransportOption) -> Option<&OptionValue> {
        self.0.get(&option)
    }

    /// Remove `option`, returning its previous value
    pub fn remove(&mut self, option: TransportOption) -> Option<OptionValue> {
        self.0.remove(&option)
    }

    /// Whether `option` is set to any value
    #[must_use]
    pub fn contains(&self, option: TransportOption) -> bool {
        self.0.contains_key(&option)
    }

    /// Whether `option` is set to `true`
    #[must_use]
    pub fn flag(&self, option: TransportOption) -> bool {
        self.get(option).is_some_and(OptionValue::is_true)
    }

    /// The text value of `option`
    #[must_use]
    pub fn text(&self, option: TransportOption) -> Option<&str> {
        match self.get(option) {
            Some(OptionValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// The list value of `option`, empty if unset
    #[must_use]
    pub fn list(&self, option: TransportOption) -> &[String] {
        match self.get(option) {
            Some(OptionValue::List(values)) => values,
            _ => &[],
        }
    }

    /// The integer value of `option`
    #[must_use]
    pub fn int(&self, option: TransportOption) -> Option<u64> {
        match self.get(option) {
            Some(OptionValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// The duration value of `option`
    #[must_use]
    pub fn duration(&self, option: TransportOption) -> Option<Duration> {
        match self.get(option) {
            Some(OptionValue::Duration(value)) => Some(*value),
            _ => None,
        }
    }

    /// The body stored under [`TransportOption::PostFields`]
    #[must_use]
    pub fn body(&self) -> Option<&Body> {
        match self.get(TransportOption::PostFields) {
            Some(OptionValue::Body(body)) => Some(body),
            _ => None,
        }
    }

    /// The credentials stored under [`TransportOption::UserPwd`]
    #[must_use]
    pub fn credentials(&self) -> Option<&BasicAuthCredentials> {
        match self.get(TransportOption::UserPwd) {
            Some(OptionValue::Auth(credentials)) => Some(credentials),
            _ => None,
        }
    }

    /// Iterate over all options in a stable order
    pub fn iter(&self) -> impl Iterator<Item = (TransportOption, &OptionValue)> {
        self.0.iter().map(|(option, value)| (*option, value))
    }

    /// Number of options set
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no option is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_required_defaults() {
        let options = Options::with_required();
        assert_eq!(options.len(), 3);
        for option in TransportOption::REQUIRED {
            assert!(options.flag(option));
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut options = Options::new();
        assert_eq!(options.set(TransportOption::Url, "http://a"), None);
        assert_eq!(options.set(TransportOption::Url, "http://b"), None);
        assert_eq!(options.text(TransportOption::Url), Some("http://b"));
        assert_eq!(options.len(), 1);
    }

    #[rstest]
    #[case(TransportOption::HeaderOut, OptionValue::Bool(false))]
    #[case(TransportOption::Header, OptionValue::Int(0))]
    #[case(TransportOption::ReturnTransfer, OptionValue::Text("yes".into()))]
    fn test_required_override_warns(#[case] option: TransportOption, #[case] value: OptionValue) {
        let mut options = Options::with_required();
        let warning = options.set(option, value.clone());

        assert_eq!(warning, Some(RequiredOptionWarning { option, value: value.clone() }));
        // stored anyway
        assert_eq!(options.get(option), Some(&value));
        assert!(!options.flag(option));
    }

    #[test]
    fn test_required_set_true_does_not_warn() {
        let mut options = Options::new();
        assert_eq!(options.set(TransportOption::HeaderOut, true), None);
        assert_eq!(options.set(TransportOption::Verbose, false), None);
    }

    #[test]
    fn test_typed_getters() {
        let mut options = Options::new();
        options.set(TransportOption::MaxRedirs, 3_u64);
        options.set(TransportOption::Timeout, Duration::from_secs(2));
        options.set(TransportOption::HttpHeader, vec!["A: b".to_string()]);
        options.set(TransportOption::PostFields, Body::Raw("x=1".into()));
        options.set(TransportOption::UserPwd, BasicAuthCredentials::new("u", "p"));

        assert_eq!(options.int(TransportOption::MaxRedirs), Some(3));
        assert_eq!(options.duration(TransportOption::Timeout), Some(Duration::from_secs(2)));
        assert_eq!(options.list(TransportOption::HttpHeader), ["A: b".to_string()]);
        assert_eq!(options.list(TransportOption::Cookie), Vec::<String>::new().as_slice());
        assert_eq!(options.body(), Some(&Body::Raw("x=1".into())));
        assert_eq!(options.credentials().map(|c| c.username.as_str()), Some("u"));
        // wrong type reads as unset
        assert_eq!(options.text(TransportOption::MaxRedirs), None);
    }

    #[test]
    fn test_identity_options() {
        assert!(TransportOption::Url.is_identity());
        assert!(TransportOption::PostFields.is_identity());
        assert!(!TransportOption::HttpHeader.is_identity());
        assert!(!TransportOption::Timeout.is_identity());
    }

    #[test]
    fn test_warning_hides_password() {
        let warning = RequiredOptionWarning {
            option: TransportOption::Header,
            value: OptionValue::Auth(BasicAuthCredentials::new("user", "secret")),
        };
        let message = warning.to_string();
        assert_eq!(
            message,
            "Option `header` must stay enabled, but was set to credentials for user"
        );
    }
}
