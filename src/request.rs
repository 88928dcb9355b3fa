//! The request engine.
//!
//! A [`Request`] owns the configuration of one request, executes it through a
//! [`Transport`], classifies the outcome and fires the registered callbacks:
//!
//! ```text
//! Configured -> Executing -> Classified -> Succeeded | Failed -> Completed -> Closed
//! ```
//!
//! Given several targets, [`Request::get`] and [`Request::post`] run a batch
//! instead: every target gets its own child request, and the children are
//! executed concurrently. See [`Request::children`].
use std::{any::Any, fmt, path::PathBuf, sync::Arc, time::Duration};

use log::{debug, warn};

use crate::{
    batch,
    classify::{classify, Classification},
    config::Config,
    options::{Body, FormPart, OptionValue, Options, RequiredOptionWarning, TransportOption},
    query::{append_query, build_cookie_header, build_multi_query, build_query},
    transport::{Exchange, Handle, ReqwestTransport, Transport, TransportError},
    types::{BasicAuthCredentials, Field, HeaderMap, Payload, ResponseBody},
    ErrorKind, Result,
};

/// Default user agent, `volley/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("volley/", env!("CARGO_PKG_VERSION"));

/// Free-form value handed to every callback of a request.
pub type Context = Arc<dyn Any + Send + Sync>;

/// Called after a request finished.
pub type Callback = Arc<dyn Fn(&Request, &Payload, Option<&Context>) + Send + Sync>;

/// Called right before a request is sent, with a chance to reconfigure it.
pub type BeforeSend = Arc<dyn Fn(&mut Request, &Payload, Option<&Context>) + Send + Sync>;

#[derive(Clone, Default)]
struct Callbacks {
    before_send: Option<BeforeSend>,
    success: Option<Callback>,
    error: Option<Callback>,
    complete: Option<Callback>,
}

/// Lifecycle state of a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Not executed yet, or ready to be executed again
    Configured,
    /// Waiting for the transport
    Executing,
    /// Result fields are populated
    Classified,
    /// The success callback is running
    Succeeded,
    /// The error callback is running
    Failed,
    /// All callbacks have run
    Completed,
    /// The transport handle has been released
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    const fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }
}

/// One or more URLs a verb is invoked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    /// A single request
    One(String),
    /// A batch, one child request per URL
    Many(Vec<String>),
}

impl From<&str> for Targets {
    fn from(url: &str) -> Self {
        Targets::One(url.to_string())
    }
}

impl From<String> for Targets {
    fn from(url: String) -> Self {
        Targets::One(url)
    }
}

impl From<&String> for Targets {
    fn from(url: &String) -> Self {
        Targets::One(url.clone())
    }
}

impl From<Vec<String>> for Targets {
    fn from(urls: Vec<String>) -> Self {
        Targets::Many(urls)
    }
}

impl From<Vec<&str>> for Targets {
    fn from(urls: Vec<&str>) -> Self {
        Targets::Many(urls.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for Targets {
    fn from(urls: &[&str]) -> Self {
        Targets::Many(urls.iter().map(|url| (*url).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Targets {
    fn from(urls: [&str; N]) -> Self {
        Targets::Many(urls.into_iter().map(String::from).collect())
    }
}

/// What a verb returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The response of a single request
    Response(ResponseBody),
    /// A batch ran; the results live on [`Request::children`]
    Batch,
}

impl Outcome {
    /// The response, unless a batch ran
    #[must_use]
    pub const fn response(&self) -> Option<&ResponseBody> {
        match self {
            Outcome::Response(response) => Some(response),
            Outcome::Batch => None,
        }
    }

    /// Whether a batch ran
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(self, Outcome::Batch)
    }
}

/// A configurable HTTP request with outcome callbacks.
///
/// Failures never surface as `Err`: a refused connection or a `404` is
/// recorded in the result fields ([`Request::error`],
/// [`Request::error_code`], ...) and reported to the error callback. `Err`
/// is reserved for a closed request or a batch which could not be set up.
///
/// ```no_run
/// use volley::{Fields, Request};
///
/// # fn main() -> volley::Result<()> {
/// let mut request = Request::new()?;
/// request
///     .set_header("Accept", "application/json")
///     .on_error(|request, _, _| eprintln!("{}", request.error_message()));
///
/// request.get("https://example.com/search", Fields::new().text("q", "volley"))?;
/// println!("{}", request.response());
/// # Ok(())
/// # }
/// ```
pub struct Request {
    transport: Arc<dyn Transport>,
    handle: Handle,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    data: Payload,
    context: Option<Context>,
    callbacks: Callbacks,
    batch_child: bool,
    children: Vec<Request>,
    state: State,
    warnings: Vec<RequiredOptionWarning>,
    result: Classification,
}

impl Request {
    /// Create a request backed by a [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TransportUnavailable`] if the transport cannot
    /// be created.
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(Arc::new(ReqwestTransport::new()?)))
    }

    /// Create a request backed by `transport`.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let mut handle = Handle::new();
        handle.set(TransportOption::UserAgent, DEFAULT_USER_AGENT);
        Self {
            transport,
            handle,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            data: Payload::Empty,
            context: None,
            callbacks: Callbacks::default(),
            batch_child: false,
            children: Vec::new(),
            state: State::Configured,
            warnings: Vec::new(),
            result: Classification::default(),
        }
    }

    /// Create a request backed by a [`ReqwestTransport`] and apply `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TransportUnavailable`] if the transport cannot
    /// be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut request = Self::new()?;
        request.apply_config(config);
        Ok(request)
    }

    /// Apply every field set in `config` through the ordinary setters.
    pub fn apply_config(&mut self, config: &Config) -> &mut Self {
        if let Some(user_agent) = &config.user_agent {
            self.set_user_agent(user_agent.as_str());
        }
        for (name, value) in &config.headers {
            self.set_header(name.as_str(), value.as_str());
        }
        if let Some(credentials) = &config.basic_auth {
            self.set_option(TransportOption::UserPwd, credentials.clone());
        }
        if let Some(referrer) = &config.referrer {
            self.set_referrer(referrer.as_str());
        }
        for (name, value) in &config.cookies {
            self.set_cookie(name.as_str(), value.as_str());
        }
        if let Some(path) = &config.cookie_file {
            self.set_cookie_file(path.clone());
        }
        if let Some(path) = &config.cookie_jar {
            self.set_cookie_jar(path.clone());
        }
        if let Some(timeout) = config.timeout {
            self.set_timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            self.set_connect_timeout(timeout);
        }
        if config.follow_redirects {
            self.set_follow_location(true);
        }
        if let Some(max) = config.max_redirects {
            self.set_option(TransportOption::MaxRedirs, max);
        }
        if config.insecure {
            self.set_option(TransportOption::SslVerifyPeer, false);
        }
        if config.verbose {
            self.verbose(true);
        }
        self
    }

    /// Send a `GET` request.
    ///
    /// `data` is appended to the URL as query string. Given several targets,
    /// a batch runs and [`Outcome::Batch`] is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the request has been closed, or if a batch child
    /// cannot be registered with the transport.
    pub fn get(&mut self, targets: impl Into<Targets>, data: impl Into<Payload>) -> Result<Outcome> {
        self.dispatch(Verb::Get, targets.into(), data.into())
    }

    /// Send a `POST` request.
    ///
    /// Raw data is sent as is. Flat fields are sent as a multipart form, so
    /// they may contain files. Nested fields are sent url-encoded.
    ///
    /// # Errors
    ///
    /// See [`Request::get`].
    pub fn post(&mut self, targets: impl Into<Targets>, data: impl Into<Payload>) -> Result<Outcome> {
        self.dispatch(Verb::Post, targets.into(), data.into())
    }

    /// Send a `PUT` request with `data` url-encoded as body.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::HandleClosed`] if the request has been closed.
    pub fn put(&mut self, url: &str, data: impl Into<Payload>) -> Result<ResponseBody> {
        self.single(Verb::Put, url, data.into())
    }

    /// Send a `PATCH` request. The body is encoded like for [`Request::post`].
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::HandleClosed`] if the request has been closed.
    pub fn patch(&mut self, url: &str, data: impl Into<Payload>) -> Result<ResponseBody> {
        self.single(Verb::Patch, url, data.into())
    }

    /// Send a `DELETE` request with `data` appended to the URL as query
    /// string.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::HandleClosed`] if the request has been closed.
    pub fn delete(&mut self, url: &str, data: impl Into<Payload>) -> Result<ResponseBody> {
        self.single(Verb::Delete, url, data.into())
    }

    fn dispatch(&mut self, verb: Verb, targets: Targets, data: Payload) -> Result<Outcome> {
        match targets {
            Targets::One(url) => self.single(verb, &url, data).map(Outcome::Response),
            Targets::Many(urls) => {
                self.ensure_open()?;
                self.data = data;
                let data = self.data.clone();
                batch::run(self, verb, &urls, &data)?;
                Ok(Outcome::Batch)
            }
        }
    }

    fn single(&mut self, verb: Verb, url: &str, data: Payload) -> Result<ResponseBody> {
        self.ensure_open()?;
        self.configure(verb, url, &data);
        self.data = data;
        self.run_before_send();

        self.state = State::Executing;
        debug!("{} {}", verb.as_str(), self.url().unwrap_or_default());
        let exchange = self.transport.execute(self.handle.options());
        self.finish(exchange);
        Ok(self.result.response.clone())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.handle.is_open() {
            Ok(())
        } else {
            Err(ErrorKind::HandleClosed)
        }
    }

    /// Set the target, method and body options for `verb`.
    pub(crate) fn configure(&mut self, verb: Verb, url: &str, data: &Payload) {
        self.handle.set(TransportOption::CustomRequest, verb.as_str());
        for option in [
            TransportOption::HttpGet,
            TransportOption::Post,
            TransportOption::PostFields,
        ] {
            self.handle.unset(option);
        }

        match verb {
            Verb::Get | Verb::Delete => {
                self.handle
                    .set(TransportOption::Url, append_query(url, &query_string(data)));
                if verb == Verb::Get {
                    self.handle.set(TransportOption::HttpGet, true);
                }
            }
            Verb::Post | Verb::Patch => {
                self.handle.set(TransportOption::Url, url);
                if verb == Verb::Post {
                    self.handle.set(TransportOption::Post, true);
                }
                self.handle.set(TransportOption::PostFields, post_body(data));
            }
            Verb::Put => {
                self.handle.set(TransportOption::Url, url);
                // an empty payload leaves an upload file set through `set_option` in charge
                if !(data.is_empty() && self.handle.options().contains(TransportOption::InFile)) {
                    self.handle
                        .set(TransportOption::PostFields, Body::Raw(query_string(data)));
                }
            }
        }
    }

    /// Create a batch child sharing transport, callbacks, context and
    /// configured headers.
    pub(crate) fn spawn_child(&self) -> Request {
        let mut child = Request::with_transport(Arc::clone(&self.transport));
        child.batch_child = true;
        child.callbacks = self.callbacks.clone();
        child.context = self.context.clone();
        child.headers = self.headers.clone();
        child.cookies = self.cookies.clone();
        child
    }

    /// Copy every option of `parent` except the target, method and body.
    pub(crate) fn inherit(&mut self, parent: &Request) {
        for (option, value) in parent.options().iter() {
            if !option.is_identity() {
                self.handle.set(option, value.clone());
            }
        }
        if parent.options().contains(TransportOption::HttpHeader) {
            self.headers = parent.headers.clone();
        }
        if parent.options().contains(TransportOption::Cookie) {
            self.cookies = parent.cookies.clone();
        }
    }

    pub(crate) fn set_data(&mut self, data: Payload) {
        self.data = data;
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub(crate) fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Close and replace the children of an earlier batch.
    pub(crate) fn adopt(&mut self, children: Vec<Request>) -> Result<()> {
        let closed = self.close_children();
        self.children = children;
        closed
    }

    pub(crate) fn run_before_send(&mut self) {
        if let Some(hook) = self.callbacks.before_send.clone() {
            let data = self.data.clone();
            let context = self.context.clone();
            hook(self, &data, context.as_ref());
        }
    }

    /// Classify `exchange` and fire the callbacks.
    pub(crate) fn finish(&mut self, exchange: Exchange) {
        self.result = classify(&exchange);
        self.handle.store(exchange);
        self.state = State::Classified;

        if self.result.error {
            debug!(
                "{} failed with {}: {}",
                self.url().unwrap_or_default(),
                self.result.error_code,
                self.result.error_message
            );
            self.state = State::Failed;
            if let Some(callback) = self.callbacks.error.clone() {
                callback(&*self, &self.data, self.context.as_ref());
            }
        } else {
            self.state = State::Succeeded;
            if let Some(callback) = self.callbacks.success.clone() {
                callback(&*self, &self.data, self.context.as_ref());
            }
        }

        self.state = State::Completed;
        if let Some(callback) = self.callbacks.complete.clone() {
            callback(&*self, &self.data, self.context.as_ref());
        }
    }

    /// Set a transport option directly.
    ///
    /// Returns a warning, which is also logged and kept in
    /// [`Request::warnings`], if one of the options the response
    /// classification depends on is set to anything other than `true`. The
    /// value is applied either way.
    pub fn set_option(
        &mut self,
        option: TransportOption,
        value: impl Into<OptionValue>,
    ) -> Option<RequiredOptionWarning> {
        let warning = self.handle.set(option, value);
        if let Some(warning) = &warning {
            warn!("{warning}");
            self.warnings.push(warning.clone());
        }
        warning
    }

    /// Set the `User-Agent` header
    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.handle.set(TransportOption::UserAgent, user_agent.into());
        self
    }

    /// Authenticate with basic auth
    pub fn set_basic_authentication(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        self.handle.set(
            TransportOption::UserPwd,
            BasicAuthCredentials::new(username, password),
        );
        self
    }

    /// Set a header. Names are case-insensitive, the last write wins.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name, value.into());
        self.sync_headers();
        self
    }

    /// Remove a header set with [`Request::set_header`]
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        let removed = self.headers.remove(name);
        self.sync_headers();
        removed
    }

    fn sync_headers(&mut self) {
        if self.headers.is_empty() {
            self.handle.unset(TransportOption::HttpHeader);
        } else {
            self.handle
                .set(TransportOption::HttpHeader, self.headers.to_lines());
        }
    }

    /// Set the `Referer` header
    pub fn set_referrer(&mut self, referrer: impl Into<String>) -> &mut Self {
        self.handle.set(TransportOption::Referer, referrer.into());
        self
    }

    /// Set a cookie. Names are case-sensitive, the last write wins.
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let (name, value) = (name.into(), value.into());
        match self.cookies.iter_mut().find(|(existing, _)| *existing == name) {
            Some(cookie) => cookie.1 = value,
            None => self.cookies.push((name, value)),
        }
        self.handle
            .set(TransportOption::Cookie, build_cookie_header(&self.cookies));
        self
    }

    /// Read cookies from a JSON cookie file
    pub fn set_cookie_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.handle.set(TransportOption::CookieFile, path.into());
        self
    }

    /// Write received cookies to a JSON file when the request is closed
    pub fn set_cookie_jar(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.handle.set(TransportOption::CookieJar, path.into());
        self
    }

    /// Log every exchange at `info` level
    pub fn verbose(&mut self, on: bool) -> &mut Self {
        self.handle.set(TransportOption::Verbose, on);
        self
    }

    /// Timeout for the whole exchange
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.handle.set(TransportOption::Timeout, timeout);
        self
    }

    /// Timeout for establishing the connection
    pub fn set_connect_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.handle.set(TransportOption::ConnectTimeout, timeout);
        self
    }

    /// Follow redirects
    pub fn set_follow_location(&mut self, follow: bool) -> &mut Self {
        self.handle.set(TransportOption::FollowLocation, follow);
        self
    }

    /// Attach a value which is handed to every callback
    pub fn set_context(&mut self, context: impl Any + Send + Sync) -> &mut Self {
        self.context = Some(Arc::new(context));
        self
    }

    /// Register a callback which runs right before the request is sent.
    ///
    /// In a batch it runs once per child, receiving the child.
    pub fn on_before_send<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut Request, &Payload, Option<&Context>) + Send + Sync + 'static,
    {
        self.callbacks.before_send = Some(Arc::new(callback));
        self
    }

    /// Register a callback which runs if the request succeeded
    pub fn on_success<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&Request, &Payload, Option<&Context>) + Send + Sync + 'static,
    {
        self.callbacks.success = Some(Arc::new(callback));
        self
    }

    /// Register a callback which runs if the request failed
    pub fn on_error<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&Request, &Payload, Option<&Context>) + Send + Sync + 'static,
    {
        self.callbacks.error = Some(Arc::new(callback));
        self
    }

    /// Register a callback which runs after the success or error callback
    pub fn on_complete<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&Request, &Payload, Option<&Context>) + Send + Sync + 'static,
    {
        self.callbacks.complete = Some(Arc::new(callback));
        self
    }

    /// Release the transport handle, closing the children of a batch first.
    ///
    /// Closing is idempotent. A closed request cannot be executed again.
    ///
    /// # Errors
    ///
    /// Returns the first error the transport reported while releasing a
    /// handle, e.g. if a cookie jar could not be written. All handles are
    /// released regardless.
    pub fn close(&mut self) -> Result<()> {
        let children = self.close_children();
        let own = self.handle.close(self.transport.as_ref());
        self.state = State::Closed;
        children.and(own)
    }

    fn close_children(&mut self) -> Result<()> {
        let mut outcome = Ok(());
        for child in &mut self.children {
            if let Err(e) = child.close() {
                warn!("Failed to close batch child: {e}");
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        }
        outcome
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Whether [`Request::close`] has been called
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        !self.handle.is_open()
    }

    /// The current transport options
    #[must_use]
    pub const fn options(&self) -> &Options {
        self.handle.options()
    }

    /// The target URL, including any query string
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.options().text(TransportOption::Url)
    }

    /// Headers set with [`Request::set_header`]
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Cookies set with [`Request::set_cookie`]
    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// The data passed to the last verb
    #[must_use]
    pub const fn data(&self) -> &Payload {
        &self.data
    }

    /// The value set with [`Request::set_context`]
    #[must_use]
    pub const fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// The context, if it is a `T`
    #[must_use]
    pub fn context_as<T: Any>(&self) -> Option<&T> {
        self.context.as_deref()?.downcast_ref()
    }

    /// Warnings raised by [`Request::set_option`]
    #[must_use]
    pub fn warnings(&self) -> &[RequiredOptionWarning] {
        &self.warnings
    }

    /// Whether this request was spawned by a batch
    #[must_use]
    pub const fn is_batch_child(&self) -> bool {
        self.batch_child
    }

    /// The children of the last batch, in the order of its targets
    #[must_use]
    pub fn children(&self) -> &[Request] {
        &self.children
    }

    /// The child for the target at `index` of the last batch
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Request> {
        self.children.get(index)
    }

    /// The response body, decoded if it is JSON
    #[must_use]
    pub const fn response(&self) -> &ResponseBody {
        &self.result.response
    }

    /// The unparsed response as the transport buffered it
    #[must_use]
    pub fn raw_response(&self) -> &[u8] {
        self.handle
            .exchange()
            .map_or(&[][..], |exchange| exchange.raw.as_slice())
    }

    /// The headers actually sent, including the `Request-Line`.
    ///
    /// Empty when no outbound header block was captured, for example with
    /// [`TransportOption::HeaderOut`] turned off.
    #[must_use]
    pub const fn request_headers(&self) -> &HeaderMap {
        &self.result.request_headers
    }

    /// The headers received, including the `Status-Line`.
    ///
    /// Compressed responses are decoded before they are stored, so a gzip
    /// response carries neither `Content-Encoding` nor `Content-Length` here.
    #[must_use]
    pub const fn response_headers(&self) -> &HeaderMap {
        &self.result.response_headers
    }

    /// Whether the request failed for any reason
    #[must_use]
    pub const fn error(&self) -> bool {
        self.result.error
    }

    /// Transport error code, else the HTTP status on an HTTP error, else `0`
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        self.result.error_code
    }

    /// Transport error message, else the status line on an HTTP error
    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.result.error_message
    }

    /// The transport-level failure, if any
    #[must_use]
    pub const fn transport_error(&self) -> Option<&TransportError> {
        self.result.transport_error.as_ref()
    }

    /// Whether the transport failed
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        self.result.transport_error.is_some()
    }

    /// Numeric code of the transport failure, `0` if there was none
    #[must_use]
    pub fn transport_error_code(&self) -> u32 {
        self.transport_error().map_or(0, |e| e.code.code())
    }

    /// Whether the status code is in the 4xx or 5xx range
    #[must_use]
    pub const fn http_error(&self) -> bool {
        self.result.http_error
    }

    /// Status code of the response, `0` without a response
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        self.result.http_status_code
    }

    /// The status line on an HTTP error, empty otherwise
    #[must_use]
    pub fn http_error_message(&self) -> &str {
        &self.result.http_error_message
    }
}

fn query_string(data: &Payload) -> String {
    match data {
        Payload::Empty => String::new(),
        Payload::Raw(raw) => raw.clone(),
        Payload::Fields(fields) => build_query(fields),
    }
}

fn post_body(data: &Payload) -> Body {
    match data {
        Payload::Empty => Body::Raw(String::new()),
        Payload::Raw(raw) => Body::Raw(raw.clone()),
        Payload::Fields(fields) if fields.is_nested() => Body::Raw(build_multi_query(fields)),
        Payload::Fields(fields) => Body::Form(
            fields
                .iter()
                .map(|(name, value)| match value {
                    Field::File(path) => FormPart::File {
                        name: name.to_string(),
                        path: path.clone(),
                    },
                    Field::Text(text) => FormPart::Text {
                        name: name.to_string(),
                        value: text.clone(),
                    },
                    // flat, so any container is empty
                    Field::List(_) | Field::Map(_) => FormPart::Text {
                        name: name.to_string(),
                        value: String::new(),
                    },
                })
                .collect(),
        ),
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close request: {e}");
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("state", &self.state)
            .field("options", self.options())
            .field("headers", &self.headers)
            .field("data", &self.data)
            .field("batch_child", &self.batch_child)
            .field("children", &self.children.len())
            .field("error_code", &self.result.error_code)
            .finish_non_exhaustive()
    }
}
