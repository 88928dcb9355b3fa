use std::{
    collections::HashMap,
    error::Error as _,
    fmt::Write as _,
    io::Write as _,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use headers::HeaderMapExt;
use http::{
    header::{
        ACCEPT, ACCEPT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, REFERER, USER_AGENT,
    },
    HeaderMap as WireHeaders, HeaderName, HeaderValue, Method,
};
use log::{debug, info, warn};
use reqwest::{multipart, redirect, Client, RequestBuilder, Url};
use tokio::{
    runtime::Runtime,
    task::{JoinError, JoinSet},
};

use super::{
    CookieJar, ErrorCode, Exchange, MultiTransport, Progress, Token, Transport, TransportError,
};
use crate::{
    options::{Body, FormPart, OptionValue, Options, TransportOption},
    ErrorKind, Result,
};

/// Number of redirects followed if [`TransportOption::MaxRedirs`] is unset.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// How long a single [`MultiTransport::perform`] step waits for an exchange
/// to finish.
const PERFORM_STEP: Duration = Duration::from_millis(50);

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// `Accept` header `reqwest` sends unless one is set.
const DEFAULT_ACCEPT: &str = "*/*";

/// `Accept-Encoding` header `reqwest` sends unless one is set. Compressed
/// responses are decoded transparently.
const DEFAULT_ACCEPT_ENCODING: &str = "gzip";

/// [`Transport`] backed by [`reqwest`], running on a private single-threaded
/// `tokio` runtime.
///
/// Calls block the current thread. They must not be made from within an
/// asynchronous context; use `tokio::task::spawn_blocking` there.
#[derive(Debug)]
pub struct ReqwestTransport {
    runtime: Runtime,
    /// Cookie stores by the file they are persisted to
    jars: Mutex<HashMap<PathBuf, CookieJar>>,
}

impl ReqwestTransport {
    /// Create a new transport.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TransportUnavailable`] if the runtime cannot be
    /// started.
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ErrorKind::TransportUnavailable(e.to_string()))?;
        Ok(Self {
            runtime,
            jars: Mutex::default(),
        })
    }

    /// Turn `options` into a request which is ready to be sent.
    fn prepare(&self, options: &Options) -> std::result::Result<Prepared, TransportError> {
        let url = options.text(TransportOption::Url).ok_or_else(|| {
            TransportError::new(ErrorCode::UrlMalformed, "No URL set")
        })?;
        let url = Url::parse(url).map_err(|e| {
            TransportError::new(ErrorCode::UrlMalformed, format!("Malformed URL `{url}`: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::new(
                ErrorCode::UnsupportedProtocol,
                format!("Protocol `{}` is not supported", url.scheme()),
            ));
        }

        let jar = self.cookie_jar(options)?;
        let client = build_client(options, jar.as_ref())?;

        let mut headers = request_headers(options)?;
        if let Some(jar) = &jar {
            if !headers.contains_key(COOKIE) {
                if let Some(cookies) = jar.header_for(&url) {
                    headers.insert(COOKIE, cookies);
                }
            }
        }
        // set here so that the captured block carries them
        for (name, value) in [
            (ACCEPT, DEFAULT_ACCEPT),
            (ACCEPT_ENCODING, DEFAULT_ACCEPT_ENCODING),
        ] {
            if !headers.contains_key(&name) {
                headers.insert(name, HeaderValue::from_static(value));
            }
        }

        let builder = client.request(method(options)?, url).headers(headers);
        let request = attach_body(builder, options)?
            .build()
            .map_err(|e| transport_error(&e))?;

        Ok(Prepared {
            header_out: header_block(&request),
            client,
            request,
            capture_header_out: options.flag(TransportOption::HeaderOut),
            include_header: options.flag(TransportOption::Header),
            return_transfer: options.flag(TransportOption::ReturnTransfer),
            verbose: options.flag(TransportOption::Verbose),
        })
    }

    /// The cookie store for `options`, loaded on first use.
    ///
    /// Stores are keyed by the cookie jar path, or by the cookie file if no
    /// jar is set, and are read from the cookie file if one is set.
    fn cookie_jar(&self, options: &Options) -> std::result::Result<Option<CookieJar>, TransportError> {
        let Some(key) = options
            .text(TransportOption::CookieJar)
            .or_else(|| options.text(TransportOption::CookieFile))
        else {
            return Ok(None);
        };
        let key = PathBuf::from(key);

        let mut jars = self.jars.lock().map_err(|e| {
            TransportError::new(ErrorCode::ReadError, format!("Failed to lock cookie stores: {e}"))
        })?;
        if let Some(jar) = jars.get(&key) {
            return Ok(Some(jar.clone()));
        }

        let source = options
            .text(TransportOption::CookieFile)
            .map_or_else(|| key.clone(), PathBuf::from);
        let jar = CookieJar::load(source)
            .map_err(|e| TransportError::new(ErrorCode::ReadError, e.to_string()))?;
        jars.insert(key, jar.clone());
        Ok(Some(jar))
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, options: &Options) -> Exchange {
        match self.prepare(options) {
            Ok(prepared) => self.runtime.block_on(send(prepared)),
            Err(error) => {
                debug!("Request not sent: {error}");
                Exchange::failed(error)
            }
        }
    }

    fn multi(&self) -> Box<dyn MultiTransport + '_> {
        Box::new(ReqwestMulti {
            transport: self,
            queued: Vec::new(),
            tasks: JoinSet::new(),
            finished: HashMap::new(),
            next_token: 0,
            started: false,
        })
    }

    fn release(&self, options: &Options) -> Result<()> {
        let Some(path) = options.text(TransportOption::CookieJar) else {
            return Ok(());
        };
        let path = PathBuf::from(path);
        let jar = self
            .jars
            .lock()
            .map_err(|e| ErrorKind::Cookies(format!("Failed to lock cookie stores: {e}")))?
            .get(&path)
            .cloned();
        match jar {
            Some(jar) => jar.save_to(&path),
            None => Ok(()),
        }
    }
}

/// A request with everything needed to send it from a spawned task.
struct Prepared {
    client: Client,
    request: reqwest::Request,
    header_out: String,
    capture_header_out: bool,
    include_header: bool,
    return_transfer: bool,
    verbose: bool,
}

async fn send(prepared: Prepared) -> Exchange {
    let Prepared {
        client,
        request,
        header_out,
        capture_header_out,
        include_header,
        return_transfer,
        verbose,
    } = prepared;

    if verbose {
        for line in header_out.lines().filter(|line| !line.is_empty()) {
            info!("> {line}");
        }
    }
    let header_out = if capture_header_out {
        header_out
    } else {
        String::new()
    };

    let response = match client.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            debug!("Request failed: {e}");
            return Exchange {
                header_out,
                ..Exchange::failed(transport_error(&e))
            };
        }
    };

    let status_code = response.status().as_u16();
    let head = status_block(&response);
    if verbose {
        for line in head.lines().filter(|line| !line.is_empty()) {
            info!("< {line}");
        }
    }

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            return Exchange {
                header_out,
                status_code,
                ..Exchange::failed(transport_error(&e))
            };
        }
    };

    let mut raw = Vec::with_capacity(head.len() + body.len());
    if include_header {
        raw.extend_from_slice(head.as_bytes());
    }
    raw.extend_from_slice(&body);

    if !return_transfer {
        if let Err(e) = std::io::stdout().write_all(&raw) {
            warn!("Cannot write response to stdout: {e}");
        }
        raw.clear();
    }

    Exchange {
        raw,
        header_out,
        status_code,
        error: None,
    }
}

fn method(options: &Options) -> std::result::Result<Method, TransportError> {
    if let Some(custom) = options.text(TransportOption::CustomRequest) {
        return Method::from_bytes(custom.as_bytes()).map_err(|_| {
            TransportError::new(
                ErrorCode::BadFunctionArgument,
                format!("Invalid request method `{custom}`"),
            )
        });
    }
    Ok(if options.flag(TransportOption::Put) {
        Method::PUT
    } else if options.flag(TransportOption::Post) || options.contains(TransportOption::PostFields) {
        Method::POST
    } else {
        Method::GET
    })
}

fn build_client(
    options: &Options,
    jar: Option<&CookieJar>,
) -> std::result::Result<Client, TransportError> {
    let insecure = options.get(TransportOption::SslVerifyPeer) == Some(&OptionValue::Bool(false));
    let mut builder = Client::builder()
        .danger_accept_invalid_certs(insecure)
        .redirect(redirect_policy(options));

    if let Some(timeout) = options.duration(TransportOption::Timeout) {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = options.duration(TransportOption::ConnectTimeout) {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar.inner.clone());
    }

    builder
        .build()
        .map_err(|e| TransportError::new(ErrorCode::BadFunctionArgument, e.to_string()))
}

fn redirect_policy(options: &Options) -> redirect::Policy {
    if !options.flag(TransportOption::FollowLocation) {
        return redirect::Policy::none();
    }
    let max = options
        .int(TransportOption::MaxRedirs)
        .map_or(DEFAULT_MAX_REDIRECTS, |max| {
            usize::try_from(max).unwrap_or(usize::MAX)
        });
    redirect::Policy::limited(max)
}

/// Build the wire headers from the header related options.
///
/// Lines from [`TransportOption::HttpHeader`] win over the dedicated
/// options. A line with an empty value removes the header.
fn request_headers(options: &Options) -> std::result::Result<WireHeaders, TransportError> {
    let mut headers = WireHeaders::new();
    for (name, option) in [
        (USER_AGENT, TransportOption::UserAgent),
        (REFERER, TransportOption::Referer),
        (COOKIE, TransportOption::Cookie),
    ] {
        if let Some(value) = options.text(option) {
            headers.insert(name, header_value(value)?);
        }
    }
    if let Some(credentials) = options.credentials() {
        headers.typed_insert(credentials.to_authorization());
    }

    for line in options.list(TransportOption::HttpHeader) {
        let (name, value) = line.split_once(':').ok_or_else(|| {
            TransportError::new(
                ErrorCode::BadFunctionArgument,
                format!("Header line `{line}` has no name"),
            )
        })?;
        let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| {
            TransportError::new(ErrorCode::BadFunctionArgument, format!("`{line}`: {e}"))
        })?;
        match value.trim() {
            "" => {
                headers.remove(name);
            }
            value => {
                headers.insert(name, header_value(value)?);
            }
        }
    }
    Ok(headers)
}

fn header_value(value: &str) -> std::result::Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value).map_err(|e| {
        TransportError::new(ErrorCode::BadFunctionArgument, format!("`{value}`: {e}"))
    })
}

fn has_content_type(options: &Options) -> bool {
    options.list(TransportOption::HttpHeader).iter().any(|line| {
        line.split_once(':')
            .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
    })
}

fn attach_body(
    builder: RequestBuilder,
    options: &Options,
) -> std::result::Result<RequestBuilder, TransportError> {
    match options.body() {
        Some(Body::Raw(raw)) => {
            let builder = builder.body(raw.clone());
            if has_content_type(options) {
                Ok(builder)
            } else {
                Ok(builder.header(CONTENT_TYPE, FORM_URLENCODED))
            }
        }
        Some(Body::Form(parts)) => Ok(builder.multipart(form(parts)?)),
        None => match options.text(TransportOption::InFile) {
            Some(path) => Ok(builder.body(read_file(Path::new(path))?)),
            None => Ok(builder),
        },
    }
}

fn form(parts: &[FormPart]) -> std::result::Result<multipart::Form, TransportError> {
    let mut form = multipart::Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File { name, path } => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let part = multipart::Part::bytes(read_file(path)?).file_name(file_name);
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

fn read_file(path: &Path) -> std::result::Result<Vec<u8>, TransportError> {
    std::fs::read(path).map_err(|e| {
        TransportError::new(
            ErrorCode::ReadError,
            format!("Cannot read `{}`: {e}", path.display()),
        )
    })
}

/// Serialise the outbound request line and headers as they go on the wire.
///
/// `Host` and `Content-Length` are added by the connection, so they are
/// derived from the URL and the buffered body.
fn header_block(request: &reqwest::Request) -> String {
    let url = request.url();
    let target = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    };

    let mut block = format!("{} {target} HTTP/1.1\r\n", request.method());
    if let Some(host) = url.host_str() {
        let _ = match url.port() {
            Some(port) => write!(block, "Host: {host}:{port}\r\n"),
            None => write!(block, "Host: {host}\r\n"),
        };
    }
    write_headers(&mut block, request.headers());
    if !request.headers().contains_key(CONTENT_LENGTH) {
        // an empty body is sent without any length header
        if let Some(body) = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .filter(|body| !body.is_empty())
        {
            let _ = write!(block, "{CONTENT_LENGTH}: {}\r\n", body.len());
        }
    }
    block.push_str("\r\n");
    block
}

/// Serialise the status line and headers of `response`, including the
/// terminating empty line.
fn status_block(response: &reqwest::Response) -> String {
    let status = response.status();
    let mut block = format!(
        "{:?} {} {}",
        response.version(),
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
    .trim_end()
    .to_string();
    block.push_str("\r\n");
    write_headers(&mut block, response.headers());
    block.push_str("\r\n");
    block
}

fn write_headers(block: &mut String, headers: &WireHeaders) {
    for (name, value) in headers {
        let _ = write!(block, "{name}: {}\r\n", String::from_utf8_lossy(value.as_bytes()));
    }
}

fn transport_error(error: &reqwest::Error) -> TransportError {
    TransportError::new(error_code(error), error_message(error))
}

fn error_code(error: &reqwest::Error) -> ErrorCode {
    if error.is_timeout() {
        ErrorCode::OperationTimedOut
    } else if error.is_redirect() {
        ErrorCode::TooManyRedirects
    } else if error.is_builder() {
        ErrorCode::UrlMalformed
    } else if error.is_connect() {
        if is_dns_error(error) {
            ErrorCode::CouldntResolveHost
        } else {
            ErrorCode::CouldntConnect
        }
    } else if error.is_body() || error.is_decode() {
        ErrorCode::RecvError
    } else if error.is_request() {
        ErrorCode::SendError
    } else {
        ErrorCode::GotNothing
    }
}

/// Traverse the error chain looking for a failed name lookup
fn is_dns_error(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(err) = source {
        let message = err.to_string();
        if message.contains("dns error") || message.contains("failed to lookup address") {
            return true;
        }
        source = err.source();
    }
    false
}

/// The error and all of its sources, outermost first
fn error_message(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(err) = source {
        let _ = write!(message, ": {err}");
        source = err.source();
    }
    message
}

/// Concurrent group of exchanges for [`ReqwestTransport`].
///
/// Registered requests are spawned on the transport's runtime by the first
/// call to [`perform`](MultiTransport::perform). Every later call drives the
/// runtime for at most one short step.
struct ReqwestMulti<'a> {
    transport: &'a ReqwestTransport,
    queued: Vec<(Token, Prepared)>,
    tasks: JoinSet<(Token, Exchange)>,
    finished: HashMap<Token, Exchange>,
    next_token: Token,
    started: bool,
}

impl ReqwestMulti<'_> {
    fn collect(&mut self, joined: std::result::Result<(Token, Exchange), JoinError>) {
        match joined {
            Ok((token, exchange)) => {
                self.finished.insert(token, exchange);
            }
            Err(e) => warn!("Exchange task did not finish: {e}"),
        }
    }
}

impl MultiTransport for ReqwestMulti<'_> {
    fn add(&mut self, options: &Options) -> Result<Token> {
        if self.started {
            return Err(ErrorKind::MultiAddHandle {
                token: self.next_token,
                reason: "the group is already performing".to_string(),
            });
        }
        let token = self.next_token;
        self.next_token += 1;
        match self.transport.prepare(options) {
            Ok(prepared) => self.queued.push((token, prepared)),
            Err(error) => {
                debug!("Request {token} not sent: {error}");
                self.finished.insert(token, Exchange::failed(error));
            }
        }
        Ok(token)
    }

    fn perform(&mut self) -> Progress {
        if !self.started {
            self.started = true;
            let _guard = self.transport.runtime.enter();
            for (token, prepared) in self.queued.drain(..) {
                self.tasks.spawn(async move { (token, send(prepared).await) });
            }
        }
        if self.tasks.is_empty() {
            return Progress::default();
        }

        let tasks = &mut self.tasks;
        let joined = self
            .transport
            .runtime
            .block_on(async { tokio::time::timeout(PERFORM_STEP, tasks.join_next()).await });
        if let Ok(Some(joined)) = joined {
            self.collect(joined);
        }
        while let Some(joined) = self.tasks.try_join_next() {
            self.collect(joined);
        }

        Progress {
            running: self.tasks.len(),
            call_again: false,
        }
    }

    fn take(&mut self, token: Token) -> Option<Exchange> {
        self.finished.remove(&token)
    }
}
