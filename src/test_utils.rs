#![cfg(test)]

use std::{
    collections::HashMap,
    fmt::Write as _,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use crate::{
    options::{Options, TransportOption},
    transport::{Exchange, MultiTransport, Progress, Token, Transport},
    ErrorKind, Result,
};

/// A buffered response as a transport with every required option enabled
/// would return it.
pub(crate) fn mock_response(
    status_code: u16,
    reason: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> Exchange {
    let mut raw = format!("HTTP/1.1 {status_code} {reason}\r\n");
    for (name, value) in headers {
        let _ = write!(raw, "{name}: {value}\r\n");
    }
    raw.push_str("\r\n");
    raw.push_str(body);

    Exchange {
        raw: raw.into_bytes(),
        header_out: String::new(),
        status_code,
        error: None,
    }
}

/// Scripted [`Transport`] which never touches the network.
///
/// Responses are looked up by URL; unknown URLs get `200 OK`. Handles of a
/// concurrent group complete in reverse order of registration.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    responses: HashMap<String, Exchange>,
    executed: Mutex<Vec<Options>>,
    releases: AtomicUsize,
    max_adds: Option<usize>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `url` with `exchange`
    pub(crate) fn respond(mut self, url: &str, exchange: Exchange) -> Self {
        self.responses.insert(url.to_string(), exchange);
        self
    }

    /// Reject every registration with a concurrent group after the first `n`
    pub(crate) fn reject_adds_after(mut self, n: usize) -> Self {
        self.max_adds = Some(n);
        self
    }

    /// Options of every executed request, in order of execution
    pub(crate) fn executed(&self) -> Vec<Options> {
        self.executed.lock().unwrap().clone()
    }

    /// Number of released handles
    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn execute(&self, options: &Options) -> Exchange {
        self.executed.lock().unwrap().push(options.clone());

        let url = options.text(TransportOption::Url).unwrap_or_default();
        let mut exchange = self
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| mock_response(200, "OK", &[], "OK"));

        if exchange.error.is_none() && options.flag(TransportOption::HeaderOut) {
            let method = options
                .text(TransportOption::CustomRequest)
                .unwrap_or("GET");
            let mut header_out = format!("{method} {url} HTTP/1.1\r\n");
            if let Some(agent) = options.text(TransportOption::UserAgent) {
                let _ = write!(header_out, "User-Agent: {agent}\r\n");
            }
            for line in options.list(TransportOption::HttpHeader) {
                let _ = write!(header_out, "{line}\r\n");
            }
            header_out.push_str("\r\n");
            exchange.header_out = header_out;
        }
        exchange
    }

    fn multi(&self) -> Box<dyn MultiTransport + '_> {
        Box::new(MockMulti {
            transport: self,
            added: Vec::new(),
            finished: HashMap::new(),
        })
    }

    fn release(&self, _options: &Options) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockMulti<'a> {
    transport: &'a MockTransport,
    added: Vec<(Token, Options)>,
    finished: HashMap<Token, Exchange>,
}

impl MultiTransport for MockMulti<'_> {
    fn add(&mut self, options: &Options) -> Result<Token> {
        let token = self.added.len() + self.finished.len();
        if self.transport.max_adds.is_some_and(|max| token >= max) {
            return Err(ErrorKind::MultiAddHandle {
                token,
                reason: "rejected by mock".to_string(),
            });
        }
        self.added.push((token, options.clone()));
        Ok(token)
    }

    fn perform(&mut self) -> Progress {
        if let Some((token, options)) = self.added.pop() {
            let exchange = self.transport.execute(&options);
            self.finished.insert(token, exchange);
        }
        Progress {
            running: self.added.len(),
            call_again: false,
        }
    }

    fn take(&mut self, token: Token) -> Option<Exchange> {
        self.finished.remove(&token)
    }
}

static CAPTURED: CaptureLogger = CaptureLogger(Mutex::new(Vec::new()));

/// Keeps every log record in memory, as `LEVEL message`.
struct CaptureLogger(Mutex<Vec<String>>);

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.0
            .lock()
            .unwrap()
            .push(format!("{} {}", record.level(), record.args()));
    }

    fn flush(&self) {}
}

/// Route log records of the whole test binary into memory.
/// Calling this more than once is harmless.
pub(crate) fn capture_logs() {
    if log::set_logger(&CAPTURED).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}

/// Every record captured since [`capture_logs`] was first called
pub(crate) fn captured_logs() -> Vec<String> {
    CAPTURED.0.lock().unwrap().clone()
}
