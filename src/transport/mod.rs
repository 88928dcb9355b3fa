//! The transport capability requests are executed with.
//!
//! A [`Transport`] performs one blocking exchange at a time, while a
//! [`MultiTransport`] drives a group of exchanges concurrently, one
//! [`perform`](MultiTransport::perform) step at a time.
//! [`ReqwestTransport`] is the implementation shipped with this crate.
use std::fmt::{Debug, Display};

use thiserror::Error;

use crate::{options::Options, Result};

mod client;
mod cookies;
mod handle;

pub use client::{ReqwestTransport, DEFAULT_MAX_REDIRECTS};
pub use cookies::CookieJar;
pub(crate) use handle::Handle;

/// Identifies an exchange registered with a [`MultiTransport`].
pub type Token = usize;

/// Performs HTTP exchanges described by [`Options`].
pub trait Transport: Debug + Send + Sync {
    /// Perform one exchange and block until it has finished.
    ///
    /// Failures are reported through [`Exchange::error`], never by
    /// panicking.
    fn execute(&self, options: &Options) -> Exchange;

    /// Create an empty group for concurrent execution.
    fn multi(&self) -> Box<dyn MultiTransport + '_>;

    /// Release whatever the transport keeps for a handle with these
    /// options. Called exactly once per handle.
    ///
    /// # Errors
    ///
    /// Returns an error if state tied to the handle, such as a cookie jar,
    /// cannot be persisted.
    fn release(&self, options: &Options) -> Result<()>;
}

/// A group of exchanges executed concurrently.
pub trait MultiTransport {
    /// Register an exchange. Only possible before the first call to
    /// [`perform`](MultiTransport::perform).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MultiAddHandle`](crate::ErrorKind::MultiAddHandle)
    /// if the exchange cannot be registered.
    fn add(&mut self, options: &Options) -> Result<Token>;

    /// Make one step of progress on all registered exchanges.
    fn perform(&mut self) -> Progress;

    /// Remove the finished exchange registered under `token`.
    fn take(&mut self, token: Token) -> Option<Exchange>;
}

/// Reported by [`MultiTransport::perform`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Exchanges still in flight
    pub running: usize,
    /// Whether `perform` should be called again right away, even if nothing
    /// is running
    pub call_again: bool,
}

impl Progress {
    /// Whether the group has nothing left to do
    #[must_use]
    pub const fn is_quiescent(&self) -> bool {
        self.running == 0 && !self.call_again
    }
}

/// Everything known about an exchange after it finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exchange {
    /// The buffered response: header block, empty line and body
    pub raw: Vec<u8>,
    /// The outbound header block as it was sent
    pub header_out: String,
    /// Numeric status code, `0` if no response was received
    pub status_code: u16,
    /// Why the exchange failed, if it did
    pub error: Option<TransportError>,
}

impl Exchange {
    /// An exchange which failed before a response was received
    #[must_use]
    pub fn failed(error: TransportError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Failure class
    pub code: ErrorCode,
    /// Human-readable description
    pub message: String,
}

impl TransportError {
    /// Create a new transport error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Class of a [`TransportError`].
///
/// The numeric values follow libcurl's error numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// The URL uses a scheme which is not supported
    UnsupportedProtocol,
    /// The URL is malformed or missing
    UrlMalformed,
    /// The host name could not be resolved
    CouldntResolveHost,
    /// The connection could not be established
    CouldntConnect,
    /// A local file could not be read for upload
    ReadError,
    /// The exchange timed out
    OperationTimedOut,
    /// An option had a value the transport cannot use
    BadFunctionArgument,
    /// The redirect limit was exceeded
    TooManyRedirects,
    /// The server closed the connection without responding
    GotNothing,
    /// Sending the request failed
    SendError,
    /// Receiving the response failed
    RecvError,
}

impl ErrorCode {
    /// Numeric value of this code
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            ErrorCode::UnsupportedProtocol => 1,
            ErrorCode::UrlMalformed => 3,
            ErrorCode::CouldntResolveHost => 6,
            ErrorCode::CouldntConnect => 7,
            ErrorCode::ReadError => 26,
            ErrorCode::OperationTimedOut => 28,
            ErrorCode::BadFunctionArgument => 43,
            ErrorCode::TooManyRedirects => 47,
            ErrorCode::GotNothing => 52,
            ErrorCode::SendError => 55,
            ErrorCode::RecvError => 56,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorCode::UnsupportedProtocol, 1)]
    #[case(ErrorCode::CouldntResolveHost, 6)]
    #[case(ErrorCode::CouldntConnect, 7)]
    #[case(ErrorCode::OperationTimedOut, 28)]
    #[case(ErrorCode::GotNothing, 52)]
    fn test_error_codes(#[case] code: ErrorCode, #[case] expected: u32) {
        assert_eq!(code.code(), expected);
        assert_eq!(code.to_string(), expected.to_string());
    }

    #[test]
    fn test_failed_exchange() {
        let exchange = Exchange::failed(TransportError::new(ErrorCode::CouldntConnect, "refused"));
        assert_eq!(exchange.status_code, 0);
        assert!(exchange.raw.is_empty());
        assert_eq!(exchange.error.map(|e| e.to_string()), Some("refused".to_string()));
    }

    #[test]
    fn test_progress() {
        assert!(Progress::default().is_quiescent());
        assert!(!Progress { running: 1, call_again: false }.is_quiescent());
        assert!(!Progress { running: 0, call_again: true }.is_quiescent());
    }
}
