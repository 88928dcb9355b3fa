//! `volley` issues blocking HTTP requests, alone or as parallel batches.
//!
//! Every request is a [`Request`]: configure it, invoke a verb, then read its
//! result fields or let the registered callbacks react. Failures such as a
//! refused connection or a `404` never abort a call; they are recorded on the
//! request and reported to its error callback.
//!
//! ```no_run
//! use volley::{Request, Result};
//!
//! fn main() -> Result<()> {
//!     let mut request = Request::new()?;
//!     request.on_complete(|request, _, _| {
//!         println!("{} -> {}", request.url().unwrap_or_default(), request.http_status_code());
//!     });
//!
//!     request.get("https://example.com", ())?;
//!     if request.error() {
//!         eprintln!("{}: {}", request.error_code(), request.error_message());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Passing several targets runs a batch. Each target gets a child request
//! which shares the configuration of its parent, and all children are
//! executed concurrently:
//!
//! ```no_run
//! use volley::{Request, Result};
//!
//! fn main() -> Result<()> {
//!     let mut request = Request::new()?;
//!     request.set_header("Accept", "application/json");
//!     request.get(["https://example.com/a", "https://example.com/b"], ())?;
//!
//!     for child in request.children() {
//!         println!("{}", child.response());
//!     }
//!     Ok(())
//! }
//! ```
#![deny(missing_docs)]

mod batch;
mod classify;
mod request;
mod types;

pub mod codec;
pub mod config;
pub mod options;
pub mod query;
pub mod transport;
#[cfg(test)]
pub(crate) mod test_utils;

pub use classify::{classify, Classification};
pub use config::Config;
pub use options::{OptionValue, RequiredOptionWarning, TransportOption};
pub use request::{
    BeforeSend, Callback, Context, Outcome, Request, State, Targets, DEFAULT_USER_AGENT,
};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use types::*;
