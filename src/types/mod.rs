#![allow(unreachable_pub)]

mod basic_auth;
mod error;
mod header_map;
mod payload;
mod response;

pub use basic_auth::{BasicAuthCredentials, BasicAuthCredentialsParseError};
pub use error::ErrorKind;
pub use header_map::{CaseInsensitiveMap, HeaderMap, Iter};
pub use payload::{Field, Fields, Payload};
pub use response::ResponseBody;

/// The volley `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
