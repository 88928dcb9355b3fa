use std::path::PathBuf;

use thiserror::Error;

/// Possible errors when interacting with `volley`.
///
/// Failures of an individual request (a refused connection, a timeout, a
/// `404`) are never reported through this type. They are recorded on the
/// request itself; see [`Request::error`](crate::Request::error).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The transport could not be initialised, so no request can be made.
    #[error("Transport is not available: {0}")]
    TransportUnavailable(String),
    /// A batch child could not be registered with the concurrent executor.
    #[error("Cannot add handle {token} to the parallel group: {reason}")]
    MultiAddHandle {
        /// Position of the child in the batch
        token: usize,
        /// Why the executor rejected it
        reason: String,
    },
    /// A verb was invoked on a request which has already been closed.
    #[error("Request handle has been closed")]
    HandleClosed,
    /// Any form of I/O error occurred while reading from or writing to a path.
    #[error("Failed to access path: `{}`, reason: {}", match .0 {
        Some(p) => p.to_str().unwrap_or("<MALFORMED PATH>"),
        None => "<MALFORMED PATH>",
    }, .1)]
    IoError(Option<PathBuf>, std::io::Error),
    /// Cookies could not be loaded from or saved to the cookie jar
    #[error("Cookie jar error: {0}")]
    Cookies(String),
    /// The configuration file is not valid TOML for [`Config`](crate::Config).
    #[error("Cannot parse configuration: {0}")]
    InvalidConfig(#[from] toml::de::Error),
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::TransportUnavailable(a), Self::TransportUnavailable(b))
            | (Self::Cookies(a), Self::Cookies(b)) => a == b,
            (
                Self::MultiAddHandle { token: t1, .. },
                Self::MultiAddHandle { token: t2, .. },
            ) => t1 == t2,
            (Self::IoError(p1, e1), Self::IoError(p2, e2)) => p1 == p2 && e1.kind() == e2.kind(),
            (Self::InvalidConfig(e1), Self::InvalidConfig(e2)) => e1.to_string() == e2.to_string(),
            (Self::HandleClosed, Self::HandleClosed) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let error = ErrorKind::IoError(
            Some(PathBuf::from("cookies.json")),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );

        assert!(error
            .to_string()
            .starts_with("Failed to access path: `cookies.json`"));
        assert_eq!(
            error,
            ErrorKind::IoError(
                Some(PathBuf::from("cookies.json")),
                io::ErrorKind::PermissionDenied.into()
            )
        );
    }

    #[test]
    fn test_credentials_surface_as_config_error() {
        let error = r#"basic_auth = "no-colon""#
            .parse::<crate::Config>()
            .unwrap_err();

        assert!(matches!(error, ErrorKind::InvalidConfig(_)));
        assert!(error
            .to_string()
            .contains("Invalid basic auth credentials syntax"));
    }
}
