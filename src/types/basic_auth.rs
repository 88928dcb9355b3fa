use std::{fmt::Display, str::FromStr};

use headers::{authorization::Basic, Authorization};
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;

/// Why a `user:password` string could not be parsed
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum BasicAuthCredentialsParseError {
    /// No colon separates username and password
    #[error("Invalid basic auth credentials syntax")]
    InvalidSyntax,

    /// The username is empty
    #[error("Missing basic auth username")]
    MissingUsername,
}

/// [`BasicAuthCredentials`] contains a pair of basic auth values consisting of
/// a username and password.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicAuthCredentials {
    /// Basic auth username
    pub username: String,

    /// Basic auth password
    pub password: String,
}

impl BasicAuthCredentials {
    /// Create credentials from a username and password
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the credentials as [`Authorization<Basic>`].
    #[must_use]
    pub fn to_authorization(&self) -> Authorization<Basic> {
        Authorization::basic(&self.username, &self.password)
    }
}

impl FromStr for BasicAuthCredentials {
    type Err = BasicAuthCredentialsParseError;

    // Only the first colon separates the two parts, passwords may contain more.
    fn from_str(credentials: &str) -> Result<Self, Self::Err> {
        let (username, password) = credentials
            .trim()
            .split_once(':')
            .ok_or(BasicAuthCredentialsParseError::InvalidSyntax)?;

        if username.is_empty() {
            return Err(BasicAuthCredentialsParseError::MissingUsername);
        }

        Ok(Self::new(username, password))
    }
}

impl Display for BasicAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.username, self.password)
    }
}

impl<'de> Deserialize<'de> for BasicAuthCredentials {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("user:pass", "user", "pass")]
    #[case(" user:pass ", "user", "pass")]
    #[case("user:", "user", "")]
    #[case("user:p:a:ss", "user", "p:a:ss")]
    fn test_from_str(#[case] input: &str, #[case] username: &str, #[case] password: &str) {
        let credentials: BasicAuthCredentials = input.parse().unwrap();
        assert_eq!(credentials, BasicAuthCredentials::new(username, password));
    }

    #[rstest]
    #[case("user", BasicAuthCredentialsParseError::InvalidSyntax)]
    #[case(":pass", BasicAuthCredentialsParseError::MissingUsername)]
    fn test_from_str_invalid(#[case] input: &str, #[case] error: BasicAuthCredentialsParseError) {
        assert_eq!(input.parse::<BasicAuthCredentials>(), Err(error));
    }

    #[test]
    fn test_display_round_trips() {
        let credentials = BasicAuthCredentials::new("aladin", "abretesesamo");
        assert_eq!(credentials.to_string(), "aladin:abretesesamo");
    }
}
