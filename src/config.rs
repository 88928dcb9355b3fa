//! Request configuration which can be shared between requests or loaded
//! from a TOML file.
//!
//! ```toml
//! user_agent = "my-crawler/1.0"
//! basic_auth = "user:password"
//! timeout = "20s"
//! follow_redirects = true
//!
//! [headers]
//! Accept = "application/json"
//! ```
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;
use typed_builder::TypedBuilder;

use crate::{types::BasicAuthCredentials, ErrorKind, Result};

/// Settings applied to a [`Request`](crate::Request) by
/// [`Request::from_config`](crate::Request::from_config).
///
/// Unset fields leave the request's defaults alone.
#[derive(TypedBuilder, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[builder(field_defaults(default, setter(into)))]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `User-Agent` header
    #[builder(setter(strip_option))]
    pub user_agent: Option<String>,

    /// Additional headers, by name
    pub headers: BTreeMap<String, String>,

    /// Basic auth credentials, `user:password` in a configuration file
    #[builder(setter(strip_option))]
    pub basic_auth: Option<BasicAuthCredentials>,

    /// `Referer` header
    #[builder(setter(strip_option))]
    pub referrer: Option<String>,

    /// Cookies sent with every request, by name
    pub cookies: BTreeMap<String, String>,

    /// File cookies are read from
    #[builder(setter(strip_option))]
    pub cookie_file: Option<PathBuf>,

    /// File cookies are written to when the request is closed
    #[builder(setter(strip_option))]
    pub cookie_jar: Option<PathBuf>,

    /// Timeout for the whole exchange, such as `"20s"`
    #[serde(with = "humantime_serde")]
    #[builder(setter(strip_option))]
    pub timeout: Option<Duration>,

    /// Timeout for establishing the connection
    #[serde(with = "humantime_serde")]
    #[builder(setter(strip_option))]
    pub connect_timeout: Option<Duration>,

    /// Follow redirects
    pub follow_redirects: bool,

    /// Maximum number of redirects followed
    #[builder(setter(strip_option))]
    pub max_redirects: Option<u64>,

    /// Accept invalid TLS certificates
    pub insecure: bool,

    /// Log every exchange
    pub verbose: bool,
}

impl Config {
    /// Load a configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// configuration.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let contents =
            fs::read_to_string(path).map_err(|e| ErrorKind::IoError(Some(path.into()), e))?;
        contents.parse()
    }
}

impl FromStr for Config {
    type Err = ErrorKind;

    fn from_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse() {
        let config: Config = r#"
            user_agent = "agent/1.0"
            basic_auth = "user:p:w"
            timeout = "1m 30s"
            connect_timeout = "500ms"
            follow_redirects = true
            max_redirects = 3

            [headers]
            Accept = "application/json"

            [cookies]
            session = "abc"
        "#
        .parse()
        .unwrap();

        assert_eq!(
            config,
            Config::builder()
                .user_agent("agent/1.0")
                .basic_auth(BasicAuthCredentials::new("user", "p:w"))
                .timeout(Duration::from_secs(90))
                .connect_timeout(Duration::from_millis(500))
                .follow_redirects(true)
                .max_redirects(3_u64)
                .headers(BTreeMap::from([(
                    "Accept".to_string(),
                    "application/json".to_string()
                )]))
                .cookies(BTreeMap::from([("session".to_string(), "abc".to_string())]))
                .build()
        );
    }

    #[test]
    fn test_empty_is_default() {
        assert_eq!("".parse::<Config>().unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_field() {
        assert!(matches!(
            "colour = true".parse::<Config>(),
            Err(ErrorKind::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_credentials() {
        assert!(matches!(
            r#"basic_auth = "no-colon""#.parse::<Config>(),
            Err(ErrorKind::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volley.toml");
        fs::write(&path, "verbose = true\ninsecure = true\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert!(config.verbose);
        assert!(config.insecure);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::load_from_file(&missing),
            Err(ErrorKind::IoError(Some(p), _)) if p == missing
        ));
    }
}
