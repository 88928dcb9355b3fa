use std::{
    fs::File,
    io::{BufReader, ErrorKind as IoErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};

use http::HeaderValue;
use log::{debug, info};
use reqwest::cookie::CookieStore as _;
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use url::Url;

use crate::{ErrorKind, Result};

/// Cookie store shared by every request which reads from or writes to the
/// same file.
///
/// Two jars are equal when they are backed by the same file.
#[derive(Debug, Clone)]
pub struct CookieJar {
    pub(crate) path: PathBuf,
    pub(crate) inner: Arc<CookieStoreMutex>,
}

impl CookieJar {
    /// Load the JSON cookie file at `path`. A missing file yields an empty
    /// store which is written to `path` on [`CookieJar::save`].
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or does not hold JSON
    /// cookies.
    pub fn load(path: PathBuf) -> Result<Self> {
        let store = read_store(&path)?.unwrap_or_else(|| {
            debug!("No cookie file at {}, starting empty", path.display());
            CookieStore::default()
        });
        Ok(Self {
            path,
            inner: Arc::new(CookieStoreMutex::new(store)),
        })
    }

    /// Save the store to the file it was loaded from
    ///
    /// # Errors
    ///
    /// See [`CookieJar::save_to`].
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.path)
    }

    /// Write the store as JSON to `path`, replacing the file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be created, or the store is poisoned or
    /// cannot be serialised.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let store = self
            .inner
            .lock()
            .map_err(|e| ErrorKind::Cookies(format!("Failed to lock cookie store: {e}")))?;
        let mut file = File::create(path).map_err(|e| ErrorKind::IoError(Some(path.into()), e))?;
        info!("Saving cookies to {}", path.display());
        store
            .save_json(&mut file)
            .map_err(|e| ErrorKind::Cookies(format!("Failed to save cookies: {e}")))
    }

    /// The `Cookie` header value the store would send to `url`
    #[must_use]
    pub fn header_for(&self, url: &Url) -> Option<HeaderValue> {
        self.inner.cookies(url)
    }
}

fn read_store(path: &Path) -> Result<Option<CookieStore>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ErrorKind::IoError(Some(path.into()), e)),
    };
    info!("Loading cookies from {}", path.display());
    CookieStore::load_json(BufReader::new(file))
        .map(Some)
        .map_err(|e| ErrorKind::Cookies(format!("Failed to load cookies from {}: {e}", path.display())))
}

impl PartialEq for CookieJar {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}
