//! The fetcher seam and its `reqwest`-backed implementation.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use log::debug;

use crate::error::FetchError;

/// Default timeout for a single artifact download.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads a URL to a local file.
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and write the body to `dest`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the download fails or `dest` cannot be written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

impl<F> Fetcher for F
where
    F: Fn(&str, &Path) -> Result<(), FetchError> + Send + Sync,
{
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        self(url, dest)
    }
}

/// Blocking `reqwest`-backed implementation of [`Fetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        debug!("fetching {url} to {}", dest.display());
        let mut response = self.http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let io_err = |source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let mut file = File::create(dest).map_err(io_err)?;
        let written = response.copy_to(&mut file)?;
        file.sync_all().map_err(io_err)?;
        debug!("fetched {written} bytes from {url}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_fetchers() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("blob.signed");
        let fetcher = |url: &str, dest: &Path| -> Result<(), FetchError> {
            std::fs::write(dest, url.as_bytes()).map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })
        };

        fetcher.fetch("https://example.test/a.signed", &dest).unwrap();
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "https://example.test/a.signed"
        );
    }

    #[test]
    fn fetcher_is_object_safe() {
        let fetcher: Box<dyn Fetcher> = Box::new(|_: &str, _: &Path| -> Result<(), FetchError> { Ok(()) });
        fetcher.fetch("u", Path::new("p")).unwrap();
    }
}
