//! # Content Fetcher
//!
//! Retrieves the raw bytes behind a locator, according to its
//! [`LocatorKind`]:
//!
//! - catalog names are looked up in the configured [`TemplateCatalog`],
//! - `http(s)://` URLs are fetched with a single GET (no retries), bound to
//!   a [`CancellationToken`],
//! - `file://` URLs and plain paths are read from disk,
//! - `-` reads standard input, also bound to the [`CancellationToken`].
//!
//! Every source is capped at [`MAX_TEMPLATE_SIZE`]. Reads stop at the cap;
//! the excess is dropped without error. A locator that matches no kind
//! yields empty content and the caller decides what that means.

use std::io::Read;
use std::path::Path;

use log::debug;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::catalog::TemplateCatalog;
use crate::error::{Error, Result};
use crate::locator::{classify, LocatorKind};

/// Upper bound on the size of any fetched document, in bytes.
pub const MAX_TEMPLATE_SIZE: usize = 4 * 1024 * 1024;

/// Reads at most `limit` bytes from `reader`.
pub fn read_at_most<R: Read>(reader: R, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Fetches locator content from every supported source.
pub struct Fetcher {
    client: reqwest::Client,
    catalog: Box<dyn TemplateCatalog>,
}

impl Fetcher {
    /// Creates a fetcher with a default HTTP client.
    pub fn new(catalog: impl TemplateCatalog + 'static) -> Self {
        Self::with_client(reqwest::Client::new(), catalog)
    }

    pub fn with_client(client: reqwest::Client, catalog: impl TemplateCatalog + 'static) -> Self {
        Self {
            client,
            catalog: Box::new(catalog),
        }
    }

    /// Fetches the bytes behind `locator`.
    ///
    /// `locator` must already be absolute (or STDIN); relative paths are
    /// read relative to the current directory.
    pub async fn fetch(&self, cancel: &CancellationToken, locator: &str) -> Result<Vec<u8>> {
        let kind = classify(locator)?;
        debug!("Fetching {:?} as {:?}", locator, kind);
        match kind {
            LocatorKind::Catalog(name) => {
                let mut bytes = self.catalog.read(&name)?;
                bytes.truncate(MAX_TEMPLATE_SIZE);
                Ok(bytes)
            }
            LocatorKind::Http => self.fetch_http(cancel, locator).await,
            LocatorKind::FileUrl(path) => read_file(locator, &path),
            LocatorKind::FilePath => read_file(locator, Path::new(locator)),
            LocatorKind::Stdin => fetch_stdin(cancel, locator).await,
            LocatorKind::Unknown => Ok(Vec::new()),
        }
    }

    async fn fetch_http(&self, cancel: &CancellationToken, locator: &str) -> Result<Vec<u8>> {
        let request = async {
            let mut response = self.client.get(locator).send().await?.error_for_status()?;
            let mut body = Vec::new();
            while let Some(chunk) = response.chunk().await? {
                let remaining = MAX_TEMPLATE_SIZE - body.len();
                if chunk.len() >= remaining {
                    body.extend_from_slice(&chunk[..remaining]);
                    break;
                }
                body.extend_from_slice(&chunk);
            }
            Ok::<_, reqwest::Error>(body)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled {
                locator: locator.to_string(),
            }),
            result = request => result.map_err(|e| Error::Fetch {
                locator: locator.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

async fn fetch_stdin(cancel: &CancellationToken, locator: &str) -> Result<Vec<u8>> {
    let read = async {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .take(MAX_TEMPLATE_SIZE as u64)
            .read_to_end(&mut buf)
            .await?;
        Ok::<_, std::io::Error>(buf)
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled {
            locator: locator.to_string(),
        }),
        result = read => result.map_err(|e| Error::Fetch {
            locator: locator.to_string(),
            message: e.to_string(),
        }),
    }
}

fn read_file(locator: &str, path: &Path) -> Result<Vec<u8>> {
    let fetch_error = |e: std::io::Error| Error::Fetch {
        locator: locator.to_string(),
        message: e.to_string(),
    };
    let file = std::fs::File::open(path).map_err(fetch_error)?;
    read_at_most(file, MAX_TEMPLATE_SIZE).map_err(fetch_error)
}
