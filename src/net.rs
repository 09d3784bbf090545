//! HTTP fetching of synthesized audio from web-backed services.
//!
//! A single logical download may span several requests when the input
//! phrase had to be segmented; [`NetFetcher::download`] fetches every
//! target, validates each response, and writes the concatenated payloads
//! to disk in one shot so the destination file is never partially filled.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::errors::TtsError;

/// User agent presented on every request. Several endpoints reject
/// obviously non-browser agents outright.
pub const USER_AGENT: &str = "Mozilla/5.0";

/// Per-request timeout covering connect through body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// One address to fetch, with its query parameters.
#[derive(Debug, Clone)]
pub struct WebTarget {
    addr: String,
    query: Vec<(String, String)>,
}

impl WebTarget {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter. Values are stringified here and
    /// percent-encoded at request time.
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// The bare address, without query parameters.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

/// Validation requirements for each fetched response.
#[derive(Debug, Clone, Default)]
pub struct FetchRequire {
    /// Required media type of the `Content-Type` header, compared against
    /// the media-type portion only (parameters such as `charset` are
    /// ignored). `None` accepts any declared type.
    pub mime: Option<String>,
    /// Minimum payload size in bytes.
    pub min_size: u64,
}

/// Blocking HTTP fetcher with a running download counter.
///
/// The counter lives in a [`Cell`], so a fetcher belongs to one worker at
/// a time; clone-per-worker is not supported because the count is meant
/// to be read by whoever issued the downloads.
#[derive(Debug)]
pub struct NetFetcher {
    client: Client,
    downloads: Cell<usize>,
}

impl Default for NetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NetFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("HTTP client construction only fails on malformed defaults");
        Self {
            client,
            downloads: Cell::new(0),
        }
    }

    /// Fetch every target in order, validate each response, and write the
    /// concatenated payloads to `path`.
    ///
    /// Any failing target aborts the whole download and nothing is
    /// written. The download counter advances once per target that
    /// passed validation, so a five-segment phrase counts as five even
    /// when the sixth segment fails.
    pub fn download(
        &self,
        path: &Path,
        targets: &[WebTarget],
        require: &FetchRequire,
    ) -> Result<(), TtsError> {
        let total = targets.len();
        let mut payload: Vec<u8> = Vec::new();

        for (index, target) in targets.iter().enumerate() {
            let desc = if total > 1 {
                format!("web request ({} of {})", index + 1, total)
            } else {
                "web request".to_string()
            };
            debug!(addr = %target.addr, query = ?target.query, %desc, "fetching");

            let response = self
                .client
                .get(&target.addr)
                .query(&target.query)
                .send()
                .map_err(|e| TtsError::NoResponse {
                    desc: desc.clone(),
                    url: target.addr.clone(),
                    reason: e.to_string(),
                })?;

            let status = response.status().as_u16();
            if status != 200 {
                return Err(TtsError::HttpStatus {
                    desc,
                    url: target.addr.clone(),
                    status,
                });
            }

            if let Some(wanted) = &require.mime {
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                if media_type(&content_type) != *wanted {
                    return Err(TtsError::ContentType {
                        desc,
                        url: target.addr.clone(),
                        got: content_type,
                        wanted: wanted.clone(),
                    });
                }
            }

            let bytes = response.bytes().map_err(|e| TtsError::NoResponse {
                desc: desc.clone(),
                url: target.addr.clone(),
                reason: e.to_string(),
            })?;
            if (bytes.len() as u64) < require.min_size {
                return Err(TtsError::PayloadTooSmall {
                    desc,
                    url: target.addr.clone(),
                    actual: bytes.len() as u64,
                    wanted: require.min_size,
                });
            }

            self.downloads.set(self.downloads.get() + 1);
            payload.extend_from_slice(&bytes);
        }

        fs::write(path, &payload).map_err(|e| TtsError::io(path, e))?;
        debug!(?path, bytes = payload.len(), requests = total, "download complete");

        Ok(())
    }

    /// Downloads issued and validated since construction or the last
    /// [`reset_download_count`](Self::reset_download_count).
    pub fn download_count(&self) -> usize {
        self.downloads.get()
    }

    /// Reset the download counter to zero.
    pub fn reset_download_count(&self) {
        self.downloads.set(0);
    }
}

/// The media-type portion of a `Content-Type` header value.
fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
}
