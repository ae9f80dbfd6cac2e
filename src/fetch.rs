//! # Artifact Fetcher
//!
//! Downloads one watchdog release into a layer root:
//!
//! 1. Substitute the version into [`DOWNLOAD_URL_TEMPLATE`]
//! 2. Issue a single GET; anything but `200` is fatal
//! 3. Create the target directory (with parents)
//! 4. Stream the body into a uniquely named temp file in that directory
//! 5. Verify the SHA-256 digest, if one was configured
//! 6. Set [`EXECUTABLE_MODE`] and rename onto `<dir>/watchdog`
//!
//! There are no retries. A failed download removes its temp file, so the
//! artifact path only ever holds a complete body.
//!
//! ## Transport
//!
//! The fetcher only needs "GET, give me a status and a readable body". That
//! capability is the [`HttpClient`] trait; [`ReqwestClient`] is the real
//! implementation and tests script their own.

use crate::constants::{
    DOWNLOAD_TIMEOUT, DOWNLOAD_URL_TEMPLATE, EXECUTABLE_MODE, EXECUTABLE_NAME, VERSION_PLACEHOLDER,
};
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Status and body of a GET.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, read to the end by the fetcher.
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// A response with an in-memory body.
    pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: Box::new(io::Cursor::new(body.into())),
        }
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Minimal HTTP capability used by [`ArtifactFetcher`].
pub trait HttpClient {
    /// Performs a GET. Transport failures are errors; HTTP error statuses
    /// are not.
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        (**self).get(url)
    }
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client bounded by [`DOWNLOAD_TIMEOUT`].
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("watchdog-cnb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport {
                url: String::new(),
                reason: format!("building HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send().map_err(|e| Error::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(HttpResponse {
            status: response.status().as_u16(),
            body: Box::new(response),
        })
    }
}

/// Download location of `version`.
pub fn download_url(version: &str) -> String {
    DOWNLOAD_URL_TEMPLATE.replace(VERSION_PLACEHOLDER, version)
}

/// Downloads watchdog releases through an [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ArtifactFetcher<C> {
    client: C,
}

impl<C: HttpClient> ArtifactFetcher<C> {
    /// Creates a fetcher using `client`.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Downloads `version` to `<dir>/watchdog` and returns that path.
    ///
    /// `expected_sha256` is a hex digest; when given, a body that does not
    /// match is rejected before it reaches the artifact path.
    pub fn fetch(&self, version: &str, dir: &Path, expected_sha256: Option<&str>) -> Result<PathBuf> {
        let url = download_url(version);
        debug!(url = %url, "downloading watchdog");

        let response = self.client.get(&url)?;
        if response.status != 200 {
            return Err(Error::UnexpectedStatus {
                url,
                status: response.status,
            });
        }

        fs::create_dir_all(dir).map_err(|e| Error::Fetch {
            stage: "creating layer dir",
            reason: e.to_string(),
        })?;

        let target = dir.join(EXECUTABLE_NAME);
        let temp_path = dir.join(format!(".{}.tmp.{}", EXECUTABLE_NAME, uuid::Uuid::now_v7()));

        let result = write_artifact(response.body, &temp_path, expected_sha256)
            .and_then(|size| {
                fs::rename(&temp_path, &target).map_err(|e| Error::Fetch {
                    stage: "installing binary",
                    reason: e.to_string(),
                })?;
                Ok(size)
            });

        match result {
            Ok(size) => {
                info!(version, bytes = size, path = %target.display(), "downloaded watchdog");
                Ok(target)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

/// Streams `body` into `path`, checks the digest and marks it executable.
fn write_artifact(
    mut body: Box<dyn Read + Send>,
    path: &Path,
    expected_sha256: Option<&str>,
) -> Result<u64> {
    let file = File::create(path).map_err(|e| Error::Fetch {
        stage: "creating binary",
        reason: e.to_string(),
    })?;

    let mut writer = HashingWriter {
        inner: file,
        hasher: Sha256::new(),
    };
    let size = io::copy(&mut body, &mut writer).map_err(|e| Error::Fetch {
        stage: "downloading watchdog",
        reason: e.to_string(),
    })?;
    writer.inner.sync_all().map_err(|e| Error::Fetch {
        stage: "downloading watchdog",
        reason: e.to_string(),
    })?;

    let computed = hex::encode(writer.hasher.finalize());
    if let Some(expected) = expected_sha256
        && !expected.eq_ignore_ascii_case(&computed)
    {
        return Err(Error::ChecksumMismatch {
            expected: expected.to_string(),
            computed,
        });
    }

    set_executable(path).map_err(|e| Error::Fetch {
        stage: "marking binary executable",
        reason: e.to_string(),
    })?;

    Ok(size)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Hashes everything written through it.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
