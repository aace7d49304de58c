//! Byte transports for audio assets
//!
//! A [`Locator`] names where an asset lives; a [`Transport`] turns it into
//! raw bytes. Fetches are single-attempt: retries are the caller's concern.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ReverieError, Result};
use crate::loader::LoadFailureReason;

/// Where an audio asset can be fetched from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Remote resource (`http://` or `https://`)
    Http(String),
    /// Local file (`file://` prefix or a bare path)
    File(PathBuf),
}

impl Locator {
    /// Parse a locator string
    ///
    /// # Example
    /// ```
    /// use reverie::loader::Locator;
    ///
    /// let remote = Locator::parse("https://cdn.example.com/rain.mp3").unwrap();
    /// assert_eq!(remote.extension().as_deref(), Some("mp3"));
    ///
    /// let local = Locator::parse("file:///tmp/voice.wav").unwrap();
    /// assert!(matches!(local, Locator::File(_)));
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReverieError::InvalidLocator {
                locator: raw.to_string(),
                reason: "locator is empty".to_string(),
            });
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Locator::Http(trimmed.to_string()));
        }

        if lower.starts_with("file://") {
            let path = &trimmed["file://".len()..];
            if path.is_empty() {
                return Err(ReverieError::InvalidLocator {
                    locator: raw.to_string(),
                    reason: "file locator has no path".to_string(),
                });
            }
            return Ok(Locator::File(PathBuf::from(path)));
        }

        Ok(Locator::File(PathBuf::from(trimmed)))
    }

    /// Lowercase file extension, ignoring any URL query or fragment
    pub fn extension(&self) -> Option<String> {
        let path = match self {
            Locator::Http(url) => {
                let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
                let without_query = &url[..end];
                // Skip the scheme and host so "https://host.mp3" yields nothing
                let after_scheme = without_query.split_once("://").map_or(without_query, |(_, rest)| rest);
                match after_scheme.split_once('/') {
                    Some((_, path)) => path.to_string(),
                    None => return None,
                }
            }
            Locator::File(path) => path.to_string_lossy().into_owned(),
        };

        Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Http(url) => write!(f, "{}", url),
            Locator::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches raw bytes for a locator
///
/// Implementations must be shareable across threads: the pipeline may fetch
/// the narration and the background concurrently.
pub trait Transport: Send + Sync {
    /// Retrieve the complete payload, or the reason it could not be retrieved
    fn fetch(&self, locator: &Locator) -> std::result::Result<Vec<u8>, LoadFailureReason>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn fetch(&self, locator: &Locator) -> std::result::Result<Vec<u8>, LoadFailureReason> {
        (**self).fetch(locator)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn fetch(&self, locator: &Locator) -> std::result::Result<Vec<u8>, LoadFailureReason> {
        (**self).fetch(locator)
    }
}

// ============================================================================
// File Transport
// ============================================================================

/// Reads local files
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

impl Transport for FileTransport {
    fn fetch(&self, locator: &Locator) -> std::result::Result<Vec<u8>, LoadFailureReason> {
        match locator {
            Locator::File(path) => fs::read(path).map_err(|e| {
                LoadFailureReason::Transport(format!("cannot read {}: {}", path.display(), e))
            }),
            Locator::Http(_) => Err(LoadFailureReason::Unsupported(
                "file transport cannot fetch remote locators".to_string(),
            )),
        }
    }
}

// ============================================================================
// HTTP Transport
// ============================================================================

/// Fetches remote locators with a blocking HTTP client
///
/// Every request carries the configured timeout; expiry is reported as
/// [`LoadFailureReason::Timeout`].
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Build a client with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReverieError::InvalidConfig {
                reason: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self { client, timeout })
    }

    fn map_error(&self, e: reqwest::Error) -> LoadFailureReason {
        if e.is_timeout() {
            LoadFailureReason::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            LoadFailureReason::Transport(e.to_string())
        }
    }
}

#[cfg(feature = "http")]
impl Transport for HttpTransport {
    fn fetch(&self, locator: &Locator) -> std::result::Result<Vec<u8>, LoadFailureReason> {
        let url = match locator {
            Locator::Http(url) => url,
            Locator::File(_) => {
                return Err(LoadFailureReason::Unsupported(
                    "HTTP transport cannot fetch local files".to_string(),
                ))
            }
        };

        let response = self.client.get(url).send().map_err(|e| self.map_error(e))?;

        if !response.status().is_success() {
            return Err(LoadFailureReason::Status(response.status().as_u16()));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| self.map_error(e))
    }
}

// ============================================================================
// Default Transport
// ============================================================================

/// Dispatches local locators to [`FileTransport`] and remote ones to HTTP
#[derive(Debug, Clone)]
pub struct DefaultTransport {
    file: FileTransport,
    #[cfg(feature = "http")]
    http: HttpTransport,
}

impl DefaultTransport {
    /// Create a transport whose remote fetches time out after `timeout`
    #[cfg(feature = "http")]
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            file: FileTransport,
            http: HttpTransport::new(timeout)?,
        })
    }

    #[cfg(not(feature = "http"))]
    pub fn new(_timeout: Duration) -> Result<Self> {
        Ok(Self { file: FileTransport })
    }
}

impl Transport for DefaultTransport {
    fn fetch(&self, locator: &Locator) -> std::result::Result<Vec<u8>, LoadFailureReason> {
        match locator {
            Locator::File(_) => self.file.fetch(locator),
            #[cfg(feature = "http")]
            Locator::Http(_) => self.http.fetch(locator),
            #[cfg(not(feature = "http"))]
            Locator::Http(_) => Err(LoadFailureReason::Unsupported(
                "HTTP support not compiled. Build with --features http".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_http() {
        let locator = Locator::parse("  https://cdn.example.com/a/b.MP3?x=1#t ").unwrap();
        assert_eq!(locator, Locator::Http("https://cdn.example.com/a/b.MP3?x=1#t".to_string()));
        assert_eq!(locator.extension().as_deref(), Some("mp3"));
    }

    #[test]
    fn test_parse_file_forms() {
        assert_eq!(
            Locator::parse("file:///tmp/voice.wav").unwrap(),
            Locator::File(PathBuf::from("/tmp/voice.wav"))
        );
        assert_eq!(
            Locator::parse("voice.wav").unwrap(),
            Locator::File(PathBuf::from("voice.wav"))
        );
    }

    #[test]
    fn test_parse_scheme_is_case_insensitive() {
        assert_eq!(
            Locator::parse("FILE:///tmp/Voice.wav").unwrap(),
            Locator::File(PathBuf::from("/tmp/Voice.wav"))
        );
        assert!(matches!(
            Locator::parse("HTTPS://cdn.example.com/a.mp3").unwrap(),
            Locator::Http(_)
        ));
        assert!(Locator::parse("File://").is_err());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(
            Locator::parse("   "),
            Err(ReverieError::InvalidLocator { .. })
        ));
        assert!(Locator::parse("file://").is_err());
    }

    #[test]
    fn test_extension_of_bare_host_is_none() {
        let locator = Locator::parse("https://audio.mp3").unwrap();
        assert_eq!(locator.extension(), None);
    }

    #[test]
    fn test_file_transport_reads_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();

        let locator = Locator::File(file.path().to_path_buf());
        assert_eq!(FileTransport.fetch(&locator).unwrap(), b"abc".to_vec());
    }

    #[test]
    fn test_file_transport_missing_file() {
        let locator = Locator::File(PathBuf::from("/nonexistent/path/voice.mp3"));
        match FileTransport.fetch(&locator) {
            Err(LoadFailureReason::Transport(msg)) => assert!(msg.contains("nonexistent")),
            other => panic!("Expected transport failure, got: {:?}", other),
        }
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_timeout_is_reported() {
        // Accepted by the kernel backlog, never answered
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/voice.mp3", listener.local_addr().unwrap());

        let transport = HttpTransport::new(Duration::from_millis(150)).unwrap();
        let result = transport.fetch(&Locator::Http(url));
        assert_eq!(result, Err(LoadFailureReason::Timeout { after_ms: 150 }));
        drop(listener);
    }

    #[test]
    fn test_file_transport_rejects_remote() {
        let locator = Locator::Http("https://example.com/a.mp3".to_string());
        assert!(matches!(
            FileTransport.fetch(&locator),
            Err(LoadFailureReason::Unsupported(_))
        ));
    }
}
