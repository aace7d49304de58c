//! In-memory transport
//!
//! Serves canned payloads and statuses keyed by locator string, so pipeline
//! behavior can be exercised without a network. Also records every request.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::loader::transport::{Locator, Transport};
use crate::loader::LoadFailureReason;

#[derive(Debug, Clone)]
struct Route {
    status: u16,
    body: Vec<u8>,
    delay: Option<Duration>,
}

/// A transport backed by a map of locator → response
///
/// Unknown locators answer with status 404.
///
/// # Example
/// ```
/// use reverie::loader::{Locator, MemoryTransport, Transport};
///
/// let transport = MemoryTransport::new().with_body("https://cdn.test/a.wav", vec![1, 2, 3]);
/// let bytes = transport.fetch(&Locator::parse("https://cdn.test/a.wav").unwrap()).unwrap();
/// assert_eq!(bytes, vec![1, 2, 3]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryTransport {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200
    pub fn with_body(mut self, locator: &str, body: Vec<u8>) -> Self {
        self.routes.insert(
            locator.to_string(),
            Route {
                status: 200,
                body,
                delay: None,
            },
        );
        self
    }

    /// Answer with a bare status code and no body
    pub fn with_status(mut self, locator: &str, status: u16) -> Self {
        self.routes.insert(
            locator.to_string(),
            Route {
                status,
                body: Vec::new(),
                delay: None,
            },
        );
        self
    }

    /// Serve `body` after sleeping for `delay`
    pub fn with_delayed_body(mut self, locator: &str, body: Vec<u8>, delay: Duration) -> Self {
        self.routes.insert(
            locator.to_string(),
            Route {
                status: 200,
                body,
                delay: Some(delay),
            },
        );
        self
    }

    /// Locators requested so far, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, locator: &Locator) -> std::result::Result<Vec<u8>, LoadFailureReason> {
        let key = locator.to_string();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(key.clone());
        }

        let route = self.routes.get(&key).ok_or(LoadFailureReason::Status(404))?;

        if let Some(delay) = route.delay {
            std::thread::sleep(delay);
        }

        if !(200..300).contains(&route.status) {
            return Err(LoadFailureReason::Status(route.status));
        }

        Ok(route.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_route_is_404() {
        let transport = MemoryTransport::new();
        let locator = Locator::parse("https://cdn.test/missing.mp3").unwrap();
        assert_eq!(transport.fetch(&locator), Err(LoadFailureReason::Status(404)));
    }

    #[test]
    fn test_status_route() {
        let transport = MemoryTransport::new().with_status("https://cdn.test/a.mp3", 503);
        let locator = Locator::parse("https://cdn.test/a.mp3").unwrap();
        assert_eq!(transport.fetch(&locator), Err(LoadFailureReason::Status(503)));
        assert_eq!(transport.requests(), vec!["https://cdn.test/a.mp3".to_string()]);
    }
}
