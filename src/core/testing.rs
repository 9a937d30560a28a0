// In-memory fetcher for tests. No network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Fetcher;

#[derive(Default)]
pub struct FakeFetcher {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    /// Remaining failures to inject per url before serving the body.
    failures: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut bodies) = self.bodies.lock() {
            bodies.insert(url.to_string(), body.into());
        }
        self
    }

    pub fn fail_times(self, url: &str, times: usize) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(url.to_string(), times);
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.requested
            .lock()
            .map(|r| r.iter().filter(|u| *u == url).count())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> LauncherResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }

        let inject = match self.failures.lock() {
            Ok(mut failures) => match failures.get_mut(url) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            },
            Err(_) => false,
        };
        if inject {
            return Err(LauncherError::download(url, "HTTP 503"));
        }

        let body = self
            .bodies
            .lock()
            .ok()
            .and_then(|bodies| bodies.get(url).cloned());
        body.ok_or_else(|| LauncherError::download(url, "HTTP 404"))
    }
}
