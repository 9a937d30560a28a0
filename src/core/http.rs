use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

use crate::core::error::{LauncherError, LauncherResult};

const APP_USER_AGENT: &str = concat!("mc-launch-core/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .timeout(timeout)
        .build()
}

/// The single network capability the engine relies on.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full body at `url`. Non-success statuses are errors.
    async fn fetch(&self, url: &str) -> LauncherResult<Vec<u8>>;
}

/// `Fetcher` backed by a shared `reqwest::Client`.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> LauncherResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> LauncherResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::download(
                url,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
