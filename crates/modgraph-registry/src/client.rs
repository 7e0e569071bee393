//! HTTP client for a Forge-style module registry.

use std::time::Duration;

use modgraph_core::release::Release;
use modgraph_resolver::source::{FetchFuture, ReleaseSource, SourceError, REGISTRY_PRIORITY};
use modgraph_util::errors::ModError;
use reqwest::{Client, Request};

use crate::api::{parse_page, PAGE_LIMIT};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_PAGES: usize = 50;

/// Build a shared reqwest client for registry requests.
pub fn build_client() -> miette::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("modgraph/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            ModError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// Lists releases from a registry's `/v3/releases` endpoint.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The first page of `module`'s releases; the query string is encoded.
    fn releases_request(&self, module: &str) -> reqwest::Result<Request> {
        let limit = PAGE_LIMIT.to_string();
        self.client
            .get(format!("{}/v3/releases", self.base_url))
            .query(&[("module", module), ("limit", limit.as_str())])
            .build()
    }

    /// `next` links are usually paths relative to the registry root.
    fn absolute(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}/{}", self.base_url, link.trim_start_matches('/'))
        }
    }

    /// Every release of `module`, following pagination.
    pub async fn releases(&self, module: &str) -> Result<Vec<Release>, SourceError> {
        let mut request = self
            .releases_request(module)
            .map_err(|e| SourceError::Network {
                module: module.to_string(),
                message: format!("Invalid registry request: {e}"),
            })?;
        let mut releases = Vec::new();

        for _ in 0..MAX_PAGES {
            let Some(body) = self.get_text(module, request).await? else {
                return Err(SourceError::NotFound {
                    module: module.to_string(),
                });
            };
            let page = parse_page(module, &body)?;
            releases.extend(page.releases);
            match page.next {
                Some(next) => {
                    request = self
                        .client
                        .get(self.absolute(&next))
                        .build()
                        .map_err(|e| SourceError::Network {
                            module: module.to_string(),
                            message: format!("Invalid next link '{next}': {e}"),
                        })?
                }
                None => return Ok(releases),
            }
        }

        tracing::warn!("stopped following pagination for {module} after {MAX_PAGES} pages");
        Ok(releases)
    }

    /// Send `request` with retries. `Ok(None)` means 404.
    async fn get_text(&self, module: &str, request: Request) -> Result<Option<String>, SourceError> {
        let network = |message: String| SourceError::Network {
            module: module.to_string(),
            message,
        };
        let url = request.url().to_string();
        let mut last_err = String::new();

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                tracing::debug!("retrying {url} (attempt {})", attempt + 1);
                tokio::time::sleep(RETRY_DELAY * attempt).await;
            }

            let Some(attempt_request) = request.try_clone() else {
                return Err(network(format!("Request to {url} cannot be retried")));
            };
            match self.client.execute(attempt_request).await {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    if status.is_server_error() {
                        last_err = format!("HTTP {status} from {url}");
                        continue;
                    }
                    if !status.is_success() {
                        return Err(network(format!("HTTP {status} fetching {url}")));
                    }
                    let text = resp
                        .text()
                        .await
                        .map_err(|e| network(format!("Failed to read response from {url}: {e}")))?;
                    return Ok(Some(text));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_err = format!("{e}");
                    continue;
                }
                Err(e) => return Err(network(format!("Request to {url} failed: {e}"))),
            }
        }

        Err(network(format!(
            "Failed after {MAX_RETRIES} retries for {url}: {last_err}"
        )))
    }
}

impl ReleaseSource for RegistryClient {
    fn name(&self) -> &str {
        &self.base_url
    }

    fn priority(&self) -> u8 {
        REGISTRY_PRIORITY
    }

    fn fetch<'a>(&'a self, module: &'a str) -> FetchFuture<'a> {
        Box::pin(self.releases(module))
    }
}
