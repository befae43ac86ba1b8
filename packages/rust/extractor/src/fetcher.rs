//! Homepage fetcher.
//!
//! One GET per domain, redirects followed, fixed total timeout. The fetcher
//! never returns an error: every failure is folded into a [`FetchOutcome`].

use reqwest::{Client, StatusCode};
use tracing::debug;

use enricher_shared::{DomainKey, EnricherError, FetchConfig, Result};

/// Raw result of fetching one homepage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// HTTP 200 with the response body.
    Html(String),
    /// Any status other than 200.
    HttpError(u16),
    /// Timeout, DNS failure, refused connection, broken body stream.
    TimeoutOrNetwork(String),
}

/// HTTP client wrapper for homepage requests. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    scheme: String,
}

impl Fetcher {
    /// Build a fetcher with the given configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| EnricherError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            scheme: config.scheme.clone(),
        })
    }

    /// The homepage URL requested for `domain`.
    pub fn homepage_url(&self, domain: &DomainKey) -> String {
        format!("{}://{}", self.scheme, domain)
    }

    /// GET the homepage of `domain`.
    pub async fn fetch(&self, domain: &DomainKey) -> FetchOutcome {
        if domain.is_empty() {
            return FetchOutcome::TimeoutOrNetwork("empty domain".into());
        }

        let url = self.homepage_url(domain);
        debug!(%url, "fetching homepage");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::TimeoutOrNetwork(describe(&e)),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return FetchOutcome::HttpError(status.as_u16());
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Html(body),
            Err(e) => FetchOutcome::TimeoutOrNetwork(format!("body read failed: {}", describe(&e))),
        }
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timed out".into()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}
