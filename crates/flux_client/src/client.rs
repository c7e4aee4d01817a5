//! HTTP client for the query endpoint.

use common::config::InfluxConfig;
use common::{Error, TableRow};
use tracing::debug;

use crate::parser::{self, ParseOptions};

/// Async client for the `/api/v2/query` endpoint.
#[derive(Debug, Clone)]
pub struct FluxClient {
    client: reqwest::Client,
    base_url: String,
    org: String,
    token: String,
}

impl FluxClient {
    pub fn new(config: &InfluxConfig) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build query HTTP client");

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            org: config.org.clone(),
            token: config.token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Probe the endpoint's health route.
    pub async fn ping(&self) -> Result<(), Error> {
        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }
        Ok(())
    }

    /// Run a query and return the raw tabular body.
    ///
    /// Transport failures and timeouts surface as `Error::Http`;
    /// non-success statuses as `Error::Api` with the response body.
    pub async fn query_raw(&self, flux: &str) -> Result<String, Error> {
        debug!("POST /api/v2/query org={} ({} bytes)", self.org, flux.len());

        let mut req = self
            .client
            .post(self.url("/api/v2/query"))
            .query(&[("org", self.org.as_str())])
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "text/csv")
            .body(flux.to_string());

        if !self.token.is_empty() {
            req = req.header("Authorization", format!("Token {}", self.token));
        }

        let resp = req.send().await.map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        resp.text().await.map_err(|e| Error::Http(e.to_string()))
    }

    /// Run a query and parse the response into rows.
    ///
    /// An empty or header-only body is a valid empty result.
    pub async fn query(&self, flux: &str) -> Result<Vec<TableRow>, Error> {
        let body = self.query_raw(flux).await?;
        Ok(parser::parse(&body, &ParseOptions::default()))
    }
}
