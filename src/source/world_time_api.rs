use std::time::Duration;

use reqwest::{Client, Response, Url, header};
use tracing::{debug, error, info};

use super::TimeZoneSource;
use crate::error::{AppError, FetchError};
use crate::query::ZoneIdentifier;

// Public endpoint of the WorldTimeAPI service
pub const DEFAULT_BASE_URL: &str = "http://worldtimeapi.org/api/timezone";

const USER_AGENT: &str = "WorldTimeAPI Client";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(20);

/// Client for a WorldTimeAPI-compatible service.
///
/// Holds one pooled `reqwest::Client`; cloning shares the pool.
#[derive(Debug, Clone)]
pub struct WorldTimeApi {
    client: Client,
    base: Url,
}

impl WorldTimeApi {
    /// Builds a client rooted at `base_url` (e.g. `http://worldtimeapi.org/api/timezone`).
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base = Url::parse(base_url).map_err(|e| AppError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(AppError::InvalidBaseUrl(base_url.to_string()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        info!("Using time-zone data source at {}", base);
        Ok(Self { client, base })
    }

    fn zone_url(&self, zone: &ZoneIdentifier) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(zone.as_str().split('/'));
        }
        url
    }

    async fn get(&self, url: Url, context: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let response = check_status(response, context).await?;
        Ok(response.text().await?)
    }
}

/// Turns a 4xx/5xx response into `FetchError::Status`, keeping the body for diagnostics.
async fn check_status(response: Response, context: &str) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        error!("HTTP error {}: {}", context, status);
        let body = response.text().await.unwrap_or_default();
        error!("Error response body {}: {}", context, body);
        return Err(FetchError::Status {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        });
    }
    Ok(response)
}

#[async_trait::async_trait]
impl TimeZoneSource for WorldTimeApi {
    async fn catalog(&self) -> Result<String, FetchError> {
        self.get(self.base.clone(), "while listing time zones").await
    }

    async fn zone_time(&self, zone: &ZoneIdentifier) -> Result<String, FetchError> {
        let context = format!("while fetching the time for {zone}");
        self.get(self.zone_url(zone), &context).await
    }
}
