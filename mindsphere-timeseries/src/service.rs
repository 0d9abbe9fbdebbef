//! Time-series operations against the remote API
//!
//! Each operation validates its asset/aspect target, obtains a bearer token
//! for the tenant, and then issues its request(s). Errors from the token
//! provider and the transport are returned exactly as produced.

use mindsphere_core::{
    codec,
    datapoint::TimeSeriesData,
    error::{MindSphereError, MindSphereResult},
    time::TimeRange,
};
use reqwest::header::HeaderMap;
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::pagination::{decode_page, NullPagePolicy, PaginatedFetcher};
use crate::stats::{RequestCounters, ServiceStats};
use crate::token::{StaticTokenFetcher, TokenManager, TokenProvider};
use crate::transport::{
    ensure_success, json_headers, HttpTransport, Method, ReqwestTransport, TransportRequest,
    TransportResponse,
};

/// Rows requested per page on range reads
pub const DEFAULT_PAGE_LIMIT: usize = 2000;

/// Client for reading, writing and deleting aspect time-series
pub struct TimeSeriesService {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenProvider>,
    page_limit: usize,
    counters: RequestCounters,
}

impl TimeSeriesService {
    /// Create a service talking to `base_url`
    pub fn new<U: Into<String>>(
        base_url: U,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            tokens,
            page_limit: DEFAULT_PAGE_LIMIT,
            counters: RequestCounters::default(),
        }
    }

    /// Build the production service: reqwest transport and configured tokens
    pub fn from_config(config: &ClientConfig) -> MindSphereResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        let tokens = Arc::new(TokenManager::new(StaticTokenFetcher::from_config(
            &config.tokens,
        )));

        Ok(Self::new(config.base_url.clone(), transport, tokens)
            .with_page_limit(config.page_limit))
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// Snapshot of request statistics
    pub fn stats(&self) -> ServiceStats {
        self.counters.snapshot()
    }

    /// Most recent value of every variable of an aspect
    pub async fn get_last_values(
        &self,
        tenant: &str,
        asset_id: &str,
        aspect_name: &str,
    ) -> MindSphereResult<TimeSeriesData> {
        validate_target(asset_id, aspect_name)?;
        let url = self.timeseries_url(asset_id, aspect_name)?;
        let headers = self.request_headers(tenant).await?;

        let request = TransportRequest::new(Method::GET, url, headers)
            .with_params(vec![("latestValue".to_string(), "true".to_string())]);
        let response = self.send(request).await?;

        let data = decode_page(&response.data, NullPagePolicy::Reject)?;
        info!(
            asset_id,
            aspect_name,
            variables = data.variable_count(),
            "Fetched latest values"
        );
        Ok(data)
    }

    /// All values in `[from_ms, to_ms]`, following continuation links
    pub async fn get_values(
        &self,
        tenant: &str,
        asset_id: &str,
        aspect_name: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> MindSphereResult<TimeSeriesData> {
        validate_target(asset_id, aspect_name)?;
        let range = TimeRange::from_millis(from_ms, to_ms)?;
        let url = self.timeseries_url(asset_id, aspect_name)?;
        let headers = self.request_headers(tenant).await?;

        let mut params = range.query_params();
        params.push(("limit".to_string(), self.page_limit.to_string()));

        debug!(asset_id, aspect_name, %range, "Fetching values");
        PaginatedFetcher::new(self.transport.as_ref(), headers, &self.counters)
            .fetch_all(&url, params)
            .await
    }

    /// Write values; empty data is a no-op without any network call
    pub async fn set_values(
        &self,
        tenant: &str,
        asset_id: &str,
        aspect_name: &str,
        data: &TimeSeriesData,
    ) -> MindSphereResult<()> {
        validate_target(asset_id, aspect_name)?;
        if data.is_empty() {
            debug!(asset_id, aspect_name, "Nothing to write");
            return Ok(());
        }

        let rows = codec::encode(data)?;
        let row_count = rows.len();
        let url = self.timeseries_url(asset_id, aspect_name)?;
        let headers = self.request_headers(tenant).await?;

        let body = Value::Array(rows.into_iter().map(Value::Object).collect());
        let request = TransportRequest::new(Method::PUT, url, headers).with_body(body);
        self.send(request).await?;

        info!(asset_id, aspect_name, rows = row_count, "Wrote values");
        Ok(())
    }

    /// Delete all values in `[from_ms, to_ms]`
    pub async fn delete_values(
        &self,
        tenant: &str,
        asset_id: &str,
        aspect_name: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> MindSphereResult<()> {
        validate_target(asset_id, aspect_name)?;
        let range = TimeRange::from_millis(from_ms, to_ms)?;
        let url = self.timeseries_url(asset_id, aspect_name)?;
        let headers = self.request_headers(tenant).await?;

        let request = TransportRequest::new(Method::DELETE, url, headers)
            .with_params(range.query_params());
        self.send(request).await?;

        info!(asset_id, aspect_name, %range, "Deleted values");
        Ok(())
    }

    /// `{base}/timeseries/{asset}/{aspect}` with both ids percent-encoded
    fn timeseries_url(&self, asset_id: &str, aspect_name: &str) -> MindSphereResult<String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            MindSphereError::configuration(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                MindSphereError::configuration(format!(
                    "Base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["timeseries", asset_id, aspect_name]);
        Ok(url.into())
    }

    async fn request_headers(&self, tenant: &str) -> MindSphereResult<HeaderMap> {
        let token = self.tokens.bearer_token(tenant).await?;
        json_headers(&token)
    }

    /// Execute a single, non-paged request
    async fn send(&self, request: TransportRequest) -> MindSphereResult<TransportResponse> {
        let method = request.method.clone();
        self.counters.record_request();

        let result = match self.transport.execute(request).await {
            Ok(response) => ensure_success(&response).map(|_| response),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            self.counters.record_failure();
            warn!(%method, error = %e, category = e.category(), "Request failed");
        }
        result
    }
}

/// Reject requests that do not name both an asset and an aspect
fn validate_target(asset_id: &str, aspect_name: &str) -> MindSphereResult<()> {
    match (asset_id.is_empty(), aspect_name.is_empty()) {
        (true, true) => Err(MindSphereError::validation(
            "Both assetId and aspectName not specified",
        )),
        (true, false) => Err(MindSphereError::validation("assetId not specified")),
        (false, true) => Err(MindSphereError::validation("aspectName not specified")),
        (false, false) => Ok(()),
    }
}
