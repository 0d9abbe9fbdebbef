//! Cursor-following retrieval of paged time-series reads
//!
//! A range read returns at most `limit` rows per response. When more data is
//! available the response carries a `link` header holding the next page URL
//! between angle brackets:
//!
//! ```text
//! link: <https://gateway.eu1.mindsphere.io/.../timeseries/a/b?cursor=XYZ>; rel="next"
//! ```
//!
//! The next URL is self-contained, so follow-up requests carry no query
//! parameters. Pages are requested strictly one after another since each
//! cursor is only known once the previous page has arrived.

use mindsphere_core::{
    codec,
    datapoint::TimeSeriesData,
    error::{MindSphereError, MindSphereResult, INVALID_LAST_VALUE_RESPONSE},
};
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::stats::RequestCounters;
use crate::transport::{
    ensure_success, HttpTransport, Method, TransportRequest, TransportResponse,
};

/// Header carrying the continuation link
pub const LINK_HEADER: &str = "link";

/// How a page whose body is `null` or empty is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPagePolicy {
    /// Decode to no rows and keep going
    Tolerate,
    /// Fail with an invalid response error
    Reject,
}

/// Extract the text between the first `<` and the next `>` after it.
///
/// Returns `None` when either delimiter is missing or nothing lies between them.
pub fn parse_link(value: &str) -> Option<&str> {
    let start = value.find('<')? + 1;
    let len = value[start..].find('>')?;
    let url = &value[start..start + len];
    (!url.is_empty()).then_some(url)
}

/// Next-page URL from a response's `link` header, if it holds one
pub fn extract_cursor(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(LINK_HEADER)?.to_str().ok()?;
    parse_link(value).map(str::to_string)
}

/// Decode one response body according to the null policy
pub fn decode_page(data: &Value, policy: NullPagePolicy) -> MindSphereResult<TimeSeriesData> {
    match (data, policy) {
        (Value::Array(_) | Value::Object(_), _) => Ok(codec::decode(data)),
        (_, NullPagePolicy::Reject) => Err(MindSphereError::invalid_response(
            INVALID_LAST_VALUE_RESPONSE,
        )),
        (_, NullPagePolicy::Tolerate) => Ok(TimeSeriesData::new()),
    }
}

/// Fetcher states; failure leaves the loop through `?`
enum FetchState {
    Init,
    Fetching { url: String, page: usize },
    Done { pages: usize },
}

/// Follows continuation links until exhausted, merging every page.
///
/// A `null` page counts as empty and does not end the fetch.
pub struct PaginatedFetcher<'a> {
    transport: &'a dyn HttpTransport,
    headers: HeaderMap,
    counters: &'a RequestCounters,
}

impl<'a> PaginatedFetcher<'a> {
    /// Create a fetcher that sends `headers` with every page request
    pub fn new(
        transport: &'a dyn HttpTransport,
        headers: HeaderMap,
        counters: &'a RequestCounters,
    ) -> Self {
        Self {
            transport,
            headers,
            counters,
        }
    }

    /// Fetch every page starting at `url` with `params`.
    ///
    /// Any failing page aborts the whole fetch and its error is returned
    /// unchanged; pages merged so far are discarded.
    pub async fn fetch_all(
        &self,
        url: &str,
        params: Vec<(String, String)>,
    ) -> MindSphereResult<TimeSeriesData> {
        let mut aggregate = TimeSeriesData::new();
        let mut state = FetchState::Init;

        loop {
            state = match state {
                FetchState::Init => {
                    let response = self.request(url, params.clone(), 1).await?;
                    self.absorb(response, &mut aggregate, 1)?
                }
                FetchState::Fetching { url, page } => {
                    let response = self.request(&url, Vec::new(), page).await?;
                    self.absorb(response, &mut aggregate, page)?
                }
                FetchState::Done { pages } => {
                    info!(
                        pages,
                        variables = aggregate.variable_count(),
                        points = aggregate.point_count(),
                        "Paginated fetch complete"
                    );
                    return Ok(aggregate);
                }
            };
        }
    }

    async fn request(
        &self,
        url: &str,
        params: Vec<(String, String)>,
        page: usize,
    ) -> MindSphereResult<TransportResponse> {
        debug!(page, url, "Requesting page");

        let request = TransportRequest::new(Method::GET, url, self.headers.clone())
            .with_params(params);
        self.counters.record_request();

        self.transport.execute(request).await.map_err(|e| {
            self.counters.record_failure();
            warn!(page, url, error = %e, "Page request failed");
            e
        })
    }

    fn absorb(
        &self,
        response: TransportResponse,
        aggregate: &mut TimeSeriesData,
        page: usize,
    ) -> MindSphereResult<FetchState> {
        if let Err(e) = ensure_success(&response) {
            self.counters.record_failure();
            warn!(page, status = response.status, "Page answered with non-success status");
            return Err(e);
        }
        self.counters.record_page();

        aggregate.merge(decode_page(&response.data, NullPagePolicy::Tolerate)?);

        Ok(match extract_cursor(&response.headers) {
            Some(url) => FetchState::Fetching {
                url,
                page: page + 1,
            },
            None => FetchState::Done { pages: page },
        })
    }
}
