//! HTTP transport interface and the reqwest-backed implementation
//!
//! The service layer only ever talks to [`HttpTransport`], so tests can swap
//! in [`MockTransport`](crate::mock_transport::MockTransport).

use async_trait::async_trait;
use mindsphere_core::error::{MindSphereError, MindSphereResult};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;

pub use reqwest::Method;

/// A single request handed to the transport
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// Query parameters, appended in order
    pub params: Vec<(String, String)>,
    /// JSON body, if any
    pub body: Option<Value>,
}

/// A response with a decoded JSON body
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Decoded body, `Value::Null` when the body was empty
    pub data: Value,
    pub headers: HeaderMap,
}

/// Trait defining the interface for HTTP transports
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute one request.
    ///
    /// Implementations reject with [`MindSphereError::Transport`] when no
    /// response arrived and with [`MindSphereError::Status`] when the
    /// remote answered outside 2xx.
    async fn execute(&self, request: TransportRequest) -> MindSphereResult<TransportResponse>;
}

impl TransportRequest {
    pub fn new<U: Into<String>>(method: Method, url: U, headers: HeaderMap) -> Self {
        Self {
            method,
            url: url.into(),
            headers,
            params: Vec::new(),
            body: None,
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl TransportResponse {
    pub fn new(status: u16, data: Value) -> Self {
        Self {
            status,
            data,
            headers: HeaderMap::new(),
        }
    }

    /// Add a header, silently ignoring names or values that are not valid HTTP
    pub fn with_header(mut self, name: &str, value: HeaderValue) -> Self {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fail with a status error unless the response is 2xx
pub fn ensure_success(response: &TransportResponse) -> MindSphereResult<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(MindSphereError::status(response.status))
    }
}

/// Decode a success body. Blank bodies become `null` and bodies that are not
/// JSON are kept as text, so the caller decides whether the payload matters.
pub fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }

    serde_json::from_slice(bytes).unwrap_or_else(|e| {
        debug!(error = %e, "Response body is not JSON");
        Value::String(String::from_utf8_lossy(bytes).into_owned())
    })
}

/// Headers carried by every time-series request
pub fn json_headers(token: &str) -> MindSphereResult<HeaderMap> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| {
            MindSphereError::token("Bearer token contains invalid header characters")
        })?;
    auth.set_sensitive(true);

    let json = HeaderValue::from_static("application/json");
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, json.clone());
    headers.insert(ACCEPT, json);
    Ok(headers)
}

/// Production transport on top of a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with timeouts and user agent taken from config
    pub fn new(config: &ClientConfig) -> MindSphereResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                MindSphereError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self::with_client(client))
    }

    /// Wrap an already configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> MindSphereResult<TransportResponse> {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(url = %request.url, error = %e, "Request failed");
            MindSphereError::transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %request.url, status = status.as_u16(), "Non-success status");
            return Err(MindSphereError::status(status.as_u16()));
        }

        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MindSphereError::transport(e.to_string()))?;

        Ok(TransportResponse {
            status: status.as_u16(),
            data: decode_body(&bytes),
            headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_headers() {
        let headers = json_headers("abc").unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCEPT], "application/json");

        assert!(matches!(
            json_headers("bad\ntoken"),
            Err(MindSphereError::TokenAcquisition(_))
        ));
    }

    #[test]
    fn test_ensure_success() {
        assert!(ensure_success(&TransportResponse::new(200, json!([]))).is_ok());
        assert!(ensure_success(&TransportResponse::new(204, Value::Null)).is_ok());

        let err = ensure_success(&TransportResponse::new(500, Value::Null)).unwrap_err();
        assert_eq!(err.to_string(), "Server responded with status code: 500");
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b" \r\n"), Value::Null);
        assert_eq!(decode_body(b"[{\"v\": 1}]"), json!([{"v": 1}]));
        assert_eq!(decode_body(b"OK"), json!("OK"));
        assert_eq!(decode_body(b"{truncated"), json!("{truncated"));
    }

    #[test]
    fn test_request_params() {
        let request = TransportRequest::new(Method::GET, "http://localhost/x", HeaderMap::new())
            .with_params(vec![("limit".to_string(), "2000".to_string())]);
        assert_eq!(request.param("limit"), Some("2000"));
        assert_eq!(request.param("from"), None);
    }

    #[test]
    fn test_reqwest_transport_from_config() {
        assert!(ReqwestTransport::new(&ClientConfig::default()).is_ok());
    }
}
