//! MindSphere Time-Series Client Library
//!
//! This library provides the networked half of the client: token supply,
//! HTTP transport, cursor-following pagination and the time-series
//! service operations built on the `mindsphere-core` codec.

// Core modules
pub mod config;
pub mod mock_transport;
pub mod pagination;
pub mod service;
pub mod stats;
pub mod token;
pub mod transport;

// Re-export commonly used types
pub use config::ClientConfig;
pub use service::TimeSeriesService;
pub use stats::ServiceStats;
pub use token::{TokenManager, TokenProvider};
pub use transport::{HttpTransport, ReqwestTransport};
