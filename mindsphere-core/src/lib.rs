//! # MindSphere Core Library
//!
//! Shared data types and the wire codec for the MindSphere IoT time-series
//! client.
//!
//! ## Features
//!
//! - **Data Types**: Columnar time-series keyed by variable and timestamp,
//!   scalar values and opaque quality codes
//! - **Codec**: Lossless conversion between wire rows and the columnar form
//! - **Time**: Millisecond ISO-8601 formatting and parsing
//! - **Errors**: One error type shared by the codec and the network client

pub mod codec;
pub mod datapoint;
pub mod error;
pub mod time;

// Re-export commonly used types
pub use codec::{decode, encode, WireRow};
pub use datapoint::{DataPoint, DataPointValue, TimeSeriesData, VariableSeries};
pub use error::{MindSphereError, MindSphereResult};
pub use time::{TimeRange, Timestamp};

/// Version information for mindsphere-rs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
