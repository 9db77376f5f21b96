//! Async clients and typed records for the wildfire data feeds.
//!
//! This crate is the data-access boundary of the firewatch workspace: it
//! fetches observed fire detections and model-predicted risk points for a
//! geographic bounding box, and exposes them as validated Rust types.
//!
//! # Design principles
//!
//! - **Web-compatible**: Works on desktop and WASM via reqwest
//! - **Runtime-agnostic**: Returns `impl Future`, works with any executor
//! - **Explicit outcomes**: A superseded request resolves to
//!   [`FetchOutcome::Cancelled`], never to an error the caller has to
//!   pattern-match out of an error type
//!
//! # Example
//!
//! ```ignore
//! use firewatch_feeds::{FeedClient, FireQuery, GeoBounds, DateRange, CancelToken};
//!
//! let client = FeedClient::new(
//!     "https://fires.example.com/api".into(),
//!     "https://model.example.com/api".into(),
//! )?;
//!
//! let query = FireQuery::new(GeoBounds::new(1.0, 0.0, 1.0, 0.0), DateRange::Last24h, 100);
//! let outcome = client.fetch_batch(&query, CancelToken::new()).await;
//! ```

pub mod client;
pub mod dates;
mod error;
pub mod source;
pub mod types;

pub use client::FeedClient;
pub use dates::DateRange;
pub use error::{Error, Result};
pub use source::{
    CancelToken, Cancelled, FetchFuture, FireBatch, FireSource, FetchOutcome, run_until_cancelled,
};
pub use types::{
    FireQuery, FirePoint, FireResponse, GeoBounds, PredictedPoint, PredictionResponse,
    TerrainInfo, VegetationInfo,
};
