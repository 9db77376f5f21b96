//! HTTP clients for the detection and prediction feeds.
//!
//! The two feeds have different shapes and different latency budgets: the
//! detection feed is a plain `GET` with query parameters, while the
//! prediction feed runs model inference behind a `POST` and is given a
//! longer timeout. `fetch_batch` joins the two — it never races them.

use chrono::Utc;
use serde_json::json;

use crate::dates;
use crate::error::{Error, Result};
use crate::source::{
    CancelToken, FetchFuture, FireBatch, FireSource, FetchOutcome, run_until_cancelled,
};
use crate::types::{FireQuery, FirePoint, FireResponse, GeoBounds, PredictionResponse};

/// Request timeout for the detection feed.
const DETECTION_TIMEOUT_SECS: u64 = 10;

/// Request timeout for the prediction feed. Model inference is slower than
/// a database query, so this budget is deliberately larger.
const PREDICTION_TIMEOUT_SECS: u64 = 25;

/// Hard cap on the detection feed's result count.
pub const MAX_RESULT_LIMIT: u32 = 100;

/// HTTP client pair for the wildfire feeds.
///
/// # Example
///
/// ```ignore
/// let client = FeedClient::new(
///     "https://fires.example.com/api".into(),
///     "https://model.example.com/api".into(),
/// )?;
/// let fires = client.fetch_fires(&query).await?;
/// ```
pub struct FeedClient {
    detection_http: reqwest::Client,
    prediction_http: reqwest::Client,
    detection_base_url: String,
    prediction_base_url: String,
}

impl FeedClient {
    /// Create a client pair for the given feed base URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if either underlying HTTP client fails to build.
    pub fn new(detection_base_url: String, prediction_base_url: String) -> Result<Self> {
        Ok(Self {
            detection_http: build_http(DETECTION_TIMEOUT_SECS)?,
            prediction_http: build_http(PREDICTION_TIMEOUT_SECS)?,
            detection_base_url,
            prediction_base_url,
        })
    }

    /// Fetch observed fire detections for the query's bounds and date range.
    ///
    /// An empty result set is a valid "no fires" answer, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the feed returns a non-success
    /// status, or the body cannot be decoded.
    pub async fn fetch_fires(&self, query: &FireQuery) -> Result<Vec<FirePoint>> {
        let url = format!("{}/fires", self.detection_base_url);
        let params = fire_query_params(query);

        tracing::debug!(url, limit = query.limit, "fetching detections");

        let response = self
            .detection_http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::Http {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let envelope: FireResponse = response.json().await.map_err(|e| Error::Json {
            context: "fire response",
            message: e.to_string(),
        })?;

        tracing::debug!(count = envelope.data.len(), "detections received");
        Ok(envelope.data)
    }

    /// Fetch the predicted risk grid for a bounding box.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the feed returns a non-success
    /// status, or the body cannot be decoded.
    pub async fn fetch_prediction(
        &self,
        bounds: &GeoBounds,
        forecast_date: &str,
    ) -> Result<PredictionResponse> {
        let url = format!("{}/predict-fire-risk", self.prediction_base_url);
        let body = prediction_body(bounds, forecast_date);

        tracing::debug!(url, forecast_date, "fetching prediction");

        let response = self
            .prediction_http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let prediction: PredictionResponse = response.json().await.map_err(|e| Error::Json {
            context: "prediction response",
            message: e.to_string(),
        })?;

        tracing::debug!(points = prediction.risk_grid.len(), "prediction received");
        Ok(prediction)
    }

    /// Fetch both feeds for one cycle, honoring the cancellation token.
    ///
    /// Cancellation aborts: the joined requests are raced against the
    /// token, so a superseded cycle drops its connections mid-flight
    /// instead of running them to their timeouts.
    pub async fn fetch_batch(&self, query: &FireQuery, token: CancelToken) -> FetchOutcome {
        let forecast = dates::forecast_date(Utc::now());
        let work = async {
            futures::join!(
                self.fetch_fires(query),
                self.fetch_prediction(&query.bounds, &forecast),
            )
        };

        let Some((fires, prediction)) = run_until_cancelled(&token, work).await else {
            tracing::debug!("fetch superseded mid-flight, dropping requests");
            return FetchOutcome::Cancelled;
        };

        // A response that lands after supersession is stale regardless of
        // whether the transport succeeded.
        if token.is_cancelled() {
            return FetchOutcome::Cancelled;
        }

        match (fires, prediction) {
            (Ok(observed), Ok(prediction)) => FetchOutcome::Complete(FireBatch {
                observed,
                predicted: prediction.risk_grid,
            }),
            (Err(e), _) | (_, Err(e)) => FetchOutcome::Failed(e),
        }
    }
}

impl FireSource for FeedClient {
    fn fetch(&self, query: &FireQuery, token: CancelToken) -> FetchFuture<'_> {
        let query = query.clone();
        Box::pin(async move { self.fetch_batch(&query, token).await })
    }
}

fn build_http(timeout_secs: u64) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder();
    // Timeouts are enforced by the browser on WASM.
    #[cfg(not(target_family = "wasm"))]
    let builder = builder.timeout(std::time::Duration::from_secs(timeout_secs));
    #[cfg(target_family = "wasm")]
    let _ = timeout_secs;
    builder.build().map_err(|e| Error::Http {
        url: String::new(),
        message: format!("failed to build http client: {e}"),
    })
}

/// Build the detection feed's query parameters from a query bundle.
fn fire_query_params(query: &FireQuery) -> Vec<(&'static str, String)> {
    let (start, end) = query.range.window_rfc3339(Utc::now());
    let limit = query.limit.min(MAX_RESULT_LIMIT);
    vec![
        ("start", start),
        ("end", end),
        ("minLat", query.bounds.south.to_string()),
        ("maxLat", query.bounds.north.to_string()),
        ("minLon", query.bounds.west.to_string()),
        ("maxLon", query.bounds.east.to_string()),
        ("limit", limit.to_string()),
    ]
}

/// Build the prediction feed's request body.
///
/// Corners are `[longitude, latitude]` pairs: top-left is the north-west
/// corner, bottom-right the south-east.
fn prediction_body(bounds: &GeoBounds, forecast_date: &str) -> serde_json::Value {
    json!({
        "bbox_corners": {
            "top_left": [bounds.west, bounds.north],
            "bottom_right": [bounds.east, bounds.south],
        },
        "forecast_date": forecast_date,
    })
}
