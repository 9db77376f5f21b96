//! Headless driver for the firewatch viewport engine.
//!
//! Runs the full camera-to-markers pipeline against live feed services
//! without a renderer: an in-memory scene stands in for the globe viewer,
//! and a scripted camera path exercises debounce, motion gating, fetching,
//! and reconciliation. Useful for smoke-testing feed deployments and for
//! inspecting what the chat layer would see at each stop.

use std::sync::Arc;

use clap::Parser;
use web_time::{Duration, Instant};

use firewatch_engine::{
    EngineSettings, GeoPosition, MemoryScene, SharedViewContext, ViewportController,
};
use firewatch_feeds::FeedClient;

/// Half-extent of the synthetic viewport, in degrees, around each stop.
const VIEW_HALF_SPAN_DEG: f64 = 0.5;

#[derive(Parser, Debug)]
#[command(name = "firewatch-headless")]
#[command(about = "Drive the fire viewport engine along a scripted camera path", long_about = None)]
struct Args {
    /// Base URL of the fire detection service.
    #[arg(long, default_value = "http://localhost:8000")]
    detection_url: String,

    /// Base URL of the fire prediction service.
    #[arg(long, default_value = "http://localhost:8001")]
    prediction_url: String,

    /// Starting latitude in degrees.
    #[arg(long, default_value_t = -13.517)]
    lat: f64,

    /// Starting longitude in degrees.
    #[arg(long, default_value_t = -71.967)]
    lon: f64,

    /// Camera height above terrain in meters.
    #[arg(long, default_value_t = 4000.0)]
    height: f64,

    /// Number of camera stops along the path.
    #[arg(long, default_value_t = 4)]
    stops: u32,

    /// Degrees of longitude between consecutive stops.
    #[arg(long, default_value_t = 0.25)]
    stride: f64,
}

/// Aim the in-memory scene at a stop: camera above it, corner picks
/// covering a box around it.
fn aim(scene: &mut MemoryScene, lat: f64, lon: f64, height: f64) {
    scene.set_camera(&GeoPosition::new(lat, lon, height));
    scene.set_view(
        lat + VIEW_HALF_SPAN_DEG,
        lat - VIEW_HALF_SPAN_DEG,
        lon + VIEW_HALF_SPAN_DEG,
        lon - VIEW_HALF_SPAN_DEG,
    );
}

#[tokio::main]
async fn main() {
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let args = Args::parse();

    let client = match FeedClient::new(args.detection_url.clone(), args.prediction_url.clone()) {
        Ok(client) => Arc::new(client),
        Err(error) => {
            tracing::error!(%error, "failed to construct feed client");
            std::process::exit(1);
        }
    };

    let settings = EngineSettings::default();
    let debounce = settings.debounce;
    let context = SharedViewContext::new();
    let mut controller =
        ViewportController::new(MemoryScene::new(), client, settings, context.clone());

    for stop in 0..args.stops {
        let lon = args.lon + f64::from(stop) * args.stride;
        tracing::info!(stop, lat = args.lat, lon, "flying to next stop");

        aim(controller.scene_mut(), args.lat, lon, args.height);
        controller.note_camera_motion(Instant::now());

        // Let the camera settle, then poll the debounced pipeline.
        tokio::time::sleep(debounce + Duration::from_millis(100)).await;
        if !controller.run_cycle(Instant::now()).await {
            tracing::info!(stop, "no cycle ran (below motion threshold or rays missed)");
            continue;
        }

        println!(
            "--- stop {} ({} markers, {} recent observed, {} recent predicted) ---",
            stop,
            controller.marker_count(),
            controller.recent_observed().count(),
            controller.recent_predicted().count(),
        );
        if let Some(snapshot) = context.read() {
            println!("{}", snapshot.summary(chrono::Utc::now()));
        }
    }

    controller.teardown();
}
