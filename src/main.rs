// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use anyhow::Context;
use axum::{routing::{get, post, put}, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::delivery_pipeline::DeliveryPipeline;
use crate::application::ports::PreferenceStore;
use crate::application::tracker::{Tracker, TrackerPorts};
use crate::application::tracking_service::TrackerHandle;
use crate::infrastructure::config::load_relay_config;
use crate::infrastructure::host_bridge::{HostBridge, PermissionSet};
use crate::infrastructure::http_collector::HttpCollector;
use crate::infrastructure::preference_store::FilePreferenceStore;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    health_check, host_sampling, start_tracking, stop_tracking, submit_battery, submit_fix,
    submit_memory_pressure, submit_transition, tracking_status, update_credentials,
    update_permissions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("location_relay=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_relay_config().context("Failed to load relay configuration")?;

    // Create adapters (infrastructure layer)
    let store = FilePreferenceStore::new(config.storage.preferences_path.clone());
    tracing::info!(path = %store.path().display(), "Using preference store");
    let preferences: Arc<dyn PreferenceStore> = Arc::new(store);
    let bridge = Arc::new(HostBridge::new(PermissionSet {
        location: config.host.location_permission,
        activity_recognition: config.host.activity_permission,
    }));
    let collector = Arc::new(HttpCollector::new(
        config.collector.upload_path.clone(),
        Duration::from_secs(config.collector.connect_timeout_secs),
        Duration::from_secs(config.collector.request_timeout_secs),
    )?);

    // Surface sampling changes for the host glue
    let mut requests = bridge.subscribe();
    tokio::spawn(async move {
        while requests.changed().await.is_ok() {
            let request = requests.borrow_and_update().clone();
            tracing::debug!(
                generation = request.generation,
                interval_millis = request.policy.map(|policy| policy.interval_millis),
                activity_updates = request.activity_updates,
                keep_awake = request.keep_awake,
                "Sampling request updated"
            );
        }
    });

    // Create services (application layer)
    let pipeline = DeliveryPipeline::new(
        collector,
        config.delivery.max_batch_size,
        config.delivery.workers,
    );
    let ports = TrackerPorts {
        positions: bridge.clone(),
        activities: bridge.clone(),
        wake_lock: bridge.clone(),
        preferences: preferences.clone(),
    };
    let tracker = Tracker::new(ports, pipeline, config.tracker_settings());
    let (handle, worker) = TrackerHandle::spawn(tracker);

    // Resume a session that was running when the process last exited
    match preferences.load() {
        Ok(stored) if stored.tracking_enabled => match handle.start().await {
            Ok(()) => tracing::info!("Resumed tracking after restart"),
            Err(error) => tracing::warn!(%error, "Could not resume tracking"),
        },
        Ok(_) => {}
        Err(error) => tracing::warn!(error = %format!("{error:#}"), "Could not read stored preferences"),
    }

    // Create application state
    let state = Arc::new(AppState {
        tracker: handle.clone(),
        preferences,
        bridge,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/tracking/status", get(tracking_status))
        .route("/tracking/start", post(start_tracking))
        .route("/tracking/stop", post(stop_tracking))
        .route("/credentials", put(update_credentials))
        .route("/events/fix", post(submit_fix))
        .route("/events/transition", post(submit_transition))
        .route("/events/battery", post(submit_battery))
        .route("/events/memory-pressure", post(submit_memory_pressure))
        .route("/host/sampling", get(host_sampling))
        .route("/host/permissions", put(update_permissions))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_address))?;
    tracing::info!(%addr, "Starting location-relay service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Final flush and drain; the enabled flag stays set so the next start resumes
    let grace = config.shutdown_grace() + Duration::from_secs(1);
    match tokio::time::timeout(grace, handle.shutdown()).await {
        Ok(Ok(())) => {
            let _ = worker.await;
        }
        Ok(Err(error)) => tracing::warn!(%error, "Tracking service already stopped"),
        Err(_) => tracing::warn!("Tracking service did not stop within the grace period"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
