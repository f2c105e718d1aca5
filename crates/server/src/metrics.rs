//! Prometheus metrics for the Soundpost server.
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping
//! and must be network-restricted at the infrastructure level when enabled.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, IntCounter, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static TRACKS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "soundpost_tracks_created_total",
        "Total number of tracks created across all ingestion paths",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_SESSIONS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "soundpost_upload_sessions_created_total",
        "Total number of chunked upload sessions opened",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_SESSIONS_FINALIZED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "soundpost_upload_sessions_finalized_total",
        "Total number of chunked upload sessions successfully finalized",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_SESSIONS_REAPED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "soundpost_upload_sessions_reaped_total",
        "Total number of chunked upload sessions reaped by the TTL sweep",
    )
    .expect("metric creation failed")
});

pub static CHUNKS_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "soundpost_chunks_received_total",
        "Total number of upload chunks received",
    )
    .expect("metric creation failed")
});

pub static TRANSCRIPTIONS_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "soundpost_transcriptions_completed_total",
        "Total number of transcription jobs that completed",
    )
    .expect("metric creation failed")
});

pub static TRANSCRIPTIONS_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "soundpost_transcriptions_failed_total",
        "Total number of transcription jobs that failed",
    )
    .expect("metric creation failed")
});

pub static CLOUD_OBJECTS_PROBED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "soundpost_cloud_objects_probed_total",
        "Total number of cloud objects probed by the integrity reconciler",
    )
    .expect("metric creation failed")
});

pub static ORPHANED_TRACKS_DELETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "soundpost_orphaned_tracks_deleted_total",
        "Total number of tracks deleted because their cloud object was unreadable",
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Idempotent.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(TRACKS_CREATED.clone()),
            Box::new(UPLOAD_SESSIONS_CREATED.clone()),
            Box::new(UPLOAD_SESSIONS_FINALIZED.clone()),
            Box::new(UPLOAD_SESSIONS_REAPED.clone()),
            Box::new(CHUNKS_RECEIVED.clone()),
            Box::new(TRANSCRIPTIONS_COMPLETED.clone()),
            Box::new(TRANSCRIPTIONS_FAILED.clone()),
            Box::new(CLOUD_OBJECTS_PROBED.clone()),
            Box::new(ORPHANED_TRACKS_DELETED.clone()),
        ];
        for metric in metrics {
            if let Err(e) = REGISTRY.register(metric) {
                tracing::warn!(error = %e, "failed to register metric");
            }
        }
    });
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
