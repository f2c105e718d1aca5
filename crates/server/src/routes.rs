//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Track ingestion and CRUD
        .route(
            "/v1/tracks",
            post(handlers::create_track).get(handlers::list_tracks),
        )
        .route("/v1/tracks/from-key", post(handlers::create_track_from_key))
        .route(
            "/v1/tracks/from-key/batch",
            post(handlers::batch_create_from_keys),
        )
        .route(
            "/v1/tracks/{track_id}",
            get(handlers::get_track)
                .patch(handlers::update_track)
                .delete(handlers::delete_track),
        )
        .route(
            "/v1/tracks/{track_id}/analysis",
            put(handlers::update_analysis),
        )
        // Transcription
        .route(
            "/v1/tracks/{track_id}/transcribe",
            post(handlers::transcribe_track),
        )
        .route(
            "/v1/tracks/{track_id}/transcript",
            get(handlers::get_transcript),
        )
        .route("/v1/transcriptions/run", post(handlers::transcribe_all))
        // Direct-to-bucket and proxied uploads
        .route("/v1/uploads/sign", post(handlers::sign_upload))
        .route("/v1/uploads/sign/batch", post(handlers::sign_upload_batch))
        .route("/v1/uploads/proxy", post(handlers::proxy_upload))
        // Chunked uploads
        .route("/v1/uploads/chunked", post(handlers::init_chunked_upload))
        .route(
            "/v1/uploads/chunked/{session_id}/chunks/{index}",
            put(handlers::upload_chunk),
        )
        .route(
            "/v1/uploads/chunked/{session_id}/finalize",
            post(handlers::finalize_chunked_upload),
        )
        // Cleanup / reconciliation
        .route(
            "/v1/cleanup/missing-audio",
            post(handlers::purge_missing_audio),
        )
        .route(
            "/v1/cleanup/verify-objects",
            post(handlers::verify_cloud_objects),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Streaming routes authenticate in-handler: media elements can only
    // carry the credential as a query parameter.
    let stream_routes = Router::new()
        .route("/v1/tracks/{track_id}/stream", get(handlers::stream_track))
        .route(
            "/v1/tracks/{track_id}/stream/proxy",
            get(handlers::stream_proxy),
        )
        .route("/v1/tracks/{track_id}/stream/url", get(handlers::stream_url));

    // Health check is intentionally unauthenticated for load balancers.
    let public_routes = Router::new().route("/v1/health", get(handlers::health_check));

    let mut router = Router::new()
        .merge(api_routes)
        .merge(stream_routes)
        .merge(public_routes);

    // SECURITY: when enabled, /metrics must be network-restricted to
    // authorized Prometheus scrapers at the infrastructure level.
    if state.config.server.metrics_enabled {
        router = router.merge(Router::new().route("/metrics", get(metrics_handler)));
    }

    let body_limit = state.body_limit();

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
