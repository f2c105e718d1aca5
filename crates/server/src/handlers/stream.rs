//! Playback streaming handlers.
//!
//! The credential is accepted via header or `?token=` query because native
//! media-playback elements cannot attach custom headers. Ownership is
//! checked identically on every path; a non-owner sees the same 404 as a
//! missing track.

use crate::auth::{AuthenticatedUser, authenticate_request};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use soundpost_metadata::models::TrackRow;
use uuid::Uuid;

/// Query parameters common to the streaming endpoints.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Credential for clients that cannot set the Authorization header.
    pub token: Option<String>,
}

async fn stream_auth_track(
    state: &AppState,
    headers: &HeaderMap,
    query: &StreamQuery,
    track_id: Uuid,
) -> ApiResult<TrackRow> {
    let user: AuthenticatedUser =
        authenticate_request(state, headers, query.token.as_deref()).await?;
    state
        .metadata
        .get_track_for_owner(track_id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("track {track_id}")))
}

/// GET /v1/tracks/{track_id}/stream - Play a track.
///
/// Cloud-backed tracks redirect to a short-lived signed URL (the
/// low-overhead path) unless the deployment forces proxying or the backend
/// cannot sign. Inline tracks are served directly with range support.
pub async fn stream_track(
    State(state): State<AppState>,
    Path(track_id): Path<Uuid>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let track = stream_auth_track(&state, &headers, &query, track_id).await?;

    if let Some(key) = &track.object_key {
        if !state.config.server.proxy_streaming
            && let Some(url) = state.facade.signed_read_url(key).await?
        {
            return redirect_found(&url);
        }
        return proxy_cloud_object(&state, key, &headers).await;
    }

    serve_inline(&state, &track, &headers).await
}

/// GET /v1/tracks/{track_id}/stream/proxy - Always proxy the bytes.
///
/// For deployments where the client cannot reach the bucket origin at all.
pub async fn stream_proxy(
    State(state): State<AppState>,
    Path(track_id): Path<Uuid>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let track = stream_auth_track(&state, &headers, &query, track_id).await?;

    match &track.object_key {
        Some(key) => proxy_cloud_object(&state, key, &headers).await,
        None => serve_inline(&state, &track, &headers).await,
    }
}

/// Signed playback URL response.
#[derive(Debug, Serialize)]
pub struct StreamUrlResponse {
    pub url: String,
    pub expires_in_secs: u64,
}

/// GET /v1/tracks/{track_id}/stream/url - Return the signed URL as JSON.
pub async fn stream_url(
    State(state): State<AppState>,
    Path(track_id): Path<Uuid>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<StreamUrlResponse>> {
    let track = stream_auth_track(&state, &headers, &query, track_id).await?;

    let key = track.object_key.as_ref().ok_or_else(|| {
        ApiError::BadRequest("track is stored inline; use the stream endpoint".to_string())
    })?;

    match state.facade.signed_read_url(key).await? {
        Some(url) => Ok(Json(StreamUrlResponse {
            url,
            expires_in_secs: state.config.server.signed_url_ttl_secs,
        })),
        None => Err(ApiError::StorageUnavailable),
    }
}

/// 302 redirect; media elements follow it to the bucket.
fn redirect_found(url: &str) -> ApiResult<Response> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, url)
        .body(Body::empty())
        .map_err(|e| ApiError::Internal(format!("failed to build redirect: {e}")))
}

/// Serve an inline payload, honoring a single `Range` header.
async fn serve_inline(
    state: &AppState,
    track: &TrackRow,
    headers: &HeaderMap,
) -> ApiResult<Response> {
    let (payload, mime) = state
        .metadata
        .get_inline_audio(track.track_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("track {} has no audio", track.track_id)))?;

    let content_type = mime.unwrap_or_else(|| "application/octet-stream".to_string());
    let total = payload.len() as u64;

    match parse_range(headers.get(header::RANGE), total)? {
        Some((start, end)) => {
            let body = payload[start as usize..=end as usize].to_vec();
            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, body.len())
                .header(header::ACCEPT_RANGES, "bytes")
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{total}"),
                )
                .body(Body::from(body))
                .map_err(|e| ApiError::Internal(format!("failed to build response: {e}")))
        }
        None => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, total)
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::from(payload))
            .map_err(|e| ApiError::Internal(format!("failed to build response: {e}"))),
    }
}

/// Proxy a cloud object through this service, forwarding content
/// type/length and honoring ranges. The full-object path streams with
/// backpressure; nothing is buffered.
async fn proxy_cloud_object(
    state: &AppState,
    key: &str,
    headers: &HeaderMap,
) -> ApiResult<Response> {
    if headers.contains_key(header::RANGE) {
        let meta = state.facade.head(key).await?;
        if let Some((start, end)) = parse_range(headers.get(header::RANGE), meta.size)? {
            let body = state.facade.get_range(key, start, end + 1).await?;
            let content_type = meta
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string());
            return Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, body.len())
                .header(header::ACCEPT_RANGES, "bytes")
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{}", meta.size),
                )
                .body(Body::from(body))
                .map_err(|e| ApiError::Internal(format!("failed to build response: {e}")));
        }
    }

    let (stream, meta) = state.facade.get_stream(key).await?;
    let content_type = meta
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, meta.size)
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(format!("failed to build response: {e}")))
}

/// Parse a single-span `Range` header against a known total length.
///
/// Returns the inclusive byte span to serve, or `None` for absent or
/// syntactically unusable headers (served as a full 200, per RFC 9110's
/// leniency). Spans that start past the end are unsatisfiable.
fn parse_range(
    header_value: Option<&header::HeaderValue>,
    total: u64,
) -> ApiResult<Option<(u64, u64)>> {
    let Some(raw) = header_value.and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };
    let Some(spec) = raw.strip_prefix("bytes=") else {
        return Ok(None);
    };

    // Only a single span is supported; multipart ranges degrade to full.
    let spec = spec.split(',').next().unwrap_or("").trim();
    let Some((start_raw, end_raw)) = spec.split_once('-') else {
        return Ok(None);
    };

    let span = match (start_raw.is_empty(), end_raw.is_empty()) {
        // "-n": the final n bytes.
        (true, false) => {
            let suffix: u64 = match end_raw.parse() {
                Ok(n) => n,
                Err(_) => return Ok(None),
            };
            if suffix == 0 || total == 0 {
                return Err(ApiError::RangeNotSatisfiable(format!(
                    "suffix {suffix} of {total}"
                )));
            }
            (total.saturating_sub(suffix), total - 1)
        }
        // "a-" : from a to the end.
        (false, true) => {
            let start: u64 = match start_raw.parse() {
                Ok(n) => n,
                Err(_) => return Ok(None),
            };
            if start >= total {
                return Err(ApiError::RangeNotSatisfiable(format!(
                    "start {start} of {total}"
                )));
            }
            (start, total - 1)
        }
        // "a-b".
        (false, false) => {
            let (start, end): (u64, u64) = match (start_raw.parse(), end_raw.parse()) {
                (Ok(s), Ok(e)) => (s, e),
                _ => return Ok(None),
            };
            if start > end {
                return Ok(None);
            }
            if start >= total {
                return Err(ApiError::RangeNotSatisfiable(format!(
                    "start {start} of {total}"
                )));
            }
            (start, end.min(total - 1))
        }
        (true, true) => return Ok(None),
    };

    Ok(Some(span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn range(raw: &str, total: u64) -> ApiResult<Option<(u64, u64)>> {
        let value = HeaderValue::from_str(raw).unwrap();
        parse_range(Some(&value), total)
    }

    #[test]
    fn test_bounded_span() {
        assert_eq!(range("bytes=100-199", 1000).unwrap(), Some((100, 199)));
    }

    #[test]
    fn test_open_ended_span() {
        assert_eq!(range("bytes=950-", 1000).unwrap(), Some((950, 999)));
    }

    #[test]
    fn test_suffix_span() {
        assert_eq!(range("bytes=-100", 1000).unwrap(), Some((900, 999)));
        assert_eq!(range("bytes=-2000", 1000).unwrap(), Some((0, 999)));
    }

    #[test]
    fn test_end_clamped_to_length() {
        assert_eq!(range("bytes=900-5000", 1000).unwrap(), Some((900, 999)));
    }

    #[test]
    fn test_start_past_end_unsatisfiable() {
        assert!(matches!(
            range("bytes=1000-1099", 1000),
            Err(ApiError::RangeNotSatisfiable(_))
        ));
    }

    #[test]
    fn test_malformed_degrades_to_full() {
        assert_eq!(range("bytes=abc-def", 1000).unwrap(), None);
        assert_eq!(range("items=0-5", 1000).unwrap(), None);
        assert_eq!(range("bytes=-", 1000).unwrap(), None);
        assert_eq!(range("bytes=5-2", 1000).unwrap(), None);
        assert_eq!(parse_range(None, 1000).unwrap(), None);
    }
}
