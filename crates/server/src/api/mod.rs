//! HTTP surface: REST control endpoints and the websocket upgrade
//!
//! Everything is nested under `/control/api/v1`. The REST side covers the
//! request-reply interactions (capability probe, auto exposure, one-shot
//! white balance); everything stateful and streaming goes over the
//! websocket at `/event/websocket`.

mod ws;

use crate::context::BridgeContext;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use protocol::{AutoExposureMode, AutoExposureState};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::error;

pub fn router(ctx: Arc<BridgeContext>, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/system", get(get_system))
        .route(
            "/video/autoExposure",
            get(get_auto_exposure).put(put_auto_exposure),
        )
        .route("/video/whiteBalance/doAuto", put(trigger_white_balance))
        .route("/event/websocket", get(ws::event_websocket));

    let mut app = Router::new().nest("/control/api/v1", api);
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    // Control UIs are typically served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.layer(cors).with_state(ctx)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemResponse {
    codec_format: CodecFormat,
    video_format: VideoFormat,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CodecFormat {
    codec: &'static str,
    container: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoFormat {
    name: &'static str,
    frame_rate: &'static str,
    width: u32,
    height: u32,
    interlaced: bool,
}

impl SystemResponse {
    /// The fixed output format of the sensor pipeline
    fn current() -> Self {
        Self {
            codec_format: CodecFormat {
                codec: "H.264",
                container: "MPEG2-TS",
            },
            video_format: VideoFormat {
                name: "1080p30",
                frame_rate: "30.00",
                width: 1920,
                height: 1080,
                interlaced: false,
            },
        }
    }
}

async fn get_system() -> Json<SystemResponse> {
    Json(SystemResponse::current())
}

async fn get_auto_exposure(State(ctx): State<Arc<BridgeContext>>) -> Json<AutoExposureState> {
    Json(ctx.store.auto_exposure().await)
}

#[derive(Debug, Deserialize)]
struct AutoExposureRequest {
    mode: AutoExposureMode,
}

async fn put_auto_exposure(
    State(ctx): State<Arc<BridgeContext>>,
    Json(request): Json<AutoExposureRequest>,
) -> Result<Json<AutoExposureState>, StatusCode> {
    match ctx.set_auto_exposure(request.mode).await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(e) => {
            error!("Failed to apply auto exposure mode: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn trigger_white_balance(State(ctx): State<Arc<BridgeContext>>) -> StatusCode {
    match ctx.trigger_auto_white_balance().await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            error!("Failed to trigger auto white balance: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_response_shape() {
        let json = serde_json::to_value(SystemResponse::current()).unwrap();
        assert_eq!(json["codecFormat"]["codec"], "H.264");
        assert_eq!(json["codecFormat"]["container"], "MPEG2-TS");
        assert_eq!(json["videoFormat"]["name"], "1080p30");
        assert_eq!(json["videoFormat"]["frameRate"], "30.00");
        assert_eq!(json["videoFormat"]["width"], 1920);
        assert_eq!(json["videoFormat"]["height"], 1080);
        assert_eq!(json["videoFormat"]["interlaced"], false);
    }

    #[test]
    fn test_auto_exposure_request_parses() {
        let request: AutoExposureRequest =
            serde_json::from_str(r#"{"mode":"Continuous"}"#).unwrap();
        assert_eq!(request.mode, AutoExposureMode::Continuous);
    }
}
