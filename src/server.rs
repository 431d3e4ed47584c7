//! Inbound HTTP surface: the Bot Framework message endpoint and a
//! health check.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::bot::Bot;
use crate::schema::Activity;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
}

/// Build the Axum router: `POST /api/messages` + `GET /`.
pub fn app_routes(bot: Arc<Bot>) -> Router {
    Router::new()
        .route("/api/messages", post(messages))
        .route("/", get(root))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { bot })
}

/// Health check — fixed body.
async fn root() -> Html<&'static str> {
    Html("Teams Task Relay Bot with Logic App Integration")
}

/// One bot-platform activity per call. The caller's authenticity is the
/// Bot Framework integration layer's concern, not this handler's.
async fn messages(
    State(state): State<AppState>,
    Json(activity): Json<Activity>,
) -> impl IntoResponse {
    info!(
        activity_type = %activity.activity_type,
        activity_id = activity.id.as_deref().unwrap_or(""),
        "inbound activity"
    );

    match state.bot.on_turn(&activity).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            // The turn-error hook: log, tell the user, fail the request.
            error!(error = %e, "unhandled turn error");
            state.bot.report_turn_error(&activity).await;
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
