use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::WidgetSettings;
use crate::profile::{LoadOutcome, ProfileLoader, ProfileSource, ProfileStore};
use crate::render::{HtmlRenderer, RenderBackend, ViewOptions, WidgetView, derive_view};
use crate::role::RoleKey;

#[derive(Clone)]
struct AppState {
    loader: ProfileLoader,
    /// Set only for a file source; a URL source is never proxied.
    document_loader: Option<ProfileLoader>,
    view_options: ViewOptions,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WidgetQuery {
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

pub fn build_router(settings: &WidgetSettings) -> Router {
    let loader = ProfileLoader::new(settings.profile_source.clone());
    let document_loader = match &settings.profile_source {
        ProfileSource::File(_) => Some(loader.clone()),
        ProfileSource::Http(_) => None,
    };
    let state = AppState {
        loader,
        document_loader,
        view_options: settings.view_options(),
    };

    Router::new()
        .route("/health", get(handle_health))
        .route("/profiles.json", get(handle_profiles))
        .route("/widget/summary", get(handle_summary))
        .route("/widget/popup", get(handle_popup))
        .with_state(state)
}

pub async fn run_http_server(settings: &WidgetSettings, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind HTTP server to `{bind}`"))?;
    serve_with_listener(listener, settings).await
}

pub async fn serve_with_listener(
    listener: tokio::net::TcpListener,
    settings: &WidgetSettings,
) -> Result<()> {
    let local_addr = listener.local_addr().ok();
    info!(
        profile_source = %settings.profile_source,
        bound_addr = local_addr.map(|addr| addr.to_string()),
        "starting HTTP server"
    );

    axum::serve(listener, build_router(settings))
        .await
        .context("HTTP server exited with an error")
}

async fn handle_health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn handle_profiles(State(state): State<AppState>) -> Response {
    let Some(loader) = &state.document_loader else {
        let body = ErrorBody {
            error: "profile document is not served for a remote data source".to_owned(),
        };
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };

    match loader.load().await {
        LoadOutcome::Loaded(store) => (StatusCode::OK, Json(store)).into_response(),
        LoadOutcome::Failed(error) => {
            warn!(error = %error, "profile document request failed");
            let body = ErrorBody {
                error: error.to_string(),
            };
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
    }
}

async fn handle_summary(
    State(state): State<AppState>,
    Query(query): Query<WidgetQuery>,
) -> Html<String> {
    let view = widget_view(&state, query).await;
    Html(HtmlRenderer.render_summary(&view.summary))
}

async fn handle_popup(
    State(state): State<AppState>,
    Query(query): Query<WidgetQuery>,
) -> Html<String> {
    let view = widget_view(&state, query).await;
    Html(HtmlRenderer.render_popup(&view.popup))
}

/// Fragments degrade like the in-page widget: an unavailable document
/// renders against an empty store.
async fn widget_view(state: &AppState, query: WidgetQuery) -> WidgetView {
    let store = match state.loader.load().await {
        LoadOutcome::Loaded(store) => store,
        LoadOutcome::Failed(_) => ProfileStore::new(),
    };
    let role = query.role.map(RoleKey::from).unwrap_or_default();
    derive_view(&role, &store, &state.view_options)
}
