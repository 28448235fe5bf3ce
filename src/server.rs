use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::config::AppConfig;
use crate::session::Session;
use crate::ui::events::{Dispatch, UiEvent, dispatch};
use crate::ui::pages::{render_chat_body, render_page, render_send_button, render_widget};
use crate::ui::transcript::{MessageLog, TurnRole};

/// Cookie naming the browser client whose preferences a page loads.
pub const CLIENT_COOKIE: &str = "barista_client";

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!(
        name: "proxy.config.loaded",
        endpoint = %config.proxy.endpoint,
        model = %config.proxy.model,
        api_key_set = !config.proxy.api_key.is_empty(),
        overlap_policy = ?config.widget.overlap_policy,
        "Proxy configuration loaded"
    );

    let state = AppState::from_config(Arc::clone(&config))?;
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the router for `state`.
pub fn build_router(state: AppState) -> Router {
    let timeout_duration = Duration::from_secs(state.config.server.request_timeout_secs);
    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        .route("/", get(index_handler))
        .route("/api/sessions/{id}/events", post(api_post_event))
        .route("/api/sessions/{id}/turns/{turn_id}", get(api_await_turn))
        .route("/api/sessions/{id}/idle", get(api_await_idle))
        .route("/api/sessions/{id}/messages", get(api_get_messages))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(
                    move |req: Request, next: Next| async move {
                        match tokio::time::timeout(timeout_duration, next.run(req)).await {
                            Ok(res) => res,
                            Err(_) => {
                                (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
                            }
                        }
                    },
                )),
        )
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Open a new widget session and render the page.
///
/// The client cookie is issued on first visit and refreshed on every load.
async fn index_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Html<String>) {
    let client_id = jar
        .get(CLIENT_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
        .unwrap_or_else(Uuid::new_v4)
        .to_string();

    let session = state.open_session(&client_id);
    let cookie = Cookie::build((CLIENT_COOKIE, client_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .permanent();

    (
        jar.add(cookie),
        Html(render_page(&session, state.controller.send_blocked(&session))),
    )
}

/// Response for an unknown or expired session.
fn session_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(r#"<div class="session-expired">Session expired. <a href="/">Reload</a> to start a new chat.</div>"#),
    )
        .into_response()
}

fn lookup(state: &AppState, id: &str) -> Result<Session, Response> {
    state.sessions.get(id).ok_or_else(session_not_found)
}

/// POST /api/sessions/:id/events - Apply one UI event and re-render the widget.
async fn api_post_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(event): Json<UiEvent>,
) -> Result<Html<String>, Response> {
    let session = lookup(&state, &id)?;
    tracing::debug!(name: "widget.event", session_id = %id, event = ?event, "UI event received");

    match dispatch(&state.controller, &session, event) {
        Dispatch::TurnStarted(pending) => {
            let controller = Arc::clone(&state.controller);
            tokio::spawn(async move {
                controller.finish_turn(pending).await;
            });
        }
        Dispatch::Busy | Dispatch::Updated | Dispatch::Ignored => {}
    }

    Ok(Html(render_widget(&session, state.controller.send_blocked(&session))))
}

/// GET /api/sessions/:id/turns/:turn_id - Wait for a placeholder to settle.
///
/// Returns the whole log plus an out-of-band send button.
async fn api_await_turn(
    State(state): State<AppState>,
    Path((id, turn_id)): Path<(String, Uuid)>,
) -> Result<Html<String>, Response> {
    let session = lookup(&state, &id)?;
    session.wait_until_gone(turn_id).await;
    Ok(Html(render_settled(&state, &session)))
}

/// GET /api/sessions/:id/idle - Wait until no reply is outstanding.
///
/// Polled when the log was cleared while a reply was still pending.
async fn api_await_idle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, Response> {
    let session = lookup(&state, &id)?;
    session.wait_until_idle().await;
    Ok(Html(render_settled(&state, &session)))
}

/// Chat body plus an out-of-band send button.
fn render_settled(state: &AppState, session: &Session) -> String {
    let body = session.with_conversation(|c| render_chat_body(session.id(), c));
    let send = render_send_button(session.id(), state.controller.send_blocked(session), true);
    format!("{body}{send}")
}

/// Message DTO for API responses.
#[derive(Debug, Serialize)]
struct MessageDto {
    id: Uuid,
    role: TurnRole,
    content: String,
    loading: bool,
}

/// GET /api/sessions/:id/messages - Get the chat log as JSON.
async fn api_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageDto>>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let messages: Vec<MessageDto> = session.with_conversation(|c| {
        c.transcript()
            .turns()
            .iter()
            .map(|t| MessageDto {
                id: t.id,
                role: t.role,
                content: t.content.clone(),
                loading: t.loading,
            })
            .collect()
    });
    Ok(Json(messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, CompletionClient};
    use crate::session::ConversationState;
    use crate::ui::preferences::MemoryPreferenceStore;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tower::ServiceExt;

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait::async_trait]
    impl CompletionClient for Unreachable {
        async fn request_completion(
            &self,
            _text: &str,
            _state: &ConversationState,
        ) -> Result<Completion, crate::error::ProxyError> {
            Err(crate::error::ProxyError::Network { status: 503 })
        }
    }

    fn app() -> (AppState, Router) {
        let state = AppState::with_parts(
            Arc::new(AppConfig::default()),
            Arc::new(Unreachable),
            Arc::new(MemoryPreferenceStore::new()),
        );
        (state.clone(), build_router(state))
    }

    #[tokio::test]
    async fn index_opens_a_session() {
        let (state, app) = app();
        let res = app
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(state.sessions.len(), 1);
        let cookie = res
            .headers()
            .get(axum::http::header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with("barista_client="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn known_client_cookie_is_kept() {
        let (_, app) = app();
        let id = Uuid::new_v4();
        let res = app
            .oneshot(
                HttpRequest::get("/")
                    .header(axum::http::header::COOKIE, format!("barista_client={id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let cookie = res
            .headers()
            .get(axum::http::header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with(&format!("barista_client={id}")));
    }

    #[tokio::test]
    async fn idle_returns_at_once_without_pending_reply() {
        let (state, app) = app();
        let session = state.open_session("c");
        let res = app
            .oneshot(
                HttpRequest::get(format!("/api/sessions/{}/idle", session.id()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_session_messages_is_404() {
        let (_, app) = app();
        let res = app
            .oneshot(
                HttpRequest::get("/api/sessions/nope/messages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
