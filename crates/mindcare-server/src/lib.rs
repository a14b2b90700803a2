pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{delete, get, post, put};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router for an initialized root. Opens the store, so only
/// one router per root may exist at a time.
pub fn build_router(root: PathBuf) -> anyhow::Result<Router> {
    let app_state = AppState::open(root)?;
    Ok(router(app_state))
}

/// Assemble routes and middleware around an existing state. Integration
/// tests use this to seed the store the router serves.
pub fn router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Appointments
        .route(
            "/api/appointments",
            post(routes::appointments::create_appointment),
        )
        .route("/api/appointments/mine", get(routes::appointments::list_mine))
        .route(
            "/api/appointments/counsellor",
            get(routes::appointments::list_for_counsellor),
        )
        .route(
            "/api/appointments/{id}",
            get(routes::appointments::get_appointment),
        )
        .route(
            "/api/appointments/{id}/status",
            post(routes::appointments::update_status),
        )
        .route(
            "/api/appointments/{id}/cancel",
            post(routes::appointments::cancel),
        )
        .route(
            "/api/appointments/{id}/pre-session-form",
            post(routes::appointments::submit_pre_session_form)
                .delete(routes::appointments::clear_pre_session_form),
        )
        // Sessions
        .route(
            "/api/appointments/{id}/session-result",
            post(routes::sessions::add_session_result),
        )
        .route(
            "/api/appointments/{id}/follow-up",
            post(routes::sessions::propose_follow_up),
        )
        .route(
            "/api/appointments/{id}/follow-up/accept",
            post(routes::sessions::accept_follow_up),
        )
        .route(
            "/api/appointments/{id}/follow-up/reject",
            post(routes::sessions::reject_follow_up),
        )
        // Chat
        .route(
            "/api/appointments/{id}/chat",
            get(routes::chat::list_messages).post(routes::chat::send_message),
        )
        .route(
            "/api/appointments/{id}/chat/end",
            post(routes::chat::end_chat),
        )
        .route(
            "/api/appointments/{id}/post-chat-form",
            post(routes::chat::submit_post_chat_form),
        )
        // Counsellors
        .route(
            "/api/counsellors",
            get(routes::counsellors::list_counsellors).post(routes::counsellors::create_counsellor),
        )
        .route(
            "/api/counsellors/{id}",
            get(routes::counsellors::get_counsellor),
        )
        .route(
            "/api/counsellors/{id}/availability",
            put(routes::counsellors::update_availability),
        )
        .route(
            "/api/counsellors/{id}/booked",
            get(routes::counsellors::booked_slots),
        )
        .route(
            "/api/counsellors/{id}/open",
            get(routes::counsellors::open_slots),
        )
        // Users
        .route(
            "/api/users",
            get(routes::users::list_users).post(routes::users::register_user),
        )
        .route("/api/users/me", get(routes::users::me))
        .route("/api/users/bootstrap", post(routes::users::bootstrap))
        .route("/api/users/has-admin", get(routes::users::has_admin))
        .route("/api/users/{id}", delete(routes::users::remove_user))
        .route("/api/users/{id}/role", post(routes::users::set_role))
        // Institutions
        .route(
            "/api/institutions",
            get(routes::institutions::list_institutions)
                .post(routes::institutions::create_institution),
        )
        .route(
            "/api/institutions/by-domain/{domain}",
            get(routes::institutions::by_domain),
        )
        .route(
            "/api/institutions/{id}/analytics",
            get(routes::institutions::analytics),
        )
        // Screenings
        .route("/api/screenings", post(routes::screenings::submit))
        .route("/api/screenings/mine", get(routes::screenings::list_mine))
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_token,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server on `0.0.0.0:{port}`.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener).await
}

/// Start the API server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(root: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(root)?;

    tracing::info!("MindCare API listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
