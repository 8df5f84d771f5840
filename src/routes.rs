// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{content, documents, progress, session},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (content, documents, sessions, progress).
/// * Every route is user-scoped and sits behind the bearer-token middleware.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://localhost:5173".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let content_routes = Router::new()
        .route("/{id}", get(content::get_content))
        .route("/document/{document_id}", get(content::list_document_content));

    let document_routes = Router::new().route("/", get(documents::list_documents));

    let session_routes = Router::new()
        .route("/", post(session::create_session))
        .route("/{id}", get(session::get_session).delete(session::abandon_session))
        .route("/{id}/answer", post(session::answer_question))
        .route("/{id}/next", post(session::next_question))
        .route("/{id}/previous", post(session::previous_question))
        .route("/{id}/submit", post(session::submit_session));

    let progress_routes = Router::new()
        .route("/", get(progress::list_user_progress))
        .route("/submit", post(progress::submit_progress))
        .route("/dashboard", get(progress::get_dashboard));

    Router::new()
        .nest("/api/content", content_routes)
        .nest("/api/documents", document_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/progress", progress_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
