// src/routes.rs
use std::time::Duration;

use axum::{routing::get, Router};
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let cors = cors_layer(&state);

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/polls",
            get(handlers::list_polls).post(handlers::create_poll),
        )
        .route(
            "/polls/{id}",
            get(handlers::get_poll)
                .put(handlers::update_poll)
                .delete(handlers::delete_poll),
        )
        .route(
            "/polls/{id}/vote",
            get(handlers::get_vote)
                .post(handlers::submit_vote)
                .delete(handlers::remove_vote),
        )
        .route("/polls/{id}/share", get(handlers::share_poll));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    match &state.config.cors_origin {
        // Cookies only travel to an explicitly allowed origin.
        Some(origin) => layer
            .allow_origin(AllowOrigin::exact(origin.clone()))
            .allow_credentials(true),
        None => layer.allow_origin(AllowOrigin::any()),
    }
}
