use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Taxonomy
        .route("/genres", get(handlers::list_genres))
        .route("/languages", get(handlers::list_languages))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/:id/reset", post(handlers::reset))
        // Recommendation cycle
        .route("/sessions/:id/recommendations", post(handlers::recommend))
        .route("/sessions/:id/scores", post(handlers::score_all))
        .route(
            "/sessions/:id/movies/:position/score",
            post(handlers::score_movie),
        )
        .route(
            "/sessions/:id/movies/:position/details",
            get(handlers::movie_details),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::http::StatusCode;
    use axum_test::TestServer;

    fn server() -> TestServer {
        let state = AppState::from_config(&Config::default()).unwrap();
        TestServer::new(create_router(state)).unwrap()
    }

    #[tokio::test]
    async fn test_health_route_gets_request_id() {
        let response = server().get("/health").await;

        response.assert_status_ok();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        server()
            .get("/api/v1/titles")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
