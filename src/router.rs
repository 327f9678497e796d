use axum::{Router, http::StatusCode, routing::get};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{AppState, middleware::log_errors, routes};

// 用户目录路由
pub fn user_routes() -> Router<AppState> {
    Router::new().route(
        "/users",
        get(routes::user::list_users).post(routes::user::add_user),
    )
}

// 健康检查路由
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(routes::health::root))
        .route("/db-check", get(routes::health::db_check))
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(health_routes())
        .merge(user_routes())
        .layer(axum::middleware::from_fn(log_errors))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout(),
        ));

    // 开发模式下允许所有来源
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
