use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/subscribe", post(handlers::subscriptions::subscribe))
        .route(
            "/sendNotification",
            post(handlers::notifications::send_notification),
        )
        .route(
            "/scheduleNotification",
            post(handlers::notifications::schedule_notification),
        )
        .route("/schedules", get(handlers::notifications::list_schedules))
        .route(
            "/schedules/:id/fire",
            post(handlers::notifications::fire_schedule),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn welcome() -> &'static str {
    "Welcome to the Push Notification Service"
}
