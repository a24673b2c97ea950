use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use thoughts_types::api::{Endpoint, ServiceInfo};

use crate::auth;
use crate::state::AppState;
use crate::thoughts;

/// Everything `router` mounts, as advertised by `GET /`.
pub const ENDPOINTS: &[Endpoint] = &[
    Endpoint { path: "/", methods: &["GET"] },
    Endpoint { path: "/thoughts", methods: &["GET", "POST"] },
    Endpoint { path: "/thoughts/{id}", methods: &["GET", "PATCH", "DELETE"] },
    Endpoint { path: "/thoughts/{id}/like", methods: &["POST"] },
    Endpoint { path: "/register", methods: &["POST"] },
    Endpoint { path: "/login", methods: &["POST"] },
];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route(
            "/thoughts",
            get(thoughts::list_thoughts).post(thoughts::create_thought),
        )
        .route(
            "/thoughts/{id}",
            get(thoughts::get_thought)
                .patch(thoughts::update_thought)
                .delete(thoughts::delete_thought),
        )
        .route("/thoughts/{id}/like", post(thoughts::like_thought))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "thoughts",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS,
    })
}
