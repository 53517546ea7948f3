use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::database::models::Role;
use crate::error::ApiError;
use crate::handlers::{admin, protected, public};
use crate::middleware::{authenticate, require_role, ApiResponse, ApiResult};
use crate::state::AppState;

/// Full application router with its middleware stack
pub fn app(state: AppState) -> Router {
    let config = state.config();

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
        .layer(cors_layer(&config.security.cors_origins));

    let mut router = Router::new()
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .nest("/api/admin", admin_routes(state.clone()));

    // Uploaded files are served from disk when the public URL is a local path
    let base_url = config.storage.base_url.trim_end_matches('/');
    if base_url.starts_with('/') {
        router = router.nest_service(base_url, ServeDir::new(&config.storage.base_path));
    } else {
        tracing::info!("Storage base URL '{}' is not served by this process", config.storage.base_url);
    }

    router
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(middleware)
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/register", post(public::users::register))
        .route("/api/users/login", post(public::users::login))
        .route("/api/users/user/:id", get(public::users::get))
        .route("/api/subjects", get(public::subjects::list))
        .route("/api/subjects/:id", get(public::subjects::get))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/users/current", get(protected::users::current))
        .route("/api/users/logout", post(protected::users::logout))
        .route("/api/users", put(protected::users::update))
        .route("/api/courses", get(protected::courses::list))
        .route("/api/courses/:id", get(protected::courses::get))
        .route_layer(from_fn_with_state(state, authenticate))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::users::list))
        .route("/users/:id", put(admin::users::update).delete(admin::users::delete))
        .route("/subjects", post(admin::subjects::create))
        .route("/subjects/:id", put(admin::subjects::update).delete(admin::subjects::delete))
        .route("/courses", get(admin::courses::list).post(admin::courses::create))
        .route("/courses/upload", post(admin::courses::upload))
        .route(
            "/courses/:id",
            get(admin::courses::get)
                .put(admin::courses::update)
                .delete(admin::courses::delete),
        )
        .route("/user-courses", get(admin::user_courses::list).post(admin::user_courses::create))
        .route("/user-courses/:id", axum::routing::delete(admin::user_courses::delete))
        // Layers run outermost-last: authenticate answers 401 before the role gate answers 403
        .route_layer(from_fn_with_state(Role::Admin, require_role))
        .route_layer(from_fn_with_state(state, authenticate))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        tracing::warn!("CORS: all origins allowed");
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// GET /health - reports whether the store answers
async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    match state.store().ping().await {
        Ok(()) => Ok(ApiResponse::success(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err(ApiError::service_unavailable("Database unavailable"))
        }
    }
}
