use axum::http::{header, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};
use axum::Router;
use storecraft_core::Role;
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::handlers::{
    check_reset_link, delete_user, forgot_password, get_profile, handler_404, health, list_users,
    login, register, reset_password, verify_email,
};
use super::middleware::{auth_middleware, role_guard};
use super::state::AppState;

/// 管理端点允许的角色集
const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// 根据配置的来源列表构建 CorsLayer
fn build_cors_layer(cors_origins: Vec<String>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .allow_credentials(true);

    if cors_origins.is_empty() {
        // 未配置时允许所有来源（开发环境友好，生产环境应配置 SC_CORS_ORIGINS）
        tracing::warn!(
            "SC_CORS_ORIGINS not configured, allowing all origins. \
             Set SC_CORS_ORIGINS in production for security."
        );
        base.allow_origin(AllowOrigin::any())
            .allow_credentials(false) // any() 不能与 credentials(true) 共用
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .into_iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        base.allow_origin(origins)
    }
}

/// Build the router with routes and middleware wired.
pub fn app_router(state: AppState, cors_origins: Vec<String>) -> Router {
    // 公开端点（不需要认证）
    let public_routes = Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/verify-email/:user_id/:token", get(verify_email))
        .route("/users/forgot-password", post(forgot_password))
        .route(
            "/users/reset-password/:user_id/:token",
            get(check_reset_link),
        )
        .route("/users/reset-password", post(reset_password));

    // 管理端点：路由层声明允许的角色集，守卫 fail-closed
    let admin_routes = Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", delete(delete_user))
        .route_layer(from_fn(|req, next| role_guard(ADMIN_ONLY, req, next)));

    // 认证端点（只要求有效 bearer token，不限角色）
    let profile_routes = Router::new().route("/users/profile", get(get_profile));

    let api = Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(profile_routes);

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health))
        .fallback(handler_404)
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}
