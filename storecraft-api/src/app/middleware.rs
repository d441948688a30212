use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use storecraft_core::{Role, TokenClaims};

use super::error::ApiError;
use super::state::AppState;

/// 认证信息扩展（由 auth_middleware 写入 request extensions）
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub claims: TokenClaims,
}

/// 不需要认证的 API 路径
const PUBLIC_PATHS: &[&str] = &[
    "/api/v1/users/register",
    "/api/v1/users/login",
    "/api/v1/users/forgot-password",
    "/api/v1/users/reset-password",
];

/// 不需要认证的 API 路径前缀（路径里带 token 的链接端点）
const PUBLIC_PREFIXES: &[&str] = &[
    "/api/v1/users/verify-email/",
    "/api/v1/users/reset-password/",
];

/// API 前缀之外的路径（health、404 fallback）不做认证；
/// API 前缀之内只放行显式声明的公开端点
fn is_public(path: &str) -> bool {
    !path.starts_with("/api/v1/")
        || PUBLIC_PATHS.iter().any(|p| path == *p)
        || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// 从 Authorization header 提取 bearer token；缺失或格式错误返回 None
fn extract_bearer(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
}

/// 客户端 IP：反向代理的 X-Forwarded-For 最左侧，否则直连 socket 地址
fn extract_client_ip(request: &Request<Body>) -> String {
    let forwarded = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 认证中间件：校验 bearer token 并把 {id, role} 挂到请求上。
/// 缺失、畸形、过期、伪造一律 401；失败计入按 IP 的认证限流。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();
    if is_public(&path) {
        return Ok(next.run(request).await);
    }

    let client_ip = extract_client_ip(&request);
    let token = match extract_bearer(&request) {
        Some(t) => t,
        None => {
            if !state.auth_limiter.allow(&client_ip).await {
                tracing::warn!(ip = %client_ip, %path, "auth rate limit hit (no token)");
                return Err(ApiError::too_many_requests(
                    "too many requests, try again later",
                ));
            }
            return Err(ApiError::unauthorized_with_message(
                "access denied, no token provided",
            ));
        }
    };

    let claims = match state.accounts.issuer().verify(&token) {
        Ok(claims) => claims,
        Err(_) => {
            if !state.auth_limiter.allow(&client_ip).await {
                tracing::warn!(ip = %client_ip, %path, "auth rate limit hit (invalid token)");
                return Err(ApiError::too_many_requests(
                    "too many requests, try again later",
                ));
            }
            return Err(ApiError::unauthorized());
        }
    };

    request.extensions_mut().insert(AuthInfo { claims });
    Ok(next.run(request).await)
}

/// 路由级角色守卫：路由声明的允许角色集为空时一律拒绝（fail-closed）。
/// 必须排在 auth_middleware 之后，身份缺失视为未认证。
pub async fn role_guard(
    allowed: &'static [Role],
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = request
        .extensions()
        .get::<AuthInfo>()
        .ok_or_else(ApiError::unauthorized)?;

    if !allowed.contains(&auth.claims.role) {
        return Err(ApiError::forbidden("insufficient role for this route"));
    }
    Ok(next.run(request).await)
}
