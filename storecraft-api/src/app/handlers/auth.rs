//! 认证相关 API handlers：注册、登录、邮箱验证与密码重置

use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::net::SocketAddr;
use storecraft_core::{
    FlowReply, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
};

use super::super::error::ApiError;
use super::super::state::AppState;

/// POST /api/v1/users/register - 注册账户
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<FlowReply>), ApiError> {
    if req.email.trim().is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }
    if req.password.trim().is_empty() {
        return Err(ApiError::bad_request("password is required"));
    }
    let reply = state.accounts.register(req).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

/// POST /api/v1/users/login - 登录
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<FlowReply>, ApiError> {
    let ip = addr.ip().to_string();
    if !state.login_limiter.allow(&ip).await {
        return Err(ApiError::too_many_requests(
            "too many login attempts, try again later",
        ));
    }
    let reply = state.accounts.login(req).await?;
    Ok(Json(reply))
}

/// GET /api/v1/users/verify-email/:user_id/:token - 消费邮箱验证 token
pub async fn verify_email(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(i64, String)>,
) -> Result<Json<FlowReply>, ApiError> {
    let reply = state.accounts.verify_email(user_id, &token).await?;
    Ok(Json(reply))
}

/// POST /api/v1/users/forgot-password - 申请密码重置
pub async fn forgot_password(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<FlowReply>, ApiError> {
    let ip = addr.ip().to_string();
    if !state.reset_limiter.allow(&ip).await {
        return Err(ApiError::too_many_requests(
            "too many reset requests, try again later",
        ));
    }
    let reply = state.accounts.request_reset(&req.email).await?;
    Ok(Json(reply))
}

/// GET /api/v1/users/reset-password/:user_id/:token - 校验重置链接（纯校验）
pub async fn check_reset_link(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(i64, String)>,
) -> Result<Json<FlowReply>, ApiError> {
    let reply = state.accounts.check_reset_link(user_id, &token).await?;
    Ok(Json(reply))
}

/// POST /api/v1/users/reset-password - 完成密码重置
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<FlowReply>, ApiError> {
    let reply = state.accounts.complete_reset(req).await?;
    Ok(Json(reply))
}
