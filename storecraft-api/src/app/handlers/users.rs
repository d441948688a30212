//! 用户管理与资料 handlers（角色集由路由层声明）

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::{json, Value};
use storecraft_core::AccountSummary;

use super::super::error::ApiError;
use super::super::middleware::AuthInfo;
use super::super::state::AppState;

/// GET /api/v1/users - 列出全部账户（仅管理员）
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountSummary>>, ApiError> {
    let accounts = state.accounts.list_accounts().await?;
    Ok(Json(accounts))
}

/// GET /api/v1/users/profile - 当前用户资料（身份来自 bearer token 的 claims）
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
) -> Result<Json<Value>, ApiError> {
    let summary = state.accounts.profile(auth.claims.id).await?;
    Ok(Json(json!({
        "message": "Profile fetched successfully",
        "data": summary,
    })))
}

/// DELETE /api/v1/users/:id - 删除账户（仅管理员；管理员账户受保护）
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let removed = state.accounts.delete_account(id).await?;
    Ok(Json(json!({
        "message": "User deleted successfully",
        "data": removed,
    })))
}
