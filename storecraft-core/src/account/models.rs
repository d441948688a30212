//! 账户数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// 账户角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 管理员
    Admin,
    /// 普通用户
    User,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// 用户账户（存储模型，包含密码哈希）
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// 账户唯一 ID（由存储层分配，创建后不变）
    pub id: i64,
    /// 邮箱（唯一，用于登录）
    pub email: String,
    /// 显示名称（不要求唯一）
    pub username: String,
    /// bcrypt 哈希后的密码
    pub password_hash: String,
    /// 邮箱是否已验证
    #[serde(default)]
    pub is_verified: bool,
    /// 未消费的邮箱验证 token；已验证的账户该字段恒为空
    #[serde(default)]
    pub verification_token: Option<String>,
    /// 未消费的密码重置 token
    #[serde(default)]
    pub reset_password_token: Option<String>,
    /// 账户角色
    #[serde(default)]
    pub role: Role,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 创建账户的输入（密码已在上游哈希）
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub verification_token: Option<String>,
}

/// 账户部分更新。`None` 表示不修改该字段；
/// 两个 token 列是可空列，用 `Option<Option<String>>` 表达"写入 null"。
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub is_verified: Option<bool>,
    pub verification_token: Option<Option<String>>,
    pub reset_password_token: Option<Option<String>>,
    /// 前置条件：仅当存储中的 verification_token 与该值一致时才应用整个 patch
    pub expect_verification_token: Option<Option<String>>,
    /// 前置条件：仅当存储中的 reset_password_token 与该值一致时才应用整个 patch
    pub expect_reset_token: Option<Option<String>>,
}

/// 账户对外视图（不含密码哈希与 token 字段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub is_verified: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            username: account.username,
            is_verified: account.is_verified,
            role: account.role,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// JWT Claims：账户 ID 与角色，外加签发方管理的有效期
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// 账户 ID
    pub id: i64,
    /// 账户角色
    pub role: Role,
    /// 过期时间戳 (Unix timestamp)
    pub exp: i64,
    /// 签发时间戳 (Unix timestamp)
    pub iat: i64,
}

/// 注册请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub username: String,
    pub password: String,
}

/// 登录请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// 申请密码重置请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// 完成密码重置请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub user_id: i64,
    pub new_password: String,
    pub reset_token: String,
}

/// 流程统一响应：message 加可选的 data（登录成功时为 bearer token）
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowReply {
    pub message: String,
    #[serde(default)]
    pub data: Option<String>,
}

impl FlowReply {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(message: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Some(data.into()),
        }
    }
}
