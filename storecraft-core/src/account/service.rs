//! 账户服务：核心结构与管理操作

use super::models::{AccountSummary, Role};
use super::store::CredentialStore;
use super::token::TokenIssuer;
use crate::error::{Result, ServiceError};
use crate::mailer::Mailer;
use std::sync::Arc;
use tracing::{info, instrument};

/// bearer token 默认有效期（秒）
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 3600;

/// 账户服务：注册、登录、邮箱验证、密码重置与管理操作。
/// 协作方全部经构造器注入；任何满足接口的存储或邮件实现都可替换。
pub struct AccountService {
    pub(super) store: Arc<dyn CredentialStore>,
    pub(super) mailer: Arc<dyn Mailer>,
    pub(super) issuer: TokenIssuer,
    /// 对外链接的基础地址（验证/重置链接均以此为前缀）
    pub(super) public_url: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        mailer: Arc<dyn Mailer>,
        issuer: TokenIssuer,
        public_url: impl Into<String>,
    ) -> Self {
        let public_url = public_url.into().trim_end_matches('/').to_string();
        Self {
            store,
            mailer,
            issuer,
            public_url,
        }
    }

    /// Bearer token 签发/验证器（认证中间件使用）
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub(super) fn verification_link(&self, id: i64, token: &str) -> String {
        format!("{}/api/v1/users/verify-email/{}/{}", self.public_url, id, token)
    }

    pub(super) fn reset_link(&self, id: i64, token: &str) -> String {
        format!("{}/reset-password/{}/{}", self.public_url, id, token)
    }
}

// ============================================================================
// 管理与资料操作
// ============================================================================

impl AccountService {
    /// 列出全部账户（管理端；返回对外视图，不含哈希与 token）
    #[instrument(skip(self))]
    pub async fn list_accounts(&self) -> Result<Vec<AccountSummary>> {
        let accounts = self.store.list().await?;
        Ok(accounts.into_iter().map(Into::into).collect())
    }

    /// 查询账户资料
    pub async fn profile(&self, id: i64) -> Result<AccountSummary> {
        let account = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("account {}", id)))?;
        Ok(account.into())
    }

    /// 删除账户。管理员账户受保护：自己或其他管理员都不可删除。
    #[instrument(skip(self))]
    pub async fn delete_account(&self, id: i64) -> Result<AccountSummary> {
        let account = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("account {}", id)))?;
        if account.role == Role::Admin {
            return Err(ServiceError::AdminProtected);
        }
        let removed = self
            .store
            .remove(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("account {}", id)))?;
        info!(account_id = id, "deleted account");
        Ok(removed.into())
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use crate::account::store::CredentialStore;

    #[tokio::test]
    async fn delete_refuses_admin_accounts() {
        let h = harness();
        let admin_id = seed(&h.store, "root@example.com", "hash", Role::Admin, true).await;
        let user_id = seed(&h.store, "user@example.com", "hash", Role::User, true).await;

        let err = h.service.delete_account(admin_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AdminProtected));
        assert!(h.store.find_by_id(admin_id).await.unwrap().is_some());

        let removed = h.service.delete_account(user_id).await.unwrap();
        assert_eq!(removed.id, user_id);
        assert!(h.store.find_by_id(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_account_is_not_found() {
        let h = harness();
        let err = h.service.delete_account(42).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_returns_summaries_in_id_order() {
        let h = harness();
        seed(&h.store, "a@example.com", "hash", Role::User, true).await;
        seed(&h.store, "b@example.com", "hash", Role::Admin, true).await;

        let listed = h.service.list_accounts().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].id < listed[1].id);
        // 对外视图序列化后绝不携带密码哈希或 token 字段
        let json = serde_json::to_value(&listed).unwrap();
        assert!(json[0].get("password_hash").is_none());
        assert!(json[0].get("verification_token").is_none());
        assert!(json[0].get("reset_password_token").is_none());
    }

    #[tokio::test]
    async fn profile_of_deleted_account_is_not_found() {
        let h = harness();
        let id = seed(&h.store, "a@example.com", "hash", Role::User, true).await;
        assert_eq!(h.service.profile(id).await.unwrap().email, "a@example.com");

        h.store.remove(id).await.unwrap();
        let err = h.service.profile(id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
