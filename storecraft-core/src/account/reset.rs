//! 密码重置流程：申请、链接校验与完成重置

use super::models::{AccountPatch, FlowReply, ResetPasswordRequest};
use super::password::{hash_password, validate_password_strength};
use super::secret::{generate_token, token_matches};
use super::service::AccountService;
use crate::error::{Result, ServiceError};
use tracing::{info, instrument, warn};

impl AccountService {
    /// 申请密码重置。已有未消费的重置 token 时拒绝，绝不覆盖。
    #[instrument(skip(self, email))]
    pub async fn request_reset(&self, email: &str) -> Result<FlowReply> {
        let email = email.trim();
        let account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("account with this email".into()))?;
        if account.reset_password_token.is_some() {
            return Err(ServiceError::ResetAlreadyPending);
        }

        let token = generate_token();
        let set_once = AccountPatch {
            reset_password_token: Some(Some(token.clone())),
            expect_reset_token: Some(None),
            ..Default::default()
        };
        if self.store.update(account.id, set_once).await? == 0 {
            // 并发申请抢先写入了 token
            return Err(ServiceError::ResetAlreadyPending);
        }

        let link = self.reset_link(account.id, &token);
        if let Err(e) = self.mailer.send_password_reset(&account.email, &link).await {
            warn!(account_id = account.id, error = %e, "failed to send reset mail");
        }
        info!(account_id = account.id, "password reset requested");
        Ok(FlowReply::message("Reset link sent successfully"))
    }

    /// 校验重置链接；纯校验，不做任何修改
    pub async fn check_reset_link(&self, user_id: i64, token: &str) -> Result<FlowReply> {
        let account = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("account {}", user_id)))?;
        match account.reset_password_token.as_deref() {
            Some(current) if token_matches(current, token) => {
                Ok(FlowReply::message("Valid link"))
            }
            _ => Err(ServiceError::InvalidOrExpiredToken),
        }
    }

    /// 完成密码重置：换哈希并清除 token。
    /// 换哈希与清除是同一个条件更新，消费过的 token 不可复用。
    #[instrument(skip(self, req))]
    pub async fn complete_reset(&self, req: ResetPasswordRequest) -> Result<FlowReply> {
        validate_password_strength(&req.new_password)?;

        let account = self
            .store
            .find_by_id(req.user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("account {}", req.user_id)))?;
        let current = account
            .reset_password_token
            .as_deref()
            .ok_or(ServiceError::InvalidOrExpiredToken)?;
        if !token_matches(current, &req.reset_token) {
            return Err(ServiceError::InvalidOrExpiredToken);
        }

        let password_hash = hash_password(&req.new_password).await?;
        let consume = AccountPatch {
            password_hash: Some(password_hash),
            reset_password_token: Some(None),
            expect_reset_token: Some(Some(req.reset_token.clone())),
            ..Default::default()
        };
        if self.store.update(req.user_id, consume).await? == 0 {
            return Err(ServiceError::InvalidOrExpiredToken);
        }

        info!(account_id = req.user_id, "password reset completed");
        Ok(FlowReply::message("Password reset successfully, please login"))
    }
}

#[cfg(test)]
mod tests {
    use super::super::models::{LoginRequest, Role};
    use super::super::password::hash_password;
    use super::super::service::testutil::*;
    use super::super::store::CredentialStore;
    use super::*;

    async fn seed_verified(h: &Harness, email: &str) -> i64 {
        let hash = hash_password("Str0ng!Pass").await.unwrap();
        seed(&h.store, email, &hash, Role::User, true).await
    }

    #[tokio::test]
    async fn request_reset_sets_token_and_mails_link() {
        let h = harness();
        let id = seed_verified(&h, "alice@example.com").await;

        h.service.request_reset("alice@example.com").await.unwrap();
        let token = h
            .store
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .reset_password_token
            .expect("reset token outstanding");

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, "reset");
        assert!(sent[0].link.contains(&format!("/{}/{}", id, token)));
    }

    #[tokio::test]
    async fn request_reset_unknown_email_is_not_found() {
        let h = harness();
        let err = h.service.request_reset("nobody@example.com").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn pending_reset_is_never_overwritten() {
        let h = harness();
        let id = seed_verified(&h, "alice@example.com").await;

        h.service.request_reset("alice@example.com").await.unwrap();
        let first = h
            .store
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .reset_password_token
            .unwrap();

        let err = h.service.request_reset("alice@example.com").await.unwrap_err();
        assert!(matches!(err, ServiceError::ResetAlreadyPending));

        let still = h
            .store
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .reset_password_token
            .unwrap();
        assert_eq!(still, first);
    }

    #[tokio::test]
    async fn check_reset_link_validates_without_mutation() {
        let h = harness();
        let id = seed_verified(&h, "alice@example.com").await;
        h.service.request_reset("alice@example.com").await.unwrap();
        let token = h
            .store
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .reset_password_token
            .unwrap();

        h.service.check_reset_link(id, &token).await.unwrap();
        // 纯校验：token 仍未被消费
        let reread = h
            .store
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .reset_password_token;
        assert_eq!(reread.as_deref(), Some(token.as_str()));

        let err = h.service.check_reset_link(id, "bogus").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOrExpiredToken));
        let err = h.service.check_reset_link(999, &token).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn check_reset_link_with_no_token_outstanding_fails() {
        let h = harness();
        let id = seed_verified(&h, "alice@example.com").await;
        let err = h.service.check_reset_link(id, "whatever").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn complete_reset_changes_password_and_consumes_token() {
        let h = harness();
        let id = seed_verified(&h, "alice@example.com").await;
        h.service.request_reset("alice@example.com").await.unwrap();
        let token = h
            .store
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .reset_password_token
            .unwrap();

        h.service
            .complete_reset(ResetPasswordRequest {
                user_id: id,
                new_password: "N3w!Password".into(),
                reset_token: token.clone(),
            })
            .await
            .unwrap();

        // 旧密码失效，新密码可登录
        let err = h
            .service
            .login(LoginRequest {
                email: "alice@example.com".into(),
                password: "Str0ng!Pass".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));
        let reply = h
            .service
            .login(LoginRequest {
                email: "alice@example.com".into(),
                password: "N3w!Password".into(),
            })
            .await
            .unwrap();
        assert!(reply.data.is_some());

        // 消费过的 token 不可复用
        let err = h
            .service
            .complete_reset(ResetPasswordRequest {
                user_id: id,
                new_password: "An0ther!Pass".into(),
                reset_token: token,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn complete_reset_rejects_weak_password_before_consuming() {
        let h = harness();
        let id = seed_verified(&h, "alice@example.com").await;
        h.service.request_reset("alice@example.com").await.unwrap();
        let token = h
            .store
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .reset_password_token
            .unwrap();

        let err = h
            .service
            .complete_reset(ResetPasswordRequest {
                user_id: id,
                new_password: "weak".into(),
                reset_token: token.clone(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        // token 未被消费，重试仍然有效
        h.service
            .complete_reset(ResetPasswordRequest {
                user_id: id,
                new_password: "N3w!Password".into(),
                reset_token: token,
            })
            .await
            .unwrap();
    }
}
