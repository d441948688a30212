//! 注册与邮箱验证流程

use super::models::{AccountPatch, FlowReply, NewAccount, RegisterRequest, Role};
use super::password::{hash_password, validate_password_strength};
use super::secret::{generate_token, token_matches};
use super::service::AccountService;
use crate::error::{Result, ServiceError};
use tracing::{info, instrument, warn};

impl AccountService {
    /// 注册新账户并发送验证邮件。
    /// 返回值不携带任何 bearer token：必须先完成邮箱验证才能登录换取 token。
    #[instrument(skip(self, req))]
    pub async fn register(&self, req: RegisterRequest) -> Result<FlowReply> {
        let email = req.email.trim().to_string();
        if email.is_empty() {
            return Err(ServiceError::Validation("email is required".into()));
        }
        validate_password_strength(&req.password)?;

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::DuplicateEmail(email));
        }

        let password_hash = hash_password(&req.password).await?;
        let verification_token = generate_token();

        let account = self
            .store
            .create(NewAccount {
                email,
                username: req.username.trim().to_string(),
                password_hash,
                role: Role::User,
                verification_token: Some(verification_token.clone()),
            })
            .await?;

        // 邮件投递是尽力而为：失败只记录，账户已经存在
        let link = self.verification_link(account.id, &verification_token);
        if let Err(e) = self.mailer.send_verification(&account.email, &link).await {
            warn!(account_id = account.id, error = %e, "failed to send verification mail");
        }

        info!(account_id = account.id, "registered account");
        Ok(FlowReply::message(
            "Verification token has been sent to your email",
        ))
    }

    /// 消费邮箱验证 token，置账户为已验证。
    /// token 是一次性的：消费成功后同一 token 再次提交得到 NoTokenOutstanding。
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, user_id: i64, token: &str) -> Result<FlowReply> {
        let account = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("account {}", user_id)))?;

        let current = account
            .verification_token
            .as_deref()
            .ok_or(ServiceError::NoTokenOutstanding)?;
        if !token_matches(current, token) {
            return Err(ServiceError::InvalidToken);
        }

        // 检查与清除必须是同一个逻辑步骤：带前置条件的条件更新，
        // 并发的第二次消费在这里落空
        let consume = AccountPatch {
            is_verified: Some(true),
            verification_token: Some(None),
            expect_verification_token: Some(Some(token.to_string())),
            ..Default::default()
        };
        if self.store.update(user_id, consume).await? == 0 {
            return Err(ServiceError::NoTokenOutstanding);
        }

        info!(account_id = user_id, "email verified");
        Ok(FlowReply::message(
            "Email verified successfully, you can login now",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::service::testutil::*;
    use super::super::store::CredentialStore;
    use super::*;

    #[tokio::test]
    async fn register_creates_unverified_account_with_token() {
        let h = harness();
        let reply = h
            .service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();
        assert!(reply.data.is_none());

        let account = h
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(!account.is_verified);
        assert_eq!(account.role, Role::User);
        let token = account.verification_token.expect("token outstanding");
        assert_eq!(token.len(), 64);
        assert_ne!(account.password_hash, "Str0ng!Pass");

        // 验证邮件带上了嵌入 {id, token} 的链接
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, "verification");
        assert!(sent[0].link.contains(&format!("/{}/{}", account.id, token)));
    }

    #[tokio::test]
    async fn register_succeeds_even_when_mail_relay_is_down() {
        let h = harness();
        h.mailer.fail.store(true, std::sync::atomic::Ordering::SeqCst);

        // 投递失败只记录日志：账户照常存在，token 照常未消费
        h.service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();
        let account = h
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(account.verification_token.is_some());
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn register_same_email_twice_is_duplicate() {
        let h = harness();
        h.service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();

        // 第二次注册即使换了用户名/密码也一样失败
        let mut again = register_request("alice@example.com");
        again.username = "other".into();
        again.password = "Different1!".into();
        let err = h.service.register(again).await.unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let h = harness();
        let mut req = register_request("alice@example.com");
        req.password = "weak".into();
        let err = h.service.register(req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(h
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn verify_consumes_token_exactly_once() {
        let h = harness();
        h.service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();
        let account = h
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        let token = account.verification_token.clone().unwrap();

        h.service.verify_email(account.id, &token).await.unwrap();
        let verified = h.store.find_by_id(account.id).await.unwrap().unwrap();
        assert!(verified.is_verified);
        assert!(verified.verification_token.is_none());

        // 同一 token 第二次消费：NoTokenOutstanding，而不是静默成功
        let err = h.service.verify_email(account.id, &token).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoTokenOutstanding));
    }

    #[tokio::test]
    async fn verify_rejects_mismatched_token() {
        let h = harness();
        h.service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();
        let account = h
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        let err = h
            .service
            .verify_email(account.id, "0000000000000000000000000000000000000000000000000000000000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidToken));
        // 失败不消费 token
        let reread = h.store.find_by_id(account.id).await.unwrap().unwrap();
        assert!(reread.verification_token.is_some());
    }

    #[tokio::test]
    async fn verify_unknown_account_is_not_found() {
        let h = harness();
        let err = h.service.verify_email(42, "tok").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
