//! 登录流程：凭证校验、验证门槛与 bearer token 签发

use super::models::{Account, AccountPatch, FlowReply, LoginRequest};
use super::password::verify_password;
use super::secret::generate_token;
use super::service::AccountService;
use crate::error::{Result, ServiceError};
use tracing::{info, instrument, warn};

impl AccountService {
    /// 用户登录。
    /// "邮箱不存在"与"密码错误"返回同一个错误，避免账户枚举；
    /// 未验证的账户拿不到 bearer token，只会收到验证邮件。
    #[instrument(skip(self, req))]
    pub async fn login(&self, req: LoginRequest) -> Result<FlowReply> {
        let email = req.email.trim();
        let account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let valid = verify_password(&req.password, &account.password_hash).await?;
        if !valid {
            warn!(account_id = account.id, "login failed: invalid password");
            return Err(ServiceError::InvalidCredentials);
        }

        if !account.is_verified {
            let token = self.outstanding_verification_token(&account).await?;
            let link = self.verification_link(account.id, &token);
            if let Err(e) = self.mailer.send_verification(&account.email, &link).await {
                warn!(account_id = account.id, error = %e, "failed to resend verification mail");
            }
            info!(account_id = account.id, "login deferred: verification pending");
            return Ok(FlowReply::message(
                "Verification pending, a link has been sent to your email",
            ));
        }

        let token = self.issuer.sign(account.id, account.role)?;
        info!(account_id = account.id, "logged in");
        Ok(FlowReply::with_data("Logged in successfully", token))
    }

    /// 取当前未消费的验证 token；不存在时惰性生成一次。
    /// 重复登录不轮换已有 token，并发请求只有一个生成者胜出。
    async fn outstanding_verification_token(&self, account: &Account) -> Result<String> {
        if let Some(token) = &account.verification_token {
            return Ok(token.clone());
        }

        let fresh = generate_token();
        let set_once = AccountPatch {
            verification_token: Some(Some(fresh.clone())),
            expect_verification_token: Some(None),
            ..Default::default()
        };
        if self.store.update(account.id, set_once).await? == 1 {
            return Ok(fresh);
        }

        // 竞争失败：重读并复用胜出者写入的 token
        let current = self
            .store
            .find_by_id(account.id)
            .await?
            .and_then(|a| a.verification_token);
        current.ok_or_else(|| ServiceError::Other("verification token vanished during login".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::models::Role;
    use super::super::password::hash_password;
    use super::super::service::testutil::*;
    use super::super::store::CredentialStore;
    use super::*;

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_identical() {
        let h = harness();
        let hash = hash_password("Str0ng!Pass").await.unwrap();
        seed(&h.store, "alice@example.com", &hash, Role::User, true).await;

        let missing = h
            .service
            .login(login_request("nobody@example.com", "Str0ng!Pass"))
            .await
            .unwrap_err();
        let wrong = h
            .service
            .login(login_request("alice@example.com", "WrongPass1!"))
            .await
            .unwrap_err();
        assert!(matches!(missing, ServiceError::InvalidCredentials));
        assert!(matches!(wrong, ServiceError::InvalidCredentials));
        assert_eq!(missing.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn unverified_login_returns_no_token_and_reuses_verification_token() {
        let h = harness();
        h.service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();
        let first_token = h
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap()
            .verification_token
            .unwrap();

        let reply = h
            .service
            .login(login_request("alice@example.com", "Str0ng!Pass"))
            .await
            .unwrap();
        assert!(reply.data.is_none());

        // 重复登录不轮换 token
        h.service
            .login(login_request("alice@example.com", "Str0ng!Pass"))
            .await
            .unwrap();
        let still = h
            .store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap()
            .verification_token
            .unwrap();
        assert_eq!(still, first_token);

        // 注册一封 + 两次登录各重发一封，链接里始终是同一个 token
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|m| m.link.contains(&first_token)));
    }

    #[tokio::test]
    async fn unverified_login_lazily_issues_token_when_missing() {
        let h = harness();
        let hash = hash_password("Str0ng!Pass").await.unwrap();
        let id = seed(&h.store, "bob@example.com", &hash, Role::User, false).await;
        assert!(h
            .store
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .verification_token
            .is_none());

        h.service
            .login(login_request("bob@example.com", "Str0ng!Pass"))
            .await
            .unwrap();
        let issued = h
            .store
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .verification_token
            .expect("token issued on first unverified login");
        assert_eq!(issued.len(), 64);

        // 第二次登录复用同一个
        h.service
            .login(login_request("bob@example.com", "Str0ng!Pass"))
            .await
            .unwrap();
        let reread = h
            .store
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .verification_token
            .unwrap();
        assert_eq!(reread, issued);
    }

    #[tokio::test]
    async fn verified_login_issues_bearer_token_with_id_and_role() {
        let h = harness();
        let hash = hash_password("Str0ng!Pass").await.unwrap();
        let id = seed(&h.store, "alice@example.com", &hash, Role::User, true).await;

        let reply = h
            .service
            .login(login_request("alice@example.com", "Str0ng!Pass"))
            .await
            .unwrap();
        let token = reply.data.expect("bearer token for verified account");
        let claims = h.service.issuer().verify(&token).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn login_trims_password_before_verification() {
        let h = harness();
        let hash = hash_password("Str0ng!Pass").await.unwrap();
        seed(&h.store, "alice@example.com", &hash, Role::User, true).await;

        let reply = h
            .service
            .login(login_request("alice@example.com", "  Str0ng!Pass  "))
            .await
            .unwrap();
        assert!(reply.data.is_some());
    }
}
