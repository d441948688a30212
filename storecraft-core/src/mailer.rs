//! 邮件投递协作方：验证邮件与重置邮件。
//! 各 flow 把投递当作尽力而为：失败只记录日志，绝不改变流程结果。

use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use url::Url;

/// 邮件发送接口
#[async_trait]
pub trait Mailer: Send + Sync {
    /// 发送邮箱验证邮件
    async fn send_verification(&self, email: &str, link: &str) -> Result<()>;

    /// 发送密码重置邮件
    async fn send_password_reset(&self, email: &str, link: &str) -> Result<()>;
}

/// 通过 HTTP 中继投递邮件：POST JSON 到配置的端点。
/// 重试策略（如果有）属于中继，这里不做。
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: Url,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: Url, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            from: from.into(),
        }
    }

    async fn deliver(&self, to: &str, subject: &str, template: &str, link: &str) -> Result<()> {
        let payload = json!({
            "to": to,
            "from": self.from,
            "subject": subject,
            "template": template,
            "context": { "link": link },
        });
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Other(format!("mail relay request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(ServiceError::Other(format!(
                "mail relay returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_verification(&self, email: &str, link: &str) -> Result<()> {
        self.deliver(email, "Verify Your Email", "verification", link)
            .await
    }

    async fn send_password_reset(&self, email: &str, link: &str) -> Result<()> {
        self.deliver(email, "Reset Your Password", "reset-password", link)
            .await
    }
}

/// 未配置邮件中继时的空实现：只记录日志
#[derive(Debug, Default)]
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send_verification(&self, email: &str, link: &str) -> Result<()> {
        info!(%email, %link, "mail relay not configured, skipping verification mail");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, link: &str) -> Result<()> {
        info!(%email, %link, "mail relay not configured, skipping reset mail");
        Ok(())
    }
}

/// 测试用：记录每一封"发出"的邮件
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<SentMail>>,
    /// 为 true 时所有投递都失败（模拟中继故障）
    pub fail: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub struct SentMail {
    pub kind: &'static str,
    pub to: String,
    pub link: String,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }

    fn record(&self, kind: &'static str, to: &str, link: &str) -> Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(ServiceError::Other("simulated mail relay outage".into()));
        }
        self.sent.lock().expect("mailer lock poisoned").push(SentMail {
            kind,
            to: to.to_string(),
            link: link.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification(&self, email: &str, link: &str) -> Result<()> {
        self.record("verification", email, link)
    }

    async fn send_password_reset(&self, email: &str, link: &str) -> Result<()> {
        self.record("reset", email, link)
    }
}
