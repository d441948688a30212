//! Bearer token 签发与验证（无状态 JWT）

use super::models::{Role, TokenClaims};
use crate::error::{Result, ServiceError};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

/// Token 签发器：持有签名密钥与有效期。
/// 无状态设计：没有吊销列表，签出的 token 在过期前一直有效。
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    /// 签发携带 {id, role} 的 bearer token
    pub fn sign(&self, id: i64, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            id,
            role,
            exp: (now + Duration::seconds(self.ttl_secs)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Other(format!("jwt encode failed: {}", e)))
    }

    /// 验证 token；过期与伪造/畸形分别报告
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ServiceError::Expired,
            _ => ServiceError::InvalidToken,
        })
    }
}
