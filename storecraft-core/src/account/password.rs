//! 密码哈希与强度校验

use crate::error::{Result, ServiceError};
use bcrypt::{hash, verify};

/// bcrypt 工作因子（固定成本，盐由算法随机生成并编入摘要）
const BCRYPT_COST: u32 = 10;

/// 异步哈希密码（bcrypt 在阻塞线程中执行）。
/// 哈希前去除首尾空白；verify_password 走完全相同的规则，
/// 两侧不一致会导致比较静默失败。
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.trim().to_string();
    tokio::task::spawn_blocking(move || hash(&password, BCRYPT_COST))
        .await
        .map_err(|e| ServiceError::Other(format!("spawn_blocking failed: {}", e)))?
        .map_err(|e| ServiceError::Other(format!("bcrypt hash failed: {}", e)))
}

/// 异步验证密码（常量时间比较由 bcrypt 保证）
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.trim().to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify(&password, &hash))
        .await
        .map_err(|e| ServiceError::Other(format!("spawn_blocking failed: {}", e)))?
        .map_err(|e| ServiceError::Other(format!("bcrypt verify failed: {}", e)))
}

/// 校验密码强度
pub fn validate_password_strength(password: &str) -> Result<()> {
    let password = password.trim();
    if password.len() < 8 {
        return Err(ServiceError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;
    let mut has_symbol = false;
    for ch in password.chars() {
        if ch.is_ascii_uppercase() {
            has_upper = true;
        } else if ch.is_ascii_lowercase() {
            has_lower = true;
        } else if ch.is_ascii_digit() {
            has_digit = true;
        } else {
            has_symbol = true;
        }
    }
    if !(has_upper && has_lower && (has_digit || has_symbol)) {
        return Err(ServiceError::Validation(
            "password must contain upper and lower case letters plus a digit or symbol".into(),
        ));
    }
    Ok(())
}
