//! 不透明安全 token：生成与常量时间比较

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// token 原始字节数（对应 64 个十六进制字符）
const TOKEN_BYTES: usize = 32;

/// 生成加密安全的随机 token。
/// 碰撞概率视为可忽略，不做存储侧唯一性检查。
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let mut out = String::with_capacity(TOKEN_BYTES * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// 常量时间比较两个 token，长度不同直接判不等
pub fn token_matches(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn matches_same_rejects_other() {
        let token = generate_token();
        assert!(token_matches(&token, &token.clone()));
        assert!(!token_matches(&token, &generate_token()));
        assert!(!token_matches(&token, &token[..32]));
    }
}
