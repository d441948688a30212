use std::sync::Arc;
use storecraft_core::AccountService;

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    /// 登录接口限流（按 IP）
    pub login_limiter: Arc<crate::app::RateLimiter>,
    /// 密码重置申请限流（按 IP）
    pub reset_limiter: Arc<crate::app::RateLimiter>,
    /// Bearer 认证失败限流（按 IP）
    pub auth_limiter: Arc<crate::app::RateLimiter>,
}
