//! 账户生命周期与认证核心

mod auth;
mod models;
mod password;
mod register;
mod reset;
mod secret;
mod service;
mod store;
mod token;

pub use models::{
    Account, AccountPatch, AccountSummary, FlowReply, ForgotPasswordRequest, LoginRequest,
    NewAccount, RegisterRequest, ResetPasswordRequest, Role, TokenClaims,
};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use secret::{generate_token, token_matches};
pub use service::{AccountService, DEFAULT_TOKEN_TTL_SECS};
pub use store::{CredentialStore, JsonCredentialStore, MemoryCredentialStore};
pub use token::TokenIssuer;
