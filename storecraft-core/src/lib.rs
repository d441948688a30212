//! Core library for the account lifecycle & authentication backend:
//! credential storage, password hashing, token issuance, and the
//! registration / login / verification / password-reset flows.

pub mod account;
mod error;
pub mod mailer;

pub use account::{
    Account, AccountPatch, AccountService, AccountSummary, CredentialStore, FlowReply,
    ForgotPasswordRequest, JsonCredentialStore, LoginRequest, MemoryCredentialStore, NewAccount,
    RegisterRequest, ResetPasswordRequest, Role, TokenClaims, TokenIssuer,
};
pub use error::{Result, ServiceError};
pub use mailer::{HttpMailer, Mailer, NullMailer};
