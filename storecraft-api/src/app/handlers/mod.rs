mod auth;
mod health;
mod users;

pub use auth::{check_reset_link, forgot_password, login, register, reset_password, verify_email};
pub use health::{handler_404, health};
pub use users::{delete_user, get_profile, list_users};
