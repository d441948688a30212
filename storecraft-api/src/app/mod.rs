mod error;
mod handlers;
mod middleware;
mod rate_limit;
mod router;
mod state;


pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use router::app_router;
pub use state::AppState;
