//! Authentication module for the PhotoFlow server
//!
//! This module handles user signup and login, access/refresh token
//! issuance and rotation, and server-side refresh-token revocation.

pub mod handlers;

mod password;
mod rate_limit;
mod service;
mod tokens;

pub use handlers::bearer_token;
pub use password::PasswordHasher;
pub use rate_limit::{RateLimiter, RateLimitConfig};
pub use service::{AuthService, TokenPair};
pub use tokens::{Claims, IssuedRefreshToken, TokenKind, TokenManager};
