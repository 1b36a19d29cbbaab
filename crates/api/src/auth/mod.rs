//! Authentication module for Scripta

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset;

pub use jwt::{Claims, JwtManager, TokenType};
pub use middleware::{require_auth, AuthState, AuthUser};
pub use password::{hash_password, validate_password, verify_password};
pub use reset::ResetTokenManager;
