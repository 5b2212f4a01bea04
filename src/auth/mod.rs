//! Authentication: token signing, password hashing, and the session middleware

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, TokenError, TokenService};
pub use middleware::{extract_token, session_middleware, AuthContext, SESSION_COOKIE};
pub use password::PasswordHasher;
