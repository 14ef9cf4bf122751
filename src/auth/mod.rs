pub mod jwt;
pub mod middleware;

pub use jwt::{JwtVerifier, TokenVerifyResult};
pub use middleware::AuthMiddleware;
