pub mod auth;
pub mod bug;
pub mod global_error;
pub mod notification;

pub use auth::{Actor, Claims};
pub use global_error::{AppError, ErrorCode};
