use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const SYSTEM_ROLE: &str = "system";

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Claims {
    pub sub: String,      // identity id
    pub role: String,
    pub exp: usize,       // expiry (unix timestamp)
    pub iat: usize,       // issued at (unix timestamp)
}

/// Who is performing a write. Users come from the identity service; the
/// system actor is used by background jobs such as the auto-close sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Option<i32>,
    pub role: String,
}

impl Actor {
    pub fn user(user_id: i32, role: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            role: role.into(),
        }
    }

    pub fn system() -> Self {
        Self {
            user_id: None,
            role: SYSTEM_ROLE.to_string(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.user_id.is_none() && self.role == SYSTEM_ROLE
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.user_id {
            Some(id) => write!(f, "user #{} ({})", id, self.role),
            None => f.write_str(SYSTEM_ROLE),
        }
    }
}
