//! Authentication DTOs

use serde::{Deserialize, Serialize};

/// JWT claims carried by operator tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Subject (user_id)
    pub username: String, // Username for convenience
    pub exp: i64,         // Expiration time (as UTC timestamp)
    pub iat: i64,         // Issued at (as UTC timestamp)
}

impl Claims {
    pub fn new(user_id: String, username: String, expiration_hours: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        let exp = now + (expiration_hours * 3600);

        Self {
            sub: user_id,
            username,
            exp,
            iat: now,
        }
    }
}
