//! User types shared by authentication and the management CLI.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::user;

/// Caller resolved from a valid API key.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub email: String,
}

impl From<user::Model> for AuthenticatedUser {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
        }
    }
}

/// User row without the key hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserSummary {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}
