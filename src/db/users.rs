//! Database queries for users.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entity::user::{self, ActiveModel, Entity as User};
use crate::error::{AppError, AppResult};
use crate::services::api_key::{generate_key, hash_key};

use super::DbPool;

impl DbPool {
    /// Register a user and issue their first API key.
    ///
    /// Returns the stored row and the plaintext key. The key is not
    /// recoverable afterwards.
    pub async fn insert_user(&self, email: &str) -> AppResult<(user::Model, String)> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::InvalidInput(format!(
                "'{}' is not a valid email address",
                email
            )));
        }

        if self.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::InvalidInput(format!(
                "User with email {} already exists",
                email
            )));
        }

        let key = generate_key();
        let now = Utc::now();

        let model = ActiveModel {
            email: Set(email),
            api_key: Set(hash_key(&key)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert user: {}", e)))?;

        Ok((result, key))
    }

    pub async fn find_user_by_id(&self, id: i32) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get user: {}", e)))
    }

    pub async fn find_user_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get user by email: {}", e)))
    }

    /// Resolve a plaintext API key to its owner.
    pub async fn find_user_by_api_key(&self, key: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::ApiKey.eq(hash_key(key)))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get user by API key: {}", e)))
    }

    /// Activate or deactivate a user. Inactive users cannot authenticate.
    pub async fn set_user_active(&self, id: i32, is_active: bool) -> AppResult<user::Model> {
        let existing = self
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?;

        let mut active: ActiveModel = existing.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());

        active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update user: {}", e)))
    }

    /// Replace a user's API key. The previous key stops working immediately.
    pub async fn rotate_user_api_key(&self, id: i32) -> AppResult<String> {
        let existing = self
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?;

        let key = generate_key();
        let mut active: ActiveModel = existing.into();
        active.api_key = Set(hash_key(&key));
        active.updated_at = Set(Utc::now());

        active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to rotate API key: {}", e)))?;

        Ok(key)
    }

    pub async fn list_users(&self) -> AppResult<Vec<user::Model>> {
        User::find()
            .order_by_asc(user::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list users: {}", e)))
    }
}
