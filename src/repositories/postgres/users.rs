use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::map_update_err;
use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User};
use crate::repositories::UserRepository;

#[derive(Clone)]
pub struct PgUserRepository {
    pool: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_firebase_id(&self, uid: &str) -> AppResult<Option<User>> {
        Ok(users::Entity::find()
            .filter(users::Column::FirebaseId.eq(uid))
            .one(&self.pool)
            .await?
            .map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.pool)
            .await?
            .map(Into::into))
    }

    async fn insert(&self, user: NewUser) -> AppResult<User> {
        let now = Utc::now();
        let model = users::ActiveModel {
            email: Set(user.email),
            name: Set(user.name),
            firebase_id: Set(user.firebase_id),
            password_hash: Set(user.password_hash),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(|e| AppError::from_insert(e, "User"))?;
        Ok(model.into())
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let model = users::ActiveModel {
            id: Set(user.id),
            email: Set(user.email.clone()),
            name: Set(user.name.clone()),
            firebase_id: Set(user.firebase_id.clone()),
            password_hash: Set(user.password_hash.clone()),
            created_at: Set(user.created_at),
            updated_at: Set(Utc::now()),
        }
        .update(&self.pool)
        .await
        .map_err(|e| match e.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("User identity already linked".into())
            }
            _ => map_update_err(e, "User"),
        })?;
        Ok(model.into())
    }
}
