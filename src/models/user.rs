use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::user_entity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub firebase_id: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// 新建用户（id 由存储分配）
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub firebase_id: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseAuthRequest {
    #[schema(example = "kT9sQf2mXvU1")]
    pub uid: String,
    #[schema(example = "jamie@example.com")]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub id_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// 身份提供方验证后的身份，由鉴权中间件放入请求扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

impl From<user_entity::Model> for User {
    fn from(m: user_entity::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            name: m.name,
            firebase_id: m.firebase_id,
            password_hash: m.password_hash,
            created_at: m.created_at,
        }
    }
}
