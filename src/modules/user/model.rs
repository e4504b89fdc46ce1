use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::user::schema::UserInfoRow;

#[derive(Deserialize, Validate)]
pub struct RegisterModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 4, max = 20, message = "Username must be 4 to 20 characters long"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters long"))]
    pub password: String,
    #[validate(length(min = 3, max = 29, message = "Name must be 3 to 29 characters long"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "Profile index cannot be negative"))]
    pub profile_index: Option<i16>,
}

#[derive(Deserialize, Validate)]
pub struct LoginModel {
    #[validate(length(min = 4, max = 20, message = "Username must be 4 to 20 characters long"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters long"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct UpdateUserModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 4, max = 20, message = "Username must be 4 to 20 characters long"))]
    pub username: Option<String>,
    #[validate(length(min = 3, max = 29, message = "Name must be 3 to 29 characters long"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "Profile index cannot be negative"))]
    pub profile_index: Option<i16>,
}

impl UpdateUserModel {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.name.is_none()
            && self.profile_index.is_none()
    }
}

/// Body of every endpoint that addresses another user by name.
#[derive(Deserialize, Validate)]
pub struct UsernameModel {
    #[validate(length(min = 4, max = 20, message = "Username must be 4 to 20 characters long"))]
    pub username: String,
}

#[derive(Deserialize, Validate)]
pub struct ChangePasswordModel {
    #[validate(length(min = 4, message = "Password must be at least 4 characters long"))]
    pub password: String,
}

pub struct InsertUser {
    pub email: String,
    pub username: String,
    pub hash_password: String,
    pub name: Option<String>,
    pub profile_index: i16,
}

pub struct UpdateUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub profile_index: Option<i16>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserDetailResponse {
    pub profile_index: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub user_detail: UserDetailResponse,
}

impl From<UserInfoRow> for UserResponse {
    fn from(row: UserInfoRow) -> Self {
        UserResponse {
            id: row.id,
            email: row.email,
            username: row.username,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            // activity changes on every call; keep it out of the cached payload
            user_detail: UserDetailResponse {
                profile_index: row.profile_index.unwrap_or_default(),
                last_activity: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicUserResponse {
    pub username: String,
    pub name: Option<String>,
    pub user_detail: UserDetailResponse,
}

impl From<UserInfoRow> for PublicUserResponse {
    fn from(row: UserInfoRow) -> Self {
        PublicUserResponse {
            username: row.username,
            name: row.name,
            user_detail: UserDetailResponse {
                profile_index: row.profile_index.unwrap_or_default(),
                last_activity: row.last_activity,
            },
        }
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}
