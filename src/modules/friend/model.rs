use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::{
    friend::schema::{FriendRequestEntity, FriendRequestStatus},
    user::schema::UserEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FriendResponse {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
}

impl From<UserEntity> for FriendResponse {
    fn from(user: UserEntity) -> Self {
        FriendResponse { id: user.id, username: user.username, name: user.name }
    }
}

#[derive(sqlx::FromRow)]
pub struct FriendRequestRow {
    pub req_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub status: FriendRequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A request seen from one side; `user` is the other party.
#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestResponse {
    pub id: Uuid,
    pub user: FriendResponse,
    pub status: FriendRequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<FriendRequestRow> for FriendRequestResponse {
    fn from(r: FriendRequestRow) -> Self {
        FriendRequestResponse {
            id: r.req_id,
            user: FriendResponse { id: r.user_id, username: r.username, name: r.name },
            status: r.status,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FriendRequestBody {
    #[validate(length(min = 4, max = 20, message = "Username must be 4 to 20 characters long"))]
    pub username: String,
}

#[derive(Debug)]
pub enum SendRequestOutcome {
    Requested(FriendRequestEntity),
    /// The target had already asked; both are now friends.
    AutoAccepted(FriendResponse),
}
