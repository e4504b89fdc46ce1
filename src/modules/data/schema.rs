use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct SaveDataEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub data: Vec<u8>,
    pub size_bytes: i64,
    pub public: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl SaveDataEntity {
    /// Location of the mirrored copy in every blob store.
    pub fn storage_key(&self) -> String {
        format!("{}/{}", self.user_id, self.id)
    }
}

/// Listing row; never carries the payload.
#[derive(Debug, Clone, FromRow)]
pub struct SaveDataSummary {
    pub id: Uuid,
    pub size_bytes: i64,
    pub public: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
