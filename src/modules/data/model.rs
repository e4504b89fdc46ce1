use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::data::schema::{SaveDataEntity, SaveDataSummary};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct AddDataQuery {
    pub public: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub size_bytes: i64,
    pub public: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&SaveDataEntity> for DataResponse {
    fn from(entity: &SaveDataEntity) -> Self {
        DataResponse {
            id: entity.id,
            user_id: entity.user_id,
            size_bytes: entity.size_bytes,
            public: entity.public,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataListItem {
    pub id: Uuid,
    pub size_bytes: i64,
    pub public: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<SaveDataSummary> for DataListItem {
    fn from(row: SaveDataSummary) -> Self {
        DataListItem {
            id: row.id,
            size_bytes: row.size_bytes,
            public: row.public,
            created_at: row.created_at,
        }
    }
}
