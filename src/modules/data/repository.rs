use uuid::Uuid;

use crate::{
    api::error,
    modules::data::schema::{SaveDataEntity, SaveDataSummary},
    utils::Pagination,
};

#[async_trait::async_trait]
pub trait DataRepository {
    async fn create(
        &self,
        user_id: &Uuid,
        data: &[u8],
        public: bool,
    ) -> Result<SaveDataEntity, error::SystemError>;

    /// Only returns the row when `user_id` owns it.
    async fn find_owned(
        &self,
        user_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<SaveDataEntity>, error::SystemError>;

    async fn list_by_user(
        &self,
        user_id: &Uuid,
        page: Option<Pagination>,
    ) -> Result<Vec<SaveDataSummary>, error::SystemError>;
}
