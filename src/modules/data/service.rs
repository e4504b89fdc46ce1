use std::sync::Arc;

use log::info;
use uuid::Uuid;

use crate::{
    api::error,
    jobs::{Job, JobQueue},
    modules::data::{
        model::{DataListItem, DataResponse},
        repository::DataRepository,
        schema::SaveDataEntity,
    },
    utils::Pagination,
};

#[derive(Clone)]
pub struct DataService<R>
where
    R: DataRepository + Send + Sync,
{
    data_repo: Arc<R>,
    jobs: JobQueue,
    max_bytes: usize,
}

impl<R> DataService<R>
where
    R: DataRepository + Send + Sync,
{
    pub fn with_dependencies(data_repo: Arc<R>, jobs: JobQueue, max_bytes: usize) -> Self {
        DataService { data_repo, jobs, max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Stores the bytes and queues a mirror copy; the response does not wait
    /// for the mirror.
    pub async fn add(
        &self,
        user_id: Uuid,
        bytes: Vec<u8>,
        public: bool,
    ) -> Result<DataResponse, error::SystemError> {
        if bytes.is_empty() {
            return Err(error::SystemError::bad_request("Data cannot be empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(error::SystemError::payload_too_large(format!(
                "Data exceeds maximum allowed size of {} bytes",
                self.max_bytes
            )));
        }

        let entity = self.data_repo.create(&user_id, &bytes, public).await?;
        info!("Stored {} bytes of save data {} for user {}", bytes.len(), entity.id, user_id);

        self.jobs.enqueue(Job::MirrorBlob { key: entity.storage_key(), bytes });
        Ok(DataResponse::from(&entity))
    }

    pub async fn retrieve(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<SaveDataEntity, error::SystemError> {
        self.data_repo
            .find_owned(&user_id, &id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Data not found"))
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        page: Option<Pagination>,
    ) -> Result<Vec<DataListItem>, error::SystemError> {
        let rows = self.data_repo.list_by_user(&user_id, page).await?;
        if rows.is_empty() {
            return Err(error::SystemError::not_found("No data found"));
        }
        Ok(rows.into_iter().map(DataListItem::from).collect())
    }
}
