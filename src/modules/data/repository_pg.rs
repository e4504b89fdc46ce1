use uuid::Uuid;

use crate::{
    api::error,
    modules::data::{
        repository::DataRepository,
        schema::{SaveDataEntity, SaveDataSummary},
    },
    utils::Pagination,
};

#[derive(Clone)]
pub struct DataRepositoryPg {
    pool: sqlx::PgPool,
}

impl DataRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DataRepository for DataRepositoryPg {
    async fn create(
        &self,
        user_id: &Uuid,
        data: &[u8],
        public: bool,
    ) -> Result<SaveDataEntity, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let entity = sqlx::query_as::<_, SaveDataEntity>(
            r#"
            INSERT INTO save_data (id, user_id, data, size_bytes, public)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data)
        .bind(data.len() as i64)
        .bind(public)
        .fetch_one(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn find_owned(
        &self,
        user_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<SaveDataEntity>, error::SystemError> {
        let entity = sqlx::query_as::<_, SaveDataEntity>(
            "SELECT * FROM save_data WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn list_by_user(
        &self,
        user_id: &Uuid,
        page: Option<Pagination>,
    ) -> Result<Vec<SaveDataSummary>, error::SystemError> {
        let (offset, limit) = page.map_or((0, None), |p| (p.offset, p.limit));
        let rows = sqlx::query_as::<_, SaveDataSummary>(
            r#"
            SELECT id, size_bytes, public, created_at
            FROM save_data
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
