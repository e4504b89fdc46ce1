use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{
        model::{InsertUser, UpdateUser},
        repository::UserRepository,
        schema::{UserEntity, UserInfoRow},
    },
};

const INFO_SELECT: &str = r#"
    SELECT u.id, u.email, u.username, u.name, u.created_at, u.updated_at,
           d.profile_index, d.last_activity
    FROM users u
    LEFT JOIN user_details d ON d.user_id = u.id
"#;

#[derive(Clone)]
pub struct UserRepositoryPg {
    pool: sqlx::PgPool,
}

impl UserRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn info_by_id<'e, E>(executor: E, id: &Uuid) -> Result<Option<UserInfoRow>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserInfoRow>(&format!(
            "{INFO_SELECT} WHERE u.id = $1 AND u.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryPg {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE lower(username) = lower($1) AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE lower(email) = lower($1) AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_info(&self, id: &Uuid) -> Result<Option<UserInfoRow>, error::SystemError> {
        Ok(Self::info_by_id(&self.pool, id).await?)
    }

    async fn find_info_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserInfoRow>, error::SystemError> {
        let row = sqlx::query_as::<_, UserInfoRow>(&format!(
            "{INFO_SELECT} WHERE lower(u.username) = lower($1) AND u.deleted_at IS NULL"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create(&self, user: &InsertUser) -> Result<UserInfoRow, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, email, username, hash_password, name) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.hash_password)
        .bind(&user.name)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_details (user_id, profile_index) VALUES ($1, $2)")
            .bind(id)
            .bind(user.profile_index)
            .execute(&mut *tx)
            .await?;

        let row = Self::info_by_id(&mut *tx, &id)
            .await?
            .ok_or_else(|| error::SystemError::internal("inserted user not visible"))?;

        tx.commit().await?;
        Ok(row)
    }

    async fn update(&self, id: &Uuid, user: &UpdateUser) -> Result<UserInfoRow, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            UPDATE users
            SET
                email      = COALESCE($2, email),
                username   = COALESCE($3, username),
                name       = COALESCE($4, name),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(error::SystemError::not_found("User not found"));
        }

        if let Some(profile_index) = user.profile_index {
            sqlx::query("UPDATE user_details SET profile_index = $2 WHERE user_id = $1")
                .bind(id)
                .bind(profile_index)
                .execute(&mut *tx)
                .await?;
        }

        let row = Self::info_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        tx.commit().await?;
        Ok(row)
    }

    async fn update_password(&self, id: &Uuid, hash: &str) -> Result<bool, error::SystemError> {
        let rows = sqlx::query(
            "UPDATE users SET hash_password = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(hash)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    async fn soft_delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let rows =
            sqlx::query("UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(rows > 0)
    }

    async fn touch_last_activity(&self, id: &Uuid) -> Result<(), error::SystemError> {
        sqlx::query("UPDATE user_details SET last_activity = NOW() WHERE user_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_report(
        &self,
        reporter_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<(), error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        sqlx::query("INSERT INTO user_reports (id, reporter_id, target_id) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(reporter_id)
            .bind(target_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
