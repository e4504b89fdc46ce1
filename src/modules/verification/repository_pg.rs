use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    modules::verification::{
        code::VerificationCode,
        repository::{EmailCodeRepository, PasswordChangeRepository, PasswordResetRepository},
        schema::{EmailVerificationEntity, PasswordChangeEntity, PasswordResetCodeEntity},
    },
};

fn new_id() -> Uuid {
    Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext))
}

#[derive(Clone)]
pub struct VerificationRepositoryPg {
    pool: sqlx::PgPool,
}

impl VerificationRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EmailCodeRepository for VerificationRepositoryPg {
    async fn find_outstanding_email_code(
        &self,
        email: &str,
    ) -> Result<Option<EmailVerificationEntity>, error::SystemError> {
        let code = sqlx::query_as::<_, EmailVerificationEntity>(
            r#"
            SELECT * FROM email_verifications
            WHERE email = $1 AND consumed_at IS NULL AND superseded_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(code)
    }

    async fn last_email_sent_at(
        &self,
        email: &str,
    ) -> Result<Option<DateTime<Utc>>, error::SystemError> {
        let latest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(last_sent_at) FROM email_verifications WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(latest)
    }

    async fn mark_email_code_sent(&self, email: &str) -> Result<(), error::SystemError> {
        sqlx::query(
            r#"
            UPDATE email_verifications
            SET last_sent_at = NOW()
            WHERE email = $1 AND consumed_at IS NULL AND superseded_at IS NULL
            "#,
        )
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_email_code(
        &self,
        email: &str,
        code: &VerificationCode,
    ) -> Result<EmailVerificationEntity, error::SystemError> {
        let row = sqlx::query_as::<_, EmailVerificationEntity>(
            "INSERT INTO email_verifications (id, email, code) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(new_id())
        .bind(email)
        .bind(code)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn consume_email_code(
        &self,
        email: &str,
        code: &VerificationCode,
    ) -> Result<bool, error::SystemError> {
        let rows = sqlx::query(
            r#"
            UPDATE email_verifications
            SET consumed_at = NOW()
            WHERE email = $1 AND code = $2
              AND consumed_at IS NULL AND superseded_at IS NULL
            "#,
        )
        .bind(email)
        .bind(code)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn has_consumed_email_code(&self, email: &str) -> Result<bool, error::SystemError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM email_verifications WHERE email = $1 AND consumed_at IS NOT NULL)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait::async_trait]
impl PasswordResetRepository for VerificationRepositoryPg {
    async fn find_outstanding_reset_code(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<PasswordResetCodeEntity>, error::SystemError> {
        let code = sqlx::query_as::<_, PasswordResetCodeEntity>(
            r#"
            SELECT * FROM password_reset_codes
            WHERE user_id = $1 AND consumed_at IS NULL AND superseded_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(code)
    }

    async fn last_reset_sent_at(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<DateTime<Utc>>, error::SystemError> {
        let latest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(last_sent_at) FROM password_reset_codes WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(latest)
    }

    async fn mark_reset_code_sent(&self, user_id: &Uuid) -> Result<(), error::SystemError> {
        sqlx::query(
            r#"
            UPDATE password_reset_codes
            SET last_sent_at = NOW()
            WHERE user_id = $1 AND consumed_at IS NULL AND superseded_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn open_reset(
        &self,
        user_id: &Uuid,
        code: &VerificationCode,
    ) -> Result<(PasswordChangeEntity, PasswordResetCodeEntity), error::SystemError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE password_reset_codes
            SET superseded_at = NOW()
            WHERE user_id = $1 AND consumed_at IS NULL AND superseded_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let change = sqlx::query_as::<_, PasswordChangeEntity>(
            "INSERT INTO password_changes (id, user_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(new_id())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let reset_code = sqlx::query_as::<_, PasswordResetCodeEntity>(
            r#"
            INSERT INTO password_reset_codes (id, change_id, user_id, code)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(change.id)
        .bind(user_id)
        .bind(code)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((change, reset_code))
    }

    async fn consume_reset_code(
        &self,
        user_id: &Uuid,
        code: &VerificationCode,
    ) -> Result<Option<PasswordResetCodeEntity>, error::SystemError> {
        let consumed = sqlx::query_as::<_, PasswordResetCodeEntity>(
            r#"
            UPDATE password_reset_codes
            SET consumed_at = NOW()
            WHERE user_id = $1 AND code = $2
              AND consumed_at IS NULL AND superseded_at IS NULL
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(consumed)
    }

    async fn consume_reset_codes_for_change(
        &self,
        change_id: &Uuid,
    ) -> Result<u64, error::SystemError> {
        let rows = sqlx::query(
            r#"
            UPDATE password_reset_codes
            SET consumed_at = NOW()
            WHERE change_id = $1 AND consumed_at IS NULL AND superseded_at IS NULL
            "#,
        )
        .bind(change_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl PasswordChangeRepository for VerificationRepositoryPg {
    async fn create_change(&self, user_id: &Uuid) -> Result<PasswordChangeEntity, error::SystemError> {
        let change = sqlx::query_as::<_, PasswordChangeEntity>(
            "INSERT INTO password_changes (id, user_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(new_id())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(change)
    }

    async fn find_change(
        &self,
        id: &Uuid,
    ) -> Result<Option<PasswordChangeEntity>, error::SystemError> {
        let change =
            sqlx::query_as::<_, PasswordChangeEntity>("SELECT * FROM password_changes WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(change)
    }

    async fn complete_change(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query(
            r#"
            UPDATE password_changes
            SET completed_at = NOW()
            WHERE id = $1 AND user_id = $2 AND completed_at IS NULL
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }
}
