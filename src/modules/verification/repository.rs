use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    modules::verification::{
        code::VerificationCode,
        schema::{EmailVerificationEntity, PasswordChangeEntity, PasswordResetCodeEntity},
    },
};

#[async_trait::async_trait]
pub trait EmailCodeRepository {
    /// The code neither consumed nor superseded, if any.
    async fn find_outstanding_email_code(
        &self,
        email: &str,
    ) -> Result<Option<EmailVerificationEntity>, error::SystemError>;

    /// Most recent mailing of any code for `email`, reused codes included.
    async fn last_email_sent_at(
        &self,
        email: &str,
    ) -> Result<Option<DateTime<Utc>>, error::SystemError>;

    /// Stamps `last_sent_at` on the outstanding code.
    async fn mark_email_code_sent(&self, email: &str) -> Result<(), error::SystemError>;

    /// Fails with `Conflict` if another code is already outstanding.
    async fn insert_email_code(
        &self,
        email: &str,
        code: &VerificationCode,
    ) -> Result<EmailVerificationEntity, error::SystemError>;

    /// Marks the matching outstanding code consumed. `false` when none matched.
    async fn consume_email_code(
        &self,
        email: &str,
        code: &VerificationCode,
    ) -> Result<bool, error::SystemError>;

    async fn has_consumed_email_code(&self, email: &str) -> Result<bool, error::SystemError>;
}

#[async_trait::async_trait]
pub trait PasswordResetRepository {
    async fn find_outstanding_reset_code(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<PasswordResetCodeEntity>, error::SystemError>;

    async fn last_reset_sent_at(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<DateTime<Utc>>, error::SystemError>;

    async fn mark_reset_code_sent(&self, user_id: &Uuid) -> Result<(), error::SystemError>;

    /// Supersedes outstanding codes, opens a change entry and links a fresh
    /// code to it, all in one transaction.
    async fn open_reset(
        &self,
        user_id: &Uuid,
        code: &VerificationCode,
    ) -> Result<(PasswordChangeEntity, PasswordResetCodeEntity), error::SystemError>;

    async fn consume_reset_code(
        &self,
        user_id: &Uuid,
        code: &VerificationCode,
    ) -> Result<Option<PasswordResetCodeEntity>, error::SystemError>;

    async fn consume_reset_codes_for_change(
        &self,
        change_id: &Uuid,
    ) -> Result<u64, error::SystemError>;
}

#[async_trait::async_trait]
pub trait PasswordChangeRepository {
    async fn create_change(&self, user_id: &Uuid) -> Result<PasswordChangeEntity, error::SystemError>;

    async fn find_change(&self, id: &Uuid)
    -> Result<Option<PasswordChangeEntity>, error::SystemError>;

    /// Guarded by `completed_at IS NULL`; `false` once already completed.
    async fn complete_change(&self, id: &Uuid, user_id: &Uuid)
    -> Result<bool, error::SystemError>;
}

pub trait VerificationRepo:
    EmailCodeRepository + PasswordResetRepository + PasswordChangeRepository + Send + Sync
{
}

impl<T> VerificationRepo for T where
    T: EmailCodeRepository + PasswordResetRepository + PasswordChangeRepository + Send + Sync
{
}
