use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{
        model::{InsertUser, UpdateUser},
        schema::{UserEntity, UserInfoRow},
    },
};

#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError>;

    async fn find_info(&self, id: &Uuid) -> Result<Option<UserInfoRow>, error::SystemError>;
    async fn find_info_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserInfoRow>, error::SystemError>;

    /// Inserts the user together with its detail row.
    async fn create(&self, user: &InsertUser) -> Result<UserInfoRow, error::SystemError>;
    async fn update(&self, id: &Uuid, user: &UpdateUser) -> Result<UserInfoRow, error::SystemError>;
    async fn update_password(&self, id: &Uuid, hash: &str) -> Result<bool, error::SystemError>;
    async fn soft_delete(&self, id: &Uuid) -> Result<bool, error::SystemError>;
    async fn touch_last_activity(&self, id: &Uuid) -> Result<(), error::SystemError>;

    /// Fails with `Conflict` when the reporter already reported the target.
    async fn create_report(
        &self,
        reporter_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<(), error::SystemError>;
}
