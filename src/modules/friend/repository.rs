use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::model::{FriendRequestResponse, FriendResponse};
use crate::modules::friend::schema::FriendRequestEntity;
use crate::utils::Pagination;

#[async_trait::async_trait]
pub trait FriendRepository {
    async fn find_friends(&self, user_id: &Uuid)
    -> Result<Vec<FriendResponse>, error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRequestRepository {
    /// Directed lookup: only `requester -> target`.
    async fn find_request(
        &self,
        requester_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn find_sent_requests(
        &self,
        user_id: &Uuid,
        page: Option<Pagination>,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError>;

    async fn find_received_requests(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError>;

    /// Fails with `Conflict` when any request already exists for the pair.
    async fn create_request(
        &self,
        requester_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRepo: FriendRepository + FriendRequestRepository + Send + Sync {
    /// Flips the pending `requester -> target` request and records the
    /// friendship in one transaction. `false` when nothing was pending.
    async fn accept_request_atomic(
        &self,
        requester_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<bool, error::SystemError>;
}
