use std::sync::Arc;

use log::info;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        friend::{
            model::{FriendRequestResponse, FriendResponse, SendRequestOutcome},
            repository::FriendRepo,
            schema::FriendRequestStatus,
        },
        user::repository::UserRepository,
    },
    utils::Pagination,
};

#[derive(Clone)]
pub struct FriendService<R, U>
where
    R: FriendRepo + Send + Sync,
    U: UserRepository + Send + Sync,
{
    friend_repo: Arc<R>,
    user_repo: Arc<U>,
}

impl<R, U> FriendService<R, U>
where
    R: FriendRepo + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(friend_repo: Arc<R>, user_repo: Arc<U>) -> Self {
        FriendService { friend_repo, user_repo }
    }

    /// Order matters: each check short-circuits the next.
    pub async fn send_request(
        &self,
        requester_id: Uuid,
        target_username: &str,
    ) -> Result<SendRequestOutcome, error::SystemError> {
        let target = self
            .user_repo
            .find_by_username(target_username)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if target.id == requester_id {
            return Err(error::SystemError::bad_request("Cannot send friend request to yourself"));
        }

        if let Some(existing) = self.friend_repo.find_request(&requester_id, &target.id).await? {
            return Err(match existing.status {
                FriendRequestStatus::Accepted => {
                    error::SystemError::conflict("User is already a friend")
                }
                FriendRequestStatus::Pending => error::SystemError::conflict("Already requested"),
            });
        }

        if let Some(reverse) = self.friend_repo.find_request(&target.id, &requester_id).await? {
            if reverse.status == FriendRequestStatus::Accepted {
                return Err(error::SystemError::conflict("User is already a friend"));
            }

            // a concurrent accept may have won; fall back to the Accepted answer
            if !self.friend_repo.accept_request_atomic(&target.id, &requester_id).await? {
                return Err(error::SystemError::conflict("User is already a friend"));
            }

            info!("Friend request {} auto-accepted by {}", reverse.id, requester_id);
            return Ok(SendRequestOutcome::AutoAccepted(FriendResponse::from(target)));
        }

        let request =
            self.friend_repo.create_request(&requester_id, &target.id).await.map_err(|e| {
                if e.is_conflict() { error::SystemError::conflict("Already requested") } else { e }
            })?;

        Ok(SendRequestOutcome::Requested(request))
    }

    pub async fn accept_request(
        &self,
        accepter_id: Uuid,
        requester_username: &str,
    ) -> Result<FriendResponse, error::SystemError> {
        let requester = self
            .user_repo
            .find_by_username(requester_username)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if !self.friend_repo.accept_request_atomic(&requester.id, &accepter_id).await? {
            return Err(error::SystemError::not_found("No friend request found"));
        }

        Ok(FriendResponse::from(requester))
    }

    pub async fn list_friends(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendResponse>, error::SystemError> {
        self.friend_repo.find_friends(&user_id).await
    }

    pub async fn list_sent_requests(
        &self,
        user_id: Uuid,
        page: Option<Pagination>,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let requests = self.friend_repo.find_sent_requests(&user_id, page).await?;
        if requests.is_empty() {
            return Err(error::SystemError::not_found("No friend request sent"));
        }
        Ok(requests)
    }

    pub async fn list_received_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        self.friend_repo.find_received_requests(&user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::MemoryStore;

    fn service(store: &MemoryStore) -> FriendService<MemoryStore, MemoryStore> {
        FriendService::with_dependencies(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_reciprocal_request_auto_accepts_once() {
        let store = MemoryStore::default();
        let alice = store.add_user("alice", "alice@example.com");
        let bobby = store.add_user("bobby", "bobby@example.com");
        let svc = service(&store);

        let first = svc.send_request(alice, "bobby").await.unwrap();
        assert!(matches!(first, SendRequestOutcome::Requested(_)));

        let second = svc.send_request(bobby, "alice").await.unwrap();
        match second {
            SendRequestOutcome::AutoAccepted(friend) => assert_eq!(friend.id, alice),
            other => panic!("expected auto-accept, got {other:?}"),
        }

        assert_eq!(store.friendship_count(alice, bobby), 1);
        assert_eq!(store.request_count(alice, bobby), 1);
        assert_eq!(svc.list_friends(alice).await.unwrap().len(), 1);
        assert_eq!(svc.list_friends(bobby).await.unwrap()[0].id, alice);
    }

    #[tokio::test]
    async fn test_self_request_is_rejected() {
        let store = MemoryStore::default();
        let alice = store.add_user("alice", "alice@example.com");
        let svc = service(&store);

        let err = svc.send_request(alice, "alice").await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));
        assert_eq!(store.request_count(alice, alice), 0);
    }

    #[tokio::test]
    async fn test_unknown_target_is_not_found() {
        let store = MemoryStore::default();
        let alice = store.add_user("alice", "alice@example.com");
        let svc = service(&store);

        let err = svc.send_request(alice, "nobody").await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_request_conflicts() {
        let store = MemoryStore::default();
        let alice = store.add_user("alice", "alice@example.com");
        store.add_user("bobby", "bobby@example.com");
        let svc = service(&store);

        svc.send_request(alice, "bobby").await.unwrap();
        let err = svc.send_request(alice, "bobby").await.unwrap_err();
        assert!(matches!(err, error::SystemError::Conflict(ref m) if m == "Already requested"));
    }

    #[tokio::test]
    async fn test_request_after_acceptance_reports_friends() {
        let store = MemoryStore::default();
        let alice = store.add_user("alice", "alice@example.com");
        let bobby = store.add_user("bobby", "bobby@example.com");
        let svc = service(&store);

        svc.send_request(alice, "bobby").await.unwrap();
        svc.accept_request(bobby, "alice").await.unwrap();

        for (from, to) in [(alice, "bobby"), (bobby, "alice")] {
            let err = svc.send_request(from, to).await.unwrap_err();
            assert!(
                matches!(err, error::SystemError::Conflict(ref m) if m == "User is already a friend")
            );
        }
    }

    #[tokio::test]
    async fn test_second_accept_is_not_found() {
        let store = MemoryStore::default();
        let alice = store.add_user("alice", "alice@example.com");
        let bobby = store.add_user("bobby", "bobby@example.com");
        let svc = service(&store);

        svc.send_request(alice, "bobby").await.unwrap();
        let friend = svc.accept_request(bobby, "alice").await.unwrap();
        assert_eq!(friend.id, alice);

        let err = svc.accept_request(bobby, "alice").await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
        assert_eq!(store.friendship_count(alice, bobby), 1);
    }

    #[tokio::test]
    async fn test_requester_cannot_accept_own_request() {
        let store = MemoryStore::default();
        let alice = store.add_user("alice", "alice@example.com");
        store.add_user("bobby", "bobby@example.com");
        let svc = service(&store);

        svc.send_request(alice, "bobby").await.unwrap();
        let err = svc.accept_request(alice, "bobby").await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sent_requests_pagination() {
        let store = MemoryStore::default();
        let alice = store.add_user("alice", "alice@example.com");
        let svc = service(&store);

        let err = svc.list_sent_requests(alice, None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));

        for name in ["bobby", "carol", "danny"] {
            store.add_user(name, &format!("{name}@example.com"));
            svc.send_request(alice, name).await.unwrap();
        }

        assert_eq!(svc.list_sent_requests(alice, None).await.unwrap().len(), 3);

        let page = Pagination::from_query(1, 1);
        let sent = svc.list_sent_requests(alice, page).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user.username, "carol");
    }

    #[tokio::test]
    async fn test_received_requests_only_pending() {
        let store = MemoryStore::default();
        let alice = store.add_user("alice", "alice@example.com");
        let bobby = store.add_user("bobby", "bobby@example.com");
        let carol = store.add_user("carol", "carol@example.com");
        let svc = service(&store);

        svc.send_request(alice, "carol").await.unwrap();
        svc.send_request(bobby, "carol").await.unwrap();
        svc.accept_request(carol, "alice").await.unwrap();

        let received = svc.list_received_requests(carol).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].user.id, bobby);
        assert_eq!(received[0].status, FriendRequestStatus::Pending);
    }
}
