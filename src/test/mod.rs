//! In-memory stand-ins for the Postgres repositories and Redis cache. They
//! honour the same uniqueness rules the migrations enforce.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    configs::CacheStore,
    modules::{
        data::{
            repository::DataRepository,
            schema::{SaveDataEntity, SaveDataSummary},
        },
        friend::{
            model::{FriendRequestResponse, FriendResponse},
            repository::{FriendRepo, FriendRepository, FriendRequestRepository},
            schema::{ordered_pair, FriendRequestEntity, FriendRequestStatus},
        },
        user::{
            model::{InsertUser, UpdateUser},
            repository::UserRepository,
            schema::{UserEntity, UserInfoRow},
        },
        verification::{
            code::VerificationCode,
            repository::{EmailCodeRepository, PasswordChangeRepository, PasswordResetRepository},
            schema::{EmailVerificationEntity, PasswordChangeEntity, PasswordResetCodeEntity},
        },
    },
    utils::Pagination,
};

/// Slice `items` the way `LIMIT`/`OFFSET` would.
pub fn paginate<T>(page: Option<Pagination>, items: Vec<T>) -> Vec<T> {
    match page {
        None => items,
        Some(p) => {
            let iter = items.into_iter().skip(p.offset.max(0) as usize);
            match p.limit {
                Some(limit) => iter.take(limit as usize).collect(),
                None => iter.collect(),
            }
        }
    }
}

struct UserRecord {
    entity: UserEntity,
    profile_index: i16,
    last_activity: Option<DateTime<Utc>>,
}

impl UserRecord {
    fn alive(&self) -> bool {
        self.entity.deleted_at.is_none()
    }

    fn info(&self) -> UserInfoRow {
        UserInfoRow {
            id: self.entity.id,
            email: self.entity.email.clone(),
            username: self.entity.username.clone(),
            name: self.entity.name.clone(),
            created_at: self.entity.created_at,
            updated_at: self.entity.updated_at,
            profile_index: Some(self.profile_index),
            last_activity: self.last_activity,
        }
    }

    fn friend(&self) -> FriendResponse {
        FriendResponse::from(self.entity.clone())
    }
}

#[derive(Default)]
struct State {
    users: Vec<UserRecord>,
    reports: Vec<(Uuid, Uuid)>,
    requests: Vec<FriendRequestEntity>,
    friendships: Vec<(Uuid, Uuid)>,
    email_codes: Vec<EmailVerificationEntity>,
    reset_codes: Vec<PasswordResetCodeEntity>,
    changes: Vec<PasswordChangeEntity>,
    data: Vec<SaveDataEntity>,
    rival_reset_pending: bool,
}

impl State {
    fn user(&self, id: &Uuid) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.entity.id == *id && u.alive())
    }

    fn user_mut(&mut self, id: &Uuid) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|u| u.entity.id == *id && u.alive())
    }

    fn user_by_username(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.alive() && u.entity.username.eq_ignore_ascii_case(username))
    }

    fn user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.alive() && u.entity.email.eq_ignore_ascii_case(email))
    }

    fn check_unique(
        &self,
        id: Option<&Uuid>,
        email: Option<&str>,
        username: Option<&str>,
    ) -> Result<(), error::SystemError> {
        let other = |u: &&UserRecord| Some(&u.entity.id) != id;
        if email.and_then(|e| self.user_by_email(e)).filter(other).is_some() {
            return Err(error::SystemError::conflict("Email already exists"));
        }
        if username.and_then(|n| self.user_by_username(n)).filter(other).is_some() {
            return Err(error::SystemError::conflict("Username already exists"));
        }
        Ok(())
    }

    fn open_reset(
        &mut self,
        user_id: &Uuid,
        code: &VerificationCode,
    ) -> (PasswordChangeEntity, PasswordResetCodeEntity) {
        let now = Utc::now();

        for outstanding in self
            .reset_codes
            .iter_mut()
            .filter(|c| c.user_id == *user_id && c.consumed_at.is_none() && c.superseded_at.is_none())
        {
            outstanding.superseded_at = Some(now);
        }

        let change =
            PasswordChangeEntity { id: Uuid::now_v7(), user_id: *user_id, created_at: now, completed_at: None };
        let reset_code = PasswordResetCodeEntity {
            id: Uuid::now_v7(),
            change_id: change.id,
            user_id: *user_id,
            code: code.clone(),
            created_at: now,
            last_sent_at: now,
            consumed_at: None,
            superseded_at: None,
        };

        self.changes.push(change.clone());
        self.reset_codes.push(reset_code.clone());
        (change, reset_code)
    }

    fn request_rows(&self, pick: impl Fn(&FriendRequestEntity) -> Option<Uuid>) -> Vec<FriendRequestResponse> {
        self.requests
            .iter()
            .filter(|r| r.status == FriendRequestStatus::Pending)
            .filter_map(|r| {
                let other = self.user(&pick(r)?)?;
                Some(FriendRequestResponse {
                    id: r.id,
                    user: other.friend(),
                    status: r.status,
                    created_at: r.created_at,
                })
            })
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn add_user(&self, username: &str, email: &str) -> Uuid {
        let now = Utc::now();
        let id = Uuid::now_v7();
        self.state.lock().unwrap().users.push(UserRecord {
            entity: UserEntity {
                id,
                email: email.to_lowercase(),
                username: username.to_string(),
                hash_password: "unset".to_string(),
                name: None,
                deleted_at: None,
                created_at: now,
                updated_at: now,
            },
            profile_index: 0,
            last_activity: None,
        });
        id
    }

    pub fn user_hash(&self, id: &Uuid) -> String {
        let state = self.state.lock().unwrap();
        state.user(id).map(|u| u.entity.hash_password.clone()).unwrap_or_default()
    }

    pub fn friendship_count(&self, a: Uuid, b: Uuid) -> usize {
        let pair = ordered_pair(a, b);
        self.state.lock().unwrap().friendships.iter().filter(|f| **f == pair).count()
    }

    /// Requests in either direction between `a` and `b`.
    pub fn request_count(&self, a: Uuid, b: Uuid) -> usize {
        let pair = ordered_pair(a, b);
        let state = self.state.lock().unwrap();
        state.requests.iter().filter(|r| ordered_pair(r.requester_id, r.target_id) == pair).count()
    }

    pub fn email_code_count(&self, email: &str) -> usize {
        self.state.lock().unwrap().email_codes.iter().filter(|c| c.email == email).count()
    }

    pub fn backdate_email_codes(&self, email: &str, by: chrono::Duration) {
        let mut state = self.state.lock().unwrap();
        for code in state.email_codes.iter_mut().filter(|c| c.email == email) {
            code.created_at -= by;
            code.last_sent_at -= by;
        }
    }

    /// Moves every reset code and change entry of the user into the past.
    pub fn backdate_reset(&self, user_id: &Uuid, by: chrono::Duration) {
        let mut state = self.state.lock().unwrap();
        for code in state.reset_codes.iter_mut().filter(|c| c.user_id == *user_id) {
            code.created_at -= by;
            code.last_sent_at -= by;
        }
        for change in state.changes.iter_mut().filter(|c| c.user_id == *user_id) {
            change.created_at -= by;
        }
    }

    /// The next `open_reset` loses to a concurrent one: the rival's entry is
    /// committed and the call fails on the outstanding-code index.
    pub fn open_rival_reset_before_next(&self) {
        self.state.lock().unwrap().rival_reset_pending = true;
    }

    pub fn last_activity(&self, id: &Uuid) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().user(id).and_then(|u| u.last_activity)
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.state.lock().unwrap().user(id).map(|u| u.entity.clone()))
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.state.lock().unwrap().user_by_username(username).map(|u| u.entity.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.state.lock().unwrap().user_by_email(email).map(|u| u.entity.clone()))
    }

    async fn find_info(&self, id: &Uuid) -> Result<Option<UserInfoRow>, error::SystemError> {
        Ok(self.state.lock().unwrap().user(id).map(UserRecord::info))
    }

    async fn find_info_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserInfoRow>, error::SystemError> {
        Ok(self.state.lock().unwrap().user_by_username(username).map(UserRecord::info))
    }

    async fn create(&self, user: &InsertUser) -> Result<UserInfoRow, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        state.check_unique(None, Some(&user.email), Some(&user.username))?;

        let now = Utc::now();
        let record = UserRecord {
            entity: UserEntity {
                id: Uuid::now_v7(),
                email: user.email.clone(),
                username: user.username.clone(),
                hash_password: user.hash_password.clone(),
                name: user.name.clone(),
                deleted_at: None,
                created_at: now,
                updated_at: now,
            },
            profile_index: user.profile_index,
            last_activity: None,
        };
        let info = record.info();
        state.users.push(record);
        Ok(info)
    }

    async fn update(&self, id: &Uuid, user: &UpdateUser) -> Result<UserInfoRow, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        state.check_unique(Some(id), user.email.as_deref(), user.username.as_deref())?;

        let record =
            state.user_mut(id).ok_or_else(|| error::SystemError::not_found("User not found"))?;
        if let Some(email) = &user.email {
            record.entity.email = email.clone();
        }
        if let Some(username) = &user.username {
            record.entity.username = username.clone();
        }
        if let Some(name) = &user.name {
            record.entity.name = Some(name.clone());
        }
        if let Some(profile_index) = user.profile_index {
            record.profile_index = profile_index;
        }
        record.entity.updated_at = Utc::now();
        Ok(record.info())
    }

    async fn update_password(&self, id: &Uuid, hash: &str) -> Result<bool, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.user_mut(id).map(|u| u.entity.hash_password = hash.to_string()).is_some())
    }

    async fn soft_delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.user_mut(id).map(|u| u.entity.deleted_at = Some(Utc::now())).is_some())
    }

    async fn touch_last_activity(&self, id: &Uuid) -> Result<(), error::SystemError> {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.user_mut(id) {
            user.last_activity = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_report(
        &self,
        reporter_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<(), error::SystemError> {
        let mut state = self.state.lock().unwrap();
        if state.reports.contains(&(*reporter_id, *target_id)) {
            return Err(error::SystemError::conflict("Report already exists"));
        }
        state.reports.push((*reporter_id, *target_id));
        Ok(())
    }
}

#[async_trait::async_trait]
impl FriendRepository for MemoryStore {
    async fn find_friends(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendResponse>, error::SystemError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .friendships
            .iter()
            .filter_map(|(a, b)| match (*a == *user_id, *b == *user_id) {
                (true, _) => Some(b),
                (_, true) => Some(a),
                _ => None,
            })
            .filter_map(|other| state.user(other).map(UserRecord::friend))
            .collect())
    }
}

#[async_trait::async_trait]
impl FriendRequestRepository for MemoryStore {
    async fn find_request(
        &self,
        requester_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .requests
            .iter()
            .find(|r| r.requester_id == *requester_id && r.target_id == *target_id)
            .cloned())
    }

    async fn find_sent_requests(
        &self,
        user_id: &Uuid,
        page: Option<Pagination>,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let state = self.state.lock().unwrap();
        let rows = state.request_rows(|r| (r.requester_id == *user_id).then_some(r.target_id));
        Ok(paginate(page, rows))
    }

    async fn find_received_requests(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let state = self.state.lock().unwrap();
        Ok(state.request_rows(|r| (r.target_id == *user_id).then_some(r.requester_id)))
    }

    async fn create_request(
        &self,
        requester_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let pair = ordered_pair(*requester_id, *target_id);
        if state.requests.iter().any(|r| ordered_pair(r.requester_id, r.target_id) == pair) {
            return Err(error::SystemError::conflict("Pair already exists"));
        }

        let now = Utc::now();
        let request = FriendRequestEntity {
            id: Uuid::now_v7(),
            requester_id: *requester_id,
            target_id: *target_id,
            status: FriendRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.requests.push(request.clone());
        Ok(request)
    }
}

#[async_trait::async_trait]
impl FriendRepo for MemoryStore {
    async fn accept_request_atomic(
        &self,
        requester_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let Some(request) = state.requests.iter_mut().find(|r| {
            r.requester_id == *requester_id
                && r.target_id == *target_id
                && r.status == FriendRequestStatus::Pending
        }) else {
            return Ok(false);
        };

        request.status = FriendRequestStatus::Accepted;
        request.updated_at = Utc::now();

        let pair = ordered_pair(*requester_id, *target_id);
        if !state.friendships.contains(&pair) {
            state.friendships.push(pair);
        }
        Ok(true)
    }
}

#[async_trait::async_trait]
impl EmailCodeRepository for MemoryStore {
    async fn find_outstanding_email_code(
        &self,
        email: &str,
    ) -> Result<Option<EmailVerificationEntity>, error::SystemError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .email_codes
            .iter()
            .find(|c| c.email == email && c.consumed_at.is_none() && c.superseded_at.is_none())
            .cloned())
    }

    async fn last_email_sent_at(
        &self,
        email: &str,
    ) -> Result<Option<DateTime<Utc>>, error::SystemError> {
        let state = self.state.lock().unwrap();
        Ok(state.email_codes.iter().filter(|c| c.email == email).map(|c| c.last_sent_at).max())
    }

    async fn mark_email_code_sent(&self, email: &str) -> Result<(), error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        for code in state
            .email_codes
            .iter_mut()
            .filter(|c| c.email == email && c.consumed_at.is_none() && c.superseded_at.is_none())
        {
            code.last_sent_at = now;
        }
        Ok(())
    }

    async fn insert_email_code(
        &self,
        email: &str,
        code: &VerificationCode,
    ) -> Result<EmailVerificationEntity, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        if state
            .email_codes
            .iter()
            .any(|c| c.email == email && c.consumed_at.is_none() && c.superseded_at.is_none())
        {
            return Err(error::SystemError::conflict("Outstanding already exists"));
        }

        let now = Utc::now();
        let row = EmailVerificationEntity {
            id: Uuid::now_v7(),
            email: email.to_string(),
            code: code.clone(),
            created_at: now,
            last_sent_at: now,
            consumed_at: None,
            superseded_at: None,
        };
        state.email_codes.push(row.clone());
        Ok(row)
    }

    async fn consume_email_code(
        &self,
        email: &str,
        code: &VerificationCode,
    ) -> Result<bool, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let outstanding = state.email_codes.iter_mut().find(|c| {
            c.email == email && c.code == *code && c.consumed_at.is_none() && c.superseded_at.is_none()
        });
        Ok(outstanding.map(|c| c.consumed_at = Some(Utc::now())).is_some())
    }

    async fn has_consumed_email_code(&self, email: &str) -> Result<bool, error::SystemError> {
        let state = self.state.lock().unwrap();
        Ok(state.email_codes.iter().any(|c| c.email == email && c.consumed_at.is_some()))
    }
}

#[async_trait::async_trait]
impl PasswordResetRepository for MemoryStore {
    async fn find_outstanding_reset_code(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<PasswordResetCodeEntity>, error::SystemError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .reset_codes
            .iter()
            .find(|c| c.user_id == *user_id && c.consumed_at.is_none() && c.superseded_at.is_none())
            .cloned())
    }

    async fn last_reset_sent_at(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<DateTime<Utc>>, error::SystemError> {
        let state = self.state.lock().unwrap();
        Ok(state.reset_codes.iter().filter(|c| c.user_id == *user_id).map(|c| c.last_sent_at).max())
    }

    async fn mark_reset_code_sent(&self, user_id: &Uuid) -> Result<(), error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        for code in state
            .reset_codes
            .iter_mut()
            .filter(|c| c.user_id == *user_id && c.consumed_at.is_none() && c.superseded_at.is_none())
        {
            code.last_sent_at = now;
        }
        Ok(())
    }

    async fn open_reset(
        &self,
        user_id: &Uuid,
        code: &VerificationCode,
    ) -> Result<(PasswordChangeEntity, PasswordResetCodeEntity), error::SystemError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.rival_reset_pending) {
            state.open_reset(user_id, &VerificationCode::generate(code.as_str().len()));
            return Err(error::SystemError::conflict("Outstanding already exists"));
        }
        Ok(state.open_reset(user_id, code))
    }

    async fn consume_reset_code(
        &self,
        user_id: &Uuid,
        code: &VerificationCode,
    ) -> Result<Option<PasswordResetCodeEntity>, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let outstanding = state.reset_codes.iter_mut().find(|c| {
            c.user_id == *user_id
                && c.code == *code
                && c.consumed_at.is_none()
                && c.superseded_at.is_none()
        });
        Ok(outstanding.map(|c| {
            c.consumed_at = Some(Utc::now());
            c.clone()
        }))
    }

    async fn consume_reset_codes_for_change(
        &self,
        change_id: &Uuid,
    ) -> Result<u64, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let mut consumed = 0;
        for code in state.reset_codes.iter_mut().filter(|c| {
            c.change_id == *change_id && c.consumed_at.is_none() && c.superseded_at.is_none()
        }) {
            code.consumed_at = Some(now);
            consumed += 1;
        }
        Ok(consumed)
    }
}

#[async_trait::async_trait]
impl PasswordChangeRepository for MemoryStore {
    async fn create_change(&self, user_id: &Uuid) -> Result<PasswordChangeEntity, error::SystemError> {
        let change = PasswordChangeEntity {
            id: Uuid::now_v7(),
            user_id: *user_id,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.state.lock().unwrap().changes.push(change.clone());
        Ok(change)
    }

    async fn find_change(
        &self,
        id: &Uuid,
    ) -> Result<Option<PasswordChangeEntity>, error::SystemError> {
        Ok(self.state.lock().unwrap().changes.iter().find(|c| c.id == *id).cloned())
    }

    async fn complete_change(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let open = state
            .changes
            .iter_mut()
            .find(|c| c.id == *id && c.user_id == *user_id && c.completed_at.is_none());
        Ok(open.map(|c| c.completed_at = Some(Utc::now())).is_some())
    }
}

#[async_trait::async_trait]
impl DataRepository for MemoryStore {
    async fn create(
        &self,
        user_id: &Uuid,
        data: &[u8],
        public: bool,
    ) -> Result<SaveDataEntity, error::SystemError> {
        let entity = SaveDataEntity {
            id: Uuid::now_v7(),
            user_id: *user_id,
            data: data.to_vec(),
            size_bytes: data.len() as i64,
            public,
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().data.push(entity.clone());
        Ok(entity)
    }

    async fn find_owned(
        &self,
        user_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<SaveDataEntity>, error::SystemError> {
        let state = self.state.lock().unwrap();
        Ok(state.data.iter().find(|d| d.id == *id && d.user_id == *user_id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: &Uuid,
        page: Option<Pagination>,
    ) -> Result<Vec<SaveDataSummary>, error::SystemError> {
        let state = self.state.lock().unwrap();
        let rows = state
            .data
            .iter()
            .rev()
            .filter(|d| d.user_id == *user_id)
            .map(|d| SaveDataSummary {
                id: d.id,
                size_bytes: d.size_bytes,
                public: d.public,
                created_at: d.created_at,
            })
            .collect();
        Ok(paginate(page, rows))
    }
}

#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, error::SystemError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        _expiration: u64,
    ) -> Result<(), error::SystemError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), error::SystemError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[tokio::test]
async fn test_touch_last_activity_updates_detail() {
    let store = MemoryStore::default();
    let id = store.add_user("alice", "alice@example.com");
    assert!(store.last_activity(&id).is_none());

    store.touch_last_activity(&id).await.unwrap();
    assert!(store.last_activity(&id).is_some());
}

#[test]
fn test_paginate_window() {
    assert_eq!(paginate(Pagination::from_query(1, 2), vec!['a', 'b', 'c', 'd']), vec!['b', 'c']);
    assert_eq!(paginate(Pagination::from_query(2, 0), vec![1, 2, 3, 4]), vec![3, 4]);
    assert_eq!(paginate(None, vec![1, 2]), vec![1, 2]);
}
