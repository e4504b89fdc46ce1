use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::configs::CacheStore;
use crate::modules::user::model::{
    InsertUser, LoginModel, PublicUserResponse, RegisterModel, UpdateUser, UpdateUserModel,
    UserResponse,
};
use crate::modules::user::repository::UserRepository;
use crate::utils::{hash_password, normalize_email, verify_password, TokenConfig};

const INFO_CACHE_SECONDS: u64 = 3600;

fn info_key(id: &Uuid) -> String {
    format!("user:{}", id)
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
    cache: Arc<dyn CacheStore>,
    tokens: TokenConfig,
}

impl UserService {
    pub fn with_dependencies(
        repo: Arc<dyn UserRepository + Send + Sync>,
        cache: Arc<dyn CacheStore>,
        tokens: TokenConfig,
    ) -> Self {
        info!("UserService initialized with dependencies");
        UserService { repo, cache, tokens }
    }

    /// Callers must have checked that the email is verified.
    pub async fn register(&self, user: RegisterModel) -> Result<UserResponse, error::SystemError> {
        let hash_password = hash_password(&user.password)?;

        let new_user = InsertUser {
            email: normalize_email(&user.email),
            username: user.username,
            hash_password,
            name: user.name,
            profile_index: user.profile_index.unwrap_or_default(),
        };

        let row = self.repo.create(&new_user).await?;
        info!("User {} registered", row.id);
        Ok(UserResponse::from(row))
    }

    pub async fn login(&self, user: LoginModel) -> Result<(String, UserResponse), error::SystemError> {
        let user_entity = self
            .repo
            .find_by_username(&user.username)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("Invalid username or password"))?;

        let valid = verify_password(&user_entity.hash_password, &user.password)?;
        if !valid {
            return Err(error::SystemError::unauthorized("Invalid username or password"));
        }

        let info = self
            .repo
            .find_info(&user_entity.id)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("Invalid username or password"))?;

        let access_token = self.tokens.issue(&user_entity.id)?;
        Ok((access_token, UserResponse::from(info)))
    }

    pub async fn renew_token(&self, id: Uuid) -> Result<String, error::SystemError> {
        self.repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("User no longer exists"))?;
        self.tokens.issue(&id)
    }

    pub async fn get_info(&self, id: Uuid) -> Result<UserResponse, error::SystemError> {
        let key = info_key(&id);
        if let Some(cached_user) = self.cache.get::<UserResponse>(&key).await? {
            info!("User {} found in cache", id);
            return Ok(cached_user);
        }

        let row = self
            .repo
            .find_info(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let user = UserResponse::from(row);
        self.cache.set(&key, &user, INFO_CACHE_SECONDS).await?;
        info!("User {} cached", id);
        Ok(user)
    }

    pub async fn get_public_info(
        &self,
        username: &str,
    ) -> Result<PublicUserResponse, error::SystemError> {
        let row = self
            .repo
            .find_info_by_username(username)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        Ok(PublicUserResponse::from(row))
    }

    pub async fn update_info(
        &self,
        id: Uuid,
        user: UpdateUserModel,
    ) -> Result<UserResponse, error::SystemError> {
        if user.is_empty() {
            return Err(error::SystemError::bad_request("No fields to update"));
        }

        let update_user = UpdateUser {
            email: user.email.as_deref().map(normalize_email),
            username: user.username,
            name: user.name,
            profile_index: user.profile_index,
        };

        let row = self.repo.update(&id, &update_user).await?;
        self.cache.delete(&info_key(&id)).await?;
        Ok(UserResponse::from(row))
    }

    pub async fn check_username(&self, username: &str) -> Result<(), error::SystemError> {
        match self.repo.find_by_username(username).await? {
            Some(_) => Err(error::SystemError::conflict("Username already taken")),
            None => Ok(()),
        }
    }

    pub async fn report_user(
        &self,
        reporter_id: Uuid,
        username: &str,
    ) -> Result<(), error::SystemError> {
        let target = self
            .repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if target.id == reporter_id {
            return Err(error::SystemError::bad_request("Cannot report yourself"));
        }

        self.repo.create_report(&reporter_id, &target.id).await.map_err(|e| {
            if e.is_conflict() {
                error::SystemError::conflict("User already reported")
            } else {
                e
            }
        })
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<(), error::SystemError> {
        if !self.repo.soft_delete(&id).await? {
            return Err(error::SystemError::not_found("User not found"));
        }
        self.cache.delete(&info_key(&id)).await?;
        info!("User {} deleted", id);
        Ok(())
    }

    pub async fn touch_last_activity(&self, id: Uuid) -> Result<(), error::SystemError> {
        self.repo.touch_last_activity(&id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{MemoryCache, MemoryStore};

    fn service(store: &MemoryStore) -> UserService {
        UserService::with_dependencies(
            Arc::new(store.clone()),
            Arc::new(MemoryCache::default()),
            TokenConfig { secret: "test-secret".to_string(), expiration: 60 },
        )
    }

    fn register_model(username: &str, email: &str) -> RegisterModel {
        RegisterModel {
            email: email.to_string(),
            username: username.to_string(),
            password: "correct horse".to_string(),
            name: Some("Alice".to_string()),
            profile_index: Some(2),
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_email() {
        let store = MemoryStore::default();
        let svc = service(&store);

        let user = svc.register(register_model("alice", "Alice@Example.com")).await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.user_detail.profile_index, 2);
    }

    #[tokio::test]
    async fn test_register_duplicate_username_conflicts() {
        let store = MemoryStore::default();
        let svc = service(&store);

        svc.register(register_model("alice", "a@example.com")).await.unwrap();
        let err = svc.register(register_model("ALICE", "b@example.com")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let store = MemoryStore::default();
        let svc = service(&store);
        svc.register(register_model("alice", "a@example.com")).await.unwrap();

        let (token, user) = svc
            .login(LoginModel { username: "alice".into(), password: "correct horse".into() })
            .await
            .unwrap();
        assert!(!token.is_empty());
        assert_eq!(user.username, "alice");

        let err = svc
            .login(LoginModel { username: "alice".into(), password: "wrong horse".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_update_requires_a_field() {
        let store = MemoryStore::default();
        let svc = service(&store);
        let user = svc.register(register_model("alice", "a@example.com")).await.unwrap();

        let empty = UpdateUserModel { email: None, username: None, name: None, profile_index: None };
        let err = svc.update_info(user.id, empty).await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_info() {
        let store = MemoryStore::default();
        let svc = service(&store);
        let user = svc.register(register_model("alice", "a@example.com")).await.unwrap();

        assert_eq!(svc.get_info(user.id).await.unwrap().name.as_deref(), Some("Alice"));

        let update = UpdateUserModel {
            email: None,
            username: None,
            name: Some("Alicia".into()),
            profile_index: None,
        };
        svc.update_info(user.id, update).await.unwrap();
        assert_eq!(svc.get_info(user.id).await.unwrap().name.as_deref(), Some("Alicia"));
    }

    #[tokio::test]
    async fn test_check_username() {
        let store = MemoryStore::default();
        let svc = service(&store);
        svc.register(register_model("alice", "a@example.com")).await.unwrap();

        assert!(svc.check_username("alice").await.unwrap_err().is_conflict());
        assert!(svc.check_username("bobby").await.is_ok());
    }

    #[tokio::test]
    async fn test_report_rules() {
        let store = MemoryStore::default();
        let svc = service(&store);
        let alice = svc.register(register_model("alice", "a@example.com")).await.unwrap();
        svc.register(register_model("bobby", "b@example.com")).await.unwrap();

        let err = svc.report_user(alice.id, "alice").await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));

        svc.report_user(alice.id, "bobby").await.unwrap();
        assert!(svc.report_user(alice.id, "bobby").await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_deleted_user_is_invisible() {
        let store = MemoryStore::default();
        let svc = service(&store);
        let user = svc.register(register_model("alice", "a@example.com")).await.unwrap();
        svc.get_info(user.id).await.unwrap();

        svc.soft_delete(user.id).await.unwrap();
        assert!(matches!(svc.get_info(user.id).await, Err(error::SystemError::NotFound(_))));
        assert!(matches!(
            svc.get_public_info("alice").await,
            Err(error::SystemError::NotFound(_))
        ));
        assert!(svc.check_username("alice").await.is_ok());
        assert!(svc.renew_token(user.id).await.is_err());
    }
}
