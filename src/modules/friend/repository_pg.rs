use uuid::Uuid;

use crate::{
    api::error,
    modules::friend::{
        model::{FriendRequestResponse, FriendRequestRow, FriendResponse},
        repository::{FriendRepo, FriendRepository, FriendRequestRepository},
        schema::{ordered_pair, FriendRequestEntity},
    },
    utils::Pagination,
};

#[derive(Clone)]
pub struct FriendRepositoryPg {
    pool: sqlx::PgPool,
}

impl FriendRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FriendRepository for FriendRepositoryPg {
    async fn find_friends(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendResponse>, error::SystemError> {
        let friends = sqlx::query_as::<_, FriendResponse>(
            r#"
        SELECT
            u.id,
            u.username,
            u.name
        FROM friendships f
        JOIN users u
            ON u.id = CASE
                WHEN f.user_a = $1 THEN f.user_b
                ELSE f.user_a
            END
        WHERE (f.user_a = $1 OR f.user_b = $1)
          AND u.deleted_at IS NULL
        ORDER BY f.created_at
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(friends)
    }
}

#[async_trait::async_trait]
impl FriendRequestRepository for FriendRepositoryPg {
    async fn find_request(
        &self,
        requester_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            "SELECT * FROM friend_requests WHERE requester_id = $1 AND target_id = $2",
        )
        .bind(requester_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn find_sent_requests(
        &self,
        user_id: &Uuid,
        page: Option<Pagination>,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let (offset, limit) = match page {
            Some(p) => (p.offset, p.limit),
            None => (0, None),
        };

        // LIMIT NULL is no limit
        let rows = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT
                fr.id AS req_id,
                u.id AS user_id,
                u.username,
                u.name,
                fr.status,
                fr.created_at
            FROM friend_requests fr
            JOIN users u
                ON fr.target_id = u.id
            WHERE fr.requester_id = $1
              AND fr.status = 'pending'
              AND u.deleted_at IS NULL
            ORDER BY fr.created_at
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FriendRequestResponse::from).collect())
    }

    async fn find_received_requests(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let rows = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT
                fr.id AS req_id,
                u.id AS user_id,
                u.username,
                u.name,
                fr.status,
                fr.created_at
            FROM friend_requests fr
            JOIN users u
                ON fr.requester_id = u.id
            WHERE fr.target_id = $1
              AND fr.status = 'pending'
              AND u.deleted_at IS NULL
            ORDER BY fr.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FriendRequestResponse::from).collect())
    }

    async fn create_request(
        &self,
        requester_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            INSERT INTO friend_requests (id, requester_id, target_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(requester_id)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(request)
    }
}

#[async_trait::async_trait]
impl FriendRepo for FriendRepositoryPg {
    async fn accept_request_atomic(
        &self,
        requester_id: &Uuid,
        target_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE friend_requests
            SET status = 'accepted', updated_at = NOW()
            WHERE requester_id = $1 AND target_id = $2 AND status = 'pending'
            "#,
        )
        .bind(requester_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if flipped == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let (u1, u2) = ordered_pair(*requester_id, *target_id);

        sqlx::query(
            "INSERT INTO friendships (user_a, user_b) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(u1)
        .bind(u2)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }
}
