// src/db.rs
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, StartupError};
use crate::models::{Identity, Poll, Vote};

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), StartupError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

/// PostgreSQL-backed store. The `votes` table carries `UNIQUE (poll_id, user_id)`
/// and cascades on poll deletion.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn resolve_session(&self, token: &str) -> Result<Option<Identity>, AppError> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT u.id, u.email
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > now()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    pub async fn list_polls(&self, creator: Option<Uuid>) -> Result<Vec<Poll>, AppError> {
        let polls = sqlx::query_as::<_, Poll>(
            r#"
            SELECT id, created_at, updated_at, question, options, creator_id
            FROM polls
            WHERE $1::uuid IS NULL OR creator_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(creator)
        .fetch_all(&self.pool)
        .await?;

        Ok(polls)
    }

    pub async fn find_poll(&self, poll_id: Uuid) -> Result<Option<Poll>, AppError> {
        let poll = sqlx::query_as::<_, Poll>(
            "SELECT id, created_at, updated_at, question, options, creator_id FROM polls WHERE id = $1",
        )
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(poll)
    }

    pub async fn insert_poll(&self, poll: &Poll) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO polls (id, created_at, updated_at, question, options, creator_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(poll.id)
        .bind(poll.created_at)
        .bind(poll.updated_at)
        .bind(&poll.question)
        .bind(Json(&poll.options))
        .bind(poll.creator_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_poll(&self, poll: &Poll) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE polls SET question = $2, options = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(poll.id)
        .bind(&poll.question)
        .bind(Json(&poll.options))
        .bind(poll.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_poll(&self, poll_id: Uuid) -> Result<bool, AppError> {
        // votes go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(poll_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn votes_for_poll(&self, poll_id: Uuid) -> Result<Vec<Vote>, AppError> {
        let votes = sqlx::query_as::<_, Vote>(
            r#"
            SELECT id, created_at, selected_option, poll_id, user_id
            FROM votes
            WHERE poll_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(votes)
    }

    pub async fn find_vote(&self, poll_id: Uuid, user_id: Uuid) -> Result<Option<Vote>, AppError> {
        let vote = sqlx::query_as::<_, Vote>(
            r#"
            SELECT id, created_at, selected_option, poll_id, user_id
            FROM votes
            WHERE poll_id = $1 AND user_id = $2
            "#,
        )
        .bind(poll_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vote)
    }

    pub async fn insert_vote(&self, vote: &Vote) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO votes (id, created_at, selected_option, poll_id, user_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(vote.id)
        .bind(vote.created_at)
        .bind(&vote.selected_option)
        .bind(vote.poll_id)
        .bind(vote.user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::AlreadyVoted,
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => AppError::NotFound,
            other => AppError::Database(other),
        })?;

        Ok(())
    }

    pub async fn delete_vote(&self, poll_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM votes WHERE poll_id = $1 AND user_id = $2")
            .bind(poll_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
