// src/store.rs
use uuid::Uuid;

use crate::db::PgStore;
use crate::error::AppError;
use crate::memory::MemoryStore;
use crate::models::{Identity, Poll, Vote};

/// Persistence for polls, votes and the sessions written by the identity provider.
#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    pub async fn resolve_session(&self, token: &str) -> Result<Option<Identity>, AppError> {
        match self {
            Store::Postgres(pg) => pg.resolve_session(token).await,
            Store::Memory(mem) => Ok(mem.resolve_session(token).await),
        }
    }

    /// Newest first, optionally restricted to one creator.
    pub async fn list_polls(&self, creator: Option<Uuid>) -> Result<Vec<Poll>, AppError> {
        match self {
            Store::Postgres(pg) => pg.list_polls(creator).await,
            Store::Memory(mem) => Ok(mem.list_polls(creator).await),
        }
    }

    pub async fn find_poll(&self, poll_id: Uuid) -> Result<Option<Poll>, AppError> {
        match self {
            Store::Postgres(pg) => pg.find_poll(poll_id).await,
            Store::Memory(mem) => Ok(mem.find_poll(poll_id).await),
        }
    }

    pub async fn insert_poll(&self, poll: &Poll) -> Result<(), AppError> {
        match self {
            Store::Postgres(pg) => pg.insert_poll(poll).await,
            Store::Memory(mem) => {
                mem.insert_poll(poll.clone()).await;
                Ok(())
            }
        }
    }

    /// Writes question, options and `updated_at`. Returns false if the poll is gone.
    pub async fn update_poll(&self, poll: &Poll) -> Result<bool, AppError> {
        match self {
            Store::Postgres(pg) => pg.update_poll(poll).await,
            Store::Memory(mem) => Ok(mem.update_poll(poll).await),
        }
    }

    /// Deletes the poll together with its votes.
    pub async fn delete_poll(&self, poll_id: Uuid) -> Result<bool, AppError> {
        match self {
            Store::Postgres(pg) => pg.delete_poll(poll_id).await,
            Store::Memory(mem) => Ok(mem.delete_poll(poll_id).await),
        }
    }

    pub async fn votes_for_poll(&self, poll_id: Uuid) -> Result<Vec<Vote>, AppError> {
        match self {
            Store::Postgres(pg) => pg.votes_for_poll(poll_id).await,
            Store::Memory(mem) => Ok(mem.votes_for_poll(poll_id).await),
        }
    }

    pub async fn find_vote(&self, poll_id: Uuid, user_id: Uuid) -> Result<Option<Vote>, AppError> {
        match self {
            Store::Postgres(pg) => pg.find_vote(poll_id, user_id).await,
            Store::Memory(mem) => Ok(mem.find_vote(poll_id, user_id).await),
        }
    }

    /// Fails with `AlreadyVoted` when the voter already has a vote on the poll
    /// and with `NotFound` when the poll no longer exists.
    pub async fn insert_vote(&self, vote: &Vote) -> Result<(), AppError> {
        match self {
            Store::Postgres(pg) => pg.insert_vote(vote).await,
            Store::Memory(mem) => mem.insert_vote(vote.clone()).await,
        }
    }

    pub async fn delete_vote(&self, poll_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        match self {
            Store::Postgres(pg) => pg.delete_vote(poll_id, user_id).await,
            Store::Memory(mem) => Ok(mem.delete_vote(poll_id, user_id).await),
        }
    }
}
