// src/memory.rs
//! In-process store used when no `DATABASE_URL` is configured, and by tests.
//!
//! Everything lives behind one `RwLock`, so the duplicate-vote check and the
//! insert happen under the same write guard.
use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Identity, Poll, Vote};

struct Session {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, Identity>,
    sessions: HashMap<String, Session>,
    polls: Vec<Poll>,
    votes: Vec<Vote>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, identity: Identity) {
        self.inner.write().await.users.insert(identity.id, identity);
    }

    /// Registers a session the way the identity provider would.
    pub async fn insert_session(
        &self,
        token: impl Into<String>,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) {
        self.inner.write().await.sessions.insert(
            token.into(),
            Session {
                user_id,
                expires_at,
            },
        );
    }

    pub async fn resolve_session(&self, token: &str) -> Option<Identity> {
        let inner = self.inner.read().await;
        let session = inner.sessions.get(token)?;
        if session.expires_at <= Utc::now() {
            return None;
        }
        inner.users.get(&session.user_id).cloned()
    }

    pub async fn list_polls(&self, creator: Option<Uuid>) -> Vec<Poll> {
        let inner = self.inner.read().await;
        let mut polls: Vec<Poll> = inner
            .polls
            .iter()
            .filter(|poll| creator.map_or(true, |id| poll.creator_id == id))
            .cloned()
            .collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        polls
    }

    pub async fn find_poll(&self, poll_id: Uuid) -> Option<Poll> {
        let inner = self.inner.read().await;
        inner.polls.iter().find(|poll| poll.id == poll_id).cloned()
    }

    pub async fn insert_poll(&self, poll: Poll) {
        self.inner.write().await.polls.push(poll);
    }

    pub async fn update_poll(&self, poll: &Poll) -> bool {
        let mut inner = self.inner.write().await;
        match inner.polls.iter_mut().find(|stored| stored.id == poll.id) {
            Some(stored) => {
                stored.question = poll.question.clone();
                stored.options = poll.options.clone();
                stored.updated_at = poll.updated_at;
                true
            }
            None => false,
        }
    }

    pub async fn delete_poll(&self, poll_id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        let before = inner.polls.len();
        inner.polls.retain(|poll| poll.id != poll_id);
        if inner.polls.len() == before {
            return false;
        }
        inner.votes.retain(|vote| vote.poll_id != poll_id);
        true
    }

    pub async fn votes_for_poll(&self, poll_id: Uuid) -> Vec<Vote> {
        let inner = self.inner.read().await;
        inner
            .votes
            .iter()
            .filter(|vote| vote.poll_id == poll_id)
            .cloned()
            .collect()
    }

    pub async fn find_vote(&self, poll_id: Uuid, user_id: Uuid) -> Option<Vote> {
        let inner = self.inner.read().await;
        inner
            .votes
            .iter()
            .find(|vote| vote.poll_id == poll_id && vote.user_id == user_id)
            .cloned()
    }

    pub async fn insert_vote(&self, vote: Vote) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if !inner.polls.iter().any(|poll| poll.id == vote.poll_id) {
            return Err(AppError::NotFound);
        }
        if inner
            .votes
            .iter()
            .any(|existing| existing.poll_id == vote.poll_id && existing.user_id == vote.user_id)
        {
            return Err(AppError::AlreadyVoted);
        }
        inner.votes.push(vote);
        Ok(())
    }

    pub async fn delete_vote(&self, poll_id: Uuid, user_id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        let before = inner.votes.len();
        inner
            .votes
            .retain(|vote| !(vote.poll_id == poll_id && vote.user_id == user_id));
        inner.votes.len() != before
    }
}
