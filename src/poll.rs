// src/poll.rs
use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Identity, Poll, PollInput, ShareLinks, Vote};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionCount {
    pub option: String,
    pub votes: u64,
    pub percentage: f64,
}

/// Per-option vote counts for one poll, in option order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tally {
    pub options: Vec<OptionCount>,
    pub total: u64,
}

impl Tally {
    pub fn count(&self, option: &str) -> Option<u64> {
        self.options
            .iter()
            .find(|entry| entry.option == option)
            .map(|entry| entry.votes)
    }
}

/// Counts `selections` against `options`.
///
/// Every distinct option gets an entry, zero-vote options included, in the
/// order it first appears. Selections naming an option the poll no longer
/// has are skipped, so `total` is the number of votes actually counted.
pub fn tally<'a, I>(options: &[String], selections: I) -> Tally
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(&str, u64)> = Vec::with_capacity(options.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(options.len());

    for option in options {
        if !index.contains_key(option.as_str()) {
            index.insert(option.as_str(), counts.len());
            counts.push((option.as_str(), 0));
        }
    }

    for selection in selections {
        match index.get(selection) {
            Some(&slot) => counts[slot].1 += 1,
            None => debug!(selection, "Ignoring vote for unknown option"),
        }
    }

    let total: u64 = counts.iter().map(|(_, votes)| votes).sum();

    Tally {
        options: counts
            .into_iter()
            .map(|(option, votes)| OptionCount {
                option: option.to_string(),
                votes,
                percentage: percentage(votes, total),
            })
            .collect(),
        total,
    }
}

fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 * 1000.0 / total as f64).round() / 10.0
}

/// Poll ids are opaque to clients, so an unparseable one is simply unknown.
pub fn parse_poll_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

pub async fn load_poll(store: &Store, poll_id: Uuid) -> Result<Poll, AppError> {
    store.find_poll(poll_id).await?.ok_or(AppError::NotFound)
}

pub async fn results(store: &Store, poll: &Poll) -> Result<Tally, AppError> {
    let votes = store.votes_for_poll(poll.id).await?;
    Ok(tally(
        &poll.options,
        votes.iter().map(|vote| vote.selected_option.as_str()),
    ))
}

/// The caller's current choice on `poll_id`, if any.
pub async fn current_vote(
    store: &Store,
    poll_id: Uuid,
    identity: Option<&Identity>,
) -> Result<Option<String>, AppError> {
    let Some(identity) = identity else {
        return Ok(None);
    };

    Ok(store
        .find_vote(poll_id, identity.id)
        .await?
        .map(|vote| vote.selected_option))
}

pub async fn submit_vote(
    store: &Store,
    poll_id: Uuid,
    selected_option: &str,
    identity: Option<&Identity>,
) -> Result<Vote, AppError> {
    let identity = identity.ok_or(AppError::Unauthorized)?;
    let poll = load_poll(store, poll_id).await?;

    if !poll.options.iter().any(|option| option == selected_option) {
        return Err(AppError::InvalidOption);
    }

    if store.find_vote(poll.id, identity.id).await?.is_some() {
        return Err(AppError::AlreadyVoted);
    }

    let vote = Vote {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        selected_option: selected_option.to_string(),
        poll_id: poll.id,
        user_id: identity.id,
    };

    // The store rejects a concurrent duplicate that slipped past the check above.
    store.insert_vote(&vote).await?;

    info!(poll_id = %poll.id, user_id = %identity.id, "Vote recorded");
    Ok(vote)
}

pub async fn remove_vote(
    store: &Store,
    poll_id: Uuid,
    identity: Option<&Identity>,
) -> Result<(), AppError> {
    let identity = identity.ok_or(AppError::Unauthorized)?;
    let poll = load_poll(store, poll_id).await?;

    if !store.delete_vote(poll.id, identity.id).await? {
        return Err(AppError::VoteNotFound);
    }

    info!(poll_id = %poll.id, user_id = %identity.id, "Vote removed");
    Ok(())
}

pub async fn list_polls(
    store: &Store,
    mine: bool,
    identity: Option<&Identity>,
) -> Result<Vec<Poll>, AppError> {
    let creator = match (mine, identity) {
        (false, _) => None,
        (true, Some(identity)) => Some(identity.id),
        (true, None) => return Err(AppError::Unauthorized),
    };

    store.list_polls(creator).await
}

pub async fn create_poll(
    store: &Store,
    input: &PollInput,
    identity: Option<&Identity>,
) -> Result<Poll, AppError> {
    let identity = identity.ok_or(AppError::Unauthorized)?;
    let draft = input.validate()?;

    let now = Utc::now();
    let poll = Poll {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        question: draft.question,
        options: draft.options,
        creator_id: identity.id,
    };

    store.insert_poll(&poll).await?;

    info!(poll_id = %poll.id, creator_id = %identity.id, "Poll created");
    Ok(poll)
}

/// Loads a poll the caller is allowed to change.
async fn owned_poll(store: &Store, poll_id: Uuid, identity: &Identity) -> Result<Poll, AppError> {
    let poll = load_poll(store, poll_id).await?;
    if poll.creator_id != identity.id {
        return Err(AppError::Forbidden);
    }
    Ok(poll)
}

pub async fn update_poll(
    store: &Store,
    poll_id: Uuid,
    input: &PollInput,
    identity: Option<&Identity>,
) -> Result<Poll, AppError> {
    let identity = identity.ok_or(AppError::Unauthorized)?;
    let mut poll = owned_poll(store, poll_id, identity).await?;
    let draft = input.validate()?;

    poll.question = draft.question;
    poll.options = draft.options;
    poll.updated_at = Utc::now();

    if !store.update_poll(&poll).await? {
        return Err(AppError::NotFound);
    }

    info!(poll_id = %poll.id, "Poll updated");
    Ok(poll)
}

pub async fn delete_poll(
    store: &Store,
    poll_id: Uuid,
    identity: Option<&Identity>,
) -> Result<(), AppError> {
    let identity = identity.ok_or(AppError::Unauthorized)?;
    let poll = owned_poll(store, poll_id, identity).await?;

    if !store.delete_poll(poll.id).await? {
        return Err(AppError::NotFound);
    }

    info!(poll_id = %poll.id, "Poll deleted");
    Ok(())
}

pub fn share_links(public_url: &str, poll_id: Uuid) -> ShareLinks {
    ShareLinks {
        url: format!("{public_url}/polls/{poll_id}"),
        results_url: format!("{public_url}/api/polls/{poll_id}/vote"),
    }
}
