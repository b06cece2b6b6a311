// src/models.rs
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, FieldErrors};
use crate::poll::Tally;

pub const MAX_QUESTION_LEN: usize = 500;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;
pub const MAX_OPTION_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub question: String,
    #[sqlx(json)]
    pub options: Vec<String>,
    pub creator_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub selected_option: String,
    pub poll_id: Uuid,
    pub user_id: Uuid,
}

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Body of `POST /api/polls` and `PUT /api/polls/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PollInput {
    pub question: String,
    pub options: Vec<String>,
}

/// A poll body that passed validation, trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct PollDraft {
    pub question: String,
    pub options: Vec<String>,
}

impl PollInput {
    pub fn validate(&self) -> Result<PollDraft, AppError> {
        let mut errors = FieldErrors::new();

        let question = self.question.trim();
        if question.is_empty() {
            push_error(&mut errors, "question", "Question is required".to_string());
        } else if question.chars().count() > MAX_QUESTION_LEN {
            push_error(
                &mut errors,
                "question",
                format!("Question must be at most {MAX_QUESTION_LEN} characters"),
            );
        }

        let options: Vec<String> = self.options.iter().map(|o| o.trim().to_string()).collect();
        if options.len() < MIN_OPTIONS {
            push_error(
                &mut errors,
                "options",
                format!("At least {MIN_OPTIONS} options are required"),
            );
        } else if options.len() > MAX_OPTIONS {
            push_error(
                &mut errors,
                "options",
                format!("At most {MAX_OPTIONS} options are allowed"),
            );
        }

        let mut seen = HashSet::new();
        for (position, option) in options.iter().enumerate() {
            let label = position + 1;
            if option.is_empty() {
                push_error(&mut errors, "options", format!("Option {label} is empty"));
            } else if option.chars().count() > MAX_OPTION_LEN {
                push_error(
                    &mut errors,
                    "options",
                    format!("Option {label} must be at most {MAX_OPTION_LEN} characters"),
                );
            } else if !seen.insert(option.to_lowercase()) {
                push_error(
                    &mut errors,
                    "options",
                    format!("Option {label} duplicates an earlier option"),
                );
            }
        }

        if !errors.is_empty() {
            return Err(AppError::ValidationFailed(errors));
        }

        Ok(PollDraft {
            question: question.to_string(),
            options,
        })
    }
}

fn push_error(errors: &mut FieldErrors, field: &str, message: String) {
    errors.entry(field.to_string()).or_default().push(message);
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(alias = "option")]
    pub selected_option: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub mine: bool,
}

/// `GET /api/polls/{id}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetails {
    pub poll: Poll,
    pub results: Tally,
    pub my_vote: Option<String>,
}

/// `GET /api/polls/{id}/vote`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub poll_id: Uuid,
    pub results: Tally,
    pub has_voted: bool,
    pub my_vote: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinks {
    pub url: String,
    pub results_url: String,
}

/// Outcome of an action, successful or not.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }
}
