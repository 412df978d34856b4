//! Error types for the achievement workflow
use super::reference::AchievementStatus;
use std::time::Duration;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,
    #[error("Achievement type is required")]
    MissingType,
    #[error(
        "Achievement type '{0}' is invalid. Options: academic, competition, organization, publication, certification, other"
    )]
    InvalidType(String),
    #[error("Invalid achievement ID '{0}'")]
    InvalidContentId(String),
    #[error("Rejection note is required")]
    EmptyRejectionNote,
    #[error("Invalid status filter '{0}'")]
    InvalidStatus(String),
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(String),
    #[error("failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("a reference already exists for content {0}")]
    DuplicateContent(String),
    #[error("record was modified concurrently")]
    Stale,
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn encode(err: impl std::fmt::Display) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<sled::transaction::TransactionError<StoreError>> for StoreError {
    fn from(value: sled::transaction::TransactionError<StoreError>) -> Self {
        match value {
            sled::transaction::TransactionError::Abort(err) => err,
            sled::transaction::TransactionError::Storage(err) => StoreError::Sled(err),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("Achievement cannot move from {from} to {to}")]
pub struct TransitionError {
    pub from: AchievementStatus,
    pub to: AchievementStatus,
}

#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    InvalidTransition {
        message: String,
        current: AchievementStatus,
    },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl WorkflowError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>, current: AchievementStatus) -> Self {
        Self::InvalidTransition {
            message: msg.into(),
            current,
        }
    }

    /// Status echoed back to the caller when a status precondition failed
    pub fn current_status(&self) -> Option<AchievementStatus> {
        match self {
            Self::InvalidTransition { current, .. } => Some(*current),
            _ => None,
        }
    }
}
