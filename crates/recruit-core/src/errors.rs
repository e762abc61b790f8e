use chrono::{DateTime, Utc};

use crate::domain::{ApplicationStatus, QuestionKey, UserId};

/// Uniqueness constraints the store enforces underneath the services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// One IN_PROGRESS/WAITING/PROCESSING application per user.
    ActiveApplicationPerUser,
    /// One open claim per admin.
    OpenClaimPerAdmin,
    /// One open claim per application.
    OpenClaimPerApplication,
    /// One user row per Telegram id.
    UserIdentity,
}

/// Core error type.
///
/// Domain failures are recoverable by the caller: the delivery layer turns each kind
/// into a reply. Faults (see [`Error::is_fault`]) point at bugs or corrupted data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("user {0:?} not found")]
    UserNotFound(UserId),

    #[error("user is banned")]
    UserIsBanned,

    #[error("application is waiting for review")]
    ApplicationAtWaitingStatus,

    #[error("application was already accepted")]
    ApplicationAlreadyAccepted,

    #[error("rejected application has no decision date")]
    ApplicationDecisionDateNotFound,

    #[error("application cooldown until {eligible_at}")]
    ApplicationCoolDown { eligible_at: DateTime<Utc> },

    #[error("application has wrong status: {status}")]
    ApplicationWrongStatus { status: ApplicationStatus },

    #[error("application does not exist")]
    ApplicationDoesNotExist,

    #[error("admin is already processing an application")]
    AdminAlreadyProcessedApplication,

    #[error("application is claimed by another admin")]
    ApplicationClaimedByAnotherAdmin,

    #[error("application is missing an answer to question {missing}")]
    ApplicationIncomplete { missing: QuestionKey },

    #[error("answer text is empty")]
    EmptyAnswer,

    #[error("answer is longer than {max} characters")]
    AnswerTooLong { max: usize },

    #[error("question {0} does not exist")]
    InvalidQuestion(u8),

    #[error("constraint violated: {0:?}")]
    Conflict(Constraint),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// True for failures that indicate a bug or data corruption rather than a user
    /// condition to wait out.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            Error::UserNotFound(_)
                | Error::ApplicationDecisionDateNotFound
                | Error::ApplicationWrongStatus { .. }
                | Error::Storage(_)
                | Error::Io(_)
                | Error::Json(_)
        )
    }

    /// Map store constraint violations onto the domain failure they stand for.
    pub fn into_domain(self) -> Self {
        match self {
            Error::Conflict(Constraint::ActiveApplicationPerUser) => {
                Error::ApplicationAtWaitingStatus
            }
            Error::Conflict(Constraint::OpenClaimPerAdmin) => {
                Error::AdminAlreadyProcessedApplication
            }
            Error::Conflict(Constraint::OpenClaimPerApplication) => {
                Error::ApplicationWrongStatus {
                    status: ApplicationStatus::Processing,
                }
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
