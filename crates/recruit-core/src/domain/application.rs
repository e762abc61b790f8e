use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{ApplicationId, UserId};
use crate::{errors::Error, Result};

/// Days a rejected applicant waits before applying again.
pub const DEFAULT_COOLDOWN_DAYS: i64 = 30;

/// Longest accepted answer, in characters. Five escaped answers at this length still
/// fit one Telegram message (4096 characters).
pub const MAX_ANSWER_CHARS: usize = 350;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    InProgress,
    Waiting,
    Processing,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::InProgress,
        ApplicationStatus::Waiting,
        ApplicationStatus::Processing,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::InProgress => "IN_PROGRESS",
            ApplicationStatus::Waiting => "WAITING",
            ApplicationStatus::Processing => "PROCESSING",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }

    /// Active applications block a user from opening another one.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ApplicationStatus::InProgress
                | ApplicationStatus::Waiting
                | ApplicationStatus::Processing
        )
    }

    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (InProgress, Waiting)
                | (Waiting, Processing)
                | (Processing, Accepted)
                | (Processing, Rejected)
        )
    }

    fn transition(self, next: ApplicationStatus) -> Result<ApplicationStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::ApplicationWrongStatus { status: self })
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question index, 1..=5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct QuestionKey(u8);

impl QuestionKey {
    pub const COUNT: u8 = 5;

    pub fn new(index: u8) -> Result<Self> {
        if (1..=Self::COUNT).contains(&index) {
            Ok(Self(index))
        } else {
            Err(Error::InvalidQuestion(index))
        }
    }

    pub fn all() -> impl Iterator<Item = QuestionKey> {
        (1..=Self::COUNT).map(QuestionKey)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for QuestionKey {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        QuestionKey::new(value)
    }
}

impl From<QuestionKey> for u8 {
    fn from(key: QuestionKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationAnswer {
    pub application_id: ApplicationId,
    pub question: QuestionKey,
    pub text: String,
}

/// A membership request and its review state.
///
/// Status changes go through the methods below so the fields each transition implies
/// (`admin_id`, `decision_date`, `invite_link`) move together with the status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub status: ApplicationStatus,
    pub admin_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub decision_date: Option<DateTime<Utc>>,
    pub invite_link: Option<String>,
    /// Stored separately; repositories attach them on load.
    #[serde(skip)]
    pub answers: BTreeMap<QuestionKey, ApplicationAnswer>,
}

impl Application {
    pub fn new(id: ApplicationId, user_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            status: ApplicationStatus::InProgress,
            admin_id: None,
            created_at,
            decision_date: None,
            invite_link: None,
            answers: BTreeMap::new(),
        }
    }

    /// Admin claims a WAITING application for review.
    pub fn take(&mut self, admin_id: UserId) -> Result<()> {
        self.status = self.status.transition(ApplicationStatus::Processing)?;
        self.admin_id = Some(admin_id);
        Ok(())
    }

    /// Drop all recorded answers; id and status stay.
    pub fn clear(&mut self) {
        self.answers.clear();
    }

    /// Record (or overwrite) the answer to `question`.
    pub fn answer(&mut self, question: QuestionKey, text: &str) -> Result<&ApplicationAnswer> {
        if self.status != ApplicationStatus::InProgress {
            return Err(Error::ApplicationWrongStatus {
                status: self.status,
            });
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyAnswer);
        }
        if text.chars().count() > MAX_ANSWER_CHARS {
            return Err(Error::AnswerTooLong {
                max: MAX_ANSWER_CHARS,
            });
        }
        let answer = ApplicationAnswer {
            application_id: self.id,
            question,
            text: text.to_string(),
        };
        self.answers.insert(question, answer);
        Ok(&self.answers[&question])
    }

    pub fn next_unanswered(&self) -> Option<QuestionKey> {
        QuestionKey::all().find(|k| !self.answers.contains_key(k))
    }

    /// Hand the completed form over to the admins.
    pub fn submit(&mut self) -> Result<()> {
        if self.status == ApplicationStatus::InProgress {
            if let Some(missing) = self.next_unanswered() {
                return Err(Error::ApplicationIncomplete { missing });
            }
        }
        self.status = self.status.transition(ApplicationStatus::Waiting)?;
        Ok(())
    }

    pub fn accept(&mut self, at: DateTime<Utc>, invite_link: Option<String>) -> Result<()> {
        self.status = self.status.transition(ApplicationStatus::Accepted)?;
        self.decision_date = Some(at);
        self.invite_link = invite_link;
        Ok(())
    }

    pub fn reject(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.status = self.status.transition(ApplicationStatus::Rejected)?;
        self.decision_date = Some(at);
        Ok(())
    }

    /// When a rejected applicant may apply again.
    pub fn cooldown_ends(&self, cooldown: Duration) -> Result<DateTime<Utc>> {
        if self.status != ApplicationStatus::Rejected {
            return Err(Error::ApplicationWrongStatus {
                status: self.status,
            });
        }
        let decided = self
            .decision_date
            .ok_or(Error::ApplicationDecisionDateNotFound)?;
        Ok(decided + cooldown)
    }
}
