use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{api::error, modules::verification::code::VerificationCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeState {
    Issued,
    Consumed { at: DateTime<Utc> },
    Superseded { at: DateTime<Utc> },
}

fn code_state(consumed_at: Option<DateTime<Utc>>, superseded_at: Option<DateTime<Utc>>) -> CodeState {
    match (consumed_at, superseded_at) {
        (Some(at), _) => CodeState::Consumed { at },
        (None, Some(at)) => CodeState::Superseded { at },
        (None, None) => CodeState::Issued,
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EmailVerificationEntity {
    pub id: Uuid,
    pub email: String,
    pub code: VerificationCode,
    pub created_at: DateTime<Utc>,
    /// Bumped every time the code is mailed; throttling counts from here.
    pub last_sent_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub superseded_at: Option<DateTime<Utc>>,
}

impl EmailVerificationEntity {
    pub fn state(&self) -> CodeState {
        code_state(self.consumed_at, self.superseded_at)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetCodeEntity {
    pub id: Uuid,
    pub change_id: Uuid,
    pub user_id: Uuid,
    pub code: VerificationCode,
    pub created_at: DateTime<Utc>,
    /// Bumped every time the code is mailed; throttling counts from here.
    pub last_sent_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub superseded_at: Option<DateTime<Utc>>,
}

impl PasswordResetCodeEntity {
    pub fn state(&self) -> CodeState {
        code_state(self.consumed_at, self.superseded_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordChangeState {
    Open,
    Completed { at: DateTime<Utc> },
}

/// Journal entry bounding one password change attempt.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordChangeEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PasswordChangeEntity {
    pub fn state(&self) -> PasswordChangeState {
        match self.completed_at {
            Some(at) => PasswordChangeState::Completed { at },
            None => PasswordChangeState::Open,
        }
    }

    /// The window runs from the entry's own creation, not the code's.
    pub fn ensure_usable(
        &self,
        now: DateTime<Utc>,
        expiry: chrono::Duration,
    ) -> Result<(), error::SystemError> {
        if let PasswordChangeState::Completed { .. } = self.state() {
            return Err(error::SystemError::bad_request("Invalid link"));
        }
        if now - self.created_at > expiry {
            return Err(error::SystemError::expired("Link expired"));
        }
        Ok(())
    }
}
