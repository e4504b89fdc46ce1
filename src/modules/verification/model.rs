use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::error,
    modules::verification::code::{VerificationCode, MAX_CODE_DIGITS},
};

/// Key a code is issued against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Email(String),
    User(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    Issued(VerificationCode),
    Reused(VerificationCode),
    Throttled { retry_after: chrono::Duration },
    AlreadyVerified,
    UnknownSubject,
}

#[derive(Debug, Clone, Copy)]
pub struct CodePolicy {
    pub digits: usize,
    pub retry_interval: chrono::Duration,
    pub expiry: chrono::Duration,
}

impl CodePolicy {
    /// Rejects widths the request models could never accept and durations
    /// chrono cannot represent.
    pub fn new(
        digits: usize,
        retry_seconds: u64,
        expiry_minutes: u64,
    ) -> Result<Self, error::SystemError> {
        if !(1..=MAX_CODE_DIGITS).contains(&digits) {
            return Err(error::SystemError::internal(format!(
                "Code width must be between 1 and {MAX_CODE_DIGITS} digits, got {digits}"
            )));
        }

        let retry_interval = i64::try_from(retry_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                error::SystemError::internal(format!("Retry interval of {retry_seconds}s is out of range"))
            })?;
        let expiry = i64::try_from(expiry_minutes)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .ok_or_else(|| {
                error::SystemError::internal(format!("Expiry of {expiry_minutes}min is out of range"))
            })?;

        Ok(CodePolicy { digits, retry_interval, expiry })
    }
}

#[derive(Deserialize, Validate)]
pub struct EmailModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Deserialize, Validate)]
pub struct EmailCodeModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 16, message = "Invalid code"))]
    pub code: String,
}

#[derive(Deserialize, Validate)]
pub struct ResetWithCodeModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 16, message = "Invalid code"))]
    pub code: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters long"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct ChangeLinkQuery {
    pub id: Uuid,
}
