use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use uuid::Uuid;

use crate::{
    api::error,
    clients::mailer::{EmailMessage, EmailTemplate},
    jobs::{Job, JobQueue},
    modules::{
        user::repository::UserRepository,
        verification::{
            code::VerificationCode,
            model::{CodePolicy, IssueOutcome, Subject},
            repository::VerificationRepo,
            schema::CodeState,
        },
    },
    utils::{hash_password, normalize_email},
};

fn invalid_code() -> error::SystemError {
    error::SystemError::bad_request("Invalid code")
}

fn invalid_link() -> error::SystemError {
    error::SystemError::bad_request("Invalid link")
}

#[derive(Clone)]
pub struct VerificationService<V, U>
where
    V: VerificationRepo,
    U: UserRepository + Send + Sync,
{
    repo: Arc<V>,
    user_repo: Arc<U>,
    jobs: JobQueue,
    email_policy: CodePolicy,
    reset_policy: CodePolicy,
}

impl<V, U> VerificationService<V, U>
where
    V: VerificationRepo,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(
        repo: Arc<V>,
        user_repo: Arc<U>,
        jobs: JobQueue,
        email_policy: CodePolicy,
        reset_policy: CodePolicy,
    ) -> Self {
        VerificationService { repo, user_repo, jobs, email_policy, reset_policy }
    }

    fn policy(&self, subject: &Subject) -> &CodePolicy {
        match subject {
            Subject::Email(_) => &self.email_policy,
            Subject::User(_) => &self.reset_policy,
        }
    }

    /// Time left before `subject` may be sent another code, measured from
    /// the last mail, whether that carried a fresh or a reused code.
    pub async fn throttle_check(
        &self,
        subject: &Subject,
        now: DateTime<Utc>,
    ) -> Result<Option<chrono::Duration>, error::SystemError> {
        let latest = match subject {
            Subject::Email(email) => self.repo.last_email_sent_at(email).await?,
            Subject::User(user_id) => self.repo.last_reset_sent_at(user_id).await?,
        };

        let Some(sent_at) = latest else {
            return Ok(None);
        };

        let ready_at = sent_at + self.policy(subject).retry_interval;
        Ok((ready_at > now).then(|| ready_at - now))
    }

    /// Hands back the outstanding code for `subject` or persists a new one.
    pub async fn issue_or_reuse(&self, subject: &Subject) -> Result<IssueOutcome, error::SystemError> {
        match subject {
            Subject::Email(email) => self.issue_email_code(email).await,
            Subject::User(user_id) => Ok(self.issue_reset_code(user_id).await?.0),
        }
    }

    async fn issue_email_code(&self, email: &str) -> Result<IssueOutcome, error::SystemError> {
        if let Some(existing) = self.repo.find_outstanding_email_code(email).await? {
            if existing.state() == CodeState::Issued {
                return Ok(IssueOutcome::Reused(existing.code));
            }
        }

        let code = VerificationCode::generate(self.email_policy.digits);
        match self.repo.insert_email_code(email, &code).await {
            Ok(row) => Ok(IssueOutcome::Issued(row.code)),
            // lost a race with a concurrent issuance; theirs is the outstanding one
            Err(e) if e.is_conflict() => self
                .repo
                .find_outstanding_email_code(email)
                .await?
                .map(|row| IssueOutcome::Reused(row.code))
                .ok_or(e),
            Err(e) => Err(e),
        }
    }

    async fn issue_reset_code(
        &self,
        user_id: &Uuid,
    ) -> Result<(IssueOutcome, Uuid), error::SystemError> {
        if let Some(existing) = self.repo.find_outstanding_reset_code(user_id).await? {
            let change = self.repo.find_change(&existing.change_id).await?;
            let usable = change
                .is_some_and(|c| c.ensure_usable(Utc::now(), self.reset_policy.expiry).is_ok());
            if existing.state() == CodeState::Issued && usable {
                return Ok((IssueOutcome::Reused(existing.code), existing.change_id));
            }
        }

        let code = VerificationCode::generate(self.reset_policy.digits);
        match self.repo.open_reset(user_id, &code).await {
            Ok((change, reset_code)) => Ok((IssueOutcome::Issued(reset_code.code), change.id)),
            // a concurrent reset opened its entry first; mail that one instead
            Err(e) if e.is_conflict() => self
                .repo
                .find_outstanding_reset_code(user_id)
                .await?
                .map(|row| (IssueOutcome::Reused(row.code), row.change_id))
                .ok_or(e),
            Err(e) => Err(e),
        }
    }

    pub async fn request_email_verification(
        &self,
        email: &str,
    ) -> Result<IssueOutcome, error::SystemError> {
        let email = normalize_email(email);

        if self.repo.has_consumed_email_code(&email).await? {
            info!("Email verification skipped, already verified");
            return Ok(IssueOutcome::AlreadyVerified);
        }

        let subject = Subject::Email(email.clone());
        if let Some(retry_after) = self.throttle_check(&subject, Utc::now()).await? {
            info!("Email verification throttled for {}s", retry_after.num_seconds());
            return Ok(IssueOutcome::Throttled { retry_after });
        }

        let outcome = self.issue_or_reuse(&subject).await?;
        if let IssueOutcome::Issued(code) | IssueOutcome::Reused(code) = &outcome {
            self.repo.mark_email_code_sent(&email).await?;
            self.jobs.enqueue(Job::SendEmail(EmailMessage {
                to: email,
                template: EmailTemplate::AccountRegistration { code: code.clone() },
            }));
        }
        Ok(outcome)
    }

    /// Consumes the code. Any mismatch, including a consumed or superseded
    /// code, reads as the same generic error.
    pub async fn validate_email(&self, email: &str, submitted: &str) -> Result<(), error::SystemError> {
        let email = normalize_email(email);
        let code = VerificationCode::parse(submitted, self.email_policy.digits).ok_or_else(invalid_code)?;

        if !self.repo.consume_email_code(&email, &code).await? {
            return Err(invalid_code());
        }
        info!("Email verified");
        Ok(())
    }

    pub async fn is_email_verified(&self, email: &str) -> Result<bool, error::SystemError> {
        self.repo.has_consumed_email_code(&normalize_email(email)).await
    }

    /// Gate for any path that makes `email` the address of an account.
    pub async fn ensure_email_verified(&self, email: &str) -> Result<(), error::SystemError> {
        if !self.is_email_verified(email).await? {
            return Err(error::SystemError::bad_request("Email is not verified"));
        }
        Ok(())
    }

    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<IssueOutcome, error::SystemError> {
        let email = normalize_email(email);

        let Some(user) = self.user_repo.find_by_email(&email).await? else {
            info!("Password reset requested for unknown email");
            return Ok(IssueOutcome::UnknownSubject);
        };

        let subject = Subject::User(user.id);
        if let Some(retry_after) = self.throttle_check(&subject, Utc::now()).await? {
            info!("Password reset throttled for user {} ({}s)", user.id, retry_after.num_seconds());
            return Ok(IssueOutcome::Throttled { retry_after });
        }

        let (outcome, change_id) = self.issue_reset_code(&user.id).await?;
        if let IssueOutcome::Issued(code) | IssueOutcome::Reused(code) = &outcome {
            self.repo.mark_reset_code_sent(&user.id).await?;
            self.jobs.enqueue(Job::SendEmail(EmailMessage {
                to: user.email,
                template: EmailTemplate::PasswordReset { change_id, code: code.clone() },
            }));
        }
        Ok(outcome)
    }

    /// Does not consume the code.
    pub async fn check_reset_code(&self, email: &str, submitted: &str) -> Result<(), error::SystemError> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid_code)?;
        let code = VerificationCode::parse(submitted, self.reset_policy.digits).ok_or_else(invalid_code)?;

        let outstanding = self
            .repo
            .find_outstanding_reset_code(&user.id)
            .await?
            .filter(|c| c.state() == CodeState::Issued && c.code == code)
            .ok_or_else(invalid_code)?;

        let change = self.repo.find_change(&outstanding.change_id).await?.ok_or_else(invalid_link)?;
        change.ensure_usable(Utc::now(), self.reset_policy.expiry)
    }

    pub async fn reset_password_with_code(
        &self,
        email: &str,
        submitted: &str,
        new_password: &str,
    ) -> Result<(), error::SystemError> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid_code)?;
        let code = VerificationCode::parse(submitted, self.reset_policy.digits).ok_or_else(invalid_code)?;
        let hash = hash_password(new_password)?;

        let consumed = self.repo.consume_reset_code(&user.id, &code).await?.ok_or_else(invalid_code)?;

        let change = self.repo.find_change(&consumed.change_id).await?.ok_or_else(invalid_link)?;
        change.ensure_usable(Utc::now(), self.reset_policy.expiry)?;

        if !self.repo.complete_change(&change.id, &user.id).await? {
            return Err(invalid_link());
        }

        if !self.user_repo.update_password(&user.id, &hash).await? {
            return Err(error::SystemError::not_found("User not found"));
        }
        info!("Password reset with code for user {}", user.id);
        Ok(())
    }

    pub async fn reset_password_with_link(
        &self,
        change_id: Uuid,
        new_password: &str,
    ) -> Result<(), error::SystemError> {
        let change = self.repo.find_change(&change_id).await?.ok_or_else(invalid_link)?;
        change.ensure_usable(Utc::now(), self.reset_policy.expiry)?;
        let hash = hash_password(new_password)?;

        if !self.repo.complete_change(&change.id, &change.user_id).await? {
            return Err(invalid_link());
        }

        if !self.user_repo.update_password(&change.user_id, &hash).await? {
            return Err(error::SystemError::not_found("User not found"));
        }

        let consumed = self.repo.consume_reset_codes_for_change(&change.id).await?;
        info!("Password reset with link for user {} ({consumed} code(s) retired)", change.user_id);
        Ok(())
    }

    /// Authenticated change. The journal entry is closed by the job worker.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        new_password: &str,
    ) -> Result<(), error::SystemError> {
        let hash = hash_password(new_password)?;
        let change = self.repo.create_change(&user_id).await?;

        if !self.user_repo.update_password(&user_id, &hash).await? {
            warn!("Password change {} opened for missing user {}", change.id, user_id);
            return Err(error::SystemError::not_found("User not found"));
        }

        self.jobs.enqueue(Job::CompletePasswordChange { change_id: change.id, user_id });
        Ok(())
    }
}
