use actix_web::{post, web};

use crate::{
    api::{error, success},
    modules::{
        user::{model::ChangePasswordModel, repository_pg::UserRepositoryPg},
        verification::{
            model::{ChangeLinkQuery, EmailCodeModel, EmailModel, IssueOutcome, ResetWithCodeModel},
            repository_pg::VerificationRepositoryPg,
            service::VerificationService,
        },
    },
    utils::{ValidatedJson, ValidatedQuery},
};

pub type VerificationSvc = VerificationService<VerificationRepositoryPg, UserRepositoryPg>;

// Callers never learn whether a mail went out.
fn silent(action: &str, outcome: IssueOutcome) -> success::Success<()> {
    match outcome {
        IssueOutcome::Issued(_) | IssueOutcome::Reused(_) => log::debug!("{action}: mail queued"),
        other => log::debug!("{action}: no mail ({other:?})"),
    }
    success::Success::accepted_silently()
}

#[post("/email")]
pub async fn request_email_verification(
    verification_service: web::Data<VerificationSvc>,
    body: ValidatedJson<EmailModel>,
) -> Result<success::Success<()>, error::Error> {
    let outcome = verification_service.request_email_verification(&body.0.email).await?;
    Ok(silent("email verification", outcome))
}

#[post("/email/validate")]
pub async fn validate_email(
    verification_service: web::Data<VerificationSvc>,
    body: ValidatedJson<EmailCodeModel>,
) -> Result<success::Success<()>, error::Error> {
    verification_service.validate_email(&body.0.email, &body.0.code).await?;
    Ok(success::Success::ok(None).message("Email verified successfully"))
}

#[post("/password-reset")]
pub async fn request_password_reset(
    verification_service: web::Data<VerificationSvc>,
    body: ValidatedJson<EmailModel>,
) -> Result<success::Success<()>, error::Error> {
    let outcome = verification_service.request_password_reset(&body.0.email).await?;
    Ok(silent("password reset", outcome))
}

#[post("/password-reset/check")]
pub async fn check_reset_code(
    verification_service: web::Data<VerificationSvc>,
    body: ValidatedJson<EmailCodeModel>,
) -> Result<success::Success<()>, error::Error> {
    verification_service.check_reset_code(&body.0.email, &body.0.code).await?;
    Ok(success::Success::ok(None).message("Code is valid"))
}

#[post("/password-reset/code")]
pub async fn reset_password_with_code(
    verification_service: web::Data<VerificationSvc>,
    body: ValidatedJson<ResetWithCodeModel>,
) -> Result<success::Success<()>, error::Error> {
    let body = body.0;
    verification_service.reset_password_with_code(&body.email, &body.code, &body.password).await?;
    Ok(success::Success::ok(None).message("Password reset successfully"))
}

#[post("/password-reset/link")]
pub async fn reset_password_with_link(
    verification_service: web::Data<VerificationSvc>,
    query: ValidatedQuery<ChangeLinkQuery>,
    body: ValidatedJson<ChangePasswordModel>,
) -> Result<success::Success<()>, error::Error> {
    verification_service.reset_password_with_link(query.0.id, &body.0.password).await?;
    Ok(success::Success::ok(None).message("Password reset successfully"))
}
