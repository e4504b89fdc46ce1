use actix_web::{delete, get, patch, post, web, HttpRequest};

use crate::{
    api::{error, success},
    middlewares::get_extensions,
    modules::{
        user::{model, service::UserService},
        verification::handle::VerificationSvc,
    },
    utils::{Claims, ValidatedJson},
};

#[post("/register")]
pub async fn register(
    user_service: web::Data<UserService>,
    verification_service: web::Data<VerificationSvc>,
    user_data: ValidatedJson<model::RegisterModel>,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    verification_service.ensure_email_verified(&user_data.0.email).await?;

    let user = user_service.register(user_data.0).await?;
    Ok(success::Success::created(Some(user)).message("Registration successful"))
}

#[post("/login")]
pub async fn login(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::LoginModel>,
) -> Result<success::Success<model::LoginResponse>, error::Error> {
    let (access_token, user) = user_service.login(user_data.0).await?;
    let response = model::LoginResponse { access_token, user };
    Ok(success::Success::ok(Some(response)).message("Login successful"))
}

#[post("/check-username")]
pub async fn check_username(
    user_service: web::Data<UserService>,
    body: ValidatedJson<model::UsernameModel>,
) -> Result<success::Success<()>, error::Error> {
    user_service.check_username(&body.0.username).await?;
    Ok(success::Success::ok(None).message("Username is available"))
}

#[get("/{username}")]
pub async fn get_public_info(
    user_service: web::Data<UserService>,
    username: web::Path<String>,
) -> Result<success::Success<model::PublicUserResponse>, error::Error> {
    let user = user_service.get_public_info(&username).await?;
    Ok(success::Success::ok(Some(user)).message("User retrieved successfully"))
}

#[post("/renew-token")]
pub async fn renew_token(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::TokenResponse>, error::Error> {
    let id = get_extensions::<Claims>(&req)?.sub;
    let access_token = user_service.renew_token(id).await?;
    Ok(success::Success::ok(Some(model::TokenResponse { access_token }))
        .message("Token renewed successfully"))
}

#[get("/me")]
pub async fn get_info(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let id = get_extensions::<Claims>(&req)?.sub;
    let user = user_service.get_info(id).await?;
    Ok(success::Success::ok(Some(user)).message("Profile retrieved successfully"))
}

#[patch("/me")]
pub async fn update_info(
    user_service: web::Data<UserService>,
    verification_service: web::Data<VerificationSvc>,
    user_data: ValidatedJson<model::UpdateUserModel>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let id = get_extensions::<Claims>(&req)?.sub;
    if let Some(email) = &user_data.0.email {
        verification_service.ensure_email_verified(email).await?;
    }
    let user = user_service.update_info(id, user_data.0).await?;
    Ok(success::Success::ok(Some(user)).message("User updated successfully"))
}

#[delete("/me")]
pub async fn delete_user(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let id = get_extensions::<Claims>(&req)?.sub;
    user_service.soft_delete(id).await?;
    Ok(success::Success::no_content())
}

#[patch("/me/password")]
pub async fn change_password(
    verification_service: web::Data<VerificationSvc>,
    body: ValidatedJson<model::ChangePasswordModel>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let id = get_extensions::<Claims>(&req)?.sub;
    verification_service.change_password(id, &body.0.password).await?;
    Ok(success::Success::ok(None).message("Password changed successfully"))
}

#[post("/report")]
pub async fn report_user(
    user_service: web::Data<UserService>,
    body: ValidatedJson<model::UsernameModel>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let reporter_id = get_extensions::<Claims>(&req)?.sub;
    user_service.report_user(reporter_id, &body.0.username).await?;
    Ok(success::Success::created(None).message("User reported successfully"))
}
