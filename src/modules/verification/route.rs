use crate::modules::verification::handle::*;
use actix_web::web::{ServiceConfig, scope};

pub fn public_api_configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/verification")
            .service(request_email_verification)
            .service(validate_email)
            .service(request_password_reset)
            .service(check_reset_code)
            .service(reset_password_with_code)
            .service(reset_password_with_link),
    );
}
