use crate::modules::user::handle::*;
use actix_web::web::{ServiceConfig, scope};

pub fn public_api_configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/auth").service(register).service(login).service(check_username))
        .service(scope("/public/users").service(get_public_info));
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/users")
            .service(renew_token)
            .service(get_info)
            .service(update_info)
            .service(delete_user)
            .service(change_password)
            .service(report_user),
    );
}
