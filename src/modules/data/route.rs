use crate::modules::data::handle::*;
use actix_web::web::{ServiceConfig, scope};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/data").service(add_data).service(list_data).service(retrieve_data));
}
