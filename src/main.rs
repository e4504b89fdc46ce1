use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use crate::{
    clients::{
        blob::{BlobStore, FsBlobStore, WebDavBlobStore, WebDavConfig},
        mailer::{HttpTemplateMailer, LogMailer, Mailer, MailerConfig},
    },
    configs::{RedisCache, connect_database, run_migrations},
    jobs::{JobQueue, JobRunner, RetryPolicy},
    middlewares::{authentication, track_activity},
    modules::{
        data::{repository_pg::DataRepositoryPg, service::DataService},
        friend::{repository_pg::FriendRepositoryPg, service::FriendService},
        user::{repository_pg::UserRepositoryPg, service::UserService},
        verification::{
            model::CodePolicy, repository_pg::VerificationRepositoryPg,
            service::VerificationService,
        },
    },
    utils::TokenConfig,
};

mod api;
mod clients;
mod configs;
mod constants;
mod jobs;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

fn build_mailer() -> Arc<dyn Mailer> {
    match &ENV.mail_api_url {
        Some(api_url) => Arc::new(HttpTemplateMailer::new(MailerConfig {
            api_url: api_url.clone(),
            api_token: ENV.mail_api_token.clone(),
            from_email: ENV.mail_from_email.clone(),
            from_name: ENV.mail_from_name.clone(),
            account_registration_template: ENV.mail_template_account_registration.clone(),
            password_reset_template: ENV.mail_template_password_reset.clone(),
        })),
        None => {
            log::warn!("MAIL_API_URL not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}

fn build_blob_stores() -> Vec<Arc<dyn BlobStore>> {
    let mut blobs: Vec<Arc<dyn BlobStore>> = Vec::new();
    if let Some(dir) = &ENV.data_mirror_dir {
        blobs.push(Arc::new(FsBlobStore::new(dir)));
    }
    if let Some(url) = &ENV.webdav_url {
        blobs.push(Arc::new(WebDavBlobStore::new(WebDavConfig {
            url: url.clone(),
            user: ENV.webdav_user.clone(),
            password: ENV.webdav_password.clone(),
            path: ENV.webdav_path.clone(),
        })));
    }
    blobs
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;
    run_migrations(&db_pool).await.map_err(|e| std::io::Error::other(e.to_string()))?;

    let redis_pool =
        RedisCache::new().await.map_err(|_| std::io::Error::other("Redis connection error"))?;

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let friend_repo = Arc::new(FriendRepositoryPg::new(db_pool.clone()));
    let verification_repo = Arc::new(VerificationRepositoryPg::new(db_pool.clone()));
    let data_repo = Arc::new(DataRepositoryPg::new(db_pool.clone()));

    let jobs = JobQueue::start(JobRunner::new(
        build_mailer(),
        build_blob_stores(),
        verification_repo.clone(),
        RetryPolicy::new(ENV.job_max_attempts, ENV.job_initial_backoff_ms),
    ));

    let tokens =
        TokenConfig { secret: ENV.jwt_secret.clone(), expiration: ENV.access_token_expiration };
    let user_service =
        UserService::with_dependencies(user_repo.clone(), Arc::new(redis_pool), tokens);
    let friend_service = FriendService::with_dependencies(friend_repo, user_repo.clone());
    let email_policy = CodePolicy::new(
        ENV.email_code_digits,
        ENV.email_code_retry_seconds,
        ENV.password_change_expiry_minutes,
    )
    .map_err(|e| std::io::Error::other(format!("EMAIL_CODE_* settings: {e}")))?;
    let reset_policy = CodePolicy::new(
        ENV.password_code_digits,
        ENV.password_code_retry_seconds,
        ENV.password_change_expiry_minutes,
    )
    .map_err(|e| std::io::Error::other(format!("PASSWORD_CODE_* settings: {e}")))?;

    let verification_service = VerificationService::with_dependencies(
        verification_repo,
        user_repo,
        jobs.clone(),
        email_policy,
        reset_policy,
    );
    let data_service = DataService::with_dependencies(data_repo, jobs, ENV.data_max_bytes);

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&ENV.frontend_url)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(friend_service.clone()))
            .app_data(web::Data::new(verification_service.clone()))
            .app_data(web::Data::new(data_service.clone()))
            .service(health_check)
            .service(
                web::scope("/api/v1")
                    .configure(modules::user::route::public_api_configure)
                    .configure(modules::verification::route::public_api_configure)
                    .service(
                        web::scope("")
                            .wrap(from_fn(track_activity))
                            .wrap(from_fn(authentication))
                            .configure(modules::user::route::configure)
                            .configure(modules::friend::route::configure)
                            .configure(modules::data::route::configure),
                    ),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(ENV.workers)
    .run()
    .await
}
