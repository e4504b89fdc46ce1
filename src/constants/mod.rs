use std::str::FromStr;

pub struct Env {
    pub jwt_secret: String,
    pub access_token_expiration: u64,
    pub database_url: String,
    pub redis_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub workers: usize,

    pub email_code_digits: usize,
    pub email_code_retry_seconds: u64,
    pub password_code_digits: usize,
    pub password_code_retry_seconds: u64,
    pub password_change_expiry_minutes: u64,

    pub mail_api_url: Option<String>,
    pub mail_api_token: String,
    pub mail_from_email: String,
    pub mail_from_name: String,
    pub mail_template_account_registration: String,
    pub mail_template_password_reset: String,

    pub data_max_bytes: usize,
    pub data_mirror_dir: Option<String>,
    pub webdav_url: Option<String>,
    pub webdav_user: String,
    pub webdav_password: String,
    pub webdav_path: String,

    pub job_max_attempts: u32,
    pub job_initial_backoff_ms: u64,
}

fn required(key: &str) -> String {
    std::env::var(key)
        .unwrap_or_else(|_| panic!("{key} must be set in .env file or environment variable"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(key: &str, default: &str) -> T {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .unwrap_or_else(|_| panic!("{key} must be a valid {}", std::any::type_name::<T>()))
}

impl Env {
    fn new() -> Self {
        Env {
            jwt_secret: required("SECRET_KEY"),
            access_token_expiration: parsed("ACCESS_TOKEN_EXPIRATION", "604800"),
            database_url: required("DATABASE_URL"),
            redis_url: required("REDIS_URL"),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ip: std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT", "8080"),
            workers: parsed("WORKERS", "2"),

            email_code_digits: parsed("EMAIL_CODE_DIGITS", "8"),
            email_code_retry_seconds: parsed("EMAIL_CODE_RETRY_SECONDS", "60"),
            password_code_digits: parsed("PASSWORD_CODE_DIGITS", "8"),
            password_code_retry_seconds: parsed("PASSWORD_CODE_RETRY_SECONDS", "60"),
            password_change_expiry_minutes: parsed("PASSWORD_CHANGE_EXPIRY_MINUTES", "30"),

            mail_api_url: optional("MAIL_API_URL"),
            mail_api_token: std::env::var("MAIL_API_TOKEN").unwrap_or_default(),
            mail_from_email: std::env::var("MAIL_FROM_EMAIL")
                .unwrap_or_else(|_| "no-reply@localhost".to_string()),
            mail_from_name: std::env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Savekeep".to_string()),
            mail_template_account_registration: std::env::var("MAIL_TEMPLATE_ACCOUNT_REGISTRATION")
                .unwrap_or_default(),
            mail_template_password_reset: std::env::var("MAIL_TEMPLATE_PASSWORD_RESET")
                .unwrap_or_default(),

            data_max_bytes: parsed("DATA_MAX_BYTES", "1048576"),
            data_mirror_dir: optional("DATA_MIRROR_DIR"),
            webdav_url: optional("WEBDAV_URL"),
            webdav_user: std::env::var("WEBDAV_USER").unwrap_or_default(),
            webdav_password: std::env::var("WEBDAV_PASSWORD").unwrap_or_default(),
            webdav_path: std::env::var("WEBDAV_PATH").unwrap_or_else(|_| "/saves/".to_string()),

            job_max_attempts: parsed("JOB_MAX_ATTEMPTS", "3"),
            job_initial_backoff_ms: parsed("JOB_INITIAL_BACKOFF_MS", "500"),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
