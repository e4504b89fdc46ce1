use serde::Serialize;
use uuid::Uuid;

use crate::{api::error, modules::verification::code::VerificationCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailTemplate {
    AccountRegistration { code: VerificationCode },
    PasswordReset { change_id: Uuid, code: VerificationCode },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub template: EmailTemplate,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), error::SystemError>;
}

#[derive(Clone)]
pub struct MailerConfig {
    pub api_url: String,
    pub api_token: String,
    pub from_email: String,
    pub from_name: String,
    pub account_registration_template: String,
    pub password_reset_template: String,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct TemplateVariables<'a> {
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<Uuid>,
    company_info_name: &'a str,
}

#[derive(Serialize)]
struct TemplatePayload<'a> {
    from: Address<'a>,
    to: Vec<Address<'a>>,
    template_uuid: &'a str,
    template_variables: TemplateVariables<'a>,
}

/// Delivers through a hosted template API (Mailtrap-compatible JSON).
pub struct HttpTemplateMailer {
    client: reqwest::Client,
    config: MailerConfig,
}

impl HttpTemplateMailer {
    pub fn new(config: MailerConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    fn payload<'a>(&'a self, message: &'a EmailMessage) -> TemplatePayload<'a> {
        let (template_uuid, code, uuid) = match &message.template {
            EmailTemplate::AccountRegistration { code } => {
                (&self.config.account_registration_template, code, None)
            }
            EmailTemplate::PasswordReset { change_id, code } => {
                (&self.config.password_reset_template, code, Some(*change_id))
            }
        };

        TemplatePayload {
            from: Address { email: &self.config.from_email, name: Some(&self.config.from_name) },
            to: vec![Address { email: &message.to, name: None }],
            template_uuid,
            template_variables: TemplateVariables {
                code: code.as_str(),
                uuid,
                company_info_name: &self.config.from_name,
            },
        }
    }
}

#[async_trait::async_trait]
impl Mailer for HttpTemplateMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), error::SystemError> {
        self.client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_token)
            .json(&self.payload(message))
            .send()
            .await?
            .error_for_status()?;

        log::info!("Mail delivered to {}", message.to);
        Ok(())
    }
}

/// Used when no mail API is configured; the code ends up in the log.
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), error::SystemError> {
        log::warn!("No mail API configured, dropping mail to {}: {:?}", message.to, message.template);
        Ok(())
    }
}
