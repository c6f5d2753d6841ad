//! Mail relay client.
//!
//! Submits rendered messages to the relay's send endpoint, authenticating
//! with a bearer token obtained through the client-credentials flow.

use reqwest::Client;
use serde::Serialize;
use tracing::info;

use super::templates::RenderedEmail;
use crate::auth::ClientCredentials;
use crate::config::EmailConfig;
use crate::error::MailError;
use crate::queue::EmailJob;

/// JSON body accepted by the mail relay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    bcc: Vec<&'a str>,
    body_type: &'static str,
    body: &'a str,
    cc: &'a [String],
    #[serde(rename = "delayTS")]
    delay_ts: u64,
    encoding: &'static str,
    from: &'a str,
    priority: &'static str,
    subject: &'a str,
    to: Vec<&'a str>,
}

/// Sends notifications through the mail relay.
#[derive(Debug, Clone)]
pub struct Mailer {
    client: Client,
    credentials: ClientCredentials,
    email_url: String,
    from: String,
    bcc_email: String,
    origin: String,
}

impl Mailer {
    pub fn new(client: Client, config: &EmailConfig) -> Self {
        let credentials = ClientCredentials::new(
            client.clone(),
            config.auth_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        );
        Self {
            client,
            credentials,
            email_url: config.email_url.clone(),
            from: format_sender(&config.sender_name, &config.sender_email),
            bcc_email: config.bcc_email.clone(),
            origin: config.frontend_origin.clone(),
        }
    }

    /// Render and send the notification described by `job`.
    pub async fn deliver(&self, job: &EmailJob) -> Result<(), MailError> {
        let email = job.notification.render(&job.application_id, &self.origin);
        self.send(&job.recipient, &email).await?;

        info!(
            application_id = %job.application_id,
            template = job.notification.name(),
            "notification_sent"
        );

        Ok(())
    }

    /// Send one rendered message to a single recipient.
    pub async fn send(&self, recipient: &str, email: &RenderedEmail) -> Result<(), MailError> {
        let token = self.credentials.access_token().await?;
        let request = self.build_request(recipient, email);

        self.client
            .post(&self.email_url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    fn build_request<'a>(&'a self, recipient: &'a str, email: &'a RenderedEmail) -> SendRequest<'a> {
        SendRequest {
            bcc: vec![self.bcc_email.as_str()],
            body_type: "html",
            body: &email.body,
            cc: &email.cc,
            delay_ts: 0,
            encoding: "utf-8",
            from: &self.from,
            priority: "normal",
            subject: &email.subject,
            to: vec![recipient],
        }
    }
}

/// Format a `From` header value, quoting the display name when needed.
fn format_sender(name: &str, email: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return email.to_string();
    }
    let needs_quotes = name
        .chars()
        .any(|c| matches!(c, ',' | ';' | ':' | '<' | '>' | '@' | '"' | '(' | ')' | '[' | ']' | '.'));
    if needs_quotes {
        format!("\"{}\" <{}>", name.replace('\\', "\\\\").replace('"', "\\\""), email)
    } else {
        format!("{} <{}>", name, email)
    }
}
