//! Outgoing mail. Delivery is behind [`Mailer`]: [`SesMailer`] sends through Amazon SES,
//! [`LogMailer`] records recipient and subject only.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_sesv2::error::DisplayErrorContext;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;

use crate::config::{MailSettings, MailTransport};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), AppError>;
}

/// Logs that a message would have been sent. The body is never logged: it may carry a token.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        tracing::info!(to = %email.to, subject = %email.subject, "mail not delivered (log transport)");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SesMailer {
    client: SesClient,
    from: String,
}

impl SesMailer {
    /// Client from the default AWS credential chain, optionally pinned to `region`.
    pub async fn new(region: Option<String>, from: String) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = match region {
            Some(region) => {
                let ses_config = aws_config.to_builder().region(aws_config::Region::new(region)).build();
                SesClient::new(&ses_config)
            }
            None => SesClient::new(&aws_config),
        };
        SesMailer { client, from }
    }
}

fn content(data: String) -> Result<Content, AppError> {
    Content::builder()
        .data(data)
        .build()
        .map_err(|e| AppError::Internal(format!("mail content: {}", e)))
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        let Email { to, subject, body } = email;
        let message = Message::builder()
            .subject(content(subject)?)
            .body(Body::builder().text(content(body)?).build())
            .build();

        self.client
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(&to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("ses send_email: {}", DisplayErrorContext(&e))))?;

        tracing::info!(to = %to, "mail sent");
        Ok(())
    }
}

/// The mailer named by `settings.transport`.
pub async fn mailer_for(settings: &MailSettings) -> Arc<dyn Mailer> {
    match &settings.transport {
        MailTransport::Log => Arc::new(LogMailer),
        MailTransport::Ses { region } => Arc::new(SesMailer::new(region.clone(), settings.from.clone()).await),
    }
}

/// Reset link pointing at the frontend, `<frontend>/reset-password?token=<token>`.
pub fn password_reset_email(to: &str, frontend_url: &str, token: &str, ttl_minutes: i64) -> Email {
    let link = format!("{}/reset-password?token={}", frontend_url.trim_end_matches('/'), token);
    Email {
        to: to.to_string(),
        subject: "Reset your password".into(),
        body: format!(
            "We received a request to reset your password.\n\n\
             Open this link to choose a new one: {link}\n\
             The link expires in {ttl_minutes} minutes. If you did not ask for this, ignore this email."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[test]
    fn reset_email_links_to_frontend() {
        let email = password_reset_email("a@b.co", "https://shop.example/", "abc123", 60);
        assert_eq!(email.to, "a@b.co");
        assert!(email.body.contains("https://shop.example/reset-password?token=abc123"));
        assert!(email.body.contains("60 minutes"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn log_transport_keeps_the_token_out_of_the_log() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let email = password_reset_email("a@b.co", "https://shop.example", "secret-token-value", 60);
        LogMailer.send(email).await.unwrap();

        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("a@b.co"));
        assert!(!log.contains("secret-token-value"));
    }

    #[tokio::test]
    async fn log_settings_give_a_log_mailer() {
        let mailer = mailer_for(&MailSettings::default()).await;
        let email = password_reset_email("a@b.co", "https://shop.example", "t", 60);
        assert!(mailer.send(email).await.is_ok());
    }
}
