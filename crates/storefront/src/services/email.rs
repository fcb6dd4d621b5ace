//! Email service for sending one-time codes and notifications.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use solstice_core::Email;

use crate::config::EmailConfig;

/// HTML template for the one-time code email.
#[derive(Template)]
#[template(path = "email/otp_code.html")]
struct OtpCodeEmailHtml<'a> {
    code: &'a str,
}

/// Plain text template for the one-time code email.
#[derive(Template)]
#[template(path = "email/otp_code.txt")]
struct OtpCodeEmailText<'a> {
    code: &'a str,
}

/// HTML template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    username: &'a str,
}

/// Plain text template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    username: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Dispatch seam for transactional email.
///
/// The OTP and auth services depend on this trait rather than on the SMTP
/// transport directly, so the insert-then-dispatch-fails path can be covered
/// in tests.
pub trait Mailer {
    /// Send a one-time code to an address.
    fn send_otp_code(
        &self,
        to: &Email,
        code: &str,
    ) -> impl Future<Output = Result<(), EmailError>> + Send;

    /// Send a welcome email after successful signup.
    fn send_welcome(
        &self,
        to: &Email,
        username: &str,
    ) -> impl Future<Output = Result<(), EmailError>> + Send;
}

impl<T: Mailer + Sync> Mailer for &T {
    async fn send_otp_code(&self, to: &Email, code: &str) -> Result<(), EmailError> {
        (**self).send_otp_code(to, code).await
    }

    async fn send_welcome(&self, to: &Email, username: &str) -> Result<(), EmailError> {
        (**self).send_welcome(to, username).await
    }
}

/// Email service for sending transactional emails over SMTP.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart (text + HTML) email.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let from = self
            .from_address
            .parse()
            .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?;
        let to_mailbox = to
            .parse()
            .map_err(|_| EmailError::InvalidAddress(to.to_string()))?;

        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(message).await?;

        Ok(())
    }
}

impl Mailer for EmailService {
    async fn send_otp_code(&self, to: &Email, code: &str) -> Result<(), EmailError> {
        let html = OtpCodeEmailHtml { code }.render()?;
        let text = OtpCodeEmailText { code }.render()?;

        self.send_multipart_email(to.as_str(), "Your Solstice verification code", &text, &html)
            .await
    }

    async fn send_welcome(&self, to: &Email, username: &str) -> Result<(), EmailError> {
        let html = WelcomeEmailHtml { username }.render()?;
        let text = WelcomeEmailText { username }.render()?;

        self.send_multipart_email(to.as_str(), "Welcome to Solstice", &text, &html)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_templates_render_code() {
        let html = OtpCodeEmailHtml { code: "123456" }.render().unwrap();
        let text = OtpCodeEmailText { code: "123456" }.render().unwrap();

        assert!(html.contains("123456"));
        assert!(html.contains("10 minutes"));
        assert!(text.contains("123456"));
    }

    #[test]
    fn test_welcome_templates_render_username() {
        let html = WelcomeEmailHtml { username: "ravi" }.render().unwrap();
        let text = WelcomeEmailText { username: "ravi" }.render().unwrap();

        assert!(html.contains("ravi"));
        assert!(text.contains("ravi"));
    }
}
