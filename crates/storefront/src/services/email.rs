//! Transactional email: order confirmations, password reset codes and email
//! verification codes.
//!
//! Uses SMTP via lettre for delivery with Askama templates. When SMTP is not
//! configured the [`Mailer`] logs what it would have sent.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use carsi_core::{Email, PaymentMethod, format_try};

use crate::config::EmailConfig;

/// Minutes a password reset code stays valid.
pub const RESET_CODE_VALID_MINUTES: i64 = 60;

/// Minutes an email verification code stays valid.
pub const VERIFICATION_CODE_VALID_MINUTES: i64 = 24 * 60;

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    name: &'a str,
    order_number: &'a str,
    total: &'a str,
    payment_method: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    name: &'a str,
    order_number: &'a str,
    total: &'a str,
    payment_method: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    code: &'a str,
    valid_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    code: &'a str,
    valid_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/email_verification.html")]
struct EmailVerificationHtml<'a> {
    name: &'a str,
    code: &'a str,
    valid_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/email_verification.txt")]
struct EmailVerificationText<'a> {
    name: &'a str,
    code: &'a str,
    valid_minutes: i64,
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

/// What the customer is told after a successful checkout.
#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub email: Email,
    pub name: String,
    pub order_number: String,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
}

/// SMTP-backed sender.
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

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Outgoing mail: real SMTP delivery, or log-only when SMTP is unconfigured.
#[derive(Clone)]
pub enum Mailer {
    Smtp(EmailService),
    LogOnly,
}

impl Mailer {
    /// Build a mailer from optional SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns error if SMTP is configured but the relay cannot be set up.
    pub fn from_config(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        match config {
            Some(config) => Ok(Self::Smtp(EmailService::new(config)?)),
            None => Ok(Self::LogOnly),
        }
    }

    /// Send the order confirmation.
    ///
    /// # Errors
    ///
    /// Returns error if rendering or delivery fails.
    pub async fn send_order_confirmation(
        &self,
        confirmation: &OrderConfirmation,
    ) -> Result<(), EmailError> {
        let total = format_try(confirmation.total);
        let payment_method = confirmation.payment_method.label_tr();
        let subject = format!("Siparişiniz alındı: {}", confirmation.order_number);

        match self {
            Self::LogOnly => {
                tracing::info!(
                    to = %confirmation.email,
                    order_number = %confirmation.order_number,
                    total = %total,
                    "SMTP not configured; order confirmation not sent"
                );
                Ok(())
            }
            Self::Smtp(service) => {
                let html = OrderConfirmationHtml {
                    name: &confirmation.name,
                    order_number: &confirmation.order_number,
                    total: &total,
                    payment_method,
                }
                .render()?;
                let text = OrderConfirmationText {
                    name: &confirmation.name,
                    order_number: &confirmation.order_number,
                    total: &total,
                    payment_method,
                }
                .render()?;
                service
                    .send_multipart_email(confirmation.email.as_str(), &subject, text, html)
                    .await
            }
        }
    }

    /// Send a password reset code.
    ///
    /// # Errors
    ///
    /// Returns error if rendering or delivery fails.
    pub async fn send_password_reset(&self, to: &Email, code: &str) -> Result<(), EmailError> {
        match self {
            Self::LogOnly => {
                tracing::debug!(to = %to, code = %code, "SMTP not configured; reset code not sent");
                Ok(())
            }
            Self::Smtp(service) => {
                let valid_minutes = RESET_CODE_VALID_MINUTES;
                let html = PasswordResetHtml {
                    code,
                    valid_minutes,
                }
                .render()?;
                let text = PasswordResetText {
                    code,
                    valid_minutes,
                }
                .render()?;
                service
                    .send_multipart_email(to.as_str(), "Şifre sıfırlama kodunuz", text, html)
                    .await
            }
        }
    }

    /// Send an email verification code.
    ///
    /// # Errors
    ///
    /// Returns error if rendering or delivery fails.
    pub async fn send_email_verification(
        &self,
        to: &Email,
        name: &str,
        code: &str,
    ) -> Result<(), EmailError> {
        match self {
            Self::LogOnly => {
                tracing::debug!(to = %to, code = %code, "SMTP not configured; verification code not sent");
                Ok(())
            }
            Self::Smtp(service) => {
                let valid_minutes = VERIFICATION_CODE_VALID_MINUTES;
                let html = EmailVerificationHtml {
                    name,
                    code,
                    valid_minutes,
                }
                .render()?;
                let text = EmailVerificationText {
                    name,
                    code,
                    valid_minutes,
                }
                .render()?;
                service
                    .send_multipart_email(to.as_str(), "E-posta doğrulama kodunuz", text, html)
                    .await
            }
        }
    }
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_verification_code_format() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_order_confirmation_text_renders_amount() {
        let text = OrderConfirmationText {
            name: "Ayşe Yılmaz",
            order_number: "3FA9C01B",
            total: &format_try(Decimal::new(123_450, 2)),
            payment_method: PaymentMethod::CashOnDelivery.label_tr(),
        }
        .render()
        .expect("render");

        assert!(text.contains("3FA9C01B"));
        assert!(text.contains("1.234,50 ₺"));
        assert!(text.contains("Kapıda ödeme"));
    }

    #[test]
    fn test_password_reset_html_contains_code() {
        let html = PasswordResetHtml {
            code: "482913",
            valid_minutes: RESET_CODE_VALID_MINUTES,
        }
        .render()
        .expect("render");
        assert!(html.contains("482913"));
        assert!(html.contains("60 dakika"));
    }

    #[test]
    fn test_email_verification_text_greets_by_name() {
        let text = EmailVerificationText {
            name: "Zeynep",
            code: "105733",
            valid_minutes: VERIFICATION_CODE_VALID_MINUTES,
        }
        .render()
        .expect("render");
        assert!(text.starts_with("Merhaba Zeynep"));
        assert!(text.contains("105733"));
        assert!(text.contains("1440 dakika"));
    }

    #[tokio::test]
    async fn test_log_only_mailer_succeeds() {
        let mailer = Mailer::LogOnly;
        let confirmation = OrderConfirmation {
            email: Email::parse("musteri@ornek.com").expect("email"),
            name: "Mehmet Kaya".to_owned(),
            order_number: "ABCDEF12".to_owned(),
            total: Decimal::new(18_000, 2),
            payment_method: PaymentMethod::CreditCard,
        };
        assert!(mailer.send_order_confirmation(&confirmation).await.is_ok());
    }
}
