//! Templated email delivery via SMTP.
//!
//! [`MailRenderer`] holds the `tera` templates; [`EmailDelivery`] renders a
//! [`TemplatedMail`] and sends it with the `lettre` async SMTP transport.
//! If `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns `None` and
//! no mailer should be constructed.

use std::path::Path;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use tera::{Context, Tera};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// A template is missing or failed to render.
    #[error("Email template error: {0}")]
    Template(#[from] tera::Error),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The template directory could not be read.
    #[error("Email template directory error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@learnhub.local";

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Directory of `*.html` templates overriding the built-in ones.
    pub template_dir: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable            | Required | Default                   |
    /// |---------------------|----------|---------------------------|
    /// | `SMTP_HOST`         | yes      |                           |
    /// | `SMTP_PORT`         | no       | `587`                     |
    /// | `SMTP_FROM`         | no       | `noreply@learnhub.local`  |
    /// | `SMTP_USER`         | no       |                           |
    /// | `SMTP_PASSWORD`     | no       |                           |
    /// | `MAIL_TEMPLATE_DIR` | no       | built-in templates only   |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            template_dir: std::env::var("MAIL_TEMPLATE_DIR").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// TemplatedMail
// ---------------------------------------------------------------------------

/// One message to render and send.
#[derive(Debug, Clone, Serialize)]
pub struct TemplatedMail {
    pub email: String,
    pub subject: String,
    /// Template name, e.g. `"course_enrolled.html"`.
    pub template: String,
    /// Values available to the template.
    pub context: serde_json::Value,
}

// ---------------------------------------------------------------------------
// MailRenderer
// ---------------------------------------------------------------------------

const BUILT_IN: &[(&str, &str)] = &[
    ("course_enrolled.html", include_str!("../../templates/course_enrolled.html")),
    ("session_scheduled.html", include_str!("../../templates/session_scheduled.html")),
    (
        "content_update_rejected.html",
        include_str!("../../templates/content_update_rejected.html"),
    ),
    ("training_created.html", include_str!("../../templates/training_created.html")),
];

/// Renders mail bodies from `tera` templates.
pub struct MailRenderer {
    tera: Tera,
}

impl MailRenderer {
    /// Renderer with the built-in templates only.
    pub fn new() -> Result<Self, EmailError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILT_IN.iter().copied())?;
        Ok(Self { tera })
    }

    /// Renderer with the built-in templates, overridden or extended by every
    /// `*.html` file in `dir`. A missing directory is ignored.
    pub fn with_dir(dir: &Path) -> Result<Self, EmailError> {
        let mut renderer = Self::new()?;
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "Mail template directory not found");
            return Ok(renderer);
        }

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("html") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)?;
            renderer.tera.add_raw_template(name, &content)?;
            tracing::debug!(template = name, "Loaded mail template");
        }
        Ok(renderer)
    }

    /// Render `template` with the given JSON object as context.
    pub fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, EmailError> {
        let context = Context::from_value(context.clone())?;
        Ok(self.tera.render(template, &context)?)
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends templated HTML email via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
    renderer: MailRenderer,
}

impl EmailDelivery {
    pub fn new(config: EmailConfig, renderer: MailRenderer) -> Self {
        Self { config, renderer }
    }

    /// Build the delivery service from config, loading templates from
    /// `template_dir` when one is set.
    pub fn from_config(config: EmailConfig) -> Result<Self, EmailError> {
        let renderer = match config.template_dir.as_deref() {
            Some(dir) => MailRenderer::with_dir(Path::new(dir))?,
            None => MailRenderer::new()?,
        };
        Ok(Self::new(config, renderer))
    }

    /// Render the message body and assemble the MIME message.
    pub fn build_message(&self, mail: &TemplatedMail) -> Result<Message, EmailError> {
        let body = self.renderer.render(&mail.template, &mail.context)?;
        Message::builder()
            .from(self.config.from_address.parse()?)
            .to(mail.email.parse()?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| EmailError::Build(e.to_string()))
    }

    /// Render and send one message.
    pub async fn send(&self, mail: &TemplatedMail) -> Result<(), EmailError> {
        let message = self.build_message(mail)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(message).await?;

        tracing::info!(to = %mail.email, template = %mail.template, "Email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            smtp_user: None,
            smtp_password: None,
            template_dir: None,
        }
    }

    fn mail(email: &str, template: &str) -> TemplatedMail {
        TemplatedMail {
            email: email.to_string(),
            subject: "Enrolled".to_string(),
            template: template.to_string(),
            context: json!({
                "display_name": "Sam",
                "title": "First <aid>",
                "site_name": "LearnHub",
                "link": "https://learn.example.org/courses/1",
            }),
        }
    }

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn built_in_template_renders_escaped_values() {
        let renderer = MailRenderer::new().unwrap();
        let body = renderer
            .render("course_enrolled.html", &mail("a@b.org", "x").context)
            .unwrap();
        assert!(body.contains("Hello Sam"));
        assert!(body.contains("First &lt;aid&gt;"));
        assert!(body.contains("learn.example.org"));
    }

    #[test]
    fn optional_blocks_are_skipped() {
        let renderer = MailRenderer::new().unwrap();
        let body = renderer
            .render(
                "content_update_rejected.html",
                &json!({"display_name": "Sam", "link": "x"}),
            )
            .unwrap();
        assert!(body.contains("Your content update was rejected"));
        assert!(!body.contains("Reason:"));
    }

    #[test]
    fn unknown_template_is_a_template_error() {
        let delivery = EmailDelivery::new(config(), MailRenderer::new().unwrap());
        let err = delivery.build_message(&mail("a@b.org", "missing.html")).unwrap_err();
        assert_matches!(err, EmailError::Template(_));
    }

    #[test]
    fn bad_recipient_is_an_address_error() {
        let delivery = EmailDelivery::new(config(), MailRenderer::new().unwrap());
        let err = delivery
            .build_message(&mail("not-an-email", "course_enrolled.html"))
            .unwrap_err();
        assert_matches!(err, EmailError::Address(_));
    }

    #[test]
    fn missing_template_dir_falls_back_to_built_ins() {
        let renderer = MailRenderer::with_dir(Path::new("/nonexistent/learnhub-mail")).unwrap();
        assert!(renderer
            .render(
                "training_created.html",
                &json!({"display_name": "Sam", "title": "T", "link": "l"}),
            )
            .is_ok());
    }
}
