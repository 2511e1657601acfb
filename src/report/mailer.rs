//! SMTP delivery of rendered reports.
//!
//! Thin adapter over `lettre`'s async transport. Connection pooling and
//! reconnection are the transport's business; the rest of the system only
//! sees [`ReportDispatcher::dispatch`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use super::{render, ReportDispatcher};
use crate::config::MailConfig;
use crate::types::{FundwatchError, Report};

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject: String,
}

impl SmtpMailer {
    /// Build the transport from config. The password comes from the env
    /// var named in the config and never appears in the config file.
    pub fn new(cfg: &MailConfig, subject: &str) -> Result<Self> {
        let password = cfg.password()?;
        let credentials =
            Credentials::new(cfg.username.clone(), password.expose_secret().to_string());

        let builder = if cfg.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server)
                .with_context(|| format!("Failed to configure STARTTLS for {}", cfg.server))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.server)
        };

        let transport = builder.port(cfg.port).credentials(credentials).build();

        let from: Mailbox = cfg
            .from_address
            .parse()
            .with_context(|| format!("Invalid from address: {}", cfg.from_address))?;

        debug!(server = %cfg.server, port = cfg.port, starttls = cfg.use_starttls, "SMTP mailer ready");

        Ok(Self {
            transport,
            from,
            subject: subject.to_string(),
        })
    }
}

#[async_trait]
impl ReportDispatcher for SmtpMailer {
    async fn dispatch(&self, address: &str, report: &Report) -> Result<(), FundwatchError> {
        let failed = |message: String| FundwatchError::DeliveryFailed {
            address: address.to_string(),
            message,
        };

        let to: Mailbox = address
            .parse()
            .map_err(|e| failed(format!("invalid recipient address: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(self.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(render(report))
            .map_err(|e| failed(format!("failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| failed(e.to_string()))?;

        info!(to = %address, date = %report.date, "Report emailed");
        Ok(())
    }
}
