//! Outbound delivery of the rendered digest.
//!
//! SendGrid's HTTP API is used when `SENDGRID_API_KEY` is set, SMTP otherwise.
//! Neither configured is an error; transport errors propagate to `main`.

pub mod email;
pub mod sendgrid;

use anyhow::{bail, Result};
use tracing::info;

use crate::config::{EmailConfig, Recipients};

pub use email::SmtpSender;
pub use sendgrid::SendGridSender;

pub const DEFAULT_FROM: &str = "no-reply@example.com";

/// A fully rendered message ready for any transport.
#[derive(Debug, Clone)]
pub struct Outgoing<'a> {
    pub subject: &'a str,
    pub html: &'a str,
    pub email: &'a EmailConfig,
    pub recipients: &'a Recipients,
}

/// `SMTP_FROM`, or the fixed no-reply address.
pub fn from_address() -> String {
    std::env::var("SMTP_FROM")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_FROM.to_string())
}

pub async fn send_digest(msg: &Outgoing<'_>, http: &reqwest::Client) -> Result<()> {
    if msg.recipients.to.is_empty() {
        bail!("no recipients configured under [recipients].to");
    }

    if let Some(key) = std::env::var("SENDGRID_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
    {
        SendGridSender::new(http.clone(), key).send(msg).await?;
        info!(target: "notify", transport = "sendgrid", to = msg.recipients.to.len(), "digest sent");
        return Ok(());
    }

    let smtp = SmtpSender::from_env()?;
    smtp.send(msg).await?;
    info!(target: "notify", transport = "smtp", to = msg.recipients.to.len(), "digest sent");
    Ok(())
}
