use anyhow::{anyhow, Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{from_address, Outgoing};

pub struct SmtpSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

fn required(var: &str) -> Result<String> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            anyhow!("no email transport configured: set SENDGRID_API_KEY or SMTP_* ({var} missing)")
        })
}

fn mailbox(addr: &str, name: Option<&str>) -> Result<Mailbox> {
    let mut mb: Mailbox = addr
        .parse()
        .with_context(|| format!("invalid email address {addr:?}"))?;
    if let Some(n) = name {
        mb.name = Some(n.to_string());
    }
    Ok(mb)
}

impl SmtpSender {
    /// STARTTLS relay on `SMTP_PORT` (default 587) with `SMTP_USER`/`SMTP_PASS`.
    pub fn from_env() -> Result<Self> {
        let host = required("SMTP_HOST")?;
        let user = required("SMTP_USER")?;
        let pass = required("SMTP_PASS")?;
        let port: u16 = match std::env::var("SMTP_PORT") {
            Ok(p) => p.trim().parse().context("invalid SMTP_PORT")?,
            Err(_) => 587,
        };

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
            .with_context(|| format!("invalid SMTP_HOST {host:?}"))?
            .port(port)
            .credentials(creds)
            .build();

        let from = mailbox(&from_address(), None)?;
        Ok(Self { mailer, from })
    }

    pub async fn send(&self, msg: &Outgoing<'_>) -> Result<()> {
        let mut from = self.from.clone();
        from.name = Some(msg.email.from_name.clone());

        let mut builder = Message::builder().from(from).subject(msg.subject);
        for to in &msg.recipients.to {
            builder = builder.to(mailbox(to, None)?);
        }
        for cc in &msg.recipients.cc {
            builder = builder.cc(mailbox(cc, None)?);
        }
        for bcc in &msg.recipients.bcc {
            builder = builder.bcc(mailbox(bcc, None)?);
        }
        if let Some(reply) = msg.email.reply_to.as_deref() {
            builder = builder.reply_to(mailbox(reply, None)?);
        }

        let email = builder
            .header(header::ContentType::TEXT_HTML)
            .body(msg.html.to_string())
            .context("build email")?;

        self.mailer.send(email).await.context("send email")?;
        Ok(())
    }
}
