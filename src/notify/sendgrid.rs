use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use super::{from_address, Outgoing};

pub const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// SendGrid v3 mail API with a short exponential backoff on transient errors.
#[derive(Clone)]
pub struct SendGridSender {
    client: Client,
    api_key: String,
    url: String,
    timeout: Duration,
    max_retries: u8,
}

impl SendGridSender {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            url: SENDGRID_URL.to_string(),
            timeout: Duration::from_secs(20),
            max_retries: 3,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub async fn send(&self, msg: &Outgoing<'_>) -> Result<()> {
        let payload = MailPayload::from_outgoing(msg, &from_address());

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => {
                    let status = rsp.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    // 4xx is a request problem; retrying will not help
                    if status.is_client_error() {
                        let body = rsp.text().await.unwrap_or_default();
                        return Err(anyhow!(
                            "SendGrid rejected message ({}): {}",
                            status.as_u16(),
                            body.chars().take(300).collect::<String>()
                        ));
                    }
                    anyhow!("SendGrid HTTP error {}", status.as_u16())
                }
                Err(e) => anyhow!("SendGrid request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            warn!(target: "notify", attempt, error = %err, "SendGrid send failed, retrying");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Address {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Address {
    fn plain(email: &str) -> Self {
        Self {
            email: email.to_string(),
            name: None,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Personalization {
    pub to: Vec<Address>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<Address>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<Address>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MailPayload {
    pub personalizations: Vec<Personalization>,
    pub from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Address>,
    pub subject: String,
    pub content: Vec<Content>,
}

impl MailPayload {
    pub fn from_outgoing(msg: &Outgoing<'_>, from: &str) -> Self {
        let addrs = |v: &[String]| v.iter().map(|a| Address::plain(a)).collect::<Vec<_>>();
        Self {
            personalizations: vec![Personalization {
                to: addrs(&msg.recipients.to),
                cc: addrs(&msg.recipients.cc),
                bcc: addrs(&msg.recipients.bcc),
            }],
            from: Address {
                email: from.to_string(),
                name: Some(msg.email.from_name.clone()),
            },
            reply_to: msg.email.reply_to.as_deref().map(Address::plain),
            subject: msg.subject.to_string(),
            content: vec![Content {
                kind: "text/html",
                value: msg.html.to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmailConfig, Recipients};

    #[test]
    fn payload_omits_empty_cc_and_reply_to() {
        let email = EmailConfig::default();
        let recipients = Recipients {
            to: vec!["a@example.com".into()],
            cc: vec![],
            bcc: vec!["b@example.com".into()],
        };
        let msg = Outgoing {
            subject: "S",
            html: "<p>x</p>",
            email: &email,
            recipients: &recipients,
        };
        let v = serde_json::to_value(MailPayload::from_outgoing(&msg, "bot@example.com")).unwrap();
        let p = &v["personalizations"][0];
        assert!(p.get("cc").is_none());
        assert_eq!(p["bcc"][0]["email"], "b@example.com");
        assert!(v.get("reply_to").is_none());
        assert_eq!(v["from"]["name"], "Finance Brief Bot");
        assert_eq!(v["content"][0]["type"], "text/html");
    }
}
