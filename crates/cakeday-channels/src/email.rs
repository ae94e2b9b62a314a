//! SMTP email for birthday greetings.

use cakeday_core::config::EmailConfig;
use cakeday_core::error::{CakedayError, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

const WISH_GIF: &str = "https://media.giphy.com/media/3o6Zt481isNVuQI1l6/giphy.gif";

pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    /// Build a sender from config. Upgrades to TLS when the relay offers it.
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| CakedayError::config("SMTP_HOST is not set"))?;
        let username = config.username.clone().unwrap_or_default();
        let from = username
            .parse::<Mailbox>()
            .map_err(|e| CakedayError::config(format!("SMTP_USERNAME is not a mailbox: {e}")))?;

        tracing::info!("📧 Email sender using {host}:{}", config.smtp_port);
        let tls = TlsParameters::new(host.to_string())
            .map_err(|e| CakedayError::Email(format!("TLS setup failed: {e}")))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(config.smtp_port)
            .tls(Tls::Opportunistic(tls))
            .credentials(Credentials::new(
                username,
                config.password.clone().unwrap_or_default(),
            ))
            .build();

        Ok(Self { transport, from })
    }

    pub fn build_wish(&self, email: &str, name: &str) -> Result<Message> {
        let to = email
            .parse::<Mailbox>()
            .map_err(|e| CakedayError::invalid(format!("Bad email address '{email}': {e}")))?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(wish_subject(name))
            .header(ContentType::TEXT_HTML)
            .body(render_wish_html(name))
            .map_err(|e| CakedayError::Email(format!("Failed to build email: {e}")))
    }

    pub async fn send_birthday_wish(&self, email: &str, name: &str) -> Result<()> {
        let message = self.build_wish(email, name)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| CakedayError::Email(format!("Failed to send email: {e}")))?;
        tracing::info!("🎉 Birthday wish sent to {email}");
        Ok(())
    }
}

pub fn wish_subject(name: &str) -> String {
    let name = if name.trim().is_empty() { "Friend" } else { name };
    format!("🎉 Happy Birthday, {name}! 🎂")
}

pub fn render_wish_html(name: &str) -> String {
    let name = escape_html(name);
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 650px; margin: auto; padding: 20px; background: linear-gradient(135deg, #f9d423, #ff4e50); color: #fff; border-radius: 10px; text-align: center;">
  <h1 style="font-size: 36px; margin-bottom: 10px;">🎉 Happy Birthday {name}! 🎉</h1>
  <p style="font-size: 18px; margin-bottom: 20px;">
    Wishing you a day filled with love, laughter, and unforgettable moments.
    May this year bring you endless happiness and success! 💖
  </p>
  <img src="{WISH_GIF}" alt="Birthday Cake" style="width: 100%; max-width: 350px; border-radius: 8px; margin: 20px auto;" />
  <p style="font-size: 16px; margin-top: 20px;">Enjoy every bite of cake and every smile you receive today. 🎂</p>
</div>"#
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: Some("smtp.example.com".into()),
            smtp_port: 2525,
            username: Some("wishes@example.com".into()),
            password: Some("secret".into()),
        }
    }

    #[test]
    fn test_subject() {
        assert_eq!(wish_subject("Asha"), "🎉 Happy Birthday, Asha! 🎂");
        assert_eq!(wish_subject(" "), "🎉 Happy Birthday, Friend! 🎂");
    }

    #[test]
    fn test_html_escapes_name() {
        let html = render_wish_html("<b>Bo & Co</b>");
        assert!(html.contains("Happy Birthday &lt;b&gt;Bo &amp; Co&lt;/b&gt;!"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_missing_host_is_config_error() {
        let mut cfg = config();
        cfg.smtp_host = None;
        assert!(matches!(EmailSender::from_config(&cfg), Err(CakedayError::Config(_))));
    }

    #[tokio::test]
    async fn test_build_wish() {
        let sender = EmailSender::from_config(&config()).unwrap();
        let message = sender.build_wish("asha@example.com", "Asha").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: asha@example.com"));
        assert!(raw.contains("text/html"));

        assert!(matches!(
            sender.build_wish("not-an-address", "Asha"),
            Err(CakedayError::InvalidRecord(_))
        ));
    }
}
