use serde::Serialize;
use crate::api::openrouter::EmailContent;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Serialize)]
struct Contact<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender: Contact<'a>,
    to: Vec<Contact<'a>>,
    subject: &'a str,
    html_content: String,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn render_welcome_html(content: &EmailContent, app_name: &str, year: i32) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"></head>
<body style="margin:0;padding:0;background:#f4f4f4;font-family:Arial,sans-serif;">
  <table width="100%" cellpadding="0" cellspacing="0" style="background:#f4f4f4;padding:40px 0;">
    <tr><td align="center">
      <table width="600" cellpadding="0" cellspacing="0"
             style="background:#ffffff;border-radius:8px;padding:40px;max-width:600px;">
        <tr>
          <td>
            <h2 style="font-size:22px;font-weight:600;color:#111;margin:0 0 16px 0;">
              {heading}
            </h2>
            <p style="font-size:15px;line-height:1.7;color:#444;margin:0 0 28px 0;">
              {body}
            </p>
            <hr style="border:none;border-top:1px solid #eee;margin:0 0 20px 0;">
            <p style="font-size:12px;color:#999;margin:0 0 8px 0;">
              {unsubscribe_note}
            </p>
            <p style="font-size:12px;color:#bbb;margin:0;">
              &copy; {year} {app_name}. All rights reserved.
            </p>
          </td>
        </tr>
      </table>
    </td></tr>
  </table>
</body>
</html>"#,
        heading = escape_html(&content.heading),
        body = escape_html(&content.body),
        unsubscribe_note = escape_html(&content.unsubscribe_note),
        year = year,
        app_name = escape_html(app_name),
    )
}

/// Transactional email through Brevo's v3 API.
pub struct Mailer {
    http: reqwest::Client,
    api_key: String,
    sender_name: String,
    sender_email: String,
}

impl Mailer {
    pub fn new(http: reqwest::Client, api_key: String, sender_name: String, sender_email: String) -> Self {
        Mailer {
            http,
            api_key,
            sender_name,
            sender_email,
        }
    }

    pub async fn send_html(&self, recipient: &str, subject: &str, html_content: String) -> Result<(), String> {
        let request = SendEmailRequest {
            sender: Contact {
                name: Some(&self.sender_name),
                email: &self.sender_email,
            },
            to: vec![Contact { name: None, email: recipient }],
            subject,
            html_content,
        };

        let response = self
            .http
            .post(BREVO_SEND_URL)
            .header("api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Brevo responded {}: {}", status, body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> EmailContent {
        EmailContent {
            subject: "Welcome".to_string(),
            heading: "You're <in>".to_string(),
            body: "Thanks & see you soon.".to_string(),
            unsubscribe_note: "Unsubscribe any time.".to_string(),
        }
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
    }

    #[test]
    fn welcome_html_contains_escaped_content_and_footer() {
        let html = render_welcome_html(&content(), "Ayxnt", 2026);
        assert!(html.contains("You&#39;re &lt;in&gt;"));
        assert!(html.contains("Thanks &amp; see you soon."));
        assert!(html.contains("Unsubscribe any time."));
        assert!(html.contains("&copy; 2026 Ayxnt. All rights reserved."));
        assert!(!html.contains("<in>"));
    }

    #[test]
    fn send_request_uses_brevo_field_names() {
        let request = SendEmailRequest {
            sender: Contact { name: Some("Ayxnt"), email: "hello@ayxnt.com" },
            to: vec![Contact { name: None, email: "ada@example.com" }],
            subject: "Welcome",
            html_content: "<p>hi</p>".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "sender": { "name": "Ayxnt", "email": "hello@ayxnt.com" },
                "to": [{ "email": "ada@example.com" }],
                "subject": "Welcome",
                "htmlContent": "<p>hi</p>"
            })
        );
    }
}
