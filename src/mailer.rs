//! # Mailer
//!
//! Template rendering plus the outbound email boundary. Transport is behind
//! the [`Mailer`] trait: production uses the Brevo transactional API over
//! `reqwest`, tests use [`RecordingMailer`].
use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::model::EmailTemplate;

const BREVO_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Error, Debug)]
pub enum SendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider rejected the message: {0}")]
    Provider(String),
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from_name: String,
    pub from_email: String,
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub html_body: String,
}

/// Substitutes `{{name}}` placeholders. Unknown placeholders are left in
/// place; only the supplied variable set is touched.
pub fn render(text: &str, variables: &[(&str, String)]) -> String {
    let mut rendered = text.to_string();
    for (name, value) in variables {
        rendered = rendered.replace(&format!("{{{{{name}}}}}"), value);
    }
    rendered
}

/// Renders a template's subject and content with the same variable set.
pub fn render_template(
    template: &EmailTemplate,
    variables: &[(&str, String)],
) -> (String, String) {
    (
        render(&template.subject, variables),
        render(&template.content, variables),
    )
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Dispatches one message, returning the provider message id.
    async fn send(&self, email: &OutgoingEmail) -> Result<String, SendError>;
}

pub struct BrevoMailer {
    client: reqwest::Client,
    api_key: String,
}

impl BrevoMailer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, SendError> {
        let payload = json!({
            "sender": { "name": email.from_name, "email": email.from_email },
            "to": [{ "email": email.to_email, "name": email.to_name }],
            "subject": email.subject,
            "htmlContent": email.html_body,
        });

        let response = self
            .client
            .post(BREVO_ENDPOINT)
            .header("accept", "application/json")
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Provider(body));
        }

        let body: serde_json::Value = response.json().await?;
        let message_id = body
            .get("messageId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(message_id)
    }
}

/// Test double: records every message and fails for configured recipients.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail_for: HashSet<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, SendError> {
        if self.fail_for.contains(&email.to_email) {
            return Err(SendError::Provider("simulated bounce".to_string()));
        }

        self.sent.lock().await.push(email.clone());

        Ok(format!("msg-{}", self.sent.lock().await.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::template;

    #[test]
    fn test_render_replaces_all_supplied_placeholders() {
        let template = template(true);
        let variables = vec![
            ("recipient_name", "Jana Nováková".to_string()),
            ("vote_title", "Výměna střechy".to_string()),
            ("vote_description", "Hlasování o rekonstrukci".to_string()),
            ("vote_start_date", "01.09.2026".to_string()),
            ("vote_end_date", "15.09.2026".to_string()),
            ("voting_link", "http://localhost:5173/vote/tok".to_string()),
            ("building_name", "Dům U Lípy".to_string()),
        ];

        let (subject, content) = render_template(&template, &variables);

        for declared in &template.variables {
            let placeholder = format!("{{{{{declared}}}}}");
            assert!(!subject.contains(&placeholder));
            assert!(!content.contains(&placeholder));
        }
        assert!(content.contains("Jana Nováková"));
        assert!(content.contains("http://localhost:5173/vote/tok"));
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let rendered = render("{{known}} {{unknown}}", &[("known", "x".to_string())]);
        assert_eq!(rendered, "x {{unknown}}");
    }

    #[tokio::test]
    async fn test_recording_mailer_failure_injection() {
        let mailer = RecordingMailer::failing_for(&["bounce@example.cz"]);
        let mut email = OutgoingEmail {
            from_name: "SVJ".into(),
            from_email: "noreply@example.cz".into(),
            to_name: "A".into(),
            to_email: "bounce@example.cz".into(),
            subject: "s".into(),
            html_body: "b".into(),
        };

        assert!(mailer.send(&email).await.is_err());

        email.to_email = "ok@example.cz".into();
        assert!(mailer.send(&email).await.is_ok());
        assert_eq!(mailer.sent.lock().await.len(), 1);
    }
}
