use std::future::Future;
use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::api::brevo::{self, Mailer};
use crate::api::google_sheets::SheetsClient;
use crate::api::openrouter::{self, EmailContent};
use crate::config::Config;
use crate::error::SubscribeError;
use crate::AppState;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("email pattern is valid")
});

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SubscribeResponse {
    pub status: String,
    pub message: String,
}

impl SubscribeResponse {
    pub fn success() -> Self {
        SubscribeResponse {
            status: "success".to_string(),
            message: "Subscribed successfully!".to_string(),
        }
    }
}

/// Trims the address and rejects anything that is not `local@domain.tld`.
pub fn validate_email(raw: &str) -> Result<String, SubscribeError> {
    let email = raw.trim();
    if email.len() > 254 || !EMAIL_RE.is_match(email) {
        return Err(SubscribeError::InvalidEmail);
    }
    Ok(email.to_string())
}

/// The external steps behind a signup, in the order they run.
pub trait WaitlistSteps: Send + Sync {
    fn save_email(&self, email: &str) -> impl Future<Output = Result<u32, SubscribeError>> + Send;
    fn generate_content(&self, email: &str) -> impl Future<Output = Result<EmailContent, SubscribeError>> + Send;
    fn send_welcome(
        &self,
        email: &str,
        content: &EmailContent,
    ) -> impl Future<Output = Result<(), SubscribeError>> + Send;
    fn mark_sent(&self, row: u32) -> impl Future<Output = Result<(), SubscribeError>> + Send;
}

pub struct WaitlistServices {
    sheets: SheetsClient,
    mailer: Mailer,
    openrouter_api_key: String,
    app_name: String,
    unsubscribe_url: String,
}

impl WaitlistServices {
    pub fn from_config(config: &Config, http: reqwest::Client) -> Self {
        WaitlistServices {
            sheets: SheetsClient::new(
                http.clone(),
                config.google_sheet_id.clone(),
                config.google_credentials.clone(),
            ),
            mailer: Mailer::new(
                http,
                config.brevo_api_key.clone(),
                config.sender_name.clone(),
                config.sender_email.clone(),
            ),
            openrouter_api_key: config.openrouter_api_key.clone(),
            app_name: config.app_name.clone(),
            unsubscribe_url: config.unsubscribe_url.clone(),
        }
    }
}

impl WaitlistSteps for WaitlistServices {
    async fn save_email(&self, email: &str) -> Result<u32, SubscribeError> {
        self.sheets
            .save_email(email)
            .await
            .map_err(|e| SubscribeError::Sheet(e.to_string()))
    }

    async fn generate_content(&self, _email: &str) -> Result<EmailContent, SubscribeError> {
        openrouter::generate_email_content(&self.openrouter_api_key, &self.app_name, &self.unsubscribe_url)
            .await
            .map_err(SubscribeError::Llm)
    }

    async fn send_welcome(&self, email: &str, content: &EmailContent) -> Result<(), SubscribeError> {
        let html = brevo::render_welcome_html(content, &self.app_name, Utc::now().year());
        self.mailer
            .send_html(email, &content.subject, html)
            .await
            .map_err(SubscribeError::Email)
    }

    async fn mark_sent(&self, row: u32) -> Result<(), SubscribeError> {
        self.sheets
            .mark_row_sent(row)
            .await
            .map_err(|e| SubscribeError::Sheet(e.to_string()))
    }
}

/// Save, generate, send, then mark. The first three abort the signup on
/// failure; a failed mark is only logged since the email already went out.
pub async fn run_subscription<S: WaitlistSteps>(steps: &S, email: &str) -> Result<SubscribeResponse, SubscribeError> {
    let row = steps.save_email(email).await.map_err(|e| {
        tracing::error!("Failed to save subscriber: {}", e);
        e
    })?;
    tracing::info!("Saved subscriber to row {}", row);

    let content = steps.generate_content(email).await.map_err(|e| {
        tracing::error!("Failed to generate welcome email: {}", e);
        e
    })?;

    steps.send_welcome(email, &content).await.map_err(|e| {
        tracing::error!("Failed to send welcome email: {}", e);
        e
    })?;

    if let Err(e) = steps.mark_sent(row).await {
        tracing::warn!("Could not mark row {} as sent: {}", row, e);
    }

    Ok(SubscribeResponse::success())
}

pub async fn subscribe<S: WaitlistSteps + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<SubscribeResponse>, SubscribeError> {
    // Malformed bodies get the same JSON error shape as every other failure.
    let Json(req) = payload.map_err(|rejection| SubscribeError::InvalidBody(rejection.body_text()))?;
    let email = validate_email(&req.email)?;
    tracing::info!("New waitlist signup");
    run_subscription(&state.steps, &email).await.map(Json)
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Records every step it is asked to run and fails the one named in `fail_at`.
    #[derive(Default)]
    pub struct FakeSteps {
        pub fail_at: Option<&'static str>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeSteps {
        pub fn failing_at(step: &'static str) -> Self {
            FakeSteps { fail_at: Some(step), ..Default::default() }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, step: &'static str, detail: String) -> bool {
            self.calls.lock().unwrap().push(format!("{}:{}", step, detail));
            self.fail_at == Some(step)
        }
    }

    impl WaitlistSteps for FakeSteps {
        async fn save_email(&self, email: &str) -> Result<u32, SubscribeError> {
            if self.record("save", email.to_string()) {
                return Err(SubscribeError::Sheet("quota exceeded".into()));
            }
            Ok(7)
        }

        async fn generate_content(&self, email: &str) -> Result<EmailContent, SubscribeError> {
            if self.record("generate", email.to_string()) {
                return Err(SubscribeError::Llm("timeout".into()));
            }
            Ok(EmailContent {
                subject: "Welcome".into(),
                heading: "Hi".into(),
                body: "Thanks for joining.".into(),
                unsubscribe_note: "Unsubscribe any time.".into(),
            })
        }

        async fn send_welcome(&self, email: &str, content: &EmailContent) -> Result<(), SubscribeError> {
            if self.record("send", format!("{}/{}", email, content.subject)) {
                return Err(SubscribeError::Email("401 unauthorized".into()));
            }
            Ok(())
        }

        async fn mark_sent(&self, row: u32) -> Result<(), SubscribeError> {
            if self.record("mark", row.to_string()) {
                return Err(SubscribeError::Sheet("row locked".into()));
            }
            Ok(())
        }
    }
}
