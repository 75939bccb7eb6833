use openai_api_rs::v1::{
    api::OpenAIClient,
    chat_completion,
};
use serde::Deserialize;
use std::time::Duration;

pub const OPENROUTER_MODEL: &str = "arcee-ai/trinity-large-preview:free";
const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";
const LLM_TIMEOUT: Duration = Duration::from_secs(40);

/// Welcome email pieces as written by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub heading: String,
    pub body: String,
    pub unsubscribe_note: String,
}

pub fn welcome_prompt(app_name: &str, unsubscribe_url: &str) -> String {
    format!(
        r#"Write a concise, warm welcome email for someone who just joined the "{app_name}" waitlist.

Rules:
- subject: one short subject line
- heading: short H2-style heading (plain text)
- body: exactly 2-3 sentences, friendly and professional
- End the body with: "Please do not reply to this email."
- unsubscribe_note: short sentence pointing to {unsubscribe_url}

Return ONLY valid JSON, no markdown, no code fences, no extra keys:
{{
  "subject": "...",
  "heading": "...",
  "body": "...",
  "unsubscribe_note": "..."
}}"#
    )
}

/// Models like to wrap JSON in ```json fences despite being told not to.
pub fn strip_code_fences(raw: &str) -> &str {
    let raw = raw.trim();
    if !raw.contains("```") {
        return raw;
    }
    let inner = raw.split("```").nth(1).unwrap_or("");
    inner.strip_prefix("json").unwrap_or(inner).trim()
}

pub fn parse_email_content(raw: &str) -> Result<EmailContent, String> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| format!("model returned invalid JSON: {}", e))
}

pub fn create_openai_client(api_key: &str) -> Result<OpenAIClient, String> {
    OpenAIClient::builder()
        .with_endpoint(OPENROUTER_ENDPOINT)
        .with_api_key(api_key)
        .build()
        .map_err(|e| e.to_string())
}

pub async fn generate_email_content(
    api_key: &str,
    app_name: &str,
    unsubscribe_url: &str,
) -> Result<EmailContent, String> {
    let client = create_openai_client(api_key)?;

    let messages = vec![chat_completion::ChatCompletionMessage {
        role: chat_completion::MessageRole::user,
        content: chat_completion::Content::Text(welcome_prompt(app_name, unsubscribe_url)),
        name: None,
        tool_calls: None,
        tool_call_id: None,
    }];
    let request = chat_completion::ChatCompletionRequest::new(OPENROUTER_MODEL.to_string(), messages)
        .temperature(0.6);

    let result = tokio::time::timeout(LLM_TIMEOUT, client.chat_completion(request))
        .await
        .map_err(|_| format!("no response within {}s", LLM_TIMEOUT.as_secs()))?
        .map_err(|e| e.to_string())?;

    let raw = result
        .choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .ok_or_else(|| "model returned no content".to_string())?;

    tracing::debug!("Welcome email draft: {}", raw);
    parse_email_content(&raw)
}
