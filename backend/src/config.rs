use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Where the Google service account key comes from. Hosted deployments keep
/// the key base64-encoded in the environment, local runs read it from disk.
#[derive(Clone, Debug)]
pub enum GoogleCredentials {
    Base64Json(String),
    File(PathBuf),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub openrouter_api_key: String,
    pub brevo_api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    pub google_sheet_id: String,
    pub google_credentials: GoogleCredentials,
    pub app_name: String,
    pub unsubscribe_url: String,
    pub allowed_origins: Vec<String>,
    pub bind_address: String,
    pub sentry_dsn: Option<String>,
}

fn required(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{} must be set", key))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let google_credentials = match env::var("GOOGLE_CREDS_JSON") {
            Ok(encoded) if !encoded.trim().is_empty() => GoogleCredentials::Base64Json(encoded),
            _ => GoogleCredentials::File(PathBuf::from(optional("GOOGLE_CREDS_FILE", "credentials.json"))),
        };

        Ok(Config {
            openrouter_api_key: required("OPENROUTER_API_KEY")?,
            brevo_api_key: required("BREVO_API_KEY")?,
            sender_email: required("SENDER_EMAIL")?,
            sender_name: optional("SENDER_NAME", "Ayxnt"),
            google_sheet_id: required("GOOGLE_SHEET_ID")?,
            google_credentials,
            app_name: optional("APP_NAME", "Ayxnt"),
            unsubscribe_url: optional("UNSUBSCRIBE_URL", "https://ayxnt.com/unsubscribe"),
            allowed_origins: parse_origins(&optional("ALLOWED_ORIGINS", "http://localhost:5173")),
            bind_address: optional("BIND_ADDRESS", "127.0.0.1:3001"),
            sentry_dsn: env::var("SENTRY_DSN").ok().filter(|v| !v.is_empty()),
        })
    }
}
