use gloo_net::http::Request;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::config;

#[derive(Serialize)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Deserialize, Debug)]
pub struct SubscribeResponse {
    pub status: String,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub enum WaitlistError {
    Network(String),
    Rejected { status: u16, message: String },
    Decode(String),
}

impl fmt::Display for WaitlistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitlistError::Network(e) => write!(f, "Request failed: {}", e),
            WaitlistError::Rejected { status, message } => {
                write!(f, "Subscribe rejected ({}): {}", status, message)
            }
            WaitlistError::Decode(e) => write!(f, "Failed to parse response: {}", e),
        }
    }
}

pub fn subscribe_url() -> String {
    format!("{}/subscribe", config::get_backend_url())
}

/// Posts the address to the waitlist backend.
pub async fn join_waitlist(email: String) -> Result<SubscribeResponse, WaitlistError> {
    let response = Request::post(&subscribe_url())
        .json(&SubscribeRequest { email })
        .map_err(|e| WaitlistError::Network(e.to_string()))?
        .send()
        .await
        .map_err(|e| WaitlistError::Network(e.to_string()))?;

    if !response.ok() {
        let status = response.status();
        let message = match response.json::<ErrorResponse>().await {
            Ok(err) => err.error,
            Err(_) => "Subscribe failed".to_string(),
        };
        return Err(WaitlistError::Rejected { status, message });
    }

    response
        .json::<SubscribeResponse>()
        .await
        .map_err(|e| WaitlistError::Decode(e.to_string()))
}
