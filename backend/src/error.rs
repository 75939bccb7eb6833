use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("Sheet error: {0}")]
    Sheet(String),
    #[error("LLM error: {0}")]
    Llm(String),
    #[error("Email send error: {0}")]
    Email(String),
}

impl SubscribeError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubscribeError::InvalidEmail | SubscribeError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SubscribeError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_failing_step() {
        assert_eq!(SubscribeError::Sheet("quota".into()).to_string(), "Sheet error: quota");
        assert_eq!(SubscribeError::Llm("timeout".into()).to_string(), "LLM error: timeout");
        assert_eq!(SubscribeError::Email("401".into()).to_string(), "Email send error: 401");
    }

    #[test]
    fn only_bad_input_is_a_client_error() {
        assert_eq!(SubscribeError::InvalidEmail.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(SubscribeError::InvalidBody("missing field".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(SubscribeError::Sheet(String::new()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
