//! Client side of the subscription verification contract.
//!
//! `POST /api/check-subscription` with `{username, code}` answers
//! `{success, message?, reason?, accessToken?}`. This module holds the
//! transport-independent part: input validation, response interpretation
//! and which form field gets focus after a failure. The fetch itself lives
//! in the WASM bridge.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const VERIFY_ENDPOINT: &str = "/api/check-subscription";
pub const VERIFY_TIMEOUT_MS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub username: String,
    pub code: String,
}

impl VerifyRequest {
    /// Trim both fields and reject empty ones.
    pub fn new(username: &str, code: &str) -> Result<Self, InputError> {
        let username = username.trim();
        let code = code.trim();
        if username.is_empty() {
            return Err(InputError::EmptyUsername);
        }
        if code.is_empty() {
            return Err(InputError::EmptyCode);
        }
        Ok(Self {
            username: username.to_string(),
            code: code.to_string(),
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Machine-readable failure reason reported by the service or the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyReason {
    InvalidCode,
    NotSubscribed,
    TelegramError,
    ServiceUnavailable,
    ServerError,
    InternalError,
    Other(String),
}

impl VerifyReason {
    pub fn parse(s: &str) -> Self {
        match s {
            "invalid_code" => Self::InvalidCode,
            "not_subscribed" => Self::NotSubscribed,
            "telegram_error" => Self::TelegramError,
            "service_unavailable" => Self::ServiceUnavailable,
            "server_error" => Self::ServerError,
            "internal_error" => Self::InternalError,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidCode => "invalid_code",
            Self::NotSubscribed => "not_subscribed",
            Self::TelegramError => "telegram_error",
            Self::ServiceUnavailable => "service_unavailable",
            Self::ServerError => "server_error",
            Self::InternalError => "internal_error",
            Self::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("verification timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("{message}")]
    Rejected {
        message: String,
        reason: VerifyReason,
    },
    #[error("verification is not supported in this environment")]
    Unsupported,
}

/// Form field that should take focus after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusField {
    Username,
    Code,
}

impl VerifyError {
    pub fn focus_field(&self) -> FocusField {
        match self {
            VerifyError::Rejected {
                reason: VerifyReason::InvalidCode,
                ..
            } => FocusField::Code,
            _ => FocusField::Username,
        }
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
}

const FALLBACK_SERVER_MESSAGE: &str = "Проверка подписки недоступна. Попробуйте позже.";
const FALLBACK_REJECT_MESSAGE: &str = "Не удалось подтвердить подписку.";

/// Interpret an HTTP reply. Bodies that fail to parse count as
/// `{success: false}`.
pub fn interpret_response(status: u16, body: &str) -> Result<Session, VerifyError> {
    let data: VerifyResponse = serde_json::from_str(body).unwrap_or_default();
    let ok_status = (200..300).contains(&status);

    if !ok_status {
        log::debug!("verification service answered {status}");
        return Err(VerifyError::Rejected {
            message: data
                .message
                .unwrap_or_else(|| FALLBACK_SERVER_MESSAGE.to_string()),
            reason: VerifyReason::parse(data.reason.as_deref().unwrap_or("server_error")),
        });
    }
    if !data.success {
        return Err(VerifyError::Rejected {
            message: data
                .message
                .unwrap_or_else(|| FALLBACK_REJECT_MESSAGE.to_string()),
            reason: VerifyReason::parse(data.reason.as_deref().unwrap_or("")),
        });
    }
    Ok(Session {
        access_token: data.access_token.filter(|t| !t.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_are_trimmed_and_required() {
        assert_eq!(VerifyRequest::new("  ", "x"), Err(InputError::EmptyUsername));
        assert_eq!(VerifyRequest::new("@user", " \t"), Err(InputError::EmptyCode));
        let req = VerifyRequest::new(" @user ", " 1234 ").unwrap();
        assert_eq!(req.to_json(), r#"{"username":"@user","code":"1234"}"#);
    }

    #[test]
    fn success_keeps_token() {
        let s = interpret_response(200, r#"{"success":true,"accessToken":"tok"}"#).unwrap();
        assert_eq!(s.access_token.as_deref(), Some("tok"));
        let s = interpret_response(200, r#"{"success":true}"#).unwrap();
        assert_eq!(s.access_token, None);
    }

    #[test]
    fn invalid_code_focuses_code_field() {
        let err = interpret_response(
            200,
            r#"{"success":false,"reason":"invalid_code","message":"bad code"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "bad code");
        assert_eq!(err.focus_field(), FocusField::Code);
    }

    #[test]
    fn server_errors_focus_username() {
        let err = interpret_response(503, "not json").unwrap_err();
        assert_eq!(
            err,
            VerifyError::Rejected {
                message: FALLBACK_SERVER_MESSAGE.to_string(),
                reason: VerifyReason::ServerError,
            }
        );
        assert_eq!(err.focus_field(), FocusField::Username);
        assert_eq!(VerifyError::Timeout.focus_field(), FocusField::Username);
    }
}
