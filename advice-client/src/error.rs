use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdviceClientError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{message} (status {status}, code {code})")]
    Http {
        status: u16,
        code: String,
        message: String,
    },
    #[error("not signed in")]
    NotSignedIn,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("session storage error: {0}")]
    Session(#[from] std::io::Error),
    #[error("session encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

impl AdviceClientError {
    pub async fn from_http_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        match resp.text().await {
            Ok(body) => Self::from_parts(status, &body),
            Err(err) => AdviceClientError::Request(err),
        }
    }

    /// Builds an error from a non-2xx status and body. Bodies that are not
    /// `{error, code}` JSON keep the raw text as the message.
    pub fn from_parts(status: StatusCode, body: &str) -> Self {
        let (message, code) = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => (parsed.error, parsed.code),
            Err(_) if body.trim().is_empty() => (
                status.canonical_reason().unwrap_or("request failed").to_string(),
                None,
            ),
            Err(_) => (body.trim().to_string(), None),
        };
        AdviceClientError::Http {
            status: status.as_u16(),
            code: code.unwrap_or_else(|| "unknown".into()),
            message,
        }
    }

    /// Server error code, if this error came from the server.
    pub fn code(&self) -> Option<&str> {
        match self {
            AdviceClientError::Http { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_error_body() {
        let err = AdviceClientError::from_parts(
            StatusCode::CONFLICT,
            r#"{"error":"a user with email a@b.c already exists","code":"duplicate_email"}"#,
        );
        assert_eq!(err.code(), Some("duplicate_email"));
        match err {
            AdviceClientError::Http {
                status, message, ..
            } => {
                assert_eq!(status, 409);
                assert!(message.contains("already exists"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_reason_for_empty_body() {
        let err = AdviceClientError::from_parts(StatusCode::UNAUTHORIZED, "");
        assert_eq!(err.code(), Some("unknown"));
        assert!(err.to_string().starts_with("Unauthorized"));
    }

    #[test]
    fn keeps_plain_text_body() {
        let err = AdviceClientError::from_parts(StatusCode::BAD_REQUEST, "Json deserialize error\n");
        assert!(err.to_string().starts_with("Json deserialize error"));
    }
}
