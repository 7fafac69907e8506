/// All errors that can occur while talking to the spreadsheet store or the
/// identity provider.
#[derive(thiserror::Error, Debug)]
pub enum SheetsError {
    /// A required configuration value was not supplied.
    #[error("missing configuration value: {key}")]
    MissingConfig { key: &'static str },

    /// A data call was attempted before a credential was obtained.
    #[error("not signed in, authenticate first")]
    NotAuthenticated,

    /// The client reports it is not connected, so the call was skipped.
    #[error("not connected to the spreadsheet")]
    NotConnected,

    /// The identity provider refused to issue a credential.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthFailure),

    /// The spreadsheet API rejected the credential (HTTP 401).
    #[error("access token expired, please reconnect")]
    TokenExpired,

    /// The credential is valid but may not access the spreadsheet (HTTP 403).
    #[error("no permission to access range {range}")]
    PermissionDenied { range: String },

    /// The spreadsheet or range does not exist (HTTP 404).
    #[error("spreadsheet or range {range} not found")]
    NotFound { range: String },

    /// HTTP request failed (network, DNS, TLS, timeout, etc.).
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// Server returned a non-success HTTP status code.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Failed to read the response body as text.
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        source: reqwest::Error,
    },

    /// The API answered with a body that is not the expected JSON shape.
    #[error("malformed api response: {0}")]
    Json(#[from] serde_json::Error),

    /// A configured endpoint is not a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A role label outside the fixed permission table.
    #[error("unknown role: {0}")]
    InvalidRole(String),
}

impl SheetsError {
    /// Whether the failure means the credential is gone and the user has to
    /// reconnect before any further remote call can succeed.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, SheetsError::TokenExpired)
    }
}

/// Why the identity provider did not hand out a credential.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("the consent popup was blocked, check the browser settings")]
    PopupBlocked,
    #[error("access to the Google account was denied")]
    AccessDenied,
    #[error("{0}")]
    Rejected(String),
}

impl AuthFailure {
    /// Classify a provider error code (plus optional description) into one of
    /// the user-facing failure kinds.
    pub fn classify(code: &str, description: Option<&str>) -> Self {
        if code.contains("popup_blocked") {
            AuthFailure::PopupBlocked
        } else if code.contains("access_denied") {
            AuthFailure::AccessDenied
        } else {
            match description {
                Some(description) if !description.is_empty() => {
                    AuthFailure::Rejected(format!("{code}: {description}"))
                }
                _ => AuthFailure::Rejected(code.to_string()),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SheetsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_failures() {
        assert_eq!(
            AuthFailure::classify("popup_blocked_by_browser", None),
            AuthFailure::PopupBlocked
        );
        assert_eq!(
            AuthFailure::classify("access_denied", Some("user said no")),
            AuthFailure::AccessDenied
        );
        assert_eq!(
            AuthFailure::classify("invalid_grant", Some("Token has been expired or revoked.")),
            AuthFailure::Rejected("invalid_grant: Token has been expired or revoked.".to_string())
        );
        assert_eq!(
            AuthFailure::classify("server_error", Some("")),
            AuthFailure::Rejected("server_error".to_string())
        );
    }

    #[test]
    fn test_token_expired_is_distinct() {
        assert!(SheetsError::TokenExpired.is_token_expired());
        assert!(!SheetsError::NotAuthenticated.is_token_expired());
        assert!(!SheetsError::PermissionDenied {
            range: "Matches!A2:K1000".to_string()
        }
        .is_token_expired());
    }
}
