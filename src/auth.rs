//! Credentials for the spreadsheet API.
//!
//! The identity provider is an external system. [`TokenProvider`] is the
//! contract the sheets client needs from it: hand out a bearer token for a
//! scope, and revoke it again.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::SheetsConfig;
use crate::error::{AuthFailure, Result, SheetsError};

/// Read/write access to spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// A bearer credential. Held in memory only.
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        let secret: String = secret.into();
        Self {
            secret: SecretString::new(secret.into_boxed_str()),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Issues and revokes credentials on behalf of the user.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a credential for `scope`, asking the user for consent if the
    /// provider needs to.
    async fn request_token(
        &self,
        client_id: &str,
        scope: &str,
    ) -> std::result::Result<AccessToken, AuthFailure>;

    /// Invalidate a credential previously handed out.
    async fn revoke(&self, token: &AccessToken) -> Result<()>;
}

/// A token obtained out of band, e.g. from `gcloud auth print-access-token`.
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: AccessToken,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, None),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn request_token(
        &self,
        _client_id: &str,
        _scope: &str,
    ) -> std::result::Result<AccessToken, AuthFailure> {
        if self.token.secret().is_empty() {
            return Err(AuthFailure::Rejected("empty access token".to_string()));
        }
        Ok(self.token.clone())
    }

    async fn revoke(&self, _token: &AccessToken) -> Result<()> {
        Ok(())
    }
}

/// Exchanges a stored OAuth refresh token for access tokens.
pub struct RefreshTokenFlow {
    http: reqwest::Client,
    client_secret: SecretString,
    refresh_token: SecretString,
    token_url: String,
    revoke_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl RefreshTokenFlow {
    pub fn new(
        http: reqwest::Client,
        client_secret: SecretString,
        refresh_token: SecretString,
    ) -> Self {
        Self {
            http,
            client_secret,
            refresh_token,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            revoke_url: GOOGLE_REVOKE_URL.to_string(),
        }
    }

    /// Point the flow at different OAuth endpoints.
    pub fn with_endpoints(
        mut self,
        token_url: impl Into<String>,
        revoke_url: impl Into<String>,
    ) -> Self {
        self.token_url = token_url.into();
        self.revoke_url = revoke_url.into();
        self
    }
}

#[async_trait]
impl TokenProvider for RefreshTokenFlow {
    #[instrument(skip(self))]
    async fn request_token(
        &self,
        client_id: &str,
        scope: &str,
    ) -> std::result::Result<AccessToken, AuthFailure> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", client_id)
            .append_pair("client_secret", self.client_secret.expose_secret())
            .append_pair("refresh_token", self.refresh_token.expose_secret())
            .append_pair("grant_type", "refresh_token")
            .append_pair("scope", scope)
            .finish();

        let response = self
            .http
            .post(&self.token_url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(|e| AuthFailure::Rejected(format!("token request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthFailure::Rejected(format!("failed to read token response: {e}")))?;

        if !status.is_success() {
            let failure = match serde_json::from_str::<TokenErrorResponse>(&text) {
                Ok(err) => AuthFailure::classify(&err.error, err.error_description.as_deref()),
                Err(_) => AuthFailure::Rejected(format!("token endpoint returned {status}")),
            };
            warn!(%status, %failure, "token request rejected");
            return Err(failure);
        }

        let token = parse_token_response(&text, Utc::now())?;
        debug!(expires_at = ?token.expires_at(), "access token issued");
        Ok(token)
    }

    #[instrument(skip(self, token))]
    async fn revoke(&self, token: &AccessToken) -> Result<()> {
        let mut url = url::Url::parse(&self.revoke_url)?;
        url.query_pairs_mut().append_pair("token", token.secret());

        let response = self
            .http
            .post(url.as_str())
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .send()
            .await
            .map_err(|e| SheetsError::Http {
                url: self.revoke_url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetsError::UnexpectedStatus {
                url: self.revoke_url.clone(),
                status,
            });
        }
        debug!("access token revoked");
        Ok(())
    }
}

fn parse_token_response(
    body: &str,
    now: DateTime<Utc>,
) -> std::result::Result<AccessToken, AuthFailure> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| AuthFailure::Rejected(format!("malformed token response: {e}")))?;
    let expires_at = response
        .expires_in
        .map(|secs| now + Duration::seconds(secs));
    Ok(AccessToken::new(response.access_token, expires_at))
}

/// Pick a provider from the configuration: a pre-issued access token wins,
/// otherwise a refresh token together with the client secret.
pub fn provider_from_config(
    http: &reqwest::Client,
    config: &SheetsConfig,
) -> Option<Arc<dyn TokenProvider>> {
    if let Some(token) = &config.access_token {
        return Some(Arc::new(StaticToken::new(token.expose_secret())));
    }
    match (&config.client_secret, &config.refresh_token) {
        (Some(secret), Some(refresh)) => Some(Arc::new(RefreshTokenFlow::new(
            http.clone(),
            secret.clone(),
            refresh.clone(),
        ))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::testing::{local_http, CannedServer};

    fn flow(server: &CannedServer) -> RefreshTokenFlow {
        RefreshTokenFlow::new(
            local_http(),
            SecretString::new("client-secret".into()),
            SecretString::new("refresh-1".into()),
        )
        .with_endpoints(
            format!("{}/token", server.base_url),
            format!("{}/revoke", server.base_url),
        )
    }

    #[test]
    fn test_parse_token_response() {
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap();
        let token = parse_token_response(
            r#"{"access_token":"ya29.abc","expires_in":3599,"token_type":"Bearer"}"#,
            now,
        )
        .unwrap();
        assert_eq!(token.secret(), "ya29.abc");
        assert_eq!(token.expires_at(), Some(now + Duration::seconds(3599)));

        let err = parse_token_response("<html>", now).unwrap_err();
        assert!(matches!(err, AuthFailure::Rejected(_)));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AccessToken::new("super-secret", None);
        assert!(!format!("{token:?}").contains("super-secret"));
    }

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("token");
        let token = provider
            .request_token("client", SPREADSHEETS_SCOPE)
            .await
            .unwrap();
        assert_eq!(token.secret(), "token");

        let empty = StaticToken::new("");
        assert!(empty
            .request_token("client", SPREADSHEETS_SCOPE)
            .await
            .is_err());
    }

    #[test]
    fn test_provider_from_config() {
        let http = reqwest::Client::new();
        assert!(provider_from_config(&http, &SheetsConfig::new("c", "s")).is_none());
        assert!(
            provider_from_config(&http, &SheetsConfig::new("c", "s").with_access_token("t"))
                .is_some()
        );
        assert!(provider_from_config(
            &http,
            &SheetsConfig::new("c", "s").with_refresh_token("secret", "refresh")
        )
        .is_some());
    }

    #[tokio::test]
    async fn test_refresh_flow_issues_token() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"access_token":"ya29.fresh","expires_in":3599,"token_type":"Bearer"}"#,
        )])
        .await;

        let before = Utc::now();
        let token = flow(&server)
            .request_token("client-1", SPREADSHEETS_SCOPE)
            .await
            .unwrap();
        assert_eq!(token.secret(), "ya29.fresh");
        assert!(token.expires_at().unwrap() >= before + Duration::seconds(3599));

        let request = &server.requests()[0];
        assert!(request.starts_with("POST /token HTTP/1.1\r\n"));
        assert!(request
            .to_lowercase()
            .contains("content-type: application/x-www-form-urlencoded\r\n"));
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let form = url::form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect::<Vec<_>>();
        assert_eq!(
            form,
            vec![
                ("client_id".to_string(), "client-1".to_string()),
                ("client_secret".to_string(), "client-secret".to_string()),
                ("refresh_token".to_string(), "refresh-1".to_string()),
                ("grant_type".to_string(), "refresh_token".to_string()),
                ("scope".to_string(), SPREADSHEETS_SCOPE.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_refresh_flow_classifies_errors() {
        let server = CannedServer::start(vec![
            (400, r#"{"error":"access_denied","error_description":"denied"}"#),
            (400, r#"{"error":"popup_blocked"}"#),
            (400, r#"{"error":"invalid_grant","error_description":"Bad Request"}"#),
            (500, "<html>oops</html>"),
        ])
        .await;
        let flow = flow(&server);

        let mut failures = Vec::new();
        for _ in 0..4 {
            failures.push(
                flow.request_token("client-1", SPREADSHEETS_SCOPE)
                    .await
                    .unwrap_err(),
            );
        }

        assert_eq!(failures[0], AuthFailure::AccessDenied);
        assert_eq!(failures[1], AuthFailure::PopupBlocked);
        assert_eq!(
            failures[2],
            AuthFailure::Rejected("invalid_grant: Bad Request".to_string())
        );
        assert!(matches!(&failures[3], AuthFailure::Rejected(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_revoke() {
        let server =
            CannedServer::start(vec![(200, "{}"), (400, r#"{"error":"invalid_token"}"#)]).await;
        let flow = flow(&server);
        let token = AccessToken::new("ya29.old", None);

        flow.revoke(&token).await.unwrap();
        assert!(server.requests()[0].starts_with("POST /revoke?token=ya29.old HTTP/1.1\r\n"));

        let err = flow.revoke(&token).await.unwrap_err();
        assert!(matches!(
            err,
            SheetsError::UnexpectedStatus { status, .. } if status == reqwest::StatusCode::BAD_REQUEST
        ));
    }
}
