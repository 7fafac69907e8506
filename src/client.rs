use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::auth::{AccessToken, TokenProvider, SPREADSHEETS_SCOPE};
use crate::config::SheetsConfig;
use crate::error::{Result, SheetsError};
use crate::model::AuthStatus;
use crate::sheets::{self, Row, ValueRange, ValueRangeBody};

/// The operations the data manager needs from a spreadsheet store.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Validate configuration and prepare the client. Calling it again is a
    /// no-op.
    async fn initialize(&self) -> Result<()>;

    /// Obtain a credential from the identity provider.
    async fn authenticate(&self) -> Result<()>;

    /// Raw rows of `range`, without any header handling.
    async fn read_range(&self, range: &str) -> Result<Vec<Row>>;

    /// Overwrite `range` in place with `rows`.
    async fn write_range(&self, range: &str, rows: Vec<Row>) -> Result<()>;

    /// Append `rows` after the last row of the table in `range`.
    async fn append_rows(&self, range: &str, rows: Vec<Row>) -> Result<()>;

    async fn is_connected(&self) -> bool;

    async fn auth_status(&self) -> AuthStatus;

    /// Revoke the credential and forget it.
    async fn sign_out(&self);
}

#[derive(Debug, Default)]
struct Session {
    initialized: bool,
    token: Option<AccessToken>,
}

/// Google Sheets client.
///
/// `SheetsClient` wraps a [`reqwest::Client`], the configuration and a
/// [`TokenProvider`], and talks to the Sheets v4 `values` endpoints.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> teamsheet::Result<()> {
/// use std::sync::Arc;
/// use teamsheet::{SheetsApi, SheetsClient, SheetsConfig, StaticToken};
///
/// let config = SheetsConfig::new("client-id", "spreadsheet-id");
/// let client = SheetsClient::new(config, Arc::new(StaticToken::new("ya29...")));
/// client.authenticate().await?;
/// let rows = client.read_range("Matches!A2:K1000").await?;
/// println!("Found {} rows", rows.len());
/// # Ok(())
/// # }
/// ```
pub struct SheetsClient {
    http: reqwest::Client,
    config: SheetsConfig,
    provider: Arc<dyn TokenProvider>,
    session: RwLock<Session>,
}

impl SheetsClient {
    /// Create a new client with a default HTTP client.
    pub fn new(config: SheetsConfig, provider: Arc<dyn TokenProvider>) -> Self {
        Self::with_client(reqwest::Client::new(), config, provider)
    }

    /// Create a new client using the provided [`reqwest::Client`].
    ///
    /// Use this when you need to configure timeouts, proxies, headers, etc.
    pub fn with_client(
        http: reqwest::Client,
        config: SheetsConfig,
        provider: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            config,
            provider,
            session: RwLock::new(Session::default()),
        }
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    /// The current token, or `NotAuthenticated`.
    async fn bearer(&self) -> Result<AccessToken> {
        self.session
            .read()
            .await
            .token
            .clone()
            .ok_or(SheetsError::NotAuthenticated)
    }

    fn url(&self, range: &str, action: Option<&str>) -> Result<reqwest::Url> {
        let spreadsheet_id = self.config.require_spreadsheet_id()?;
        let mut url = sheets::values_url(&self.config.api_base_url, spreadsheet_id, range, action)?;
        if let Some(key) = &self.config.api_key {
            url.query_pairs_mut().append_pair("key", key.expose_secret());
        }
        Ok(url)
    }

    /// Run a request and forget the token when the API says it expired.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        range: &str,
    ) -> Result<String> {
        match sheets::send(request, url, range).await {
            Err(SheetsError::TokenExpired) => {
                warn!(range, "access token rejected, signing out locally");
                self.session.write().await.token = None;
                Err(SheetsError::TokenExpired)
            }
            other => other,
        }
    }

    /// Shared path of update and append: both send a `ValueRange` body.
    async fn send_values(
        &self,
        method: reqwest::Method,
        range: &str,
        action: Option<&str>,
        extra_query: &[(&str, &str)],
        rows: &[Row],
    ) -> Result<()> {
        let token = self.bearer().await?;
        let mut url = self.url(range, action)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("valueInputOption", "RAW");
            for (key, value) in extra_query {
                query.append_pair(key, value);
            }
        }
        let display = sheets::display_url(&url);

        let body = serde_json::to_string(&ValueRangeBody {
            range,
            major_dimension: "ROWS",
            values: rows,
        })?;

        let request = self
            .http
            .request(method, url)
            .bearer_auth(token.secret())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.execute(request, &display, range).await?;
        Ok(())
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn initialize(&self) -> Result<()> {
        if self.session.read().await.initialized {
            return Ok(());
        }

        self.config.require_client_id()?;
        debug!(
            api_key = self.config.api_key.is_some(),
            base_url = %self.config.api_base_url,
            "sheets client configured"
        );

        self.session.write().await.initialized = true;
        info!("sheets client initialized");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn authenticate(&self) -> Result<()> {
        self.initialize().await?;
        let client_id = self.config.require_client_id()?;

        match self.provider.request_token(client_id, SPREADSHEETS_SCOPE).await {
            Ok(token) => {
                self.session.write().await.token = Some(token);
                info!("authenticated with the identity provider");
                Ok(())
            }
            Err(failure) => {
                self.session.write().await.token = None;
                warn!(%failure, "authentication failed");
                Err(failure.into())
            }
        }
    }

    #[instrument(skip(self))]
    async fn read_range(&self, range: &str) -> Result<Vec<Row>> {
        let token = self.bearer().await?;
        let mut url = self.url(range, None)?;
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("dateTimeRenderOption", "FORMATTED_STRING");
        let display = sheets::display_url(&url);

        let request = self.http.get(url).bearer_auth(token.secret());
        let body = self.execute(request, &display, range).await?;
        let values = serde_json::from_str::<ValueRange>(&body)?.values;
        debug!(rows = values.len(), range, "read range");
        Ok(values)
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn write_range(&self, range: &str, rows: Vec<Row>) -> Result<()> {
        self.send_values(reqwest::Method::PUT, range, None, &[], &rows)
            .await?;
        debug!(range, "wrote range");
        Ok(())
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn append_rows(&self, range: &str, rows: Vec<Row>) -> Result<()> {
        self.send_values(
            reqwest::Method::POST,
            range,
            Some("append"),
            &[("insertDataOption", "INSERT_ROWS")],
            &rows,
        )
        .await?;
        debug!(range, "appended rows");
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        let session = self.session.read().await;
        session.initialized && session.token.is_some()
    }

    async fn auth_status(&self) -> AuthStatus {
        let session = self.session.read().await;
        AuthStatus {
            initialized: session.initialized,
            authenticated: session.token.is_some(),
            has_token: session.token.is_some(),
        }
    }

    async fn sign_out(&self) {
        let token = self.session.write().await.token.take();
        if let Some(token) = token {
            if let Err(e) = self.provider.revoke(&token).await {
                warn!(error = %e, "failed to revoke access token");
            }
        }
        info!("signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::error::AuthFailure;
    use crate::testing::{local_http, CannedServer};

    fn client(config: SheetsConfig) -> SheetsClient {
        SheetsClient::new(config, Arc::new(StaticToken::new("token")))
    }

    async fn served_client(server: &CannedServer) -> SheetsClient {
        let config = SheetsConfig::new("client", "sheet-1")
            .with_api_base_url(format!("{}/v4/spreadsheets", server.base_url));
        let client =
            SheetsClient::with_client(local_http(), config, Arc::new(StaticToken::new("token")));
        client.authenticate().await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_initialize_requires_client_id() {
        let client = client(SheetsConfig::default());
        assert!(matches!(
            client.initialize().await,
            Err(SheetsError::MissingConfig { key: "client_id" })
        ));
        assert!(!client.auth_status().await.initialized);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let client = client(SheetsConfig::new("client", "sheet"));
        client.initialize().await.unwrap();
        client.initialize().await.unwrap();
        assert!(client.auth_status().await.initialized);
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_authenticate_and_sign_out() {
        let client = client(SheetsConfig::new("client", "sheet"));
        client.authenticate().await.unwrap();
        assert!(client.is_connected().await);
        assert_eq!(
            client.auth_status().await,
            AuthStatus {
                initialized: true,
                authenticated: true,
                has_token: true
            }
        );

        client.sign_out().await;
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_authenticate_failure_is_classified() {
        let client = SheetsClient::new(
            SheetsConfig::new("client", "sheet"),
            Arc::new(StaticToken::new("")),
        );
        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(err, SheetsError::Auth(AuthFailure::Rejected(_))));
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_data_calls_require_token() {
        let client = client(SheetsConfig::new("client", "sheet"));
        assert!(matches!(
            client.read_range("Matches!A2:K1000").await,
            Err(SheetsError::NotAuthenticated)
        ));
        assert!(matches!(
            client.append_rows("Matches!A:K", vec![]).await,
            Err(SheetsError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_data_calls_require_spreadsheet_id() {
        let config = SheetsConfig {
            client_id: Some("client".to_string()),
            ..SheetsConfig::default()
        };
        let client = client(config);
        client.authenticate().await.unwrap();
        assert!(matches!(
            client.read_range("Matches!A2:K1000").await,
            Err(SheetsError::MissingConfig {
                key: "spreadsheet_id"
            })
        ));
        assert!(matches!(
            client.write_range("Matches!A1:K1000", vec![]).await,
            Err(SheetsError::MissingConfig {
                key: "spreadsheet_id"
            })
        ));
    }

    #[tokio::test]
    async fn test_read_request_and_response() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"range":"Matches!A2:K1000","majorDimension":"ROWS","values":[[1,"2025-04-01","Spring Cup"]]}"#,
        )])
        .await;
        let client = served_client(&server).await;

        let rows = client.read_range("Matches!A2:K1000").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], serde_json::json!(1));
        assert_eq!(rows[0][2], serde_json::json!("Spring Cup"));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with(
            "GET /v4/spreadsheets/sheet-1/values/Matches!A2:K1000?valueRenderOption=UNFORMATTED_VALUE&dateTimeRenderOption=FORMATTED_STRING HTTP/1.1\r\n"
        ));
        assert!(requests[0]
            .to_lowercase()
            .contains("authorization: bearer token\r\n"));
    }

    #[tokio::test]
    async fn test_write_and_append_requests() {
        let server = CannedServer::start(vec![(200, "{}"), (200, "{}")]).await;
        let client = served_client(&server).await;
        let rows = vec![vec![serde_json::json!(7), serde_json::json!("2025-04-01")]];

        client
            .write_range("Matches!A1:K1000", rows.clone())
            .await
            .unwrap();
        client.append_rows("Matches!A:K", rows).await.unwrap();

        let requests = server.requests();
        assert!(requests[0].starts_with(
            "PUT /v4/spreadsheets/sheet-1/values/Matches!A1:K1000?valueInputOption=RAW HTTP/1.1\r\n"
        ));
        assert!(requests[0].ends_with(
            r#"{"range":"Matches!A1:K1000","majorDimension":"ROWS","values":[[7,"2025-04-01"]]}"#
        ));
        assert!(requests[1].starts_with(
            "POST /v4/spreadsheets/sheet-1/values/Matches!A:K:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS HTTP/1.1\r\n"
        ));
        assert!(requests[1].ends_with(
            r#"{"range":"Matches!A:K","majorDimension":"ROWS","values":[[7,"2025-04-01"]]}"#
        ));
        assert!(requests[1]
            .to_lowercase()
            .contains("content-type: application/json\r\n"));
    }

    #[tokio::test]
    async fn test_status_mapping_and_expiry() {
        let server = CannedServer::start(vec![
            (403, r#"{"error":{"code":403}}"#),
            (404, r#"{"error":{"code":404}}"#),
            (500, r#"{"error":{"code":500}}"#),
            (401, r#"{"error":{"code":401}}"#),
        ])
        .await;
        let client = served_client(&server).await;
        let range = "Members!A2:G1000";

        assert!(matches!(
            client.read_range(range).await,
            Err(SheetsError::PermissionDenied { range: r }) if r == range
        ));
        assert!(client.is_connected().await);

        assert!(matches!(
            client.read_range(range).await,
            Err(SheetsError::NotFound { .. })
        ));
        assert!(client.is_connected().await);

        assert!(matches!(
            client.read_range(range).await,
            Err(SheetsError::UnexpectedStatus { status, .. })
                if status == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert!(client.is_connected().await);

        let err = client.read_range(range).await.unwrap_err();
        assert!(err.is_token_expired());
        assert!(!client.is_connected().await);
        assert!(!client.auth_status().await.has_token);

        // The token is gone, so nothing else reaches the server.
        assert!(matches!(
            client.read_range(range).await,
            Err(SheetsError::NotAuthenticated)
        ));
        assert_eq!(server.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_api_key_stays_out_of_errors() {
        let server = CannedServer::start(vec![(503, "{}")]).await;
        let config = SheetsConfig::new("client", "sheet-1")
            .with_api_base_url(format!("{}/v4/spreadsheets", server.base_url))
            .with_api_key("key-123");
        let client =
            SheetsClient::with_client(local_http(), config, Arc::new(StaticToken::new("token")));
        client.authenticate().await.unwrap();

        let err = client.read_range("Members!A2:G1000").await.unwrap_err();
        assert!(!err.to_string().contains("key-123"));
        assert!(server.requests()[0].contains("?key=key-123&valueRenderOption="));
    }
}
