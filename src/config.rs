use std::env;
use std::time::Duration;

use secrecy::SecretString;
use tracing::debug;

use crate::error::{Result, SheetsError};

pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DEFAULT_MATCHES_SHEET: &str = "Matches";
pub const DEFAULT_MEMBERS_SHEET: &str = "Members";
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Rows beyond this are not read or overwritten.
const LAST_ROW: u32 = 1000;

/// Settings for the spreadsheet store and the identity provider.
///
/// Every value is optional at construction time. The client identifier is
/// checked when the client initializes and the spreadsheet identifier on
/// every data call.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub client_id: Option<String>,
    pub api_key: Option<SecretString>,
    pub spreadsheet_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub access_token: Option<SecretString>,
    pub api_base_url: String,
    pub layout: SheetLayout,
    pub sync_interval: Duration,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            api_key: None,
            spreadsheet_id: None,
            client_secret: None,
            refresh_token: None,
            access_token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            layout: SheetLayout::default(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }
}

impl SheetsConfig {
    pub fn new(client_id: impl Into<String>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            spreadsheet_id: Some(spreadsheet_id.into()),
            ..Self::default()
        }
    }

    /// Build the configuration from the process environment, loading a `.env`
    /// file first when one is present.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env file");
        }

        let mut config = Self {
            client_id: var("GOOGLE_CLIENT_ID"),
            api_key: secret_var("GOOGLE_SHEETS_API_KEY"),
            spreadsheet_id: var("SPREADSHEET_ID"),
            client_secret: secret_var("GOOGLE_CLIENT_SECRET"),
            refresh_token: secret_var("GOOGLE_REFRESH_TOKEN"),
            access_token: secret_var("GOOGLE_ACCESS_TOKEN"),
            ..Self::default()
        };
        if let Some(url) = var("SHEETS_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(sheet) = var("TEAMSHEET_MATCHES_SHEET") {
            config.layout.matches_sheet = sheet;
        }
        if let Some(sheet) = var("TEAMSHEET_MEMBERS_SHEET") {
            config.layout.members_sheet = sheet;
        }
        if let Some(secs) = var("TEAMSHEET_SYNC_INTERVAL_SECS").and_then(|s| s.parse().ok()) {
            config.sync_interval = Duration::from_secs(secs);
        }
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(secret(api_key.into()));
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(secret(token.into()));
        self
    }

    pub fn with_refresh_token(
        mut self,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        self.client_secret = Some(secret(client_secret.into()));
        self.refresh_token = Some(secret(refresh_token.into()));
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_layout(mut self, layout: SheetLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    pub fn require_client_id(&self) -> Result<&str> {
        self.client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(SheetsError::MissingConfig { key: "client_id" })
    }

    pub fn require_spreadsheet_id(&self) -> Result<&str> {
        self.spreadsheet_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(SheetsError::MissingConfig {
                key: "spreadsheet_id",
            })
    }
}

/// Names of the two tabs backing the store and the A1 ranges built from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub matches_sheet: String,
    pub members_sheet: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            matches_sheet: DEFAULT_MATCHES_SHEET.to_string(),
            members_sheet: DEFAULT_MEMBERS_SHEET.to_string(),
        }
    }
}

impl SheetLayout {
    /// Data rows of the matches tab, header excluded.
    pub fn matches_read_range(&self) -> String {
        format!("{}!A2:K{LAST_ROW}", self.matches_sheet)
    }

    /// The whole matches tab including the header row.
    pub fn matches_write_range(&self) -> String {
        format!("{}!A1:K{LAST_ROW}", self.matches_sheet)
    }

    pub fn matches_append_range(&self) -> String {
        format!("{}!A:K", self.matches_sheet)
    }

    pub fn members_read_range(&self) -> String {
        format!("{}!A2:G{LAST_ROW}", self.members_sheet)
    }

    pub fn members_write_range(&self) -> String {
        format!("{}!A1:G{LAST_ROW}", self.members_sheet)
    }

    pub fn members_append_range(&self) -> String {
        format!("{}!A:G", self.members_sheet)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn secret_var(key: &str) -> Option<SecretString> {
    var(key).map(secret)
}

fn secret(value: String) -> SecretString {
    SecretString::new(value.into_boxed_str())
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_ranges() {
        let layout = SheetLayout::default();
        assert_eq!(layout.matches_read_range(), "Matches!A2:K1000");
        assert_eq!(layout.matches_write_range(), "Matches!A1:K1000");
        assert_eq!(layout.matches_append_range(), "Matches!A:K");
        assert_eq!(layout.members_read_range(), "Members!A2:G1000");
        assert_eq!(layout.members_write_range(), "Members!A1:G1000");
        assert_eq!(layout.members_append_range(), "Members!A:G");
    }

    #[test]
    fn test_required_values() {
        let config = SheetsConfig::default();
        assert!(matches!(
            config.require_client_id(),
            Err(SheetsError::MissingConfig { key: "client_id" })
        ));
        assert!(matches!(
            config.require_spreadsheet_id(),
            Err(SheetsError::MissingConfig {
                key: "spreadsheet_id"
            })
        ));

        let config = SheetsConfig::new("client", "sheet").with_api_key("key");
        assert_eq!(config.require_client_id().unwrap(), "client");
        assert_eq!(config.require_spreadsheet_id().unwrap(), "sheet");
        assert_eq!(config.api_key.unwrap().expose_secret(), "key");
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let config = SheetsConfig::new("", "");
        assert!(config.require_client_id().is_err());
        assert!(config.require_spreadsheet_id().is_err());
    }
}
