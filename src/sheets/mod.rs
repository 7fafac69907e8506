//! Plumbing for the Google Sheets `values` endpoints.

pub mod rows;

use reqwest::{RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SheetsError};

/// A single cell as returned with `UNFORMATTED_VALUE` rendering.
pub type Cell = serde_json::Value;

pub type Row = Vec<Cell>;

/// Response body of `spreadsheets.values.get`. The API omits `values` for an
/// empty range.
#[derive(Debug, Deserialize)]
pub(crate) struct ValueRange {
    #[serde(default)]
    pub values: Vec<Row>,
}

/// Request body of `spreadsheets.values.update` and `append`.
#[derive(Debug, Serialize)]
pub(crate) struct ValueRangeBody<'a> {
    pub range: &'a str,
    #[serde(rename = "majorDimension")]
    pub major_dimension: &'static str,
    pub values: &'a [Row],
}

/// Build `{base}/{spreadsheet_id}/values/{range}[:{action}]`, percent-encoding
/// the range so sheet names with spaces or non-ASCII text survive.
pub(crate) fn values_url(
    base: &str,
    spreadsheet_id: &str,
    range: &str,
    action: Option<&str>,
) -> Result<Url> {
    let mut url = Url::parse(base)?;
    let last = match action {
        Some(action) => format!("{range}:{action}"),
        None => range.to_string(),
    };
    url.path_segments_mut()
        .map_err(|_| SheetsError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push(spreadsheet_id)
        .push("values")
        .push(&last);
    Ok(url)
}

/// The url as it may appear in logs and errors, without the query string
/// that can carry the API key.
pub(crate) fn display_url(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}

/// Map an HTTP status to the error kinds the rest of the crate reacts to.
pub(crate) fn check_status(status: StatusCode, url: &str, range: &str) -> Result<()> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED => Err(SheetsError::TokenExpired),
        StatusCode::FORBIDDEN => Err(SheetsError::PermissionDenied {
            range: range.to_owned(),
        }),
        StatusCode::NOT_FOUND => Err(SheetsError::NotFound {
            range: range.to_owned(),
        }),
        status => Err(SheetsError::UnexpectedStatus {
            url: url.to_owned(),
            status,
        }),
    }
}

/// Send a prepared request and return the response body as text.
pub(crate) async fn send(request: RequestBuilder, url: &str, range: &str) -> Result<String> {
    debug!(url, range, "calling sheets api");

    let response = request.send().await.map_err(|e| SheetsError::Http {
        url: url.to_owned(),
        source: e,
    })?;

    check_status(response.status(), url, range)?;

    response.text().await.map_err(|e| SheetsError::ResponseBody {
        url: url.to_owned(),
        source: e,
    })
}
