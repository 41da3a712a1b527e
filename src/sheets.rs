//! Write-side client for the Google Sheets API.

use {
    std::{
        io,
        sync::LazyLock,
    },
    serde::Serialize,
    serde_json::json,
    tokio::{
        sync::Mutex,
        time::{
            Instant,
            sleep_until,
        },
    },
    yup_oauth2::{
        ServiceAccountAuthenticator,
        read_service_account_key,
    },
    crate::prelude::*,
};

/// from <https://developers.google.com/sheets/api/limits#quota>:
///
/// > Write requests […] Per minute per user per project […] 60
const RATE_LIMIT: Duration = Duration::from_secs(1);

const SERVICE_ACCOUNT_PATH: &str = "assets/google-client-secret.json";

/// Columns A through Q.
pub(crate) const ROW_WIDTH: u32 = 17;

/// Number of rows the post-insert sort covers, starting at the insert row.
pub(crate) const SORT_WINDOW_ROWS: u32 = 100;

/// Rate limiter shared by all Sheets requests.
static NEXT_REQUEST: LazyLock<Mutex<Instant>> = LazyLock::new(|| Mutex::new(Instant::now()));

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Io(#[from] io::Error),
    #[error(transparent)] OAuth(#[from] yup_oauth2::Error),
    #[error(transparent)] Reqwest(#[from] reqwest::Error),
    #[error("empty token is not valid")]
    EmptyToken,
    #[error("OAuth token is expired")]
    TokenExpired,
    #[error("no worksheet named {0:?} in spreadsheet")]
    WorksheetNotFound(String),
}

/// Get OAuth token for the Google Sheets API
async fn get_auth_token() -> Result<String, Error> {
    let gsuite_secret = read_service_account_key(SERVICE_ACCOUNT_PATH).await?;
    let auth = ServiceAccountAuthenticator::builder(gsuite_secret)
        .build().await?;
    let token = auth.token(&["https://www.googleapis.com/auth/spreadsheets"]).await?;
    if token.is_expired() { return Err(Error::TokenExpired) }
    let Some(token_str) = token.token() else { return Err(Error::EmptyToken) };
    if token_str.is_empty() { return Err(Error::EmptyToken) }
    Ok(token_str.to_owned())
}

/// Resolve a worksheet's numeric id from its tab title.
pub(crate) async fn worksheet_id(http_client: &reqwest::Client, sheet_id: &str, title: &str) -> Result<i64, Error> {
    #[derive(Deserialize)]
    struct Metadata {
        #[serde(default)]
        sheets: Vec<Sheet>,
    }

    #[derive(Deserialize)]
    struct Sheet {
        properties: SheetProperties,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct SheetProperties {
        sheet_id: i64,
        title: String,
    }

    let mut next_request = NEXT_REQUEST.lock().await;
    sleep_until(*next_request).await;
    let token = get_auth_token().await?;
    let metadata = http_client.get(format!("https://sheets.googleapis.com/v4/spreadsheets/{sheet_id}"))
        .bearer_auth(&token)
        .query(&[("fields", "sheets.properties")])
        .send().await?
        .error_for_status()?
        .json::<Metadata>().await?;
    *next_request = Instant::now() + RATE_LIMIT;
    metadata.sheets.into_iter()
        .map(|sheet| sheet.properties)
        .find(|properties| properties.title == title)
        .map(|properties| properties.sheet_id)
        .ok_or_else(|| Error::WorksheetNotFound(title.to_owned()))
}

/// Update values in a specific range. `USER_ENTERED` makes the sheet parse
/// formula strings instead of storing them literally.
pub(crate) async fn update_values(http_client: &reqwest::Client, sheet_id: &str, range: &str, values: Vec<Vec<String>>) -> Result<(), Error> {
    #[derive(Serialize)]
    struct ValueRange {
        range: String,
        values: Vec<Vec<String>>,
    }

    let mut next_request = NEXT_REQUEST.lock().await;
    sleep_until(*next_request).await;
    let token = get_auth_token().await?;
    http_client.put(format!("https://sheets.googleapis.com/v4/spreadsheets/{sheet_id}/values/{range}"))
        .bearer_auth(&token)
        .query(&[("valueInputOption", "USER_ENTERED")])
        .json(&ValueRange {
            range: range.to_owned(),
            values,
        })
        .send().await?
        .error_for_status()?;
    *next_request = Instant::now() + RATE_LIMIT;
    Ok(())
}

async fn batch_update(http_client: &reqwest::Client, sheet_id: &str, requests: Vec<serde_json::Value>) -> Result<(), Error> {
    let mut next_request = NEXT_REQUEST.lock().await;
    sleep_until(*next_request).await;
    let token = get_auth_token().await?;
    http_client.post(format!("https://sheets.googleapis.com/v4/spreadsheets/{sheet_id}:batchUpdate"))
        .bearer_auth(&token)
        .json(&json!({ "requests": requests }))
        .send().await?
        .error_for_status()?;
    *next_request = Instant::now() + RATE_LIMIT;
    Ok(())
}

fn insert_row_request(worksheet_id: i64, row: u32) -> serde_json::Value {
    json!({
        "insertDimension": {
            "range": {
                "sheetId": worksheet_id,
                "dimension": "ROWS",
                "startIndex": row - 1,
                "endIndex": row,
            },
            "inheritFromBefore": false,
        },
    })
}

fn sort_rows_request(worksheet_id: i64, first_row: u32) -> serde_json::Value {
    json!({
        "sortRange": {
            "range": {
                "sheetId": worksheet_id,
                "startRowIndex": first_row - 1,
                "endRowIndex": first_row - 1 + SORT_WINDOW_ROWS,
                "startColumnIndex": 0,
                "endColumnIndex": ROW_WIDTH,
            },
            "sortSpecs": [
                { "dimensionIndex": 0, "sortOrder": "ASCENDING" },
            ],
        },
    })
}

/// Insert a single blank row at the given 1-based position, shifting existing
/// rows down without inheriting formatting from the row above.
pub(crate) async fn insert_blank_row(http_client: &reqwest::Client, sheet_id: &str, worksheet_id: i64, row: u32) -> Result<(), Error> {
    batch_update(http_client, sheet_id, vec![insert_row_request(worksheet_id, row)]).await
}

/// Sort the fixed row window starting at the insert position by column A's
/// datetime value.
pub(crate) async fn sort_rows(http_client: &reqwest::Client, sheet_id: &str, worksheet_id: i64, first_row: u32) -> Result<(), Error> {
    batch_update(http_client, sheet_id, vec![sort_rows_request(worksheet_id, first_row)]).await
}
