use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{AppConfig, ServiceAccountKey};
use crate::error::{Error, Result};
use crate::store::SheetBackend;

/// Base URL of the Sheets REST API.
pub const API_BASE: &str = "https://sheets.googleapis.com/v4";

/// OAuth scope granting spreadsheet read/write.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Seconds before expiry at which a cached token is considered stale.
const TOKEN_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

/// Properties of the tab all operations address.
#[derive(Debug, Clone)]
pub struct SheetProps {
    /// Numeric sheet id, needed by `batchUpdate` row deletion.
    pub sheet_id: i64,
    /// Tab title, used to build A1 ranges.
    pub title: String,
}

/// Client for one spreadsheet, authenticated as a service account.
///
/// The bearer token and the tab properties are fetched lazily and cached;
/// both caches are plain mutexes that are never held across an await.
pub struct SheetsClient {
    http: Client,
    key: ServiceAccountKey,
    spreadsheet_id: String,
    sheet_title: Option<String>,
    token: Mutex<Option<CachedToken>>,
    props: Mutex<Option<SheetProps>>,
}

impl SheetsClient {
    pub fn new(key: ServiceAccountKey, config: &AppConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        // Local development behind a firewall routes through a proxy, the
        // same switch the hosted deployment leaves unset.
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| Error::Config(format!("Invalid proxy URL {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Sheets client ready: spreadsheet={}, account={}",
            config.spreadsheet_id, key.client_email
        );

        Ok(SheetsClient {
            http,
            key,
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_title: config.sheet_title.clone(),
            token: Mutex::new(None),
            props: Mutex::new(None),
        })
    }

    /// A valid bearer token, minting a fresh one via the JWT-bearer grant
    /// when the cache is empty or about to expire.
    pub async fn access_token(&self) -> Result<String> {
        {
            let cached = self.token.lock().unwrap();
            if let Some(token) = cached.as_ref() {
                if token.expires_at - TOKEN_MARGIN_SECS > Utc::now().timestamp() {
                    return Ok(token.value.clone());
                }
            }
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| Error::Auth(format!("Invalid private key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| Error::Auth(format!("Failed to sign token request: {}", e)))?;

        debug!("Requesting access token from {}", self.key.token_uri);
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("Token endpoint returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        let cached = CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        };
        *self.token.lock().unwrap() = Some(cached);

        Ok(token.access_token)
    }

    /// Properties of the configured tab (or the first tab when none is
    /// configured), fetched from spreadsheet metadata once and cached.
    pub async fn sheet_props(&self) -> Result<SheetProps> {
        {
            let cached = self.props.lock().unwrap();
            if let Some(props) = cached.as_ref() {
                return Ok(props.clone());
            }
        }

        let url = format!(
            "{}/spreadsheets/{}?fields=sheets.properties",
            API_BASE, self.spreadsheet_id
        );
        let response = self.get(&url).await?;
        let body: serde_json::Value = response.json().await?;

        let sheets = body["sheets"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let chosen = match &self.sheet_title {
            Some(wanted) => sheets
                .iter()
                .find(|s| s["properties"]["title"].as_str() == Some(wanted.as_str())),
            None => sheets.first(),
        };

        let props = match chosen {
            Some(sheet) => SheetProps {
                sheet_id: sheet["properties"]["sheetId"].as_i64().unwrap_or(0),
                title: sheet["properties"]["title"]
                    .as_str()
                    .unwrap_or("Sheet1")
                    .to_string(),
            },
            None => {
                let wanted = self.sheet_title.as_deref().unwrap_or("<first>");
                return Err(Error::SpreadsheetNotFound(format!(
                    "Spreadsheet {} has no sheet {}",
                    self.spreadsheet_id, wanted
                )));
            }
        };

        *self.props.lock().unwrap() = Some(props.clone());
        Ok(props)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let token = self.access_token().await?;
        debug!("GET {}", url);
        let response = self.http.get(url).bearer_auth(token).send().await?;
        check_status(response).await
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response> {
        let token = self.access_token().await?;
        debug!("{} {}", method, url);
        let response = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}{}",
            API_BASE,
            self.spreadsheet_id,
            urlencoding::encode(range),
            suffix
        )
    }
}

#[async_trait]
impl SheetBackend for SheetsClient {
    async fn all_rows(&self) -> Result<Vec<Vec<String>>> {
        let props = self.sheet_props().await?;
        let url = self.values_url(&quote_title(&props.title), "");
        let response = self.get(&url).await?;

        let body: serde_json::Value = response.json().await?;
        let rows = body["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| cells.iter().map(cell_to_string).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(rows)
    }

    async fn append_row(&self, row: Vec<String>) -> Result<()> {
        let props = self.sheet_props().await?;
        let url = self.values_url(&quote_title(&props.title), ":append?valueInputOption=RAW");
        let body = serde_json::json!({ "values": [row] });
        self.send_json(reqwest::Method::POST, &url, &body).await?;
        Ok(())
    }

    async fn update_cell(&self, row: u32, col: u32, value: &str) -> Result<()> {
        let props = self.sheet_props().await?;
        let range = cell_range(&props.title, row, col);
        let url = self.values_url(&range, "?valueInputOption=RAW");
        let body = serde_json::json!({ "values": [[value]] });
        self.send_json(reqwest::Method::PUT, &url, &body).await?;
        Ok(())
    }

    async fn delete_row(&self, row: u32) -> Result<()> {
        let props = self.sheet_props().await?;
        let url = format!(
            "{}/spreadsheets/{}:batchUpdate",
            API_BASE, self.spreadsheet_id
        );
        let body = serde_json::json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": props.sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row - 1,
                        "endIndex": row,
                    }
                }
            }]
        });
        self.send_json(reqwest::Method::POST, &url, &body).await?;
        Ok(())
    }
}

/// Turn a non-success API response into the matching `Error`, pulling the
/// human-readable message out of Google's error envelope when present.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
        .unwrap_or(body);

    Err(Error::from_status(code, message))
}

/// Formatted values come back as JSON strings, but be safe about numbers
/// and booleans written by other tools.
fn cell_to_string(cell: &serde_json::Value) -> String {
    match cell.as_str() {
        Some(s) => s.to_string(),
        None => cell.to_string(),
    }
}

/// A1 column letters: 1 -> A, 26 -> Z, 27 -> AA.
pub fn col_to_letter(col: u32) -> String {
    let mut col = col;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}

/// Quote a tab title for use in an A1 range.
fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// A1 range for a single cell, 1-based row and column.
pub fn cell_range(title: &str, row: u32, col: u32) -> String {
    format!("{}!{}{}", quote_title(title), col_to_letter(col), row)
}
