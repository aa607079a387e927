use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::chain::{COLUMNS, ExpiryTable, integral_strike};

use super::{SinkError, TableSink};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_LIFETIME_SECS: i64 = 3600;
/// Refresh the access token this long before Google says it expires.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

const NEW_SHEET_ROWS: u32 = 1000;
const NEW_SHEET_COLS: u32 = 20;

// ── Service-account key ─────────────────────────────────────────────

/// The fields of a Google service-account JSON key that signing needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, SinkError> {
        let text = std::fs::read_to_string(path).map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text)
            .map_err(|e| SinkError::Auth(format!("parsing {}: {e}", path.display())))
    }
}

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
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

// ── Sheets API response types ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

// ── Sink ────────────────────────────────────────────────────────────

/// Google Sheets sink: one tab per table, cleared and rewritten on each write.
///
/// `destination_id` is the spreadsheet id; `table_name` is the tab title.
pub struct SheetsSink {
    client: reqwest::Client,
    api_base: String,
    key: ServiceAccountKey,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsSink {
    pub fn new(key: ServiceAccountKey) -> Result<Self, SinkError> {
        Self::with_base_url(key, SHEETS_API)
    }

    /// Send Sheets calls to `api_base` instead of Google (a local stub).
    /// The token exchange still goes to `key.token_uri`.
    pub fn with_base_url(key: ServiceAccountKey, api_base: &str) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("option-chain-sync/0.1")
            .build()?;
        Ok(SheetsSink {
            client,
            api_base: api_base.to_string(),
            key,
            token: Mutex::new(None),
        })
    }

    pub fn from_credentials_file(path: &Path) -> Result<Self, SinkError> {
        Self::new(ServiceAccountKey::from_file(path)?)
    }

    /// A valid bearer token, exchanging a fresh JWT when the cached one is stale.
    async fn access_token(&self) -> Result<String, SinkError> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let assertion = self.signed_assertion()?;
        let resp = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let resp = check(resp, "token exchange").await?;
        let token: TokenResponse = resp.json().await?;
        debug!(expires_in = token.expires_in, "obtained Sheets access token");

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_SLACK);
        *guard = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    fn signed_assertion(&self) -> Result<String, SinkError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + JWT_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| SinkError::Auth(format!("invalid service-account private key: {e}")))?;
        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SinkError::Auth(format!("signing assertion: {e}")))
    }

    async fn sheet_titles(&self, token: &str, spreadsheet_id: &str) -> Result<Vec<String>, SinkError> {
        let mut url = spreadsheet_url(&self.api_base, spreadsheet_id, None)?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");
        let resp = self.client.get(url).bearer_auth(token).send().await?;
        let meta: SpreadsheetMeta = check(resp, "spreadsheet lookup").await?.json().await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn add_sheet(&self, token: &str, spreadsheet_id: &str, title: &str) -> Result<(), SinkError> {
        let url = spreadsheet_url(&self.api_base, &format!("{spreadsheet_id}:batchUpdate"), None)?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLS,
                        }
                    }
                }
            }]
        });
        let resp = self.client.post(url).bearer_auth(token).json(&body).send().await?;
        check(resp, "add sheet").await?;
        info!(sheet = title, "created sheet");
        Ok(())
    }

    async fn clear(&self, token: &str, spreadsheet_id: &str, title: &str) -> Result<(), SinkError> {
        let range = format!("{}:clear", sheet_range(title, None));
        let url = spreadsheet_url(&self.api_base, spreadsheet_id, Some(&range))?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;
        check(resp, "clear values").await?;
        Ok(())
    }

    async fn update(
        &self,
        token: &str,
        spreadsheet_id: &str,
        title: &str,
        table: &ExpiryTable,
    ) -> Result<(), SinkError> {
        let range = sheet_range(title, Some("A1"));
        let mut url = spreadsheet_url(&self.api_base, spreadsheet_id, Some(&range))?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": table_values(table),
        });
        let resp = self.client.put(url).bearer_auth(token).json(&body).send().await?;
        check(resp, "update values").await?;
        Ok(())
    }
}

#[async_trait]
impl TableSink for SheetsSink {
    fn name(&self) -> &'static str {
        "sheets"
    }

    async fn write(
        &self,
        destination_id: &str,
        table_name: &str,
        table: &ExpiryTable,
    ) -> Result<(), SinkError> {
        let token = self.access_token().await?;

        let titles = self.sheet_titles(&token, destination_id).await?;
        if !titles.iter().any(|t| t == table_name) {
            self.add_sheet(&token, destination_id, table_name).await?;
        }

        self.clear(&token, destination_id, table_name).await?;
        self.update(&token, destination_id, table_name, table).await
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Header row followed by one row of numbers per strike.
pub fn table_values(table: &ExpiryTable) -> Vec<Vec<Value>> {
    let mut values = Vec::with_capacity(table.len() + 1);
    values.push(COLUMNS.iter().map(|c| Value::from(*c)).collect());
    for row in table.rows() {
        let mut cells: Vec<Value> = row.cells().iter().map(|v| Value::from(*v)).collect();
        if let Some(whole) = integral_strike(row.strike) {
            cells[0] = Value::from(whole);
        }
        values.push(cells);
    }
    values
}

/// A1-notation range for a tab, quoting the title.
pub fn sheet_range(title: &str, cell: Option<&str>) -> String {
    let quoted = format!("'{}'", title.replace('\'', "''"));
    match cell {
        Some(cell) => format!("{quoted}!{cell}"),
        None => quoted,
    }
}

fn spreadsheet_url(
    api_base: &str,
    spreadsheet: &str,
    values_range: Option<&str>,
) -> Result<Url, SinkError> {
    let mut url = Url::parse(api_base)
        .map_err(|e| SinkError::Auth(format!("bad Sheets endpoint {api_base}: {e}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| SinkError::Auth("Sheets endpoint cannot be a base".to_string()))?;
        segments.pop_if_empty().push(spreadsheet);
        if let Some(range) = values_range {
            segments.push("values").push(range);
        }
    }
    Ok(url)
}

async fn check(resp: reqwest::Response, operation: &'static str) -> Result<reqwest::Response, SinkError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SinkError::Api {
        operation,
        status: status.as_u16(),
        message: crate::acquire::excerpt(&body, 300),
    })
}
