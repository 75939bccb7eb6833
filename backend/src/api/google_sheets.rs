use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use crate::config::GoogleCredentials;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

pub const HEADER_ROW: [&str; 3] = ["Email", "Timestamp (UTC)", "Sent"];
pub const SENT_MARK: &str = "✓";

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("credentials: {0}")]
    Credentials(String),
    #[error("auth: {0}")]
    Auth(String),
    #[error("api: {0}")]
    Api(String),
    #[error("parse: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_json(raw: &[u8]) -> Result<Self, SheetsError> {
        serde_json::from_slice(raw).map_err(|e| SheetsError::Credentials(e.to_string()))
    }

    pub fn load(source: &GoogleCredentials) -> Result<Self, SheetsError> {
        match source {
            GoogleCredentials::Base64Json(encoded) => {
                let decoded = general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| SheetsError::Credentials(format!("GOOGLE_CREDS_JSON is not base64: {}", e)))?;
                Self::from_json(&decoded)
            }
            GoogleCredentials::File(path) => {
                let raw = std::fs::read(path)
                    .map_err(|e| SheetsError::Credentials(format!("{}: {}", path.display(), e)))?;
                Self::from_json(&raw)
            }
        }
    }
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

/// Quotes a sheet title into an A1 range, e.g. `'Sheet 1'!A1:C1`.
pub fn a1_range(title: &str, cells: &str) -> String {
    format!("'{}'!{}", title.replace('\'', "''"), cells)
}

/// Row number of the first cell in a range like `'Sheet1'!A5:C5`.
pub fn first_row_of_range(range: &str) -> Option<u32> {
    let cells = range.rsplit('!').next()?;
    let first = cells.split(':').next()?;
    first
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .ok()
}

pub fn header_is_present(first_row: Option<&Vec<String>>) -> bool {
    first_row
        .and_then(|row| row.first())
        .map_or(false, |cell| cell == HEADER_ROW[0])
}

/// Waitlist sheet access through the Sheets v4 REST API, authenticated as a
/// service account. Rows always go to the first worksheet.
pub struct SheetsClient {
    http: reqwest::Client,
    sheet_id: String,
    credentials: GoogleCredentials,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, sheet_id: String, credentials: GoogleCredentials) -> Self {
        SheetsClient {
            http,
            sheet_id,
            credentials,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, SheetsError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(60) > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let key = ServiceAccountKey::load(&self.credentials)?;
        let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: token_uri,
            iat: now,
            exp: now + 3600,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("invalid private key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| SheetsError::Auth(e.to_string()))?;

        let response = self
            .http
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SheetsError::Auth(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Auth(format!("token exchange failed ({}): {}", status, body)));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SheetsError::Parse(e.to_string()))?;

        tracing::debug!("Refreshed Google access token, valid for {}s", token.expires_in);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        });
        Ok(token.access_token)
    }

    fn api_url(segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(SHEETS_API).map_err(|e| SheetsError::Api(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Api("sheets url cannot be a base".to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut all = vec![self.sheet_id.as_str()];
        all.extend_from_slice(segments);
        Self::api_url(&all)
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response, SheetsError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(SheetsError::Api(format!("{} failed ({}): {}", what, status, body)))
    }

    async fn first_sheet(&self, token: &str) -> Result<SheetProperties, SheetsError> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties(sheetId,title)");
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SheetsError::Api(e.to_string()))?;
        let meta: SpreadsheetMeta = Self::check(response, "spreadsheet lookup")
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::Parse(e.to_string()))?;
        meta.sheets
            .into_iter()
            .next()
            .map(|entry| entry.properties)
            .ok_or_else(|| SheetsError::Api("spreadsheet has no worksheets".to_string()))
    }

    async fn ensure_header(&self, token: &str, sheet: &SheetProperties) -> Result<(), SheetsError> {
        let header_range = a1_range(&sheet.title, "A1:C1");
        let url = self.url(&["values", header_range.as_str()])?;
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| SheetsError::Api(e.to_string()))?;
        let existing: ValueRange = Self::check(response, "header read")
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::Parse(e.to_string()))?;
        if header_is_present(existing.values.first()) {
            return Ok(());
        }

        tracing::info!("Inserting header row into sheet '{}'", sheet.title);
        let batch_segment = format!("{}:batchUpdate", self.sheet_id);
        let batch_url = Self::api_url(&[batch_segment.as_str()])?;
        let response = self
            .http
            .post(batch_url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({
                "requests": [{
                    "insertDimension": {
                        "range": {
                            "sheetId": sheet.sheet_id,
                            "dimension": "ROWS",
                            "startIndex": 0,
                            "endIndex": 1
                        },
                        "inheritFromBefore": false
                    }
                }]
            }))
            .send()
            .await
            .map_err(|e| SheetsError::Api(e.to_string()))?;
        Self::check(response, "header row insert").await?;

        self.write_cells(token, &header_range, json!([HEADER_ROW])).await
    }

    async fn write_cells(&self, token: &str, range: &str, values: serde_json::Value) -> Result<(), SheetsError> {
        let mut url = self.url(&["values", range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let response = self
            .http
            .put(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({ "range": range, "values": values }))
            .send()
            .await
            .map_err(|e| SheetsError::Api(e.to_string()))?;
        Self::check(response, "cell update").await.map(|_| ())
    }

    /// Appends `[email, timestamp, ""]` and returns the 1-based row it landed on.
    pub async fn save_email(&self, email: &str) -> Result<u32, SheetsError> {
        let token = self.access_token().await?;
        let sheet = self.first_sheet(&token).await?;
        self.ensure_header(&token, &sheet).await?;

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let append_segment = format!("{}:append", a1_range(&sheet.title, "A:C"));
        let mut url = self.url(&["values", append_segment.as_str()])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({ "values": [[email, timestamp, ""]] }))
            .send()
            .await
            .map_err(|e| SheetsError::Api(e.to_string()))?;
        let appended: AppendResponse = Self::check(response, "row append")
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::Parse(e.to_string()))?;

        first_row_of_range(&appended.updates.updated_range).ok_or_else(|| {
            SheetsError::Parse(format!("unexpected updated range {}", appended.updates.updated_range))
        })
    }

    pub async fn mark_row_sent(&self, row: u32) -> Result<(), SheetsError> {
        let token = self.access_token().await?;
        let sheet = self.first_sheet(&token).await?;
        self.write_cells(&token, &a1_range(&sheet.title, &format!("C{}", row)), json!([[SENT_MARK]]))
            .await
    }
}
