//! Google Sheets backend over the v4 REST API.
//!
//! Authentication uses a service-account key: a short-lived RS256 JWT is
//! exchanged for an OAuth access token, which is cached until shortly before
//! it expires. Any 401/403 from the API drops the cached token so the next
//! call re-authenticates instead of reusing a stale one.
//!
//! One [`SheetsClient`] is built per process and shared by reference; tables
//! are addressed through cheap [`SheetTable`] handles.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use notifier_core::{Recipient, RecipientKind};

use crate::error::{Result, StoreError};
use crate::store::{ProductSheet, RecipientDirectory};

/// Default API root.
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/";

/// Default OAuth token endpoint.
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Read/write access to spreadsheets.
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Lifetime requested for the signed assertion.
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Refresh the access token this long before it actually expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Header cell of the identifier column in the users table.
const CHAT_ID_HEADER: &str = "Chat ID";

/// The fields of a service-account key file that matter here.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse the JSON key as downloaded from the cloud console.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::Credentials(format!("invalid service account key: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: u64,
    iat: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Render a cell the way the sheet displays it.
fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Client for one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: Url,
    spreadsheet_id: String,
    credentials: Option<ServiceAccountKey>,
    token: RwLock<Option<CachedToken>>,
}

impl SheetsClient {
    /// Create a client for the spreadsheet with the given key.
    ///
    /// Without credentials every call fails with [`StoreError::Credentials`].
    pub fn new(spreadsheet_id: impl Into<String>, credentials: Option<ServiceAccountKey>) -> Result<Self> {
        let base_url = Url::parse(SHEETS_API_BASE)
            .map_err(|e| StoreError::Http(format!("invalid API base: {}", e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            spreadsheet_id: spreadsheet_id.into(),
            credentials,
            token: RwLock::new(None),
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// The spreadsheet key.
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// A handle on one named table of this spreadsheet.
    pub fn table(self: &Arc<Self>, name: impl Into<String>) -> SheetTable {
        SheetTable {
            client: Arc::clone(self),
            name: name.into(),
        }
    }

    /// Build `.../v4/spreadsheets/{id}/values/{range}{suffix}`.
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url> {
        let target = format!("{}{}", range, suffix);
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Http("API base cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", target.as_str()]);
        Ok(url)
    }

    /// Return a usable access token, exchanging a new assertion if needed.
    async fn access_token(&self) -> Result<String> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.value.clone());
            }
        }

        let mut cached = self.token.write().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let key = self
            .credentials
            .as_ref()
            .ok_or_else(|| StoreError::Credentials("no service account configured".to_string()))?;
        let token = self.exchange_assertion(key).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn exchange_assertion(&self, key: &ServiceAccountKey) -> Result<CachedToken> {
        let token_uri = key.token_uri.as_deref().unwrap_or(TOKEN_URI);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let claims = Claims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: token_uri,
            exp: now + ASSERTION_LIFETIME_SECS,
            iat: now,
        };
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];
        let response = self.http.post(token_uri).form(&params).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("token exchange returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
        info!(client_email = %key.client_email, "Obtained spreadsheet access token");

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    /// Turn a non-success response into the matching error.
    async fn check(&self, response: reqwest::Response, range: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(status = %status, "Spreadsheet API rejected token, will re-authenticate");
                self.invalidate_token().await;
                Err(StoreError::Auth(format!("{}: {}", status, body)))
            }
            StatusCode::BAD_REQUEST if body.contains("Unable to parse range") => {
                Err(StoreError::SheetNotFound(range.to_string()))
            }
            _ => Err(StoreError::Http(format!("{}: {}", status, body))),
        }
    }

    /// Read every row of a range as display strings.
    pub async fn read_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range, "")?;
        let token = self.access_token().await?;

        let response = self.http.get(url).bearer_auth(token).send().await?;
        let response = self.check(response, range).await?;
        let body: ValueRange = response.json().await?;

        let rows: Vec<Vec<String>> = body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        debug!(range = %range, rows = rows.len(), "Read spreadsheet values");
        Ok(rows)
    }

    /// Append one row after the last row of a range.
    pub async fn append_row(&self, range: &str, row: Vec<String>) -> Result<()> {
        let mut url = self.values_url(range, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let token = self.access_token().await?;

        let body = serde_json::json!({ "values": [row] });
        let response = self.http.post(url).bearer_auth(token).json(&body).send().await?;
        self.check(response, range).await?;
        debug!(range = %range, "Appended spreadsheet row");
        Ok(())
    }
}

/// One named table of a spreadsheet.
#[derive(Clone)]
pub struct SheetTable {
    client: Arc<SheetsClient>,
    name: String,
}

impl SheetTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        self.client.read_values(&self.name).await
    }

    pub async fn append(&self, row: Vec<String>) -> Result<()> {
        self.client.append_row(&self.name, row).await
    }
}

#[async_trait]
impl ProductSheet for SheetTable {
    async fn rows(&self) -> Result<Vec<Vec<String>>> {
        self.read_rows().await
    }
}

/// Read recipients from users-table rows (`Chat ID | Name | Type`).
///
/// A first cell equal to the column header, or blank, is skipped.
pub fn parse_recipients(rows: &[Vec<String>]) -> Vec<Recipient> {
    rows.iter()
        .filter_map(|row| {
            let id = row.first()?.trim();
            if id.is_empty() || id == CHAT_ID_HEADER {
                return None;
            }
            let name = row
                .get(1)
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .unwrap_or("Unknown");
            let kind = row
                .get(2)
                .and_then(|k| k.parse::<RecipientKind>().ok())
                .unwrap_or_default();
            Some(Recipient::new(id, name, kind))
        })
        .collect()
}

/// Recipient directory stored in the users table.
#[derive(Clone)]
pub struct SheetDirectory {
    table: SheetTable,
}

impl SheetDirectory {
    pub fn new(table: SheetTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl RecipientDirectory for SheetDirectory {
    async fn recipients(&self) -> Result<Vec<Recipient>> {
        let rows = self.table.read_rows().await?;
        Ok(parse_recipients(&rows))
    }

    async fn register(&self, recipient: Recipient) -> Result<bool> {
        if self.contains(&recipient.id).await? {
            return Ok(false);
        }

        self.table
            .append(vec![
                recipient.id.clone(),
                recipient.name.clone(),
                recipient.kind.to_string(),
            ])
            .await?;
        info!(
            chat_id = %recipient.id,
            name = %recipient.name,
            kind = %recipient.kind,
            table = %self.table.name(),
            "Registered recipient"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_recipients_skips_header_and_blanks() {
        let rows = vec![
            row(&["Chat ID", "Name", "Type"]),
            row(&["123", "Alice", "User"]),
            row(&["", "Nobody", "User"]),
            row(&["-100200", "Shop staff", "Group"]),
            row(&["456"]),
        ];

        let recipients = parse_recipients(&rows);
        assert_eq!(recipients.len(), 3);
        assert_eq!(recipients[0], Recipient::new("123", "Alice", RecipientKind::User));
        assert_eq!(recipients[1].kind, RecipientKind::Group);
        assert_eq!(recipients[2].name, "Unknown");
        assert_eq!(recipients[2].kind, RecipientKind::User);
    }

    #[test]
    fn test_values_url() {
        let client = SheetsClient::new("sheet-key", None).unwrap();

        let url = client.values_url("users", "").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-key/values/users"
        );

        let url = client.values_url("my products", ":append").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-key/values/my%20products:append"
        );
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(serde_json::json!("abc")), "abc");
        assert_eq!(cell_to_string(serde_json::json!(42)), "42");
        assert_eq!(cell_to_string(serde_json::Value::Null), "");
    }

    #[test]
    fn test_service_account_key_from_json() {
        let key = ServiceAccountKey::from_json(
            r#"{"type":"service_account","client_email":"bot@example.iam.gserviceaccount.com","private_key":"pem"}"#,
        )
        .unwrap();
        assert_eq!(key.client_email, "bot@example.iam.gserviceaccount.com");
        assert!(key.token_uri.is_none());

        assert!(matches!(
            ServiceAccountKey::from_json("{}"),
            Err(StoreError::Credentials(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_network() {
        let client = Arc::new(SheetsClient::new("sheet-key", None).unwrap());
        let table = client.table("product");

        let err = table.rows().await.unwrap_err();
        assert!(matches!(err, StoreError::Credentials(_)));
    }

    #[tokio::test]
    async fn test_unusable_private_key_is_a_credentials_error() {
        let key = ServiceAccountKey {
            client_email: "bot@example.com".to_string(),
            private_key: "not a pem".to_string(),
            token_uri: None,
        };
        let client = Arc::new(SheetsClient::new("sheet-key", Some(key)).unwrap());
        let directory = SheetDirectory::new(client.table("users"));

        let err = directory.recipients().await.unwrap_err();
        assert!(matches!(err, StoreError::Credentials(_)));
    }
}
