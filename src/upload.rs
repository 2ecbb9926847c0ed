//! # Uploader Integration (CLI <-> Core)
//!
//! Bridges the core upload contract to the Google Drive v3 API: the
//! finished .docx is uploaded with a conversion target of Google Docs,
//! yielding a document id and a view link.
//!
//! ## Authentication
//!
//! - A cached token file (`token.json`) holds the access token, its expiry
//!   and the refresh token.
//! - An expired access token is refreshed against the OAuth token endpoint.
//! - With no usable cached token, an interactive consent flow runs: the
//!   consent URL (built from `client_secret.json`) is printed, and the
//!   pasted authorization code is exchanged for tokens.
//!
//! A failed upload reports the error and leaves the local file untouched.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use notion_docx_core::contract::{DocumentUploader, UploadError, UploadedDocument};

use crate::prompt::prompt_line;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=id,name,webViewLink";
const SCOPES: &str =
    "https://www.googleapis.com/auth/drive https://www.googleapis.com/auth/drive.file";
const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const GDOC_MIME: &str = "application/vnd.google-apps.document";

/// Refresh this many seconds before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Unix seconds after which the access token is considered stale.
    expires_at: i64,
}

impl StoredToken {
    fn is_fresh(&self) -> bool {
        chrono::Utc::now().timestamp() + EXPIRY_MARGIN_SECS < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: InstalledClient,
}

#[derive(Debug, Deserialize)]
struct InstalledClient {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

impl TokenResponse {
    fn into_stored(self, previous_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: chrono::Utc::now().timestamp() + self.expires_in,
        }
    }
}

/// Google Drive client implementing the core [`DocumentUploader`] contract.
pub struct GoogleDriveClient {
    http: reqwest::Client,
    token_path: PathBuf,
    client_secret_path: PathBuf,
}

impl GoogleDriveClient {
    pub fn new(token_path: PathBuf, client_secret_path: PathBuf) -> Self {
        GoogleDriveClient {
            http: reqwest::Client::new(),
            token_path,
            client_secret_path,
        }
    }

    /// A usable access token: cached, refreshed, or freshly consented.
    async fn access_token(&self) -> Result<String, UploadError> {
        let cached = self.load_cached_token();
        if let Some(token) = &cached {
            if token.is_fresh() {
                return Ok(token.access_token.clone());
            }
        }

        let secret = self.load_client_secret()?;
        if let Some(token) = cached {
            if let Some(refresh_token) = token.refresh_token.clone() {
                match self.refresh(&secret, &refresh_token).await {
                    Ok(refreshed) => {
                        self.store_token(&refreshed);
                        return Ok(refreshed.access_token);
                    }
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed, falling back to interactive consent");
                    }
                }
            }
        }

        let consented = self.consent(&secret).await?;
        self.store_token(&consented);
        Ok(consented.access_token)
    }

    fn load_cached_token(&self) -> Option<StoredToken> {
        let raw = std::fs::read_to_string(&self.token_path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(
                    error = ?e,
                    path = %self.token_path.display(),
                    "Cached token file is not valid JSON, ignoring it"
                );
                None
            }
        }
    }

    fn store_token(&self, token: &StoredToken) {
        // Best effort: a failed cache write only costs a future re-consent.
        match serde_json::to_string_pretty(token) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.token_path, json) {
                    warn!(error = ?e, path = %self.token_path.display(), "Failed to cache token");
                }
            }
            Err(e) => warn!(error = ?e, "Failed to serialize token for caching"),
        }
    }

    fn load_client_secret(&self) -> Result<InstalledClient, UploadError> {
        let raw = std::fs::read_to_string(&self.client_secret_path).map_err(|e| {
            format!(
                "cannot read client secret file {}: {e}",
                self.client_secret_path.display()
            )
        })?;
        let parsed: ClientSecretFile = serde_json::from_str(&raw)
            .map_err(|e| format!("client secret file is not valid JSON: {e}"))?;
        Ok(parsed.installed)
    }

    async fn refresh(
        &self,
        secret: &InstalledClient,
        refresh_token: &str,
    ) -> Result<StoredToken, UploadError> {
        info!("Refreshing Google Drive access token");
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("token refresh failed with {status}: {body}").into());
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.into_stored(Some(refresh_token.to_string())))
    }

    async fn consent(&self, secret: &InstalledClient) -> Result<StoredToken, UploadError> {
        let consent_url = reqwest::Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", secret.client_id.as_str()),
                ("redirect_uri", REDIRECT_URI),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| format!("failed to build consent URL: {e}"))?;

        println!("Open this link in your browser and authorize access:");
        println!("{consent_url}");
        let code = prompt_line("Paste the authorization code here: ")?;
        if code.is_empty() {
            return Err("no authorization code entered".into());
        }

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("code", code.as_str()),
                ("redirect_uri", REDIRECT_URI),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("authorization code exchange failed with {status}: {body}").into());
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.into_stored(None))
    }
}

#[async_trait]
impl DocumentUploader for GoogleDriveClient {
    async fn upload_document(
        &self,
        file_path: &Path,
        name: &str,
    ) -> Result<UploadedDocument, UploadError> {
        info!(
            file = %file_path.display(),
            name,
            "Uploading document to Google Drive"
        );
        let access_token = self.access_token().await?;
        let bytes = tokio::fs::read(file_path).await?;

        let metadata = serde_json::json!({ "name": name, "mimeType": GDOC_MIME });
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.docx".to_string());
        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata.to_string())
                    .mime_str("application/json; charset=UTF-8")?,
            )
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(DOCX_MIME)?,
            );

        let response = self
            .http
            .post(UPLOAD_URL)
            .bearer_auth(&access_token)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();

        if status == reqwest::StatusCode::FORBIDDEN {
            error!(status = %status, "Drive API denied the upload");
            return Err(
                "permission denied: ensure your Google Drive API scope includes write access"
                    .into(),
            );
        }
        if !status.is_success() {
            error!(status = %status, body = %body, "Drive API returned error for upload");
            return Err(format!("Drive API returned {status}: {body}").into());
        }

        let document_id = body
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let view_link = body
            .get("webViewLink")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        info!(document_id = %document_id, "Created Google Doc");
        Ok(UploadedDocument {
            document_id,
            view_link,
        })
    }
}
