use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use storage::dto::participant::UploadResult;
use storage::ingest::sha256_hex;

use crate::error::{AgentError, Result};

/// Delivers one results file to the API.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<UploadResult>;
}

pub struct ResultsClient {
    client: reqwest::Client,
    upload_url: String,
    api_key: String,
}

impl ResultsClient {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("racecheck-agent/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            upload_url: format!("{}/events/upload", api_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Uploader for ResultsClient {
    async fn upload(&self, path: &Path) -> Result<UploadResult> {
        let bytes = tokio::fs::read(path).await?;
        let hash = sha256_hex(&bytes);
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("results")
            .to_string();

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("hash", hash);

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(response.json::<UploadResult>().await?)
    }
}

/// Pulls `error` out of a JSON error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_url_joins_base() {
        let client = ResultsClient::new("http://api.test/api/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(client.upload_url, "http://api.test/api/events/upload");
    }

    #[test]
    fn error_message_prefers_json_error_field() {
        assert_eq!(error_message(r#"{"error":"file hash mismatch"}"#), "file hash mismatch");
        assert_eq!(error_message(" Bad Gateway \n"), "Bad Gateway");
    }
}
