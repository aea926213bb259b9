//! HTTP client for the suggestion backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::autofill::ChunkSource;
use crate::errors::EasyfillError;
use crate::messages::AutofillRequest;

/// Endpoint path the backend serves autofill streams on
const AUTOFILL_PATH: &str = "autofil";
const DOCUMENTS_PATH: &str = "documents";

/// A document the user uploaded to the frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    docs: Vec<DocumentRef>,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
}

impl BackendClient {
    pub fn new(mut base: Url) -> Result<Self> {
        // Url::join replaces the last segment unless the path ends with a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("easyfill/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(BackendClient { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Invalid endpoint {} on {}", path, self.base))
    }

    /// Send an autofill request and return the streaming response
    pub async fn open_autofill_stream(
        &self,
        request: &AutofillRequest,
    ) -> Result<reqwest::Response, EasyfillError> {
        let url = self.endpoint(AUTOFILL_PATH)?;
        info!(
            "Requesting autofill for {} field(s) in {:?} mode",
            request.fields.len(),
            request.mode
        );

        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        debug!("Backend answered {}", response.status());
        Ok(response)
    }

    /// List the documents stored for a user
    pub async fn fetch_documents(&self, user_id: &str) -> Result<Vec<DocumentRef>, EasyfillError> {
        let url = self.endpoint(DOCUMENTS_PATH)?;
        let body: DocumentsResponse = self
            .http
            .get(url)
            .query(&[("user_id", user_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Fetched {} document(s)", body.docs.len());
        Ok(body.docs)
    }
}

#[async_trait]
impl ChunkSource for reqwest::Response {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let chunk = self
            .chunk()
            .await
            .context("Failed to read response body")?;
        Ok(chunk.map(|bytes| bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_keep_base_path() {
        let client = BackendClient::new(Url::parse("http://localhost:8080").unwrap()).unwrap();
        assert_eq!(
            client.endpoint(AUTOFILL_PATH).unwrap().as_str(),
            "http://localhost:8080/autofil"
        );

        let client = BackendClient::new(Url::parse("https://api.example.com/v1").unwrap()).unwrap();
        assert_eq!(
            client.endpoint(DOCUMENTS_PATH).unwrap().as_str(),
            "https://api.example.com/v1/documents"
        );
    }
}
