//! HTTP client for the answering service.

use futures::{Stream, StreamExt};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, Result};

/// Request body of the ask endpoint.
#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

/// Error body the service sends with non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for one answering service endpoint.
#[derive(Debug, Clone)]
pub struct AnswerClient {
    http: Client,
    endpoint: Url,
}

impl AnswerClient {
    /// Create a client posting questions to `endpoint`.
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: Client::new(),
            endpoint,
        }
    }

    /// The ask endpoint.
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send `question` and return the response body as a stream of chunks.
    ///
    /// Fails if the request cannot be sent or the service answers with a
    /// non-success status. Errors while reading the body surface as items of
    /// the returned stream.
    pub async fn ask(
        &self,
        question: &str,
    ) -> Result<impl Stream<Item = Result<impl AsRef<[u8]> + Send>> + Send> {
        debug!(endpoint = %self.endpoint, "opening answer stream");
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&AskRequest { question })
            .send()
            .await?;

        let resp = check_status(resp).await?;
        Ok(resp.bytes_stream().map(|chunk| chunk.map_err(ChatError::from)))
    }

    /// Fetch the liveness message served at the service root.
    pub async fn health(&self) -> Result<String> {
        let root = self.endpoint.join("/").unwrap_or_else(|_| self.endpoint.clone());
        debug!(url = %root, "checking service health");
        let resp = self.http.get(root).send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.text().await?.trim().to_string())
    }
}

/// Turn a non-success response into [`ChatError::Status`].
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .ok()
        .or_else(|| Some(text.trim().to_string()).filter(|t| !t.is_empty()));
    Err(ChatError::Status { status, detail })
}
