use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use url::Url;

use crate::cli::chat::context::DocumentHandle;
use crate::cli::chat::router::RoutingDecision;
use crate::error::ClientError;

const UPLOAD_PATH: &str = "upload_pdf";
const LOAD_ARTICLE_PATH: &str = "load_article";

/// Number of decoded chunks buffered between the reader task and the consumer.
const CHUNK_BUFFER: usize = 64;

pub type ChunkReceiver = mpsc::Receiver<Result<String, ClientError>>;

/// What an endpoint hands back once the request was accepted.
#[derive(Debug)]
pub enum ResponseHandle {
    /// Text chunks in arrival order; the channel closes when the stream ends.
    Stream(ChunkReceiver),
    /// The complete response body, not yet parsed.
    Body(String),
}

/// Request/response contract of the chat backend.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn upload_document(&self, document: &DocumentHandle) -> Result<(), ClientError>;

    async fn load_article(&self, url: &str) -> Result<(), ClientError>;

    async fn dispatch(&self, decision: &RoutingDecision) -> Result<ResponseHandle, ClientError>;
}

pub struct BackendClient {
    base_url: Url,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_json<T: Serialize + Sync + ?Sized>(
        &self,
        path: &'static str,
        body: &T,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.endpoint_url(path)?;
        debug!("POST {} {}", url, serde_json::to_string(body).unwrap_or_default());

        let response = self.client.post(url).json(body).send().await?;
        ensure_success(path, response).await
    }
}

async fn ensure_success(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!("/{} failed with {}: {}", endpoint, status, body);
    Err(ClientError::Status {
        endpoint,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Backend for BackendClient {
    async fn upload_document(&self, document: &DocumentHandle) -> Result<(), ClientError> {
        let bytes = tokio::fs::read(&document.path)
            .await
            .map_err(|source| ClientError::Io {
                path: document.path.display().to_string(),
                source,
            })?;

        info!("Uploading {} ({} bytes)", document.name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(document.name.clone())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let url = self.endpoint_url(UPLOAD_PATH)?;
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;

        ensure_success(UPLOAD_PATH, response)
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;
        Ok(())
    }

    async fn load_article(&self, url: &str) -> Result<(), ClientError> {
        let response = self
            .post_json(LOAD_ARTICLE_PATH, &json!({ "url": url }))
            .await
            .map_err(|e| ClientError::ArticleLoad(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::ArticleLoad(e.to_string()))?;
        let reply: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ClientError::ArticleLoad(format!("unreadable reply: {}", e)))?;
        debug!("Article loaded: {}", reply);
        Ok(())
    }

    async fn dispatch(&self, decision: &RoutingDecision) -> Result<ResponseHandle, ClientError> {
        let path = decision.endpoint.path();
        let response = self.post_json(path, &decision.payload).await?;

        if decision.endpoint.is_streaming() {
            Ok(ResponseHandle::Stream(spawn_chunk_reader(response)))
        } else {
            Ok(ResponseHandle::Body(response.text().await?))
        }
    }
}

/// Read the response body chunk by chunk on a separate task and forward
/// decoded text over a channel.
fn spawn_chunk_reader(mut response: reqwest::Response) -> ChunkReceiver {
    let (tx, rx) = mpsc::channel(CHUNK_BUFFER);

    tokio::spawn(async move {
        let mut decoder = Utf8Decoder::default();

        loop {
            let decoded = match response.chunk().await {
                Ok(Some(bytes)) => decoder.push(&bytes),
                Ok(None) => match decoder.finish() {
                    Ok(()) => break,
                    Err(e) => Decoded::failed(e),
                },
                Err(e) => Decoded::failed(ClientError::Network(e)),
            };

            if !decoded.text.is_empty() && tx.send(Ok(decoded.text)).await.is_err() {
                debug!("Chunk consumer went away");
                break;
            }
            if let Some(e) = decoded.error {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    });

    rx
}

/// Text decoded from one chunk, and the failure that cut it short.
#[derive(Debug, Default)]
pub struct Decoded {
    pub text: String,
    pub error: Option<ClientError>,
}

impl Decoded {
    fn failed(error: ClientError) -> Self {
        Self {
            text: String::new(),
            error: Some(error),
        }
    }
}

/// Incremental UTF-8 decoding that tolerates characters split across chunks.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode as much of the buffered input as forms complete characters.
    ///
    /// On an invalid byte the text before it is still returned.
    pub fn push(&mut self, bytes: &[u8]) -> Decoded {
        self.pending.extend_from_slice(bytes);

        let (valid_up_to, error) = match std::str::from_utf8(&self.pending) {
            Ok(_) => (self.pending.len(), None),
            Err(e) if e.error_len().is_none() => (e.valid_up_to(), None),
            Err(e) => (
                e.valid_up_to(),
                Some(ClientError::StreamDecode(format!(
                    "invalid utf-8 at byte {}",
                    e.valid_up_to()
                ))),
            ),
        };

        let rest = self.pending.split_off(valid_up_to);
        let complete = std::mem::replace(&mut self.pending, rest);
        if error.is_some() {
            self.pending.clear();
        }

        Decoded {
            text: String::from_utf8_lossy(&complete).into_owned(),
            error,
        }
    }

    /// Fails if the stream ended in the middle of a character.
    pub fn finish(&mut self) -> Result<(), ClientError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            let len = self.pending.len();
            self.pending.clear();
            Err(ClientError::StreamDecode(format!(
                "stream ended inside a character ({} trailing bytes)",
                len
            )))
        }
    }
}
