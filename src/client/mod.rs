//! HTTP client for the analytics backend.
//!
//! Wraps the backend's endpoints: video upload, IP-camera snapshot and
//! stream start, and the streaming processing calls. Processing responses
//! are handed back unread so the caller can consume the body incrementally.

mod error;

pub use error::ClientError;

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::BackendSettings;
use crate::model::{IpTarget, Line};
use crate::stream::is_truthy;

/// Result of a successful video upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    /// File name the backend stored the first frame under
    pub snapshot_name: String,
    /// Where the snapshot can be fetched
    pub snapshot_url: String,
    /// Where the uploaded video is served
    pub video_url: String,
}

/// Body of a successful `/start_stream` call.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StartStreamResponse {
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

/// Async client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: String,
    uploads_path: String,
    http: reqwest::Client,
}

impl BackendClient {
    /// Client with default settings for `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::from_config(&BackendSettings {
            base_url: base_url.to_string(),
            ..BackendSettings::default()
        })
    }

    pub fn from_config(settings: &BackendSettings) -> Result<Self, ClientError> {
        let base = normalize_base(&settings.base_url)?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let http = builder.build()?;

        log::debug!("Backend client for {}", base);
        Ok(Self {
            base,
            uploads_path: settings.uploads_path.trim_matches('/').to_string(),
            http,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Absolute URL of a backend path such as `/Count`.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Where the backend serves a stored upload.
    pub fn uploads_url(&self, name: &str) -> String {
        format!("{}/{}/{}", self.base, self.uploads_path, name)
    }

    /// Upload a local video file.
    pub async fn upload_video(&self, path: &Path) -> Result<UploadOutcome, ClientError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ClientError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{:?} has no file name", path),
                ))
            })?;
        let bytes = tokio::fs::read(path).await?;
        log::info!("Uploading {} ({} bytes)", file_name, bytes.len());
        self.upload_video_bytes(&file_name, bytes).await
    }

    /// Upload video bytes as multipart field `file`.
    pub async fn upload_video_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ClientError> {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        let response = self
            .http
            .post(self.endpoint_url("/upload_video"))
            .multipart(form)
            .send()
            .await?;

        let body = json_payload(check_status(response).await?).await?;
        let snapshot_name = body
            .get("snapshot")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::missing_field("snapshot"))?
            .to_string();

        if let Some(info) = body.get("info").and_then(Value::as_str) {
            log::info!("Backend: {}", info);
        }

        Ok(UploadOutcome {
            snapshot_url: self.uploads_url(&snapshot_name),
            video_url: self.uploads_url(file_name),
            snapshot_name,
        })
    }

    /// Current frame of an IP camera, as encoded image bytes.
    pub async fn get_snapshot(&self, target: &IpTarget) -> Result<Vec<u8>, ClientError> {
        let response = self
            .http
            .get(self.endpoint_url("/get_snapshot"))
            .query(&[("ip", target.ip.as_str()), ("port", target.port.as_str())])
            .send()
            .await?;
        let bytes = check_status(response).await?.bytes().await?;
        log::debug!("Snapshot from {}: {} bytes", target, bytes.len());
        Ok(bytes.to_vec())
    }

    /// Ask the backend to start pulling the camera stream.
    pub async fn start_stream(&self, target: &IpTarget) -> Result<StartStreamResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint_url("/start_stream"))
            .json(target)
            .send()
            .await?;
        let body = json_payload(check_status(response).await?).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// POST a processing request. The response body is left unread.
    pub async fn post_process(&self, endpoint: &str, body: &Value) -> Result<Response, ClientError> {
        log::debug!("POST {}", endpoint);
        let response = self
            .http
            .post(self.endpoint_url(endpoint))
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    /// Live line counting on an IP camera.
    pub async fn process_stream(
        &self,
        target: &IpTarget,
        lines: &[Line],
    ) -> Result<Response, ClientError> {
        let body = json!({
            "ip": target.ip,
            "port": target.port,
            "lines": lines,
        });
        self.post_process("/process_stream", &body).await
    }

    /// GET an absolute URL, typically a snapshot under the uploads path.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let url = Url::parse(url).map_err(|e| ClientError::invalid_url(url, e))?;
        let response = self.http.get(url).send().await?;
        Ok(check_status(response).await?.bytes().await?.to_vec())
    }
}

fn normalize_base(base_url: &str) -> Result<String, ClientError> {
    let url = Url::parse(base_url).map_err(|e| ClientError::invalid_url(base_url, e))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::invalid_url(base_url, "expected an http(s) base URL"));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

/// Turn a non-2xx response into [`ClientError::Status`].
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    log::error!("{} returned {}: {}", url, status, body);
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Decode a JSON body, rejecting payloads with a set `error` field.
async fn json_payload(response: Response) -> Result<Value, ClientError> {
    let body: Value = response.json().await?;
    if let Some(error) = body.get("error").filter(|e| is_truthy(e)) {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        log::error!("Backend reported an error: {}", message);
        return Err(ClientError::Backend(message));
    }
    Ok(body)
}
