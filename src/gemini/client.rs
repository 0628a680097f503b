use std::fmt::{Debug, Display};

use reqwest::{blocking::Client, header::CONTENT_TYPE, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{GenerationConfig, SessionConfig};

#[derive(Debug, PartialEq, Clone, Default, Eq)]
pub struct GeminiClientOption {
    proxy: Option<String>,
    ca_path: Option<String>,
}

impl GeminiClientOption {
    pub fn from_env() -> Self {
        Self {
            proxy: proxy_from_env(),
            ca_path: root_ca_from_env(),
        }
    }
}

pub struct GeminiClient {
    key: GeminiKey,
    config: SessionConfig,
    http: Client,
}
impl GeminiClient {
    const URL: &'static str = "https://generativelanguage.googleapis.com/v1beta/models";
    pub fn new(key: GeminiKey, config: SessionConfig, option: GeminiClientOption) -> Result<Self> {
        // a send blocks until the transport returns; reqwest would otherwise cut it at 30s
        let mut builder = Client::builder().timeout(None);
        if let Some(proxy) = option.proxy {
            let proxy = reqwest::Proxy::all(&proxy).map_err(|e| {
                GeminiClientError::new(
                    format!("invalid proxy url: {}", e),
                    GeminiClientErrorKind::InvalidUrl(proxy.clone()),
                )
            })?;
            builder = builder.proxy(proxy);
        }
        if let Some(ca) = option.ca_path {
            let pem = std::fs::read(&ca).map_err(|e| {
                GeminiClientError::new(
                    format!("invalid ca: {}", e),
                    GeminiClientErrorKind::NotFoundCAFile(ca.clone()),
                )
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                GeminiClientError::new(
                    format!("invalid ca: {}", e),
                    GeminiClientErrorKind::NotFoundCAFile(ca.clone()),
                )
            })?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder.build().map_err(|e| {
            GeminiClientError::new(
                "Cause Error at GeminiClient::new".to_string(),
                GeminiClientErrorKind::ClientBuildError(e.to_string()),
            )
        })?;
        debug!(model = %config.model, "gemini client ready");
        Ok(Self { key, config, http })
    }
    pub fn from_env(config: SessionConfig) -> Result<Self> {
        let key = GeminiKey::from_env()?;
        Self::new(key, config, GeminiClientOption::from_env())
    }
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
    pub fn generate(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = self.endpoint();
        debug!(%url, turns = request.contents.len(), "sending generateContent");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.key.key())
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .map_err(|e| {
                GeminiClientError::new(
                    "Cause Error at GeminiClient::generate".to_string(),
                    GeminiClientErrorKind::RequestError(e.without_url().to_string()),
                )
            })?;
        let status = response.status();
        let body = response.text().map_err(|e| {
            GeminiClientError::new(
                "Cause Error at reading response body".to_string(),
                GeminiClientErrorKind::ReadBodyError(e.without_url().to_string()),
            )
        })?;
        if !status.is_success() {
            let err = GeminiClientError::from_status(status, &body);
            warn!(%status, "gemini returned an error");
            return Err(err);
        }
        serde_json::from_str(&body).map_err(|e| {
            GeminiClientError::new(
                format!("Failed to parse generateContent response: {}", e),
                GeminiClientErrorKind::ResponseDeserializeError(e.to_string()),
            )
        })
    }
    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", Self::URL, self.config.model)
    }
}

fn root_ca_from_env() -> Option<String> {
    ["CA_BUNDLE", "ca_bundle"]
        .iter()
        .find_map(|name| std::env::var(name).ok())
}

fn proxy_from_env() -> Option<String> {
    ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"]
        .iter()
        .find_map(|name| std::env::var(name).ok())
}

#[derive(Debug, Clone, serde::Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub(crate) contents: Vec<Content>,
    system_instruction: SystemInstruction,
    generation_config: GenerationConfig,
}
impl GenerateContentRequest {
    pub fn new(config: &SessionConfig, contents: Vec<Content>) -> Self {
        Self {
            contents,
            system_instruction: SystemInstruction {
                parts: vec![Part::new(config.system_instruction.as_str())],
            },
            generation_config: config.generation,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, PartialEq)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}
impl GenerateContentResponse {
    /// Joins the text parts of the first candidate in order.
    pub fn into_text(self) -> Result<String> {
        let block_reason = self
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "none".to_string());
        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            GeminiClientError::new(
                "response has no candidates".to_string(),
                GeminiClientErrorKind::EmptyResponse(block_reason),
            )
        })?;
        let finish_reason = candidate
            .finish_reason
            .unwrap_or_else(|| "unknown".to_string());
        // an empty model turn in history makes every later request fail with 400
        match candidate.content.map(|c| c.text()) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(GeminiClientError::new(
                "candidate has no text".to_string(),
                GeminiClientErrorKind::EmptyResponse(finish_reason),
            )),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}
#[derive(Debug, Clone, serde::Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Content {
    #[serde(default)]
    pub(crate) role: Role,
    #[serde(default)]
    parts: Vec<Part>,
}
impl Content {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::new(text)],
        }
    }
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}
impl Part {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Model,
}

#[derive(Clone)]
pub struct GeminiKey(String);

impl GeminiKey {
    pub const ENV: &'static str = "GEMINI_API_KEY";
    pub fn from_env() -> Result<Self> {
        Self::from_env_var(Self::ENV)
    }
    pub fn from_env_var(name: &str) -> Result<Self> {
        match std::env::var(name) {
            Ok(key) if !key.trim().is_empty() => Ok(Self(key)),
            _ => Err(GeminiClientError::new(
                format!("Environment variable {} not set", name),
                GeminiClientErrorKind::NotFoundEnvAPIKey(name.to_string()),
            )),
        }
    }
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
    fn key(&self) -> &str {
        self.0.as_str()
    }
}
impl Debug for GeminiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", "x".repeat(self.0.len()))
    }
}
impl Display for GeminiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", "x".repeat(self.0.len()))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("{message} ({kind})")]
pub struct GeminiClientError {
    message: String,
    pub kind: GeminiClientErrorKind,
}
impl GeminiClientError {
    pub fn new(message: String, kind: GeminiClientErrorKind) -> Self {
        Self { message, kind }
    }
    fn from_status(status: StatusCode, body: &str) -> Self {
        let (message, api_status) = match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(b) => (b.error.message, b.error.status),
            Err(_) => (body.to_string(), String::new()),
        };
        let rejected_key = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            || message.contains("API_KEY_INVALID")
            || message.contains("API key not valid");
        let kind = if rejected_key {
            GeminiClientErrorKind::Unauthorized(status.as_u16())
        } else {
            GeminiClientErrorKind::ResponseError(status.as_u16(), api_status)
        };
        Self::new(message, kind)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum GeminiClientErrorKind {
    #[error("Not found {0} in env")]
    NotFoundEnvAPIKey(String),
    #[error("Not found CA File. File is : {0}")]
    NotFoundCAFile(String),
    #[error("Invalid Url. Url is : {0}")]
    InvalidUrl(String),
    #[error("Client build error. Error is : {0}")]
    ClientBuildError(String),
    #[error("Request Error. Error is : {0}")]
    RequestError(String),
    #[error("Not Read response body. Error is : {0}")]
    ReadBodyError(String),
    #[error("API key was rejected with status {0}")]
    Unauthorized(u16),
    #[error("Response Error. Status is : {0} {1}")]
    ResponseError(u16, String),
    #[error("Not Deserialize response. Serde Error is : {0}")]
    ResponseDeserializeError(String),
    #[error("Empty response. Reason is : {0}")]
    EmptyResponse(String),
}
impl GeminiClientErrorKind {
    /// Errors that can only happen before the first turn is sent.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::NotFoundEnvAPIKey(_)
                | Self::NotFoundCAFile(_)
                | Self::InvalidUrl(_)
                | Self::ClientBuildError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GeminiClientError>;


#[cfg(test)]
pub mod fakes {
    pub fn make_response_json(parts: &[&str]) -> String {
        let parts = parts
            .iter()
            .map(|p| serde_json::json!({ "text": p }))
            .collect::<Vec<_>>();
        serde_json::json!({
            "candidates": [
                {
                    "content": { "role": "model", "parts": parts },
                    "finishReason": "STOP",
                    "index": 0
                }
            ],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 4, "totalTokenCount": 16 }
        })
        .to_string()
    }
}
