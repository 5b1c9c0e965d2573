use std::time::Duration;

use async_trait::async_trait;

/// Generative-AI failure classes, mirroring the transcription service's
/// error taxonomy: only rate-limit carries a retry hint, and none of these
/// are retried inside the context manager itself — that's the calling
/// ticker's job (it simply tries again at the next tick).
#[derive(Debug, thiserror::Error, Clone)]
pub enum AiError {
    #[error("request timed out")]
    Timeout,
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("server error: {0}")]
    ServerError(String),
    #[error("client error: {0}")]
    ClientError(String),
    #[error("network error: {0}")]
    Network(String),
}

/// A remote text-generation backend.
#[async_trait]
pub trait GenerativeAiClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AiError>;
}

/// `reqwest`-backed client speaking a simple JSON completion API, the same
/// shape as `live-transcripts-dispatcher::HttpTranscriptionClient`.
pub struct HttpGenerativeAiClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGenerativeAiClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("reqwest client configuration is always valid");
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct GenerateRequestBody<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, serde::Deserialize)]
struct GenerateResponseBody {
    text: String,
}

#[async_trait]
impl GenerativeAiClient for HttpGenerativeAiClient {
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, AiError> {
        let body = GenerateRequestBody { prompt, max_tokens, temperature };

        let response = self
            .http
            .post(format!("{}/v1/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            let body: GenerateResponseBody = response
                .json()
                .await
                .map_err(|e| AiError::ServerError(e.to_string()))?;
            Ok(body.text)
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            Err(AiError::RateLimited { retry_after_secs })
        } else if status.is_server_error() {
            Err(AiError::ServerError(status.to_string()))
        } else {
            Err(AiError::ClientError(status.to_string()))
        }
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> AiError {
    if e.is_timeout() {
        AiError::Timeout
    } else {
        AiError::Network(e.to_string())
    }
}
