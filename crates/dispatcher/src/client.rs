use std::time::Duration;

use async_trait::async_trait;

use crate::error::DispatchError;

/// Result of one successful transcription call.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    pub text: String,
    pub confidence: Option<f32>,
}

/// A remote speech-to-text backend, selected by model id.
///
/// Implementations are the external collaborator the spec calls out in
/// §6: `transcribe(bytes, sample_rate, channels, format) -> (text, confidence?)`.
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    async fn transcribe(
        &self,
        model: &str,
        wav_bytes: &[u8],
        sample_rate: u32,
    ) -> Result<TranscriptionResult, DispatchError>;
}

/// `reqwest`-backed client speaking a simple multipart WAV upload API.
pub struct HttpTranscriptionClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTranscriptionClient {
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

#[async_trait]
impl TranscriptionClient for HttpTranscriptionClient {
    async fn transcribe(
        &self,
        model: &str,
        wav_bytes: &[u8],
        sample_rate: u32,
    ) -> Result<TranscriptionResult, DispatchError> {
        let part = reqwest::multipart::Part::bytes(wav_bytes.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| DispatchError::ClientError(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", model.to_string())
            .text("sample_rate", sample_rate.to_string())
            .text("channels", "1")
            .part("audio", part);

        let response = self
            .http
            .post(format!("{}/v1/transcriptions", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            let body: TranscribeResponseBody = response
                .json()
                .await
                .map_err(|e| DispatchError::ServerError(e.to_string()))?;
            Ok(TranscriptionResult {
                text: body.text,
                confidence: body.confidence,
            })
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(DispatchError::RateLimited { retry_after })
        } else if status.is_server_error() {
            Err(DispatchError::ServerError(status.to_string()))
        } else {
            Err(DispatchError::ClientError(status.to_string()))
        }
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> DispatchError {
    if e.is_timeout() {
        DispatchError::Timeout
    } else if e.is_connect() || e.is_request() {
        DispatchError::Network(e.to_string())
    } else {
        DispatchError::Network(e.to_string())
    }
}

#[derive(Debug, serde::Deserialize)]
struct TranscribeResponseBody {
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
}
