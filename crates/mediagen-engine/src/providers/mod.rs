use std::collections::BTreeMap;
use std::time::Duration;

use mediagen_contracts::config::{Config, ALLOWED_IMAGE_SIZES};
use mediagen_contracts::error::{truncate_text, GenerateError};
use mediagen_contracts::request::{GenerationRequest, MediaBytes, MediaKind};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;

mod local;
mod openai;
mod runway;
mod stability;

pub use local::LocalDiffusionProvider;
pub use openai::OpenAiImageProvider;
pub use runway::RunwayVideoProvider;
pub use stability::StabilityImageProvider;

/// A backend capable of turning a request into media bytes. One blocking
/// call per invocation, no retries, no filesystem writes; persistence is
/// the file store's job.
pub trait MediaProvider: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> MediaKind;
    fn generate(&self, request: &GenerationRequest) -> Result<MediaBytes, GenerateError>;
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Box<dyn MediaProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: MediaProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<&dyn MediaProvider> {
        self.providers.get(name).map(|provider| provider.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

/// Registry wired from configuration at startup. Provider selection is a
/// lookup by stable name; nothing downstream matches on provider strings.
pub fn default_registry(config: &Config) -> ProviderRegistry {
    let mut providers = ProviderRegistry::new();
    providers.register(OpenAiImageProvider::new(config));
    providers.register(StabilityImageProvider::new(config));
    providers.register(RunwayVideoProvider::new(config));
    providers.register(LocalDiffusionProvider::new(config));
    providers
}

pub(crate) fn http_client(timeout: Duration) -> HttpClient {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

pub(crate) fn ensure_prompt(request: &GenerationRequest) -> Result<&str, GenerateError> {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(GenerateError::InvalidParameter(
            "prompt must not be empty".to_string(),
        ));
    }
    Ok(prompt)
}

pub(crate) fn ensure_image_size(size: &str, max_dim: u32) -> Result<(u32, u32), GenerateError> {
    if !ALLOWED_IMAGE_SIZES.contains(&size) {
        return Err(GenerateError::InvalidParameter(format!(
            "size '{size}' is not supported; expected one of {}",
            ALLOWED_IMAGE_SIZES.join(", ")
        )));
    }
    let (width, height) = parse_dims(size).ok_or_else(|| {
        GenerateError::InvalidParameter(format!("size '{size}' is not of the form WxH"))
    })?;
    if width > max_dim || height > max_dim {
        return Err(GenerateError::InvalidParameter(format!(
            "size '{size}' exceeds the {max_dim}px limit"
        )));
    }
    Ok((width, height))
}

pub(crate) fn ensure_steps(request: &GenerationRequest, max_steps: u32) -> Result<u32, GenerateError> {
    let Some(steps) = request.param_u64("steps") else {
        return Ok(30);
    };
    if steps == 0 || steps > u64::from(max_steps) {
        return Err(GenerateError::InvalidParameter(format!(
            "steps must be within [1, {max_steps}], got {steps}"
        )));
    }
    Ok(steps as u32)
}

pub(crate) fn ensure_video_params(
    request: &GenerationRequest,
    max_duration_s: u64,
    default_fps: u32,
) -> Result<(u64, u32), GenerateError> {
    let duration = request.param_u64("duration_s").unwrap_or(5);
    if duration == 0 || duration > max_duration_s {
        return Err(GenerateError::InvalidParameter(format!(
            "duration_s must be within [1, {max_duration_s}], got {duration}"
        )));
    }
    let fps = request.param_u64("fps").unwrap_or(u64::from(default_fps));
    if fps == 0 || fps > 60 {
        return Err(GenerateError::InvalidParameter(format!(
            "fps must be within [1, 60], got {fps}"
        )));
    }
    Ok((duration, fps as u32))
}

pub(crate) fn parse_dims(size: &str) -> Option<(u32, u32)> {
    let (width, height) = size.trim().to_ascii_lowercase().split_once('x').map(
        |(width, height)| (width.trim().to_string(), height.trim().to_string()),
    )?;
    Some((width.parse().ok()?, height.parse().ok()?))
}

/// Parse a JSON response body, mapping non-success statuses onto the error
/// taxonomy before touching the payload.
pub(crate) fn response_json_or_error(
    provider: &str,
    response: HttpResponse,
) -> Result<Value, GenerateError> {
    let status = response.status();
    let code = status.as_u16();
    let body = response.text().map_err(|err| {
        GenerateError::Provider(format!("{provider} response body read failed: {err}"))
    })?;
    if !status.is_success() {
        return Err(GenerateError::from_http_status(provider, code, &body));
    }
    serde_json::from_str(&body).map_err(|_| {
        GenerateError::Provider(format!(
            "{provider} returned invalid JSON: {}",
            truncate_text(&body, 256)
        ))
    })
}

/// Download media from a backend-supplied URL and carry its MIME type.
pub(crate) fn fetch_media(
    client: &HttpClient,
    provider: &str,
    url: &str,
) -> Result<MediaBytes, GenerateError> {
    let response = client
        .get(url)
        .send()
        .map_err(|err| GenerateError::from_transport(provider, err))?;
    if !response.status().is_success() {
        let code = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        return Err(GenerateError::from_http_status(provider, code, &body));
    }
    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response
        .bytes()
        .map_err(|err| GenerateError::Provider(format!("{provider} media read failed: {err}")))?
        .to_vec();
    if bytes.is_empty() {
        return Err(GenerateError::Provider(format!(
            "{provider} returned an empty media payload ({url})"
        )));
    }
    Ok(MediaBytes::new(bytes, mime_type))
}
