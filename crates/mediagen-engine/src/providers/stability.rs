use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use mediagen_contracts::config::Config;
use mediagen_contracts::error::GenerateError;
use mediagen_contracts::request::{GenerationRequest, MediaBytes, MediaKind};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

use super::{
    ensure_image_size, ensure_prompt, ensure_steps, http_client, response_json_or_error,
    MediaProvider,
};

const PROVIDER: &str = "stability";
const ENGINE_PATH: &str = "/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image";

/// Stability text-to-image. Prompts are weighted: the positive prompt at
/// 1.0, the negative prompt at -1.0; the response inlines base64 PNGs
/// under `artifacts`.
pub struct StabilityImageProvider {
    api_base: String,
    api_key: Option<String>,
    max_image_size: u32,
    max_steps: u32,
    http: HttpClient,
}

impl StabilityImageProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            api_base: config.stability_api_base.clone(),
            api_key: config.stability_api_key.clone(),
            max_image_size: config.max_image_size,
            max_steps: config.max_steps,
            http: http_client(config.request_timeout),
        }
    }

    fn decode_artifact(payload: &Value) -> Result<MediaBytes, GenerateError> {
        let b64 = payload
            .get("artifacts")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .and_then(Value::as_object)
            .and_then(|row| row.get("base64"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                GenerateError::Provider("stability response missing image artifact".to_string())
            })?;
        let bytes = BASE64.decode(b64.as_bytes()).map_err(|err| {
            GenerateError::Provider(format!("stability image base64 decode failed: {err}"))
        })?;
        Ok(MediaBytes::new(bytes, Some("image/png".to_string())))
    }
}

impl MediaProvider for StabilityImageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Image
    }

    fn generate(&self, request: &GenerationRequest) -> Result<MediaBytes, GenerateError> {
        let prompt = ensure_prompt(request)?;
        let (width, height) = ensure_image_size(request.size(), self.max_image_size)?;
        let steps = ensure_steps(request, self.max_steps)?;
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerateError::Authentication(
                "STABLE_DIFFUSION_API_KEY not set".to_string(),
            ));
        };

        let mut text_prompts = vec![json!({ "text": prompt, "weight": 1.0 })];
        if let Some(negative) = request
            .negative_prompt
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            text_prompts.push(json!({ "text": negative, "weight": -1.0 }));
        }
        let mut payload = json!({
            "text_prompts": text_prompts,
            "cfg_scale": 7,
            "width": width,
            "height": height,
            "samples": 1,
            "steps": steps,
        });
        if let Some(seed) = request.seed() {
            payload["seed"] = json!(seed.unsigned_abs());
        }

        let endpoint = format!("{}{ENGINE_PATH}", self.api_base);
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .map_err(|err| GenerateError::from_transport(PROVIDER, err))?;
        let parsed = response_json_or_error(PROVIDER, response)?;
        Self::decode_artifact(&parsed)
    }
}
