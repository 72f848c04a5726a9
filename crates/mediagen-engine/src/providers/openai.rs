use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use mediagen_contracts::config::Config;
use mediagen_contracts::error::GenerateError;
use mediagen_contracts::request::{GenerationRequest, MediaBytes, MediaKind};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

use super::{
    ensure_image_size, ensure_prompt, fetch_media, http_client, response_json_or_error,
    MediaProvider,
};

const PROVIDER: &str = "openai";
const DEFAULT_MODEL: &str = "dall-e-3";

/// Hosted DALL·E-style image generation. The response carries either an
/// inline `b64_json` payload or a URL the image must be fetched from;
/// both normalize to the same `MediaBytes`.
pub struct OpenAiImageProvider {
    api_base: String,
    api_key: Option<String>,
    max_image_size: u32,
    http: HttpClient,
}

impl OpenAiImageProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            api_base: config.openai_api_base.clone(),
            api_key: config.openai_api_key.clone(),
            max_image_size: config.max_image_size,
            http: http_client(config.request_timeout),
        }
    }

    fn extract_media(&self, payload: &Value) -> Result<MediaBytes, GenerateError> {
        let first = payload
            .get("data")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .and_then(Value::as_object)
            .ok_or_else(|| {
                GenerateError::Provider("openai response returned no images".to_string())
            })?;

        if let Some(b64) = first.get("b64_json").and_then(Value::as_str) {
            let bytes = BASE64.decode(b64.as_bytes()).map_err(|err| {
                GenerateError::Provider(format!("openai image base64 decode failed: {err}"))
            })?;
            return Ok(MediaBytes::new(bytes, Some("image/png".to_string())));
        }

        if let Some(url) = first.get("url").and_then(Value::as_str) {
            return fetch_media(&self.http, PROVIDER, url);
        }

        Err(GenerateError::Provider(
            "openai response had neither b64_json nor url".to_string(),
        ))
    }
}

impl MediaProvider for OpenAiImageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Image
    }

    fn generate(&self, request: &GenerationRequest) -> Result<MediaBytes, GenerateError> {
        let prompt = ensure_prompt(request)?;
        let size = request.size();
        ensure_image_size(size, self.max_image_size)?;
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerateError::Authentication(
                "OPENAI_API_KEY not set".to_string(),
            ));
        };

        let model = request.param_str("model").unwrap_or(DEFAULT_MODEL);
        // The DALL·E endpoint treats quality > 70 as the HD tier.
        let quality = request.param_u64("quality").unwrap_or(80);
        let payload = json!({
            "model": model,
            "prompt": prompt,
            "n": 1,
            "size": size,
            "quality": if quality > 70 { "hd" } else { "standard" },
        });

        let endpoint = format!("{}/images/generations", self.api_base);
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .map_err(|err| GenerateError::from_transport(PROVIDER, err))?;
        let parsed = response_json_or_error(PROVIDER, response)?;
        self.extract_media(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use mediagen_contracts::config::Config;
    use mediagen_contracts::error::GenerateError;
    use mediagen_contracts::request::{GenerationRequest, MediaKind};
    use serde_json::json;

    use super::super::MediaProvider;
    use super::OpenAiImageProvider;

    fn image_request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(MediaKind::Image, prompt, "openai")
            .with_param("size", json!("512x512"))
    }

    #[test]
    fn missing_credential_fails_before_any_call() {
        let provider = OpenAiImageProvider::new(&Config::default());
        let err = provider.generate(&image_request("a red bicycle")).unwrap_err();
        assert!(matches!(err, GenerateError::Authentication(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn parameter_validation_precedes_credential_check() {
        let provider = OpenAiImageProvider::new(&Config::default());
        let err = provider.generate(&image_request("   ")).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidParameter(_)));

        let request = GenerationRequest::new(MediaKind::Image, "boat", "openai")
            .with_param("size", json!("999x999"));
        let err = provider.generate(&request).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidParameter(_)));
    }

    #[test]
    fn inline_base64_payload_is_decoded() {
        use base64::engine::general_purpose::STANDARD as BASE64;
        use base64::Engine as _;

        let provider = OpenAiImageProvider::new(&Config::default());
        let payload = json!({
            "data": [{ "b64_json": BASE64.encode(b"pngbytes") }],
        });
        let media = provider.extract_media(&payload).unwrap();
        assert_eq!(media.bytes, b"pngbytes");
        assert_eq!(media.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn empty_data_array_is_a_provider_error() {
        let provider = OpenAiImageProvider::new(&Config::default());
        let err = provider.extract_media(&json!({ "data": [] })).unwrap_err();
        assert!(matches!(err, GenerateError::Provider(_)));
    }
}
