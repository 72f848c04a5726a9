use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use mediagen_contracts::config::Config;
use mediagen_contracts::error::GenerateError;
use mediagen_contracts::request::{mime_for_path, GenerationRequest, MediaBytes, MediaKind};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

use super::{
    ensure_prompt, ensure_video_params, fetch_media, http_client, response_json_or_error,
    MediaProvider,
};

const PROVIDER: &str = "runway";

/// Hosted text-to-video and image-to-video. Generation is asynchronous on
/// the backend: submit a task, poll it until it settles, then fetch the
/// output URL. The poll deadline is wall-clock and maps to `Timeout`.
pub struct RunwayVideoProvider {
    api_base: String,
    api_secret: Option<String>,
    max_duration_s: u64,
    default_fps: u32,
    poll_interval: Duration,
    poll_deadline: Duration,
    http: HttpClient,
}

impl RunwayVideoProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            api_base: config.runway_api_base.clone(),
            api_secret: config.runway_api_secret.clone(),
            max_duration_s: config.max_video_duration_s,
            default_fps: config.default_fps,
            poll_interval: config.poll_interval,
            poll_deadline: config.poll_deadline,
            http: http_client(config.request_timeout),
        }
    }

    fn source_image_data_url(path: &Path) -> Result<String, GenerateError> {
        let bytes = std::fs::read(path).map_err(|err| {
            GenerateError::InvalidParameter(format!(
                "source image {} unreadable: {err}",
                path.display()
            ))
        })?;
        let mime = mime_for_path(path).unwrap_or("image/png");
        Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
    }

    fn poll_task(&self, task_id: &str, api_secret: &str) -> Result<Value, GenerateError> {
        let poll_url = format!("{}/v1/tasks/{task_id}", self.api_base);
        let started = Instant::now();
        loop {
            let response = self
                .http
                .get(&poll_url)
                .bearer_auth(api_secret)
                .send()
                .map_err(|err| GenerateError::from_transport(PROVIDER, err))?;
            let payload = response_json_or_error(PROVIDER, response)?;
            let status = task_status(&payload);
            if status == "succeeded" {
                return Ok(payload);
            }
            if matches!(status.as_str(), "failed" | "cancelled" | "canceled") {
                let failure = payload
                    .get("failure")
                    .or_else(|| payload.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("task failed without detail");
                return Err(GenerateError::Provider(format!(
                    "runway task {task_id} {status}: {failure}"
                )));
            }
            if started.elapsed() >= self.poll_deadline {
                return Err(GenerateError::Timeout(format!(
                    "runway task {task_id} still {status} after {:.0}s",
                    self.poll_deadline.as_secs_f64()
                )));
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl MediaProvider for RunwayVideoProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn generate(&self, request: &GenerationRequest) -> Result<MediaBytes, GenerateError> {
        let prompt = ensure_prompt(request)?;
        let (duration, fps) = ensure_video_params(request, self.max_duration_s, self.default_fps)?;
        let Some(api_secret) = self.api_secret.as_deref() else {
            return Err(GenerateError::Authentication(
                "RUNWAYML_API_SECRET not set".to_string(),
            ));
        };

        let mut payload = json!({
            "promptText": prompt,
            "duration": duration,
            "fps": fps,
        });
        if let Some(resolution) = request.param_str("resolution") {
            payload["resolution"] = json!(resolution);
        }
        if let Some(source) = request.source_image.as_deref() {
            payload["promptImage"] = json!(Self::source_image_data_url(source)?);
        }

        let endpoint = format!("{}/v1/generations", self.api_base);
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_secret)
            .json(&payload)
            .send()
            .map_err(|err| GenerateError::from_transport(PROVIDER, err))?;
        let mut task = response_json_or_error(PROVIDER, response)?;

        if task_status(&task) != "succeeded" {
            let task_id = task
                .get("id")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    GenerateError::Provider("runway response missing task id".to_string())
                })?
                .to_string();
            task = self.poll_task(&task_id, api_secret)?;
        }

        let mut urls = Vec::new();
        extract_output_urls(&task, &mut urls);
        let url = urls.first().ok_or_else(|| {
            GenerateError::Provider("runway task returned no output URLs".to_string())
        })?;
        let media = fetch_media(&self.http, PROVIDER, url)?;
        if media.mime_type.is_some() {
            return Ok(media);
        }
        Ok(MediaBytes::new(media.bytes, Some("video/mp4".to_string())))
    }
}

fn task_status(payload: &Value) -> String {
    payload
        .get("status")
        .and_then(Value::as_str)
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default()
}

fn extract_output_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) => {
            let trimmed = url.trim();
            if !trimmed.is_empty()
                && trimmed.starts_with("http")
                && !out.iter().any(|existing| existing == trimmed)
            {
                out.push(trimmed.to_string());
            }
        }
        Value::Array(rows) => {
            for row in rows {
                extract_output_urls(row, out);
            }
        }
        Value::Object(obj) => {
            if let Some(url) = obj.get("url") {
                extract_output_urls(url, out);
            }
            if let Some(output) = obj.get("output") {
                extract_output_urls(output, out);
            }
            if let Some(artifacts) = obj.get("artifacts") {
                extract_output_urls(artifacts, out);
            }
        }
        _ => {}
    }
}
