use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What kind of media a request produces. Closed set; providers declare
/// exactly one kind and the orchestrator refuses mismatched dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "png",
            MediaKind::Video => "mp4",
        }
    }
}

/// A generation request as submitted by the caller. Immutable once built;
/// the orchestrator takes it by value and the result record owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: MediaKind,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub provider: String,
    /// Scalar tuning parameters: `size`, `n`, `steps`, `seed`, `quality`,
    /// `duration_s`, `fps`, `resolution`, `style`, `motion_prompt`.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Source frame for image-to-video requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<PathBuf>,
}

impl GenerationRequest {
    pub fn new(kind: MediaKind, prompt: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            negative_prompt: None,
            provider: provider.into(),
            params: Map::new(),
            source_image: None,
        }
    }

    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(Value::as_u64)
    }

    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(Value::as_i64)
    }

    pub fn size(&self) -> &str {
        self.param_str("size").unwrap_or("1024x1024")
    }

    pub fn seed(&self) -> Option<i64> {
        self.param_i64("seed")
    }
}

/// One generated media payload, normalized from whatever the backend
/// returned (inline bytes, base64, or a fetched URL).
#[derive(Debug, Clone)]
pub struct MediaBytes {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl MediaBytes {
    pub fn new(bytes: Vec<u8>, mime_type: Option<String>) -> Self {
        Self { bytes, mime_type }
    }

    /// Preferred file extension, from the detected MIME type when present.
    pub fn extension(&self, kind: MediaKind) -> &'static str {
        extension_from_mime(self.mime_type.as_deref(), kind)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub fn extension_from_mime(mime: Option<&str>, kind: MediaKind) -> &'static str {
    if let Some(mime) = mime {
        let lowered = mime.to_ascii_lowercase();
        if lowered.contains("jpeg") || lowered.contains("jpg") {
            return "jpg";
        }
        if lowered.contains("webp") {
            return "webp";
        }
        if lowered.contains("png") {
            return "png";
        }
        if lowered.contains("gif") {
            return "gif";
        }
        if lowered.contains("webm") {
            return "webm";
        }
        if lowered.contains("quicktime") {
            return "mov";
        }
        if lowered.contains("mp4") {
            return "mp4";
        }
    }
    kind.default_extension()
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "mov" => Some("video/quicktime"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::{extension_from_mime, mime_for_path, GenerationRequest, MediaBytes, MediaKind};

    #[test]
    fn params_are_typed_accessors() {
        let request = GenerationRequest::new(MediaKind::Image, "a red bicycle", "openai")
            .with_param("size", json!("512x512"))
            .with_param("steps", json!(30))
            .with_param("seed", json!(-7));

        assert_eq!(request.size(), "512x512");
        assert_eq!(request.param_u64("steps"), Some(30));
        assert_eq!(request.seed(), Some(-7));
        assert_eq!(request.param_str("style"), None);
    }

    #[test]
    fn blank_string_params_read_as_absent() {
        let request = GenerationRequest::new(MediaKind::Image, "boat", "openai")
            .with_param("style", json!("   "));
        assert_eq!(request.param_str("style"), None);
        assert_eq!(request.size(), "1024x1024");
    }

    #[test]
    fn extension_prefers_mime_over_kind_default() {
        let media = MediaBytes::new(vec![1, 2, 3], Some("image/jpeg".to_string()));
        assert_eq!(media.extension(MediaKind::Image), "jpg");

        let media = MediaBytes::new(vec![1], None);
        assert_eq!(media.extension(MediaKind::Video), "mp4");

        assert_eq!(
            extension_from_mime(Some("video/webm; codecs=vp9"), MediaKind::Video),
            "webm"
        );
    }

    #[test]
    fn mime_for_path_known_and_unknown() {
        assert_eq!(mime_for_path(Path::new("frame.PNG")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("clip.mp4")), Some("video/mp4"));
        assert_eq!(mime_for_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn request_round_trips_through_json() {
        let request = GenerationRequest::new(MediaKind::Video, "a cat in a garden", "runway")
            .with_param("duration_s", json!(5));
        let raw = serde_json::to_string(&request).unwrap();
        let parsed: GenerationRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.kind, MediaKind::Video);
        assert_eq!(parsed.provider, "runway");
        assert_eq!(parsed.param_u64("duration_s"), Some(5));
    }
}
