use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Image sizes accepted by the hosted image backends.
pub const ALLOWED_IMAGE_SIZES: &[&str] = &[
    "256x256",
    "512x512",
    "1024x1024",
    "1024x1792",
    "1792x1024",
];

/// Runtime configuration: credentials, endpoint overrides, output layout,
/// and generation bounds. Read once at startup; missing credentials are
/// reported per-provider at call time, never as a crash here.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub stability_api_key: Option<String>,
    pub runway_api_secret: Option<String>,
    pub openai_api_base: String,
    pub stability_api_base: String,
    pub runway_api_base: String,
    pub local_model_dir: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub poll_deadline: Duration,
    pub max_image_size: u32,
    pub max_steps: u32,
    pub max_video_duration_s: u64,
    pub default_fps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            stability_api_key: None,
            runway_api_secret: None,
            openai_api_base: "https://api.openai.com/v1".to_string(),
            stability_api_base: "https://api.stability.ai".to_string(),
            runway_api_base: "https://api.runwayml.com".to_string(),
            local_model_dir: None,
            out_dir: PathBuf::from("generated"),
            request_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
            poll_deadline: Duration::from_secs(300),
            max_image_size: 2048,
            max_steps: 150,
            max_video_duration_s: 60,
            default_fps: 24,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            stability_api_key: non_empty_env("STABLE_DIFFUSION_API_KEY"),
            runway_api_secret: non_empty_env("RUNWAYML_API_SECRET"),
            openai_api_base: api_base_env("OPENAI_API_BASE", &defaults.openai_api_base),
            stability_api_base: api_base_env("STABILITY_API_BASE", &defaults.stability_api_base),
            runway_api_base: api_base_env("RUNWAY_API_BASE", &defaults.runway_api_base),
            local_model_dir: non_empty_env("MEDIAGEN_LOCAL_MODEL").map(PathBuf::from),
            out_dir: non_empty_env("MEDIAGEN_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| defaults.out_dir.clone()),
            request_timeout: duration_env("MEDIAGEN_TIMEOUT_S", defaults.request_timeout),
            poll_interval: duration_env("MEDIAGEN_POLL_INTERVAL_S", defaults.poll_interval),
            poll_deadline: duration_env("MEDIAGEN_POLL_DEADLINE_S", defaults.poll_deadline),
            ..defaults
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.out_dir.join("images")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.out_dir.join("videos")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.out_dir.join("temp")
    }

    /// Names of the credentials expected for full hosted-provider
    /// functionality that are currently absent. Informational only.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openai_api_key.is_none() {
            missing.push("OPENAI_API_KEY");
        }
        if self.runway_api_secret.is_none() {
            missing.push("RUNWAYML_API_SECRET");
        }
        missing
    }

    pub fn size_is_allowed(&self, size: &str) -> bool {
        ALLOWED_IMAGE_SIZES.contains(&size)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn api_base_env(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn duration_env(key: &str, default: Duration) -> Duration {
    non_empty_env(key)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::time::Duration;

    use super::{api_base_env, duration_env, Config};

    #[test]
    fn default_layout_nests_under_out_dir() {
        let config = Config::default();
        assert!(config.images_dir().ends_with("generated/images"));
        assert!(config.videos_dir().ends_with("generated/videos"));
        assert!(config.temp_dir().ends_with("generated/temp"));
    }

    #[test]
    fn allowed_sizes_are_enumerated() {
        let config = Config::default();
        assert!(config.size_is_allowed("512x512"));
        assert!(config.size_is_allowed("1024x1792"));
        assert!(!config.size_is_allowed("123x456"));
    }

    #[test]
    fn missing_credentials_lists_required_keys() {
        let config = Config::default();
        let missing = config.missing_credentials();
        assert!(missing.contains(&"OPENAI_API_KEY"));
        assert!(missing.contains(&"RUNWAYML_API_SECRET"));

        let mut configured = Config::default();
        configured.openai_api_key = Some("sk-test".to_string());
        configured.runway_api_secret = Some("rw-test".to_string());
        assert!(configured.missing_credentials().is_empty());
    }

    #[test]
    fn api_base_env_trims_and_strips_trailing_slash() {
        env::set_var("MEDIAGEN_TEST_API_BASE", "  https://example.test/v1/  ");
        assert_eq!(
            api_base_env("MEDIAGEN_TEST_API_BASE", "https://fallback.test"),
            "https://example.test/v1"
        );
        env::remove_var("MEDIAGEN_TEST_API_BASE");
        assert_eq!(
            api_base_env("MEDIAGEN_TEST_API_BASE", "https://fallback.test"),
            "https://fallback.test"
        );
    }

    #[test]
    fn duration_env_rejects_garbage_and_zero() {
        env::set_var("MEDIAGEN_TEST_TIMEOUT", "45");
        assert_eq!(
            duration_env("MEDIAGEN_TEST_TIMEOUT", Duration::from_secs(120)),
            Duration::from_secs(45)
        );
        env::set_var("MEDIAGEN_TEST_TIMEOUT", "0");
        assert_eq!(
            duration_env("MEDIAGEN_TEST_TIMEOUT", Duration::from_secs(120)),
            Duration::from_secs(120)
        );
        env::set_var("MEDIAGEN_TEST_TIMEOUT", "soon");
        assert_eq!(
            duration_env("MEDIAGEN_TEST_TIMEOUT", Duration::from_secs(120)),
            Duration::from_secs(120)
        );
        env::remove_var("MEDIAGEN_TEST_TIMEOUT");
    }
}
