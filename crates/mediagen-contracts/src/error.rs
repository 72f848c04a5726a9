use thiserror::Error;

/// Failure taxonomy for a generation attempt. Every variant is a
/// recoverable-by-user condition: it surfaces as a Failed result record,
/// never as a process abort. Anything a backend reports that does not map
/// to a more specific kind is wrapped as `Provider` with the original
/// message preserved.
#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),
    #[error("write failed: {0}")]
    Write(String),
}

impl GenerateError {
    /// Short remediation hint shown next to the failure message.
    pub fn hint(&self) -> &'static str {
        match self {
            GenerateError::InvalidParameter(_) => "Adjust the request parameters and resubmit.",
            GenerateError::Authentication(_) => "Check the provider credentials in your environment.",
            GenerateError::QuotaExceeded(_) => "Reduce batch size or wait for the quota to reset.",
            GenerateError::Timeout(_) => "Try again, or raise the configured timeout.",
            GenerateError::Provider(_) => "Resubmit; if it persists, check the provider status page.",
            GenerateError::ResourceUnavailable(_) => "Install or configure the local model backend.",
            GenerateError::Write(_) => "Check free disk space and output directory permissions.",
        }
    }

    /// Human-readable message recorded on a Failed result.
    pub fn user_message(&self) -> String {
        format!("{self}. {}", self.hint())
    }

    /// Classify an HTTP failure status the way the hosted backends report
    /// them: 401/403 are credential problems, 429 is quota, everything
    /// else is the provider's fault.
    pub fn from_http_status(provider: &str, code: u16, body: &str) -> Self {
        let detail = truncate_text(body.trim(), 512);
        match code {
            401 | 403 => GenerateError::Authentication(format!(
                "{provider} rejected the credentials ({code}): {detail}"
            )),
            429 => GenerateError::QuotaExceeded(format!(
                "{provider} rate limit hit ({code}): {detail}"
            )),
            _ => GenerateError::Provider(format!(
                "{provider} request failed ({code}): {detail}"
            )),
        }
    }

    pub fn from_transport(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return GenerateError::Timeout(format!("{provider} call exceeded the deadline: {err}"));
        }
        GenerateError::Provider(format!("{provider} transport error: {err}"))
    }
}

pub fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
