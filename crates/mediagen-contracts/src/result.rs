use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::request::{GenerationRequest, MediaKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    Succeeded,
    Failed,
}

impl GenerationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationStatus::Pending)
    }
}

/// Record of one submission. Created Pending, moved exactly once to a
/// terminal state; the setters refuse any second transition.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub id: Uuid,
    pub request: GenerationRequest,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn pending(request: GenerationRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            status: GenerationStatus::Pending,
            media_path: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_succeeded(&mut self, media_path: PathBuf) -> Result<()> {
        if self.status.is_terminal() {
            bail!("result {} already {:?}", self.id, self.status);
        }
        if media_path.as_os_str().is_empty() {
            bail!("succeeded result requires a media path");
        }
        self.status = GenerationStatus::Succeeded;
        self.media_path = Some(media_path);
        Ok(())
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>) -> Result<()> {
        if self.status.is_terminal() {
            bail!("result {} already {:?}", self.id, self.status);
        }
        let message = error_message.into();
        if message.trim().is_empty() {
            bail!("failed result requires an error message");
        }
        self.status = GenerationStatus::Failed;
        self.error_message = Some(message);
        Ok(())
    }

    pub fn media_path(&self) -> Option<&Path> {
        self.media_path.as_deref()
    }
}

/// Session history: append-only, insertion order is chronological order.
/// Owned by whoever drives the orchestrator; no ambient globals.
#[derive(Debug, Default, Serialize)]
pub struct History {
    records: Vec<GenerationResult>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: GenerationResult) {
        self.records.push(result);
    }

    pub fn records(&self) -> &[GenerationResult] {
        &self.records
    }

    pub fn last(&self) -> Option<&GenerationResult> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn of_kind(&self, kind: MediaKind) -> impl Iterator<Item = &GenerationResult> {
        self.records
            .iter()
            .filter(move |record| record.request.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::request::{GenerationRequest, MediaKind};

    use super::{GenerationResult, GenerationStatus, History};

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(MediaKind::Image, prompt, "openai")
    }

    #[test]
    fn pending_record_starts_clean() {
        let result = GenerationResult::pending(request("boat"));
        assert_eq!(result.status, GenerationStatus::Pending);
        assert!(result.media_path.is_none());
        assert!(result.error_message.is_none());
    }

    #[test]
    fn succeeded_transition_is_one_shot() {
        let mut result = GenerationResult::pending(request("boat"));
        result
            .mark_succeeded(PathBuf::from("/tmp/image_1.png"))
            .unwrap();
        assert_eq!(result.status, GenerationStatus::Succeeded);

        assert!(result.mark_succeeded(PathBuf::from("/tmp/other.png")).is_err());
        assert!(result.mark_failed("late failure").is_err());
        assert_eq!(
            result.media_path(),
            Some(PathBuf::from("/tmp/image_1.png").as_path())
        );
    }

    #[test]
    fn failed_transition_requires_message_and_is_terminal() {
        let mut result = GenerationResult::pending(request("boat"));
        assert!(result.mark_failed("  ").is_err());
        result.mark_failed("provider error").unwrap();
        assert_eq!(result.status, GenerationStatus::Failed);
        assert!(result.mark_failed("again").is_err());
        assert!(result.media_path.is_none());
    }

    #[test]
    fn history_preserves_insertion_order() {
        let mut history = History::new();
        history.push(GenerationResult::pending(request("first")));
        history.push(GenerationResult::pending(request("second")));

        let prompts: Vec<&str> = history
            .records()
            .iter()
            .map(|record| record.request.prompt.as_str())
            .collect();
        assert_eq!(prompts, vec!["first", "second"]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn history_filters_by_kind() {
        let mut history = History::new();
        history.push(GenerationResult::pending(request("image one")));
        let mut video = GenerationResult::pending(GenerationRequest::new(
            MediaKind::Video,
            "video one",
            "runway",
        ));
        video.mark_failed("no credentials").unwrap();
        history.push(video);

        assert_eq!(history.of_kind(MediaKind::Image).count(), 1);
        assert_eq!(history.of_kind(MediaKind::Video).count(), 1);
    }
}
