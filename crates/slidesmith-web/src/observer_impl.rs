use crate::model::{EventStatus, GenerationEvent, GenerationLog};
use chrono::Utc;
use slidesmith_core::{GenerationRequest, PipelineObserver, Stage};

impl PipelineObserver for GenerationLog {
    fn on_start(&self, id: &str, request: &GenerationRequest) {
        let event = GenerationEvent {
            id: id.to_string(),
            timestamp: Utc::now(),
            slide_count: request.slide_count,
            background_color: request.background_color,
            description: request.content_description.clone(),
            mode: request.mode,
            stage: None,
            healing_attempts: 0,
            tokens_used: None,
            artifact_bytes: None,
            error: None,
            status: EventStatus::Generating,
        };
        self.record(event);
    }

    fn on_stage(&self, id: &str, stage: Stage) {
        if let Some(mut event) = self.events.get_mut(id) {
            event.stage = Some(stage);
        }
    }

    fn on_healing_step(&self, id: &str, attempt: u32, _error: &str) {
        if let Some(mut event) = self.events.get_mut(id) {
            event.healing_attempts = attempt;
            event.status = EventStatus::Healed;
        }
    }

    fn on_success(&self, id: &str, artifact_bytes: usize, tokens_used: Option<u32>) {
        if let Some(mut event) = self.events.get_mut(id) {
            event.artifact_bytes = Some(artifact_bytes);
            event.tokens_used = tokens_used;
            event.status = EventStatus::Success;
        }
    }

    fn on_failure(&self, id: &str, error: &str) {
        if let Some(mut event) = self.events.get_mut(id) {
            event.status = EventStatus::Failed;
            event.error = Some(error.to_string());
        }
    }

    fn on_cancelled(&self, id: &str) {
        if let Some(mut event) = self.events.get_mut(id) {
            event.status = EventStatus::Cancelled;
            event.error = Some("client disconnected before the deck was ready".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let log = GenerationLog::new();
        let request = GenerationRequest::new(3, "Intro to cats").with_api_key("sk-secret");

        log.on_start("a", &request);
        log.on_stage("a", Stage::Synthesizing);
        log.on_healing_step("a", 1, "bad json");
        log.on_success("a", 1234, Some(99));

        let event = log.get("a").unwrap();
        assert_eq!(event.status, EventStatus::Success);
        assert_eq!(event.stage, Some(Stage::Synthesizing));
        assert_eq!(event.healing_attempts, 1);
        assert_eq!(event.artifact_bytes, Some(1234));
        assert!(!serde_json::to_string(&event).unwrap().contains("sk-secret"));
    }

    #[test]
    fn test_cancelled_generation() {
        let log = GenerationLog::new();
        log.on_start("a", &GenerationRequest::new(3, "Intro to cats"));
        log.on_stage("a", Stage::Synthesizing);
        log.on_cancelled("a");

        let event = log.get("a").unwrap();
        assert_eq!(event.status, EventStatus::Cancelled);
        assert!(event.error.is_some());
    }

    #[test]
    fn test_failure_and_capacity() {
        let log = GenerationLog::with_capacity(2);
        let request = GenerationRequest::new(1, "x");
        for id in ["a", "b", "c"] {
            log.on_start(id, &request);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        log.on_failure("c", "boom");

        assert_eq!(log.events.len(), 2);
        assert!(log.get("a").is_none());
        assert_eq!(log.get("c").unwrap().error.as_deref(), Some("boom"));
        assert_eq!(log.list()[0].id, "c");
    }
}
