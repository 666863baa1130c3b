use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use slidesmith_core::{GenerationMode, Rgb, Stage};
use std::sync::Arc;

/// Entries kept before the oldest ones are dropped.
pub const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Generating,
    Healed,
    Success,
    Failed,
    Cancelled,
}

/// What the server remembers about one generation. Never holds the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub slide_count: u8,
    pub background_color: Rgb,
    pub description: String,
    pub mode: Option<GenerationMode>,
    pub stage: Option<Stage>,
    pub healing_attempts: u32,
    pub tokens_used: Option<u32>,
    pub artifact_bytes: Option<usize>,
    pub error: Option<String>,
    pub status: EventStatus,
}

#[derive(Clone)]
pub struct GenerationLog {
    pub events: Arc<DashMap<String, GenerationEvent>>,
    capacity: usize,
}

impl Default for GenerationLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl GenerationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, event: GenerationEvent) {
        self.events.insert(event.id.clone(), event);

        while self.events.len() > self.capacity {
            let oldest = self
                .events
                .iter()
                .min_by_key(|e| e.value().timestamp)
                .map(|e| e.key().clone());
            match oldest {
                Some(id) => {
                    self.events.remove(&id);
                }
                None => break,
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<GenerationEvent> {
        self.events.get(id).map(|e| e.value().clone())
    }

    /// All events, newest first.
    pub fn list(&self) -> Vec<GenerationEvent> {
        let mut events: Vec<_> = self.events.iter().map(|e| e.value().clone()).collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events
    }
}
