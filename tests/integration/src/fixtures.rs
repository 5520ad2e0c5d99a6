//! Test fixtures and data generators

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Unique user id
pub fn unique_user(prefix: &str) -> String {
    format!("{prefix}-{}", unique_suffix())
}

/// Body of `POST /api/events`
#[derive(Debug, Serialize)]
pub struct PublishEventRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

impl PublishEventRequest {
    pub fn new(kind: &str, data: Value) -> Self {
        Self {
            kind: kind.to_string(),
            data,
        }
    }

    /// A `task.updated` event for a fresh task
    pub fn task_updated() -> Self {
        let id = unique_suffix();
        Self::new(
            "task.updated",
            json!({
                "id": id,
                "title": format!("Task {id}"),
                "status": "in_progress",
            }),
        )
    }
}
