use std::time::Instant;

use webpilot_core_types::{ContextId, ContextRole};

/// Registry view of one open browser context.
#[derive(Clone, Debug)]
pub struct ContextEntry {
    pub id: ContextId,
    pub role: ContextRole,
    pub url: Option<String>,
    pub first_seen: Instant,
    pub last_seen: Instant,
}

impl ContextEntry {
    pub fn new(id: ContextId) -> Self {
        let now = Instant::now();
        Self {
            id,
            role: ContextRole::Unknown,
            url: None,
            first_seen: now,
            last_seen: now,
        }
    }
}
