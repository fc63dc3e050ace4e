//! crates/medimate_core/src/history.rs
//!
//! Fire-and-forget persistence of completed searches.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::domain::{NewSearchHistoryEntry, UserSession};
use crate::ports::HistoryService;

/// Records searches in the background. Failures are logged and never retried.
pub struct HistoryRecorder {
    service: Arc<dyn HistoryService>,
    tasks: TaskTracker,
}

impl HistoryRecorder {
    pub fn new(service: Arc<dyn HistoryService>) -> Self {
        Self {
            service,
            tasks: TaskTracker::new(),
        }
    }

    /// Starts one insert for `brand_name` under the session's user and returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn record(&self, session: &UserSession, brand_name: &str) {
        let service = Arc::clone(&self.service);
        let entry = NewSearchHistoryEntry {
            user_id: session.user_id,
            brand_name: brand_name.to_string(),
        };

        self.tasks.spawn(async move {
            let user_id = entry.user_id;
            match service.record_search(entry).await {
                Ok(saved) => debug!("Recorded search {} for user {}", saved.id, user_id),
                Err(e) => error!("Failed to record search history for user {}: {:?}", user_id, e),
            }
        });
    }

    /// Waits for every write started so far.
    pub async fn flush(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}
