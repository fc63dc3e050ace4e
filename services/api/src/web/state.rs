//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-user workspaces that
//! hold each signed-in user's search and profile state machines.

use crate::config::Config;
use medimate_core::domain::UserSession;
use medimate_core::ports::{
    AccountService, CatalogService, HistoryService, PortResult, ProfileService,
    TerminologyService,
};
use medimate_core::profile::ProfileEditor;
use medimate_core::search::SearchOrchestrator;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountService>,
    pub catalog: Arc<dyn CatalogService>,
    pub history: Arc<dyn HistoryService>,
    pub profiles: Arc<dyn ProfileService>,
    pub terminology: Arc<dyn TerminologyService>,
    pub config: Arc<Config>,
    pub workspaces: Arc<WorkspaceRegistry>,
}

impl AppState {
    /// Returns the signed-in user's workspace, creating it on first use.
    pub async fn workspace_for(&self, session: &UserSession) -> Arc<Workspace> {
        self.workspaces
            .get_or_insert_with(session.user_id, || Workspace::new(self, session.clone()))
            .await
    }
}

//=========================================================================================
// Workspace (Specific to One Signed-In User)
//=========================================================================================

/// The search and profile state of one user, alive from first use until sign-out.
pub struct Workspace {
    pub search: SearchOrchestrator,
    pub profile: ProfileEditor,
    profile_loaded: AtomicBool,
}

impl Workspace {
    pub fn new(state: &AppState, session: UserSession) -> Self {
        let search = SearchOrchestrator::new(
            state.terminology.clone(),
            state.catalog.clone(),
            state.history.clone(),
            Some(session.clone()),
            state.config.purchase_links.clone(),
        );
        let profile = ProfileEditor::new(state.profiles.clone(), session);

        Self {
            search,
            profile,
            profile_loaded: AtomicBool::new(false),
        }
    }

    /// Loads the profile the first time it is asked for. A failed load is retried next time.
    pub async fn ensure_profile_loaded(&self) -> PortResult<()> {
        if self.profile_loaded.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.profile.load().await?;
        self.profile_loaded.store(true, Ordering::SeqCst);
        Ok(())
    }
}

//=========================================================================================
// WorkspaceRegistry
//=========================================================================================

struct Entry {
    workspace: Arc<Workspace>,
    last_used: Instant,
}

#[derive(Default)]
struct Registry {
    workspaces: HashMap<Uuid, Entry>,
    /// Auth session id -> owning user, for every session seen by `require_auth`.
    sessions: HashMap<String, Uuid>,
}

impl Registry {
    fn remove_user(&mut self, user_id: Uuid) -> Option<Arc<Workspace>> {
        self.sessions.retain(|_, owner| *owner != user_id);
        self.workspaces.remove(&user_id).map(|entry| entry.workspace)
    }
}

/// Owns every open workspace. A workspace goes away at sign-out, when the last
/// auth session that used it is rejected, or after sitting idle too long.
#[derive(Default)]
pub struct WorkspaceRegistry {
    inner: Mutex<Registry>,
}

impl WorkspaceRegistry {
    pub async fn get_or_insert_with(
        &self,
        user_id: Uuid,
        make: impl FnOnce() -> Workspace,
    ) -> Arc<Workspace> {
        let mut registry = self.inner.lock().await;
        let entry = registry.workspaces.entry(user_id).or_insert_with(|| {
            info!("Opening workspace for user {}", user_id);
            Entry {
                workspace: Arc::new(make()),
                last_used: Instant::now(),
            }
        });
        entry.last_used = Instant::now();
        entry.workspace.clone()
    }

    /// Remembers that `auth_session_id` belongs to `user_id`.
    pub async fn bind_session(&self, auth_session_id: &str, user_id: Uuid) {
        let mut registry = self.inner.lock().await;
        if !registry.sessions.contains_key(auth_session_id) {
            registry
                .sessions
                .insert(auth_session_id.to_string(), user_id);
        }
    }

    /// Forgets a session the account store no longer accepts. Returns `true`
    /// when that was the user's last known session and the workspace was released.
    pub async fn forget_session(&self, auth_session_id: &str) -> bool {
        let released = {
            let mut registry = self.inner.lock().await;
            let Some(user_id) = registry.sessions.remove(auth_session_id) else {
                return false;
            };
            if registry.sessions.values().any(|owner| *owner == user_id) {
                return false;
            }
            registry.remove_user(user_id).map(|workspace| (user_id, workspace))
        };

        match released {
            Some((user_id, workspace)) => {
                workspace.search.cancel().await;
                info!("Released workspace for user {} after its session ended", user_id);
                true
            }
            None => false,
        }
    }

    /// Drops the user's workspace, cancelling any search still in flight.
    pub async fn release(&self, user_id: Uuid) -> bool {
        let removed = self.inner.lock().await.remove_user(user_id);
        match removed {
            Some(workspace) => {
                workspace.search.cancel().await;
                info!("Released workspace for user {}", user_id);
                true
            }
            None => false,
        }
    }

    /// Releases every workspace unused for at least `max_idle`. Returns how many went.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted: Vec<(Uuid, Arc<Workspace>)> = {
            let mut registry = self.inner.lock().await;
            let now = Instant::now();
            let idle: Vec<Uuid> = registry
                .workspaces
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.last_used) >= max_idle)
                .map(|(user_id, _)| *user_id)
                .collect();
            idle.into_iter()
                .filter_map(|user_id| registry.remove_user(user_id).map(|w| (user_id, w)))
                .collect()
        };

        for (user_id, workspace) in &evicted {
            workspace.search.cancel().await;
            debug!("Evicted idle workspace for user {}", user_id);
        }
        evicted.len()
    }

    /// Starts a background task that calls [`Self::evict_idle`] every `every`.
    pub fn spawn_idle_eviction(
        self: Arc<Self>,
        every: Duration,
        max_idle: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = self.evict_idle(max_idle).await;
                if evicted > 0 {
                    info!("Evicted {} idle workspace(s)", evicted);
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.workspaces.len()
    }
}
