//! crates/medimate_core/src/profile.rs
//!
//! Read-modify-write cycle for the signed-in user's profile, with optimistic
//! local edits and a short-lived confirmation or error notice after each save.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::domain::{ProfileChanges, UserProfile, UserSession};
use crate::ports::{PortResult, ProfileService};

/// How long a save notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

pub const SAVE_SUCCESS_MESSAGE: &str = "Profile updated successfully!";
pub const SAVE_FAILURE_MESSAGE: &str = "Failed to update profile. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Saved,
    SaveFailed,
}

impl NoticeKind {
    pub fn message(self) -> &'static str {
        match self {
            NoticeKind::Saved => SAVE_SUCCESS_MESSAGE,
            NoticeKind::SaveFailed => SAVE_FAILURE_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    issued: u64,
}

/// Everything a profile screen renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub profile: UserProfile,
    pub loading: bool,
    pub saving: bool,
    pub notice: Option<Notice>,
}

pub struct ProfileEditor {
    service: Arc<dyn ProfileService>,
    session: UserSession,
    view: Arc<watch::Sender<ProfileView>>,
    notices: AtomicU64,
}

impl ProfileEditor {
    pub fn new(service: Arc<dyn ProfileService>, session: UserSession) -> Self {
        let (view, _) = watch::channel(ProfileView {
            profile: UserProfile::blank(session.user_id),
            loading: true,
            saving: false,
            notice: None,
        });
        Self {
            service,
            session,
            view: Arc::new(view),
            notices: AtomicU64::new(0),
        }
    }

    pub fn session(&self) -> &UserSession {
        &self.session
    }

    pub fn view(&self) -> ProfileView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileView> {
        self.view.subscribe()
    }

    /// Reads the stored profile. A missing row renders as the blank record.
    pub async fn load(&self) -> PortResult<Option<UserProfile>> {
        let user_id = self.session.user_id;
        self.view.send_modify(|view| view.loading = true);

        let result = self.service.get_profile(user_id).await;
        let loaded = match &result {
            Ok(Some(profile)) => Some(profile.clone()),
            Ok(None) => {
                debug!("No profile stored yet for user {}", user_id);
                Some(UserProfile::blank(user_id))
            }
            Err(e) => {
                error!("Error loading profile for user {}: {:?}", user_id, e);
                None
            }
        };

        self.view.send_modify(|view| {
            view.loading = false;
            if let Some(profile) = loaded {
                view.profile = profile;
            }
        });

        result
    }

    /// Applies a local, unsaved edit.
    pub fn edit(&self, change: impl FnOnce(&mut UserProfile)) {
        self.view.send_modify(|view| change(&mut view.profile));
    }

    /// Writes the edited fields, last writer wins.
    pub async fn save(&self) -> PortResult<()> {
        self.view.send_modify(|view| {
            view.saving = true;
            view.notice = None;
        });
        let changes = {
            let view = self.view.borrow();
            ProfileChanges {
                name: view.profile.name.clone(),
                photo_url: view.profile.photo_url.clone(),
                age: view.profile.age,
                updated_at: Utc::now(),
            }
        };

        let result = self
            .service
            .update_profile(self.session.user_id, &changes)
            .await;

        let kind = match &result {
            Ok(()) => {
                info!("Profile updated for user {}", self.session.user_id);
                NoticeKind::Saved
            }
            Err(e) => {
                error!("Error updating profile for user {}: {:?}", self.session.user_id, e);
                NoticeKind::SaveFailed
            }
        };

        let notice = Notice {
            kind,
            issued: self.notices.fetch_add(1, Ordering::SeqCst) + 1,
        };
        self.view.send_modify(|view| {
            view.saving = false;
            view.notice = Some(notice);
            if kind == NoticeKind::Saved {
                view.profile.updated_at = Some(changes.updated_at);
            }
        });
        self.expire_notice(notice);

        result
    }

    // The timer outlives the editor; it only ever clears the notice it was started for.
    fn expire_notice(&self, notice: Notice) {
        let view = Arc::clone(&self.view);
        tokio::spawn(async move {
            tokio::time::sleep(NOTICE_TTL).await;
            view.send_if_modified(|view| {
                if view.notice == Some(notice) {
                    view.notice = None;
                    true
                } else {
                    false
                }
            });
        });
    }
}
