//! crates/medimate_core/src/testing.rs
//!
//! In-memory implementations of the ports, shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    CatalogMedicine, NewSearchHistoryEntry, ProfileChanges, SearchHistoryEntry, UserProfile,
    UserSession,
};
use crate::ports::{
    CatalogService, HistoryService, PortError, PortResult, ProfileService, TerminologyService,
};

pub fn session() -> UserSession {
    UserSession {
        user_id: Uuid::from_u128(0x5eed),
        email: "ada@example.com".to_string(),
    }
}

pub fn catalog_row(brand_name: &str, buying_link: &str) -> CatalogMedicine {
    CatalogMedicine {
        id: Uuid::new_v4(),
        brand_name: brand_name.to_string(),
        generic_name: "ibuprofen".to_string(),
        buying_link: buying_link.to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

//=========================================================================================
// Terminology
//=========================================================================================

#[derive(Default)]
pub struct FakeTerminology {
    rxcuis: HashMap<String, Vec<String>>,
    related: HashMap<String, Vec<String>>,
    delays: HashMap<String, Duration>,
    fail: bool,
    rxcui_calls: Mutex<Vec<String>>,
    related_calls: Mutex<Vec<String>>,
}

impl FakeTerminology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rxcuis(mut self, name: &str, ids: &[&str]) -> Self {
        self.rxcuis
            .insert(name.to_string(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_related(mut self, rxcui: &str, names: &[&str]) -> Self {
        self.related
            .insert(rxcui.to_string(), names.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Delays the identifier lookup for `name`.
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn rxcui_calls(&self) -> Vec<String> {
        self.rxcui_calls.lock().unwrap().clone()
    }

    pub fn related_calls(&self) -> Vec<String> {
        self.related_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TerminologyService for FakeTerminology {
    async fn find_rxcuis(&self, name: &str) -> PortResult<Vec<String>> {
        self.rxcui_calls.lock().unwrap().push(name.to_string());
        if let Some(delay) = self.delays.get(name) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        Ok(self.rxcuis.get(name).cloned().unwrap_or_default())
    }

    async fn find_trade_name_of(&self, rxcui: &str) -> PortResult<Vec<String>> {
        self.related_calls.lock().unwrap().push(rxcui.to_string());
        Ok(self.related.get(rxcui).cloned().unwrap_or_default())
    }
}

//=========================================================================================
// Catalog
//=========================================================================================

pub struct FakeCatalog {
    entry: Option<CatalogMedicine>,
    fail: bool,
}

impl FakeCatalog {
    pub fn empty() -> Self {
        Self {
            entry: None,
            fail: false,
        }
    }

    pub fn with(entry: CatalogMedicine) -> Self {
        Self {
            entry: Some(entry),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            entry: None,
            fail: true,
        }
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn find_by_brand_name(&self, _brand_name: &str) -> PortResult<Option<CatalogMedicine>> {
        if self.fail {
            return Err(PortError::Unexpected("catalog unavailable".to_string()));
        }
        Ok(self.entry.clone())
    }
}

//=========================================================================================
// History
//=========================================================================================

pub struct FakeHistory {
    entries: Mutex<Vec<SearchHistoryEntry>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl FakeHistory {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn entries(&self) -> Vec<SearchHistoryEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryService for FakeHistory {
    async fn record_search(&self, entry: NewSearchHistoryEntry) -> PortResult<SearchHistoryEntry> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PortError::Unexpected("insert rejected".to_string()));
        }
        let saved = SearchHistoryEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            brand_name: entry.brand_name,
            searched_at: Utc::now(),
        };
        self.entries.lock().unwrap().push(saved.clone());
        Ok(saved)
    }
}

//=========================================================================================
// Profiles
//=========================================================================================

pub struct FakeProfiles {
    profile: Mutex<Option<UserProfile>>,
    writes: Mutex<Vec<(Uuid, ProfileChanges)>>,
    fail_reads: bool,
    fail_writes: AtomicBool,
}

impl FakeProfiles {
    pub fn empty() -> Self {
        Self {
            profile: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            fail_reads: false,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn with(profile: UserProfile) -> Self {
        Self {
            profile: Mutex::new(Some(profile)),
            ..Self::empty()
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::empty()
        }
    }

    pub fn failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn writes(&self) -> Vec<(Uuid, ProfileChanges)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileService for FakeProfiles {
    async fn get_profile(&self, _user_id: Uuid) -> PortResult<Option<UserProfile>> {
        if self.fail_reads {
            return Err(PortError::Unexpected("read timed out".to_string()));
        }
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn update_profile(&self, user_id: Uuid, changes: &ProfileChanges) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("update rejected".to_string()));
        }
        self.writes.lock().unwrap().push((user_id, changes.clone()));
        if let Some(profile) = self.profile.lock().unwrap().as_mut() {
            profile.name = changes.name.clone();
            profile.photo_url = changes.photo_url.clone();
            profile.age = changes.age;
            profile.updated_at = Some(changes.updated_at);
        }
        Ok(())
    }
}
