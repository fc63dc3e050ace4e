//! crates/medimate_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Display value used when a brand resolves but no generic concept is related to it.
pub const GENERIC_NAME_PLACEHOLDER: &str = "Not Found";

/// The authenticated identity supplied by the session provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// A brand name resolved against the terminology service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConcept {
    pub rxcui: String,
    pub generic_name: String,
}

/// The medicine shown to the user after a successful search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicineResult {
    pub id: String,
    pub brand_name: String,
    pub generic_name: String,
    pub purchase_link: String,
}

/// A row of the locally stored medicine catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMedicine {
    pub id: Uuid,
    pub brand_name: String,
    pub generic_name: String,
    pub buying_link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSearchHistoryEntry {
    pub user_id: Uuid,
    pub brand_name: String,
}

/// An append-only record of a past search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub brand_name: String,
    pub searched_at: DateTime<Utc>,
}

/// The per-user profile record. `id` equals the session identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub photo_url: String,
    pub age: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// The all-default record rendered when no profile row exists yet.
    pub fn blank(user_id: Uuid) -> Self {
        Self {
            id: user_id,
            name: String::new(),
            photo_url: String::new(),
            age: 0,
            created_at: None,
            updated_at: None,
        }
    }
}

/// The mutable profile fields written by a save, plus the refreshed timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: String,
    pub photo_url: String,
    pub age: i32,
    pub updated_at: DateTime<Utc>,
}
