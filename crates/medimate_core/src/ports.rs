//! crates/medimate_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the terminology API, the database and the session provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    CatalogMedicine, NewSearchHistoryEntry, ProfileChanges, SearchHistoryEntry, UserCredentials,
    UserProfile, UserSession,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait TerminologyService: Send + Sync {
    /// Returns the identifiers the service associates with `name`, best match first.
    async fn find_rxcuis(&self, name: &str) -> PortResult<Vec<String>>;

    /// Returns the names of the concepts related to `rxcui` by "trade name of".
    async fn find_trade_name_of(&self, rxcui: &str) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Case-insensitive partial match on brand name. Ambiguous matches yield `None`.
    async fn find_by_brand_name(&self, brand_name: &str) -> PortResult<Option<CatalogMedicine>>;
}

#[async_trait]
pub trait HistoryService: Send + Sync {
    async fn record_search(&self, entry: NewSearchHistoryEntry) -> PortResult<SearchHistoryEntry>;
}

#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>>;

    async fn update_profile(&self, user_id: Uuid, changes: &ProfileChanges) -> PortResult<()>;
}

#[async_trait]
pub trait AccountService: Send + Sync {
    /// Creates the account together with its blank profile row.
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<UserSession>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live auth session to the signed-in user.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserSession>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
