//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! account, catalog, history and profile ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medimate_core::domain::{
    CatalogMedicine, NewSearchHistoryEntry, ProfileChanges, SearchHistoryEntry, UserCredentials,
    UserProfile, UserSession,
};
use medimate_core::ports::{
    AccountService, CatalogService, HistoryService, PortError, PortResult, ProfileService,
};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the persistence ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionUserRecord {
    user_id: Uuid,
    email: String,
}
impl SessionUserRecord {
    fn to_domain(self) -> UserSession {
        UserSession {
            user_id: self.user_id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct MedicineRecord {
    id: Uuid,
    brand_name: String,
    generic_name: String,
    buying_link: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl MedicineRecord {
    fn to_domain(self) -> CatalogMedicine {
        CatalogMedicine {
            id: self.id,
            brand_name: self.brand_name,
            generic_name: self.generic_name,
            buying_link: self.buying_link,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SearchHistoryRecord {
    id: Uuid,
    user_id: Uuid,
    brand_name: String,
    searched_at: DateTime<Utc>,
}
impl SearchHistoryRecord {
    fn to_domain(self) -> SearchHistoryEntry {
        SearchHistoryEntry {
            id: self.id,
            user_id: self.user_id,
            brand_name: self.brand_name,
            searched_at: self.searched_at,
        }
    }
}

#[derive(FromRow)]
struct UserProfileRecord {
    id: Uuid,
    name: String,
    photo_url: String,
    age: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserProfileRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name,
            photo_url: self.photo_url,
            age: self.age,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }
}

//=========================================================================================
// `AccountService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<UserSession> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, SessionUserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) RETURNING user_id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        // Every account starts with a blank profile keyed by the same identity.
        sqlx::query("INSERT INTO user_profiles (id) VALUES ($1)")
            .bind(record.user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserSession> {
        let record = sqlx::query_as::<_, SessionUserRecord>(
            "SELECT u.user_id, u.email FROM auth_sessions s \
             JOIN users u ON u.user_id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `CatalogService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogService for DbAdapter {
    async fn find_by_brand_name(&self, brand_name: &str) -> PortResult<Option<CatalogMedicine>> {
        // Two rows are enough to tell a unique match from an ambiguous one.
        let mut records = sqlx::query_as::<_, MedicineRecord>(
            "SELECT id, brand_name, generic_name, buying_link, created_at, updated_at \
             FROM medicines WHERE brand_name ILIKE '%' || $1 || '%' LIMIT 2",
        )
        .bind(brand_name)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        if records.len() > 1 {
            debug!("Catalog match for {:?} is ambiguous", brand_name);
            return Ok(None);
        }
        Ok(records.pop().map(MedicineRecord::to_domain))
    }
}

//=========================================================================================
// `HistoryService` Trait Implementation
//=========================================================================================

#[async_trait]
impl HistoryService for DbAdapter {
    async fn record_search(&self, entry: NewSearchHistoryEntry) -> PortResult<SearchHistoryEntry> {
        let record = sqlx::query_as::<_, SearchHistoryRecord>(
            "INSERT INTO search_history (user_id, brand_name) VALUES ($1, $2) \
             RETURNING id, user_id, brand_name, searched_at",
        )
        .bind(entry.user_id)
        .bind(&entry.brand_name)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }
}

//=========================================================================================
// `ProfileService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProfileService for DbAdapter {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>> {
        let record = sqlx::query_as::<_, UserProfileRecord>(
            "SELECT id, name, photo_url, age, created_at, updated_at FROM user_profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserProfileRecord::to_domain))
    }

    async fn update_profile(&self, user_id: Uuid, changes: &ProfileChanges) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE user_profiles SET name = $1, photo_url = $2, age = $3, updated_at = $4 WHERE id = $5",
        )
        .bind(&changes.name)
        .bind(&changes.photo_url)
        .bind(changes.age)
        .bind(changes.updated_at)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        expect_updated(result.rows_affected(), user_id)
    }
}

/// An update that touched no row means the profile does not exist.
fn expect_updated(rows_affected: u64, user_id: Uuid) -> PortResult<()> {
    if rows_affected == 0 {
        return Err(PortError::NotFound(format!("No profile for user {}", user_id)));
    }
    Ok(())
}
