//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the search and profile endpoints and the master
//! definition for the OpenAPI document.

use crate::web::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::web::state::AppState;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use medimate_core::domain::{MedicineResult, UserSession};
use medimate_core::profile::{NoticeKind, ProfileView};
use medimate_core::search::{EmptyReason, SearchOutcome, SearchState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        search_handler,
        current_search_handler,
        get_profile_handler,
        update_profile_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            AuthResponse,
            SearchRequest,
            SearchResponse,
            SearchStatus,
            MedicineResponse,
            ProfileResponse,
            ProfileUpdateRequest,
        )
    ),
    tags(
        (name = "Medimate API", description = "Medicine lookup and user profile endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SearchRequest {
    pub term: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Idle,
    Searching,
    Resolved,
    Empty,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MedicineResponse {
    pub id: String,
    pub brand_name: String,
    pub generic_name: String,
    pub purchase_link: String,
}

impl From<&MedicineResult> for MedicineResponse {
    fn from(medicine: &MedicineResult) -> Self {
        Self {
            id: medicine.id.clone(),
            brand_name: medicine.brand_name.clone(),
            generic_name: medicine.generic_name.clone(),
            purchase_link: medicine.purchase_link.clone(),
        }
    }
}

/// A snapshot of the caller's search state.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub status: SearchStatus,
    pub term: Option<String>,
    pub medicine: Option<MedicineResponse>,
    /// Set only when `status` is `empty`: `no_match` or `lookup_failed`.
    pub reason: Option<String>,
}

impl From<&SearchState> for SearchResponse {
    fn from(state: &SearchState) -> Self {
        match state {
            SearchState::Idle => Self {
                status: SearchStatus::Idle,
                term: None,
                medicine: None,
                reason: None,
            },
            SearchState::Searching { term, .. } => Self {
                status: SearchStatus::Searching,
                term: Some(term.clone()),
                medicine: None,
                reason: None,
            },
            SearchState::Resolved { medicine, .. } => Self {
                status: SearchStatus::Resolved,
                term: Some(medicine.brand_name.clone()),
                medicine: Some(medicine.into()),
                reason: None,
            },
            SearchState::Empty { term, reason, .. } => Self {
                status: SearchStatus::Empty,
                term: Some(term.clone()),
                medicine: None,
                reason: Some(
                    match reason {
                        EmptyReason::NoMatch => "no_match",
                        EmptyReason::LookupFailed => "lookup_failed",
                    }
                    .to_string(),
                ),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub photo_url: String,
    pub age: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub loading: bool,
    pub saving: bool,
    pub message: Option<String>,
    /// `saved` or `save_failed` while a notice is showing.
    pub message_kind: Option<String>,
}

impl ProfileResponse {
    fn from_view(view: ProfileView, session: &UserSession) -> Self {
        let (message, message_kind) = match view.notice {
            Some(notice) => {
                let kind = match notice.kind {
                    NoticeKind::Saved => "saved",
                    NoticeKind::SaveFailed => "save_failed",
                };
                (Some(notice.kind.message().to_string()), Some(kind.to_string()))
            }
            None => (None, None),
        };

        Self {
            id: view.profile.id,
            email: session.email.clone(),
            name: view.profile.name,
            photo_url: view.profile.photo_url,
            age: view.profile.age,
            created_at: view.profile.created_at,
            updated_at: view.profile.updated_at,
            loading: view.loading,
            saving: view.saving,
            message,
            message_kind,
        }
    }
}

/// Fields left out of the request keep their current value.
#[derive(Deserialize, ToSchema)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub age: Option<i32>,
}

//=========================================================================================
// Search Handlers
//=========================================================================================

/// Run a medicine search for a brand name.
///
/// A newer search from the same user supersedes this one; the response then
/// carries whatever state the newer search has reached.
#[utoipa::path(
    post,
    path = "/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search state after the lookup", body = SearchResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn search_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Json(req): Json<SearchRequest>,
) -> impl IntoResponse {
    let workspace = app_state.workspace_for(&session).await;

    let state = match workspace.search.search(&req.term).await {
        SearchOutcome::Completed(state) => state,
        outcome => {
            debug!("Search for {:?} ended as {:?}", req.term, outcome);
            workspace.search.state()
        }
    };

    Json(SearchResponse::from(&state))
}

/// Return the caller's current search state.
#[utoipa::path(
    get,
    path = "/search",
    responses(
        (status = 200, description = "Current search state", body = SearchResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn current_search_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> impl IntoResponse {
    let workspace = app_state.workspace_for(&session).await;
    Json(SearchResponse::from(&workspace.search.state()))
}

//=========================================================================================
// Profile Handlers
//=========================================================================================

/// Return the caller's profile, loading it on first use.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile view", body = ProfileResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> impl IntoResponse {
    let workspace = app_state.workspace_for(&session).await;
    if workspace.ensure_profile_loaded().await.is_err() {
        warn!("Serving a blank profile to user {} until a load succeeds", session.user_id);
    }

    Json(ProfileResponse::from_view(workspace.profile.view(), &session))
}

/// Edit and save the caller's profile.
#[utoipa::path(
    put,
    path = "/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile saved", body = ProfileResponse),
        (status = 400, description = "Invalid age"),
        (status = 401, description = "Not signed in"),
        (status = 503, description = "Stored profile could not be loaded; nothing was saved"),
        (status = 500, description = "Save failed; the body carries the failure notice", body = ProfileResponse)
    )
)]
pub async fn update_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.age.is_some_and(|age| age < 0) {
        return Err((StatusCode::BAD_REQUEST, "Age cannot be negative".to_string()));
    }

    let workspace = app_state.workspace_for(&session).await;
    // Edits apply on top of the stored row; without it, omitted fields would be blanked.
    workspace.ensure_profile_loaded().await.map_err(|e| {
        error!("Not saving profile for user {}: load failed: {:?}", session.user_id, e);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Profile could not be loaded; nothing was saved".to_string(),
        )
    })?;

    workspace.profile.edit(|profile| {
        if let Some(name) = req.name {
            profile.name = name;
        }
        if let Some(photo_url) = req.photo_url {
            profile.photo_url = photo_url;
        }
        if let Some(age) = req.age {
            profile.age = age;
        }
    });

    let status = match workspace.profile.save().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    Ok((
        status,
        Json(ProfileResponse::from_view(workspace.profile.view(), &session)),
    ))
}
