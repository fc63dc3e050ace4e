//! crates/medimate_core/src/search.rs
//!
//! The search state machine and the orchestrator that drives it.
//!
//! A search moves `Idle -> Searching -> {Resolved, Empty}` and may be
//! re-triggered from any state. Every trigger takes the next request token;
//! completions carrying an older token are discarded, and the request they
//! belong to is cancelled as soon as a newer trigger arrives.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{MedicineResult, UserSession};
use crate::history::HistoryRecorder;
use crate::lookup::{self, PurchaseLinkPolicy, Resolution};
use crate::ports::{CatalogService, HistoryService, PortResult, TerminologyService};

//=========================================================================================
// State Machine
//=========================================================================================

/// Why a search finished without a medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The terminology service has no identifier for the term.
    NoMatch,
    /// A network or parse error interrupted the lookup.
    LookupFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchState {
    #[default]
    Idle,
    Searching {
        token: u64,
        term: String,
    },
    Resolved {
        token: u64,
        medicine: MedicineResult,
    },
    Empty {
        token: u64,
        term: String,
        reason: EmptyReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    Started { token: u64, term: String },
    Resolved { token: u64, medicine: MedicineResult },
    NotFound { token: u64 },
    Failed { token: u64 },
    Cancelled { token: u64 },
}

impl SearchEvent {
    pub fn token(&self) -> u64 {
        match self {
            SearchEvent::Started { token, .. }
            | SearchEvent::Resolved { token, .. }
            | SearchEvent::NotFound { token }
            | SearchEvent::Failed { token }
            | SearchEvent::Cancelled { token } => *token,
        }
    }
}

impl SearchState {
    /// Returns the state that follows `event`, or `None` when the event is stale.
    ///
    /// A start always applies. Any other event applies only while a search with
    /// the same token is in progress.
    pub fn apply(&self, event: SearchEvent) -> Option<SearchState> {
        if let SearchEvent::Started { token, term } = event {
            return Some(SearchState::Searching { token, term });
        }

        let SearchState::Searching {
            token: current,
            term,
        } = self
        else {
            return None;
        };
        if event.token() != *current {
            return None;
        }

        let next = match event {
            SearchEvent::Resolved { token, medicine } => SearchState::Resolved { token, medicine },
            SearchEvent::NotFound { token } => SearchState::Empty {
                token,
                term: term.clone(),
                reason: EmptyReason::NoMatch,
            },
            SearchEvent::Failed { token } => SearchState::Empty {
                token,
                term: term.clone(),
                reason: EmptyReason::LookupFailed,
            },
            SearchEvent::Cancelled { .. } => SearchState::Idle,
            SearchEvent::Started { token, term } => SearchState::Searching { token, term },
        };
        Some(next)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SearchState::Searching { .. })
    }

    pub fn medicine(&self) -> Option<&MedicineResult> {
        match self {
            SearchState::Resolved { medicine, .. } => Some(medicine),
            _ => None,
        }
    }
}

//=========================================================================================
// Orchestrator
//=========================================================================================

/// What a single call to [`SearchOrchestrator::search`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank term; nothing ran and the state is unchanged.
    Skipped,
    /// A newer trigger or a cancellation took over before this one finished.
    Superseded,
    /// This trigger's result was applied.
    Completed(SearchState),
}

struct InFlight {
    token: u64,
    cancel: CancellationToken,
}

pub struct SearchOrchestrator {
    terminology: Arc<dyn TerminologyService>,
    catalog: Arc<dyn CatalogService>,
    history: HistoryRecorder,
    session: Option<UserSession>,
    links: PurchaseLinkPolicy,
    state: watch::Sender<SearchState>,
    in_flight: Mutex<InFlight>,
}

impl SearchOrchestrator {
    pub fn new(
        terminology: Arc<dyn TerminologyService>,
        catalog: Arc<dyn CatalogService>,
        history: Arc<dyn HistoryService>,
        session: Option<UserSession>,
        links: PurchaseLinkPolicy,
    ) -> Self {
        let (state, _) = watch::channel(SearchState::Idle);
        Self {
            terminology,
            catalog,
            history: HistoryRecorder::new(history),
            session,
            links,
            state,
            in_flight: Mutex::new(InFlight {
                token: 0,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn session(&self) -> Option<&UserSession> {
        self.session.as_ref()
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    /// Runs one search for `term`.
    ///
    /// The term is passed to the lookups and recorded in history exactly as given.
    pub async fn search(&self, term: &str) -> SearchOutcome {
        if term.trim().is_empty() {
            debug!("Ignoring blank search term");
            return SearchOutcome::Skipped;
        }

        let (token, cancel) = self.begin(term).await;
        info!(token, "Searching for {:?}", term);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(token, "Search cancelled before completion");
                return SearchOutcome::Superseded;
            }
            result = self.fetch_medicine(term) => result,
        };

        let event = match result {
            Ok(Some(medicine)) => SearchEvent::Resolved { token, medicine },
            Ok(None) => SearchEvent::NotFound { token },
            Err(e) => {
                warn!(token, "Lookup failed for {:?}: {:?}", term, e);
                SearchEvent::Failed { token }
            }
        };
        let resolved = matches!(event, SearchEvent::Resolved { .. });

        if !self.transition(event) {
            debug!(token, "Discarding stale search result");
            return SearchOutcome::Superseded;
        }

        if resolved {
            match &self.session {
                Some(session) => self.history.record(session, term),
                None => debug!(token, "No session, search history not recorded"),
            }
        }

        SearchOutcome::Completed(self.state())
    }

    /// Aborts the in-flight search, if any, and returns to `Idle`.
    pub async fn cancel(&self) {
        let in_flight = self.in_flight.lock().await;
        in_flight.cancel.cancel();
        if self.transition(SearchEvent::Cancelled {
            token: in_flight.token,
        }) {
            debug!(token = in_flight.token, "Search cancelled");
        }
    }

    async fn begin(&self, term: &str) -> (u64, CancellationToken) {
        let mut in_flight = self.in_flight.lock().await;
        in_flight.cancel.cancel();

        in_flight.token += 1;
        in_flight.cancel = CancellationToken::new();
        self.transition(SearchEvent::Started {
            token: in_flight.token,
            term: term.to_string(),
        });

        (in_flight.token, in_flight.cancel.clone())
    }

    fn transition(&self, event: SearchEvent) -> bool {
        self.state.send_if_modified(|state| match state.apply(event) {
            Some(next) => {
                *state = next;
                true
            }
            None => false,
        })
    }

    async fn fetch_medicine(&self, term: &str) -> PortResult<Option<MedicineResult>> {
        let concept = match lookup::resolve(self.terminology.as_ref(), term).await? {
            Resolution::Found(concept) => concept,
            Resolution::NotFound => return Ok(None),
        };

        let catalog_entry = match self.catalog.find_by_brand_name(term).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Catalog lookup failed for {:?}: {:?}", term, e);
                None
            }
        };
        let purchase_link = self
            .links
            .link_for(&concept.generic_name, catalog_entry.as_ref());

        Ok(Some(MedicineResult {
            id: concept.rxcui,
            brand_name: term.to_string(),
            generic_name: concept.generic_name,
            purchase_link,
        }))
    }
}
