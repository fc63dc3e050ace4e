pub mod domain;
pub mod history;
pub mod lookup;
pub mod ports;
pub mod profile;
pub mod search;

#[cfg(test)]
mod testing;

pub use domain::{
    CatalogMedicine, MedicineResult, NewSearchHistoryEntry, ProfileChanges, ResolvedConcept,
    SearchHistoryEntry, UserCredentials, UserProfile, UserSession, GENERIC_NAME_PLACEHOLDER,
};
pub use history::HistoryRecorder;
pub use lookup::{PurchaseLinkPolicy, PurchaseLinkSource, Resolution};
pub use ports::{
    AccountService, CatalogService, HistoryService, PortError, PortResult, ProfileService,
    TerminologyService,
};
pub use profile::{Notice, NoticeKind, ProfileEditor, ProfileView};
pub use search::{EmptyReason, SearchOrchestrator, SearchOutcome, SearchState};
