//! crates/medimate_core/src/lookup.rs
//!
//! Brand-to-generic resolution over the `TerminologyService` port, and the
//! derivation of the purchase link shown next to a resolved medicine.

use std::str::FromStr;

use tracing::debug;

use crate::domain::{CatalogMedicine, ResolvedConcept, GENERIC_NAME_PLACEHOLDER};
use crate::ports::{PortResult, TerminologyService};

/// Default catalog-search URL; the URL-encoded generic name is appended to it.
pub const DEFAULT_PURCHASE_SEARCH_URL: &str = "https://www.1mg.com/search/all?name=";

/// Outcome of a terminology resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedConcept),
    /// The service knows no identifier for the name.
    NotFound,
}

/// Resolves a brand name to its identifier and generic name.
///
/// A missing identifier ends the resolution with [`Resolution::NotFound`]. A
/// missing related concept still resolves, with the generic name set to
/// [`GENERIC_NAME_PLACEHOLDER`]. Any port error at either step is returned as is.
pub async fn resolve(
    terminology: &dyn TerminologyService,
    brand_name: &str,
) -> PortResult<Resolution> {
    let rxcuis = terminology.find_rxcuis(brand_name).await?;
    let rxcui = match rxcuis.into_iter().next() {
        Some(id) if !id.is_empty() => id,
        _ => {
            debug!("No identifier found for {:?}", brand_name);
            return Ok(Resolution::NotFound);
        }
    };

    let related = terminology.find_trade_name_of(&rxcui).await?;
    let generic_name = match related.into_iter().next() {
        Some(name) if !name.is_empty() => name,
        _ => GENERIC_NAME_PLACEHOLDER.to_string(),
    };

    Ok(Resolution::Found(ResolvedConcept {
        rxcui,
        generic_name,
    }))
}

//=========================================================================================
// Purchase Links
//=========================================================================================

/// Where the displayed purchase link comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PurchaseLinkSource {
    /// Always the derived catalog-search URL; the local catalog is consulted but unused.
    #[default]
    Derived,
    /// The local catalog's buying link when one matched, otherwise the derived URL.
    CatalogFirst,
}

impl FromStr for PurchaseLinkSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "derived" => Ok(Self::Derived),
            "catalog" | "catalog_first" => Ok(Self::CatalogFirst),
            other => Err(format!("'{}' is not a purchase link source", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseLinkPolicy {
    pub search_url_prefix: String,
    pub source: PurchaseLinkSource,
}

impl Default for PurchaseLinkPolicy {
    fn default() -> Self {
        Self {
            search_url_prefix: DEFAULT_PURCHASE_SEARCH_URL.to_string(),
            source: PurchaseLinkSource::Derived,
        }
    }
}

impl PurchaseLinkPolicy {
    /// Builds the search URL for `generic_name`.
    pub fn derived_link(&self, generic_name: &str) -> String {
        format!("{}{}", self.search_url_prefix, encode_component(generic_name))
    }

    pub fn link_for(&self, generic_name: &str, catalog: Option<&CatalogMedicine>) -> String {
        if self.source == PurchaseLinkSource::CatalogFirst {
            if let Some(entry) = catalog.filter(|entry| !entry.buying_link.is_empty()) {
                return entry.buying_link.clone();
            }
        }
        self.derived_link(generic_name)
    }
}

// `urlencoding` escapes everything outside `A-Za-z0-9-_.~`; URI components also
// leave `!'()*` as-is. A literal `%` is always escaped to `%25` first, so these
// sequences can only come from the marks themselves.
const COMPONENT_MARKS: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encodes a URI component with the same unreserved set browsers use.
pub fn encode_component(value: &str) -> String {
    COMPONENT_MARKS
        .iter()
        .fold(urlencoding::encode(value).into_owned(), |encoded, &(escaped, mark)| {
            encoded.replace(escaped, mark)
        })
}
