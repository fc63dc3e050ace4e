//! services/api/src/adapters/rxnav.rs
//!
//! This module contains the adapter for the NLM RxNav drug terminology REST API.
//! It implements the `TerminologyService` port from the `core` crate.

use async_trait::async_trait;
use medimate_core::ports::{PortError, PortResult, TerminologyService};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TerminologyService` port over HTTP+JSON.
#[derive(Clone)]
pub struct RxNavAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl RxNavAdapter {
    /// Creates a new `RxNavAdapter`. `base_url` is the REST root, e.g.
    /// `https://rxnav.nlm.nih.gov/REST`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> PortResult<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("RxNav request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "RxNav returned status {} for {}",
                status, url
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid RxNav response: {}", e)))
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct RxcuiResponse {
    #[serde(rename = "idGroup")]
    id_group: Option<IdGroup>,
}

#[derive(Deserialize)]
struct IdGroup {
    #[serde(rename = "rxnormId", default)]
    rxnorm_id: Vec<String>,
}

#[derive(Deserialize)]
struct RelatedResponse {
    #[serde(rename = "relatedGroup")]
    related_group: Option<RelatedGroup>,
}

#[derive(Deserialize)]
struct RelatedGroup {
    #[serde(rename = "conceptGroup", default)]
    concept_group: Vec<ConceptGroup>,
}

#[derive(Deserialize)]
struct ConceptGroup {
    #[serde(rename = "conceptProperties", default)]
    concept_properties: Vec<ConceptProperties>,
}

#[derive(Deserialize)]
struct ConceptProperties {
    #[serde(default)]
    name: String,
}

//=========================================================================================
// `TerminologyService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TerminologyService for RxNavAdapter {
    async fn find_rxcuis(&self, name: &str) -> PortResult<Vec<String>> {
        let url = format!("{}/rxcui.json", self.base_url);
        let body: RxcuiResponse = self.get_json(&url, &[("name", name)]).await?;

        let ids = body.id_group.map(|g| g.rxnorm_id).unwrap_or_default();
        debug!("RxNav returned {} identifier(s) for {:?}", ids.len(), name);
        Ok(ids)
    }

    async fn find_trade_name_of(&self, rxcui: &str) -> PortResult<Vec<String>> {
        let url = format!(
            "{}/rxcui/{}/related.json",
            self.base_url,
            urlencoding::encode(rxcui)
        );
        let body: RelatedResponse = self.get_json(&url, &[("rela", "tradename_of")]).await?;

        // Only the first concept group is considered.
        let names = body
            .related_group
            .and_then(|g| g.concept_group.into_iter().next())
            .map(|g| g.concept_properties.into_iter().map(|p| p.name).collect())
            .unwrap_or_default();
        Ok(names)
    }
}
