use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::error::SyncError;

const SAH_BASE_URL: &str = "https://www.ebi.ac.uk/ena/sah/api";

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct CollectionListing {
    institutions: Vec<InstitutionEntry>,
}

#[derive(Debug, Deserialize)]
struct InstitutionEntry {
    #[serde(default)]
    collections: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    #[serde(rename = "collectionCode", default)]
    collection_code: String,
}

/// Specimen-attribute-hub lookups: triplet well-formedness and the collection
/// codes registered for an institution.
pub trait SahClient: Send + Sync {
    fn validate_triplet(&self, value: &str) -> Result<bool, SyncError>;

    fn collection_codes(&self, institution_code: &str) -> Result<Vec<String>, SyncError>;
}

#[derive(Clone)]
pub struct SahHttpClient {
    client: Client,
    base_url: String,
}

impl SahHttpClient {
    pub fn new() -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("bio-sync-link/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::SahHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SyncError::SahHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: SAH_BASE_URL.to_string(),
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SyncError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .map_err(|err| SyncError::SahHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "ENA SAH request failed".to_string());
            return Err(SyncError::SahStatus { status, message });
        }
        response
            .json()
            .map_err(|err| SyncError::SahDecode(err.to_string()))
    }
}

impl SahClient for SahHttpClient {
    fn validate_triplet(&self, value: &str) -> Result<bool, SyncError> {
        let url = format!("{}/validate", self.base_url);
        let response: ValidationResponse =
            self.get_json(&url, &[("value", value), ("qualifier_type", "specimen_voucher")])?;
        Ok(response.success)
    }

    fn collection_codes(&self, institution_code: &str) -> Result<Vec<String>, SyncError> {
        // the endpoint returns exactly one institution entry for a unique code
        let url = format!("{}/institution/{}/collection", self.base_url, institution_code);
        let listing: CollectionListing = self.get_json(&url, &[])?;
        let Some(entry) = listing.institutions.first() else {
            return Err(SyncError::SahDecode(format!(
                "no institutions entry for {institution_code}"
            )));
        };
        Ok(entry
            .collections
            .iter()
            .map(|collection| collection.collection_code.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_listing_decodes() {
        let body = r#"{"institutions":[{"collections":[{"collectionCode":"Mamm"},{"collectionCode":"Aves"}]}]}"#;
        let listing: CollectionListing = serde_json::from_str(body).unwrap();
        let codes: Vec<_> = listing.institutions[0]
            .collections
            .iter()
            .map(|c| c.collection_code.as_str())
            .collect();
        assert_eq!(codes, vec!["Mamm", "Aves"]);
    }

    #[test]
    fn validation_response_defaults_false() {
        let response: ValidationResponse = serde_json::from_str("{}").unwrap();
        assert!(!response.success);
    }
}
