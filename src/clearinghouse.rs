use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;

use crate::error::SyncError;

const CURATION_ENDPOINT: &str = "https://www.ebi.ac.uk/ena/clearinghouse/api/curations";

/// Curation record asserting that a bare ENA voucher should carry a
/// collection triplet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurationRequest {
    #[serde(rename = "recordType")]
    pub record_type: String,
    pub record_id: String,
    #[serde(rename = "attributePost")]
    pub attribute_post: String,
    #[serde(rename = "valuePost")]
    pub value_post: String,
    #[serde(rename = "assertionMethod")]
    pub assertion_method: String,
    #[serde(rename = "assertionEvidence")]
    pub assertion_evidence: Vec<AssertionEvidence>,
    #[serde(rename = "providerSource")]
    pub provider_source: String,
    #[serde(rename = "providerName")]
    pub provider_name: String,
    #[serde(rename = "assertionAdditionalInfo")]
    pub assertion_additional_info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionEvidence {
    pub label: String,
}

impl CurationRequest {
    pub fn for_triplet(voucher_id: &str, triplet: &str) -> Self {
        Self {
            record_type: "sequence".to_string(),
            record_id: voucher_id.to_string(),
            attribute_post: voucher_id.to_string(),
            value_post: triplet.to_string(),
            assertion_method: "automaticAssertion".to_string(),
            assertion_evidence: vec![AssertionEvidence {
                label: "inference based on the construction of a DWC triplet".to_string(),
            }],
            provider_source: "https://github.com/EBI-COMMUNITY/bio-sync-link".to_string(),
            provider_name: "BioSyncLink".to_string(),
            assertion_additional_info:
                "This assertion was made by the Bio-Sync-Link project, Elixir Biohackathon 2023"
                    .to_string(),
        }
    }
}

pub trait ClearinghouseClient: Send + Sync {
    fn submit(&self, request: &CurationRequest) -> Result<(), SyncError>;
}

#[derive(Clone)]
pub struct ClearinghouseHttpClient {
    client: Client,
    endpoint: String,
}

impl ClearinghouseHttpClient {
    pub fn new() -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("bio-sync-link/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::CurationHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SyncError::CurationHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: CURATION_ENDPOINT.to_string(),
        })
    }
}

impl ClearinghouseClient for ClearinghouseHttpClient {
    fn submit(&self, request: &CurationRequest) -> Result<(), SyncError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|err| SyncError::CurationHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "clearinghouse request failed".to_string());
            return Err(SyncError::CurationStatus { status, message });
        }
        Ok(())
    }
}
