use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::domain::EndpointKind;
use crate::error::SyncError;

const PORTAL_BASE_URL: &str = "https://www.ebi.ac.uk/ena/portal/api";
const RESULT_LIMIT: &str = "10";

/// The search fields a voucher-style identifier may have been recorded under.
const VOUCHER_FIELDS: [&str; 4] = [
    "specimen_voucher",
    "bio_material",
    "culture_collection",
    "isolation_source",
];

/// One hit from the portal search API. Keys the remote omits decode to empty
/// strings; a body that is not a list of objects is a decode error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnaRecord {
    pub specimen_voucher: String,
    pub bio_material: String,
    pub culture_collection: String,
    pub isolation_source: String,
    pub scientific_name: String,
    pub country: String,
    pub collection_date: String,
    pub collected_by: String,
    pub accession: String,
}

pub trait EnaClient: Send + Sync {
    fn search_by_accession(
        &self,
        kind: EndpointKind,
        accessions: &[String],
    ) -> Result<Vec<EnaRecord>, SyncError>;

    fn search_by_unit_id(
        &self,
        kind: EndpointKind,
        cleaned_unit_id: &str,
    ) -> Result<Vec<EnaRecord>, SyncError>;

    fn search_by_triplet(
        &self,
        kind: EndpointKind,
        colon_form: &str,
        space_form: &str,
    ) -> Result<Vec<EnaRecord>, SyncError>;
}

#[derive(Clone)]
pub struct EnaHttpClient {
    client: Client,
    base_url: String,
}

impl EnaHttpClient {
    pub fn new() -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("bio-sync-link/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::EnaHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SyncError::EnaHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: PORTAL_BASE_URL.to_string(),
        })
    }

    fn search(&self, kind: EndpointKind, query: &str) -> Result<Vec<EnaRecord>, SyncError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("result", kind.as_str()),
                ("fields", "all"),
                ("limit", RESULT_LIMIT),
                ("format", "json"),
                ("query", query),
            ])
            .send()
            .map_err(|err| SyncError::EnaHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "ENA portal request failed".to_string());
            return Err(SyncError::EnaStatus { status, message });
        }

        let body = response
            .text()
            .map_err(|err| SyncError::EnaHttp(err.to_string()))?;
        // the portal answers an empty body, not an empty array, when nothing matched
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&body).map_err(|err| SyncError::EnaDecode(err.to_string()))
    }
}

impl EnaClient for EnaHttpClient {
    fn search_by_accession(
        &self,
        kind: EndpointKind,
        accessions: &[String],
    ) -> Result<Vec<EnaRecord>, SyncError> {
        self.search(kind, &accession_query(accessions))
    }

    fn search_by_unit_id(
        &self,
        kind: EndpointKind,
        cleaned_unit_id: &str,
    ) -> Result<Vec<EnaRecord>, SyncError> {
        self.search(kind, &voucher_query(cleaned_unit_id))
    }

    fn search_by_triplet(
        &self,
        kind: EndpointKind,
        colon_form: &str,
        space_form: &str,
    ) -> Result<Vec<EnaRecord>, SyncError> {
        self.search(kind, &triplet_query(colon_form, space_form))
    }
}

fn accession_query(accessions: &[String]) -> String {
    accessions
        .iter()
        .map(|accession| format!(r#"accession="{}""#, accession.trim()))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn voucher_query(value: &str) -> String {
    VOUCHER_FIELDS
        .iter()
        .map(|field| format!(r#"{field}="{value}""#))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn triplet_query(colon_form: &str, space_form: &str) -> String {
    format!("{} OR {}", voucher_query(colon_form), voucher_query(space_form))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accession_query_joins_and_trims() {
        let accessions = vec!["AB1 ".to_string(), "CD2".to_string()];
        assert_eq!(
            accession_query(&accessions),
            r#"accession="AB1" OR accession="CD2""#
        );
    }

    #[test]
    fn voucher_query_covers_all_fields() {
        let query = voucher_query("X9");
        assert_eq!(
            query,
            r#"specimen_voucher="X9" OR bio_material="X9" OR culture_collection="X9" OR isolation_source="X9""#
        );
    }

    #[test]
    fn triplet_query_is_eight_clauses() {
        let query = triplet_query("A:B:C", "A B C");
        assert_eq!(query.matches(" OR ").count(), 7);
        assert!(query.contains(r#"specimen_voucher="A:B:C""#));
        assert!(query.contains(r#"isolation_source="A B C""#));
    }

    #[test]
    fn decode_defaults_missing_keys() {
        let body = r#"[{"accession": "LR1", "scientific_name": "Panthera leo"}]"#;
        let records: Vec<EnaRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(records[0].accession, "LR1");
        assert_eq!(records[0].specimen_voucher, "");
    }
}
