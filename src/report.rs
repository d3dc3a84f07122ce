use std::fs::File;
use std::path::Path;
use std::sync::mpsc::{Receiver, SyncSender};

use serde::Serialize;
use tracing::warn;

use crate::domain::{MatchCandidate, SourceRecord};
use crate::error::SyncError;

const MATCH_HEADER: [&str; 18] = [
    "source",
    "tax_match",
    "ggbn_unitid",
    "ena_hit_on",
    "ggbn_scientific_name",
    "ena_scientific_name",
    "ggbn_country",
    "ena_country",
    "ggbn_collection_date",
    "ena_collection_date",
    "ggbn_collector",
    "ena_collector",
    "ena_id",
    "ena_api",
    "ggbn_type",
    "ggbn_guid",
    "ggbn_short_id",
    "ggbn_full_id",
];

const UNMATCHED_HEADER: [&str; 8] = [
    "accession_number",
    "ggbn_guid",
    "ggbn_unitid",
    "ggbn_scientific_name",
    "ggbn_country",
    "ggbn_collection_date",
    "ggbn_collector",
    "ggbn_full_id",
];

const ANNOTATION_HEADER: [&str; 3] = ["voucher_id", "suggested_triplet", "note"];

/// One accepted verdict, flattened for the matches file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRow {
    pub source: String,
    pub tax_match: bool,
    pub ggbn_unitid: String,
    pub ena_hit_on: String,
    pub ggbn_scientific_name: String,
    pub ena_scientific_name: String,
    pub ggbn_country: String,
    pub ena_country: String,
    pub ggbn_collection_date: String,
    pub ena_collection_date: String,
    pub ggbn_collector: String,
    pub ena_collector: String,
    pub ena_id: String,
    pub ena_api: String,
    pub ggbn_type: String,
    pub ggbn_guid: String,
    pub ggbn_short_id: String,
    pub ggbn_full_id: String,
}

impl MatchRow {
    pub fn new(record: &SourceRecord, candidate: &MatchCandidate, tax_match: bool) -> Self {
        Self {
            source: candidate.source.to_string(),
            tax_match,
            ggbn_unitid: record.unit_id.clone(),
            ena_hit_on: candidate.hit_on().to_string(),
            ggbn_scientific_name: record.scientific_name.clone(),
            ena_scientific_name: candidate.hit.scientific_name.clone(),
            ggbn_country: record.country.clone(),
            ena_country: candidate.hit.country.clone(),
            ggbn_collection_date: record.collection_date.clone(),
            ena_collection_date: candidate.hit.collection_date.clone(),
            ggbn_collector: record.collector.clone(),
            ena_collector: candidate.hit.collected_by.clone(),
            ena_id: candidate.hit.accession.clone(),
            ena_api: candidate.api.to_string(),
            ggbn_type: record.record_type.clone(),
            ggbn_guid: record.guid.clone(),
            ggbn_short_id: record.short_id.clone(),
            ggbn_full_id: record.full_id.clone(),
        }
    }
}

/// One accession lookup that came back empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedAccessionRow {
    pub accession_number: String,
    pub ggbn_guid: String,
    pub ggbn_unitid: String,
    pub ggbn_scientific_name: String,
    pub ggbn_country: String,
    pub ggbn_collection_date: String,
    pub ggbn_collector: String,
    pub ggbn_full_id: String,
}

impl UnmatchedAccessionRow {
    pub fn new(record: &SourceRecord, accession: &str) -> Self {
        Self {
            accession_number: accession.to_string(),
            ggbn_guid: record.guid.clone(),
            ggbn_unitid: record.unit_id.clone(),
            ggbn_scientific_name: record.scientific_name.clone(),
            ggbn_country: record.country.clone(),
            ggbn_collection_date: record.collection_date.clone(),
            ggbn_collector: record.collector.clone(),
            ggbn_full_id: record.full_id.clone(),
        }
    }
}

/// One curation suggestion (or diagnostic) from the triplet workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRow {
    pub voucher_id: String,
    pub suggested_triplet: String,
    pub note: String,
}

/// Where workers hand off output rows. Implementations must be cheap: the
/// writer owns the files, sinks only relay.
pub trait ReportSink {
    fn match_row(&self, record: &SourceRecord, candidate: &MatchCandidate, tax_match: bool);

    fn unmatched_accession(&self, record: &SourceRecord, accession: &str);

    fn annotation(&self, row: AnnotationRow);
}

#[derive(Debug, Clone)]
pub enum ReportEvent {
    Match(MatchRow),
    UnmatchedAccession(UnmatchedAccessionRow),
    Annotation(AnnotationRow),
}

/// Channel-backed sink held by each worker. Send failures mean the writer is
/// gone; the row is dropped with a warning rather than crashing the worker.
#[derive(Clone)]
pub struct ChannelSink {
    sender: SyncSender<ReportEvent>,
}

impl ChannelSink {
    pub fn new(sender: SyncSender<ReportEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: ReportEvent) {
        if self.sender.send(event).is_err() {
            warn!("result writer is gone, dropping report event");
        }
    }
}

impl ReportSink for ChannelSink {
    fn match_row(&self, record: &SourceRecord, candidate: &MatchCandidate, tax_match: bool) {
        self.send(ReportEvent::Match(MatchRow::new(record, candidate, tax_match)));
    }

    fn unmatched_accession(&self, record: &SourceRecord, accession: &str) {
        self.send(ReportEvent::UnmatchedAccession(UnmatchedAccessionRow::new(
            record, accession,
        )));
    }

    fn annotation(&self, row: AnnotationRow) {
        self.send(ReportEvent::Annotation(row));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteTotals {
    pub matches: usize,
    pub unmatched_accessions: usize,
    pub annotations: usize,
}

/// Single owner of the output files; one writer thread drains the report
/// channel.
pub struct ResultWriter {
    matches: csv::Writer<File>,
    unmatched: Option<csv::Writer<File>>,
    annotations: Option<csv::Writer<File>>,
}

impl ResultWriter {
    /// Creates the output files and writes their headers eagerly so that a
    /// run with zero rows still leaves well-formed files behind.
    pub fn create(
        matches_path: &Path,
        unmatched_path: Option<&Path>,
        annotations_path: Option<&Path>,
    ) -> Result<Self, SyncError> {
        let matches = Self::open_with_header(matches_path, &MATCH_HEADER)?;
        let unmatched = unmatched_path
            .map(|path| Self::open_with_header(path, &UNMATCHED_HEADER))
            .transpose()?;
        let annotations = annotations_path
            .map(|path| Self::open_with_header(path, &ANNOTATION_HEADER))
            .transpose()?;
        Ok(Self {
            matches,
            unmatched,
            annotations,
        })
    }

    fn open_with_header(path: &Path, header: &[&str]) -> Result<csv::Writer<File>, SyncError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|err| SyncError::OutputWrite(err.to_string()))?;
        writer
            .write_record(header)
            .map_err(|err| SyncError::OutputWrite(err.to_string()))?;
        Ok(writer)
    }

    /// Drains report events until every sender is dropped, then flushes.
    pub fn drain(mut self, receiver: Receiver<ReportEvent>) -> Result<WriteTotals, SyncError> {
        let mut totals = WriteTotals::default();
        for event in receiver {
            match event {
                ReportEvent::Match(row) => {
                    Self::serialize(&mut self.matches, &row)?;
                    totals.matches += 1;
                }
                ReportEvent::UnmatchedAccession(row) => {
                    let Some(writer) = self.unmatched.as_mut() else {
                        warn!(accession = %row.accession_number, "no unmatched-accession file configured, dropping row");
                        continue;
                    };
                    Self::serialize(writer, &row)?;
                    totals.unmatched_accessions += 1;
                }
                ReportEvent::Annotation(row) => {
                    let Some(writer) = self.annotations.as_mut() else {
                        warn!(voucher = %row.voucher_id, "no annotation file configured, dropping row");
                        continue;
                    };
                    Self::serialize(writer, &row)?;
                    totals.annotations += 1;
                }
            }
        }
        self.matches
            .flush()
            .map_err(|err| SyncError::OutputWrite(err.to_string()))?;
        for writer in [self.unmatched.as_mut(), self.annotations.as_mut()].into_iter().flatten() {
            writer
                .flush()
                .map_err(|err| SyncError::OutputWrite(err.to_string()))?;
        }
        Ok(totals)
    }

    fn serialize<T: Serialize>(writer: &mut csv::Writer<File>, row: &T) -> Result<(), SyncError> {
        writer
            .serialize(row)
            .map_err(|err| SyncError::OutputWrite(err.to_string()))
    }
}
