use std::fmt;
use std::fs::File;
use std::path::Path;

use clap::ValueEnum;

use crate::domain::SourceRecord;
use crate::error::SyncError;

/// Value the dump uses for NULL fields.
pub const NULL_SENTINEL: &str = r"\N";

/// Positional column layout of the GGBN dump. The dump carries no usable
/// header row, so the indices are a schema contract.
#[derive(Debug, Clone, Copy)]
pub struct DumpSchema {
    pub short_id: usize,
    pub full_id: usize,
    pub record_type: usize,
    pub collection_date: usize,
    pub collector: usize,
    pub country: usize,
    pub accessions: usize,
    pub guid: usize,
    pub institution_code: usize,
    pub collection_code: usize,
    pub unit_id: usize,
    pub scientific_name: usize,
}

pub const GGBN_DUMP_SCHEMA: DumpSchema = DumpSchema {
    short_id: 0,
    full_id: 1,
    record_type: 2,
    collection_date: 4,
    collector: 6,
    country: 8,
    accessions: 18,
    guid: 19,
    institution_code: 20,
    collection_code: 21,
    unit_id: 22,
    scientific_name: 23,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DumpDelimiter {
    Tab,
    Semicolon,
}

impl DumpDelimiter {
    pub fn as_byte(&self) -> u8 {
        match self {
            DumpDelimiter::Tab => b'\t',
            DumpDelimiter::Semicolon => b';',
        }
    }
}

impl fmt::Display for DumpDelimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpDelimiter::Tab => write!(f, "tab"),
            DumpDelimiter::Semicolon => write!(f, "semicolon"),
        }
    }
}

#[derive(Debug)]
pub struct DumpReader {
    reader: csv::Reader<File>,
    schema: DumpSchema,
}

impl DumpReader {
    pub fn open(
        path: &Path,
        delimiter: DumpDelimiter,
        schema: DumpSchema,
    ) -> Result<Self, SyncError> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|_| SyncError::DumpOpen(path.to_path_buf()))?;
        Ok(Self { reader, schema })
    }

    /// One `SourceRecord` per dump row. Row-level read errors surface as
    /// `Err` items so the caller can skip and continue.
    pub fn records(&mut self) -> impl Iterator<Item = Result<SourceRecord, SyncError>> + '_ {
        let schema = self.schema;
        self.reader.byte_records().map(move |row| {
            let row = row.map_err(|err| SyncError::DumpRead(err.to_string()))?;
            Ok(parse_record(&row, &schema))
        })
    }
}

/// Maps one raw dump row to a `SourceRecord`. Missing columns become empty
/// fields; the row itself never fails to map.
pub fn parse_record(row: &csv::ByteRecord, schema: &DumpSchema) -> SourceRecord {
    let field = |index: usize| clean_field(row.get(index).unwrap_or_default());
    SourceRecord {
        short_id: field(schema.short_id),
        full_id: field(schema.full_id),
        guid: field(schema.guid),
        unit_id: field(schema.unit_id),
        accessions: split_accessions(&field(schema.accessions)),
        institution_code: field(schema.institution_code),
        collection_code: field(schema.collection_code),
        scientific_name: field(schema.scientific_name),
        country: field(schema.country),
        collection_date: field(schema.collection_date),
        collector: field(schema.collector),
        record_type: field(schema.record_type),
    }
}

/// The dump is latin-1 encoded in places; decode lossily rather than failing
/// the row, then drop quoting noise and NULL sentinels.
fn clean_field(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .replace('"', "")
        .replace(NULL_SENTINEL, "")
        .trim()
        .to_string()
}

fn split_accessions(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
