use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bio_sync_link::app::{App, RunOptions};
use bio_sync_link::clearinghouse::{ClearinghouseClient, CurationRequest};
use bio_sync_link::domain::EndpointKind;
use bio_sync_link::dump::{DumpDelimiter, DumpReader, GGBN_DUMP_SCHEMA};
use bio_sync_link::ena::{EnaClient, EnaRecord};
use bio_sync_link::error::SyncError;
use bio_sync_link::institutions::InstitutionTable;
use bio_sync_link::report::ResultWriter;
use bio_sync_link::sah::SahClient;

#[derive(Default)]
struct MockEna {
    unit_hits: HashMap<String, Vec<EnaRecord>>,
    triplet_hits: HashMap<String, Vec<EnaRecord>>,
}

impl EnaClient for MockEna {
    fn search_by_accession(
        &self,
        _kind: EndpointKind,
        _accessions: &[String],
    ) -> Result<Vec<EnaRecord>, SyncError> {
        Ok(Vec::new())
    }

    fn search_by_unit_id(
        &self,
        kind: EndpointKind,
        cleaned_unit_id: &str,
    ) -> Result<Vec<EnaRecord>, SyncError> {
        if kind == EndpointKind::Sample {
            return Ok(Vec::new());
        }
        Ok(self
            .unit_hits
            .get(cleaned_unit_id)
            .cloned()
            .unwrap_or_default())
    }

    fn search_by_triplet(
        &self,
        kind: EndpointKind,
        colon_form: &str,
        _space_form: &str,
    ) -> Result<Vec<EnaRecord>, SyncError> {
        if kind == EndpointKind::Sample {
            return Ok(Vec::new());
        }
        Ok(self
            .triplet_hits
            .get(colon_form)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct MockSah {
    collections: Vec<String>,
}

impl SahClient for MockSah {
    fn validate_triplet(&self, _value: &str) -> Result<bool, SyncError> {
        Ok(true)
    }

    fn collection_codes(&self, _institution_code: &str) -> Result<Vec<String>, SyncError> {
        Ok(self.collections.clone())
    }
}

#[derive(Default, Clone)]
struct MockClearinghouse {
    submissions: Arc<Mutex<Vec<CurationRequest>>>,
}

impl ClearinghouseClient for MockClearinghouse {
    fn submit(&self, request: &CurationRequest) -> Result<(), SyncError> {
        self.submissions.lock().unwrap().push(request.clone());
        Ok(())
    }
}

fn nhmuk_table() -> InstitutionTable {
    InstitutionTable::from_mappings(HashMap::from([(
        "NHMUK".to_string(),
        "NHMUK".to_string(),
    )]))
}

fn dump_line(pairs: &[(usize, &str)]) -> String {
    let mut fields = vec![""; 24];
    for (index, value) in pairs {
        fields[*index] = value;
    }
    fields.join("\t")
}

fn lion_row(short_id: &str, unit_id: &str) -> String {
    dump_line(&[
        (0, short_id),
        (2, "Tissue"),
        (20, "NHMUK"),
        (21, "Mamm"),
        (22, unit_id),
        (23, "Panthera leo"),
    ])
}

fn write_dump(dir: &tempfile::TempDir, rows: &[String]) -> PathBuf {
    let header = (0..24)
        .map(|index| format!("col{index}"))
        .collect::<Vec<_>>()
        .join("\t");
    let path = dir.path().join("dump.csv");
    let mut content = header;
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    content.push('\n');
    fs::write(&path, content).unwrap();
    path
}

fn lion_hit() -> EnaRecord {
    EnaRecord {
        specimen_voucher: "NHMUK:Mamm:2018".to_string(),
        scientific_name: "Panthera leo leo".to_string(),
        accession: "LR0001".to_string(),
        ..EnaRecord::default()
    }
}

#[test]
fn reconcile_writes_match_rows_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let dump_path = write_dump(&dir, &[lion_row("1", "DNA-NHMUK_2018")]);
    let matches_path = dir.path().join("output.csv");
    let unmatched_path = dir.path().join("unmatched.csv");

    let ena = MockEna {
        unit_hits: HashMap::from([("NHMUK_2018".to_string(), vec![lion_hit()])]),
        ..MockEna::default()
    };
    let app = App::new(ena, MockSah::default(), MockClearinghouse::default(), nhmuk_table());

    let reader = DumpReader::open(&dump_path, DumpDelimiter::Tab, GGBN_DUMP_SCHEMA).unwrap();
    let writer = ResultWriter::create(&matches_path, Some(&unmatched_path), None).unwrap();
    let options = RunOptions {
        limit: None,
        jobs: 4,
        with_triplets: false,
    };

    let summary = app.reconcile(reader, writer, &options).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.matches, 1);
    assert_eq!(summary.unmatched_accessions, 0);

    let matches = fs::read_to_string(&matches_path).unwrap();
    assert_eq!(matches.lines().count(), 2);
    let row = matches.lines().nth(1).unwrap();
    assert!(row.starts_with("unit-id,true,DNA-NHMUK_2018,NHMUK:Mamm:2018"));
}

#[test]
fn reconcile_honors_the_record_limit() {
    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<_> = (0..5)
        .map(|index| lion_row(&index.to_string(), "DNA-NHMUK_2018"))
        .collect();
    let dump_path = write_dump(&dir, &rows);
    let matches_path = dir.path().join("output.csv");

    let app = App::new(
        MockEna::default(),
        MockSah::default(),
        MockClearinghouse::default(),
        nhmuk_table(),
    );

    let reader = DumpReader::open(&dump_path, DumpDelimiter::Tab, GGBN_DUMP_SCHEMA).unwrap();
    let writer = ResultWriter::create(&matches_path, None, None).unwrap();
    let options = RunOptions {
        limit: Some(2),
        jobs: 2,
        with_triplets: false,
    };

    let summary = app.reconcile(reader, writer, &options).unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.matches, 0);
}

#[test]
fn triplet_pass_writes_annotations_and_submits_curations() {
    let dir = tempfile::tempdir().unwrap();
    let dump_path = write_dump(&dir, &[lion_row("1", "NHMUK_2018")]);
    let matches_path = dir.path().join("triplet-output.csv");
    let annotations_path = dir.path().join("annotations.csv");

    // the voucher on the hit is bare, so the accepted match needs annotating
    let bare_hit = EnaRecord {
        specimen_voucher: "NHMUK_2018".to_string(),
        scientific_name: "Panthera leo leo".to_string(),
        accession: "LR0002".to_string(),
        ..EnaRecord::default()
    };
    let ena = MockEna {
        triplet_hits: HashMap::from([("NHMUK:Mamm:2018".to_string(), vec![bare_hit])]),
        ..MockEna::default()
    };
    let sah = MockSah {
        collections: vec!["Mamm".to_string()],
    };
    let clearinghouse = MockClearinghouse::default();
    let app = App::new(ena, sah, clearinghouse.clone(), nhmuk_table());

    let reader = DumpReader::open(&dump_path, DumpDelimiter::Tab, GGBN_DUMP_SCHEMA).unwrap();
    let writer = ResultWriter::create(&matches_path, None, Some(&annotations_path)).unwrap();
    let options = RunOptions {
        limit: None,
        jobs: 2,
        with_triplets: true,
    };

    let summary = app.triplet_pass(reader, writer, &options, true).unwrap();

    assert_eq!(summary.matches, 1);
    assert_eq!(summary.annotations, 1);

    let submissions = clearinghouse.submissions.lock().unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].record_id, "NHMUK_2018");
    assert_eq!(submissions[0].value_post, "NHMUK:Mamm:2018");

    let matches = fs::read_to_string(&matches_path).unwrap();
    assert!(matches.lines().nth(1).unwrap().starts_with("triplet,true"));

    let annotations = fs::read_to_string(&annotations_path).unwrap();
    let row = annotations.lines().nth(1).unwrap();
    assert!(row.starts_with("NHMUK_2018,NHMUK:Mamm:2018"));
    assert!(row.contains("automaticAssertion"));
}
