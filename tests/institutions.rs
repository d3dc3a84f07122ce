use std::path::Path;

use assert_matches::assert_matches;

use bio_sync_link::error::SyncError;
use bio_sync_link::institutions::InstitutionTable;

fn fixture_table() -> InstitutionTable {
    InstitutionTable::load(Path::new("tests/fixtures/institutions.csv")).unwrap()
}

#[test]
fn translates_known_codes() {
    let table = fixture_table();
    assert_eq!(table.translate("BGBM"), Some("B"));
    assert_eq!(table.translate("NHMUK"), Some("NHMUK"));
}

#[test]
fn placeholder_mapping_translates_to_none() {
    let table = fixture_table();
    assert_eq!(table.translate("RMNH"), None);
}

#[test]
fn later_real_value_replaces_placeholder() {
    let table = fixture_table();
    assert_eq!(table.translate("ZMB"), Some("ZMB"));
}

#[test]
fn first_real_mapping_wins() {
    let table = fixture_table();
    assert_eq!(table.translate("DUPL"), Some("FIRST"));
}

#[test]
fn unknown_code_translates_to_none() {
    let table = fixture_table();
    assert_eq!(table.translate("NOT-A-CODE"), None);
}

#[test]
fn missing_table_file_is_fatal() {
    let err = InstitutionTable::load(Path::new("tests/fixtures/absent.csv")).unwrap_err();
    assert_matches!(err, SyncError::MissingInstitutionTable(_));
}
