use tracing::{debug, info, warn};

use crate::domain::{
    is_accepted_type, EndpointKind, MatchCandidate, MatchSource, RejectReason, SourceRecord,
    Verdict,
};
use crate::ena::{EnaClient, EnaRecord};
use crate::institutions::InstitutionTable;
use crate::normalize::{assemble_triplet, clean_unit_id, is_triplet_shaped, strip_institution_prefix};
use crate::report::ReportSink;
use crate::sah::SahClient;

/// Colon- and space-delimited renderings of the same triplet. Both are empty
/// when the triplet could not be built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripletForms {
    pub colon: String,
    pub space: String,
}

/// Suggested follow-up for an accepted triplet match whose ENA voucher does
/// not already carry a triplet.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationOutcome {
    Suggest {
        voucher_id: String,
        triplet: String,
    },
    TooManyCollections {
        voucher_id: String,
        institution: String,
        collections: Vec<String>,
    },
}

/// The arbitration core: runs the strategy chain for one record and decides
/// which candidates become output rows.
pub struct MatchEngine<'a, E: EnaClient, S: SahClient> {
    ena: &'a E,
    sah: &'a S,
    institutions: &'a InstitutionTable,
    with_triplets: bool,
}

impl<'a, E: EnaClient, S: SahClient> MatchEngine<'a, E, S> {
    pub fn new(
        ena: &'a E,
        sah: &'a S,
        institutions: &'a InstitutionTable,
        with_triplets: bool,
    ) -> Self {
        Self {
            ena,
            sah,
            institutions,
            with_triplets,
        }
    }

    /// Full strategy chain for one record. Returns the number of accepted
    /// match rows emitted.
    pub fn process(&self, record: &SourceRecord, sink: &dyn ReportSink) -> usize {
        let candidates = self.collect_candidates(record, sink);
        if candidates.is_empty() {
            debug!(unit_id = %record.unit_id, "no candidates from any strategy");
            return 0;
        }
        self.emit_verdicts(record, candidates, sink).len()
    }

    /// Triplet strategy alone, for the annotation workflow. Returns the
    /// accepted candidates so the caller can derive curation suggestions.
    pub fn triplet_matches(
        &self,
        record: &SourceRecord,
        sink: &dyn ReportSink,
    ) -> Vec<MatchCandidate> {
        let candidates = self.triplet_candidates(record);
        self.emit_verdicts(record, candidates, sink)
    }

    /// Strategies in priority order, stopping at the first NON-EMPTY
    /// candidate set. A strategy whose candidates all get rejected later
    /// still terminates the chain.
    fn collect_candidates(
        &self,
        record: &SourceRecord,
        sink: &dyn ReportSink,
    ) -> Vec<MatchCandidate> {
        if !record.accessions.is_empty() {
            let candidates = self.accession_candidates(record);
            self.report_unmatched_accessions(record, &candidates, sink);
            if !candidates.is_empty() {
                return candidates;
            }
        }

        let cleaned = clean_unit_id(&record.unit_id);
        if !cleaned.is_empty() {
            let candidates = self.unit_id_candidates(&cleaned);
            if !candidates.is_empty() {
                return candidates;
            }
        }

        if self.with_triplets {
            return self.triplet_candidates(record);
        }
        Vec::new()
    }

    fn emit_verdicts(
        &self,
        record: &SourceRecord,
        candidates: Vec<MatchCandidate>,
        sink: &dyn ReportSink,
    ) -> Vec<MatchCandidate> {
        let mut accepted = Vec::new();
        for candidate in candidates {
            match arbitrate(record, &candidate) {
                Verdict::Accepted { tax_match } => {
                    info!(
                        source = %candidate.source,
                        api = %candidate.api,
                        hit_on = %candidate.hit_on(),
                        "match accepted"
                    );
                    sink.match_row(record, &candidate, tax_match);
                    accepted.push(candidate);
                }
                Verdict::Rejected(reason) => {
                    info!(
                        source = %candidate.source,
                        hit_on = %candidate.hit_on(),
                        %reason,
                        "candidate rejected"
                    );
                }
                Verdict::NoCandidate => {}
            }
        }
        accepted
    }

    fn accession_candidates(&self, record: &SourceRecord) -> Vec<MatchCandidate> {
        for kind in [EndpointKind::Sequence, EndpointKind::Sample] {
            match self.ena.search_by_accession(kind, &record.accessions) {
                Ok(hits) if !hits.is_empty() => return tag(hits, MatchSource::Accession, kind),
                Ok(_) => {}
                Err(err) => warn!(
                    accessions = ?record.accessions,
                    endpoint = %kind,
                    error = %err,
                    "accession lookup failed"
                ),
            }
        }
        Vec::new()
    }

    fn unit_id_candidates(&self, cleaned_unit_id: &str) -> Vec<MatchCandidate> {
        for kind in [EndpointKind::Sequence, EndpointKind::Sample] {
            match self.ena.search_by_unit_id(kind, cleaned_unit_id) {
                Ok(hits) if !hits.is_empty() => return tag(hits, MatchSource::UnitId, kind),
                Ok(_) => {}
                Err(err) => warn!(
                    unit_id = %cleaned_unit_id,
                    endpoint = %kind,
                    error = %err,
                    "unit-id lookup failed"
                ),
            }
        }
        Vec::new()
    }

    fn triplet_candidates(&self, record: &SourceRecord) -> Vec<MatchCandidate> {
        let Some(forms) = self.validated_triplet(record) else {
            return Vec::new();
        };
        info!(triplet = %forms.colon, "no direct match, searching by triplet");
        for kind in [EndpointKind::Sequence, EndpointKind::Sample] {
            match self.ena.search_by_triplet(kind, &forms.colon, &forms.space) {
                Ok(hits) if !hits.is_empty() => return tag(hits, MatchSource::Triplet, kind),
                Ok(_) => {}
                Err(err) => warn!(
                    triplet = %forms.colon,
                    endpoint = %kind,
                    error = %err,
                    "triplet lookup failed"
                ),
            }
        }
        Vec::new()
    }

    /// Builds the triplet with the collection segment first; when that shape
    /// is invalid or fails remote validation, retries once without it.
    fn validated_triplet(&self, record: &SourceRecord) -> Option<TripletForms> {
        for include_collection in [true, false] {
            let forms = self.build_triplet(record, include_collection);
            if forms.colon.is_empty() || !is_triplet_shaped(&forms.colon) {
                continue;
            }
            match self.sah.validate_triplet(&forms.colon) {
                Ok(true) => return Some(forms),
                Ok(false) => debug!(triplet = %forms.colon, "triplet failed remote validation"),
                Err(err) => warn!(
                    triplet = %forms.colon,
                    error = %err,
                    "triplet validation call failed"
                ),
            }
        }
        None
    }

    /// Both renderings of the record's triplet. Empty unless institution
    /// translation succeeded and a unit remains after prefix stripping.
    pub fn build_triplet(&self, record: &SourceRecord, include_collection: bool) -> TripletForms {
        let Some(institution) = self.institutions.translate(&record.institution_code) else {
            return TripletForms::default();
        };
        let unit = strip_institution_prefix(&record.unit_id, institution);
        let collection = if include_collection {
            self.resolve_collection(institution, record)
        } else {
            record.collection_code.clone()
        };
        TripletForms {
            colon: assemble_triplet(institution, &collection, &unit, ":", include_collection),
            space: assemble_triplet(institution, &collection, &unit, " ", include_collection),
        }
    }

    /// A single registered collection code wins; anything else falls back to
    /// the record's raw collection field.
    fn resolve_collection(&self, institution: &str, record: &SourceRecord) -> String {
        match self.sah.collection_codes(institution) {
            Ok(codes) if codes.len() == 1 => codes.into_iter().next().unwrap_or_default(),
            Ok(codes) => {
                if codes.len() > 1 {
                    debug!(
                        %institution,
                        collections = ?codes,
                        "institution has several collections, using the record's own"
                    );
                }
                record.collection_code.clone()
            }
            Err(err) => {
                warn!(%institution, error = %err, "collection listing failed");
                record.collection_code.clone()
            }
        }
    }

    /// What the annotation workflow should do about an accepted triplet
    /// match: nothing when the ENA voucher already is a triplet, otherwise a
    /// curation suggestion or a too-many-collections diagnostic.
    pub fn derive_annotation(
        &self,
        record: &SourceRecord,
        candidate: &MatchCandidate,
    ) -> Option<AnnotationOutcome> {
        let voucher_id = &candidate.hit.specimen_voucher;
        if voucher_id.is_empty() || is_triplet_shaped(voucher_id) {
            return None;
        }
        let Some(institution) = self.institutions.translate(&record.institution_code) else {
            debug!(
                institution = %record.institution_code,
                "cannot annotate, institution has no canonical code"
            );
            return None;
        };
        let bare_voucher = strip_institution_prefix(voucher_id, institution);
        let collections = match self.sah.collection_codes(institution) {
            Ok(codes) => codes,
            Err(err) => {
                warn!(%institution, error = %err, "collection listing failed");
                Vec::new()
            }
        };
        match collections.as_slice() {
            [] => Some(AnnotationOutcome::Suggest {
                voucher_id: voucher_id.clone(),
                triplet: assemble_triplet(institution, "", &bare_voucher, ":", false),
            }),
            [collection] => Some(AnnotationOutcome::Suggest {
                voucher_id: voucher_id.clone(),
                triplet: assemble_triplet(institution, collection, &bare_voucher, ":", true),
            }),
            _ => Some(AnnotationOutcome::TooManyCollections {
                voucher_id: voucher_id.clone(),
                institution: institution.to_string(),
                collections,
            }),
        }
    }

    fn report_unmatched_accessions(
        &self,
        record: &SourceRecord,
        candidates: &[MatchCandidate],
        sink: &dyn ReportSink,
    ) {
        for accession in &record.accessions {
            let found = candidates
                .iter()
                .any(|candidate| candidate.hit.accession == *accession);
            if !found {
                info!(%accession, "accession not found in ENA");
                sink.unmatched_accession(record, accession);
            }
        }
    }
}

/// Weak corroboration: any whitespace token of the source name appearing as a
/// case-sensitive substring of the candidate name.
pub fn taxonomic_overlap(source_name: &str, candidate_name: &str) -> bool {
    source_name
        .split_whitespace()
        .any(|token| candidate_name.contains(token))
}

/// The acceptance rule. Identifier-shaped evidence (unit-id, triplet) needs
/// taxonomic corroboration; accession equality does not. The record-type
/// filter applies to every source.
pub fn arbitrate(record: &SourceRecord, candidate: &MatchCandidate) -> Verdict {
    let tax_match = taxonomic_overlap(&record.scientific_name, &candidate.hit.scientific_name);
    if candidate.source != MatchSource::Accession && !tax_match {
        return Verdict::Rejected(RejectReason::NoTaxonomicOverlap);
    }
    if !is_accepted_type(&record.record_type) {
        return Verdict::Rejected(RejectReason::UnacceptedType);
    }
    Verdict::Accepted { tax_match }
}

fn tag(hits: Vec<EnaRecord>, source: MatchSource, api: EndpointKind) -> Vec<MatchCandidate> {
    hits.into_iter()
        .map(|hit| MatchCandidate { hit, source, api })
        .collect()
}
