use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use serde::Serialize;
use tracing::{info, warn};

use crate::clearinghouse::{ClearinghouseClient, CurationRequest};
use crate::domain::SourceRecord;
use crate::dump::DumpReader;
use crate::ena::EnaClient;
use crate::engine::{AnnotationOutcome, MatchEngine};
use crate::error::SyncError;
use crate::institutions::InstitutionTable;
use crate::report::{AnnotationRow, ChannelSink, ReportEvent, ReportSink, ResultWriter, WriteTotals};
use crate::sah::SahClient;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Ceiling on the number of dump rows processed; `None` runs the whole
    /// dump.
    pub limit: Option<usize>,
    pub jobs: usize,
    /// Enables the best-effort triplet pass at the end of the strategy chain.
    pub with_triplets: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped_rows: usize,
    pub matches: usize,
    pub unmatched_accessions: usize,
    pub annotations: usize,
}

pub struct App<E: EnaClient, S: SahClient, C: ClearinghouseClient> {
    ena: E,
    sah: S,
    clearinghouse: C,
    institutions: InstitutionTable,
}

impl<E: EnaClient, S: SahClient, C: ClearinghouseClient> App<E, S, C> {
    pub fn new(ena: E, sah: S, clearinghouse: C, institutions: InstitutionTable) -> Self {
        Self {
            ena,
            sah,
            clearinghouse,
            institutions,
        }
    }

    /// Full reconciliation: the accession / unit-id / optional-triplet chain
    /// over every dump row, writing match and unmatched-accession files.
    pub fn reconcile(
        &self,
        reader: DumpReader,
        writer: ResultWriter,
        options: &RunOptions,
    ) -> Result<RunSummary, SyncError> {
        let engine = MatchEngine::new(&self.ena, &self.sah, &self.institutions, options.with_triplets);
        self.run_pool(reader, writer, options, |record, sink| {
            engine.process(record, sink);
        })
    }

    /// Triplet-only pass: match by constructed triplets and emit curation
    /// suggestions for vouchers that should carry one.
    pub fn triplet_pass(
        &self,
        reader: DumpReader,
        writer: ResultWriter,
        options: &RunOptions,
        submit_curations: bool,
    ) -> Result<RunSummary, SyncError> {
        let engine = MatchEngine::new(&self.ena, &self.sah, &self.institutions, true);
        self.run_pool(reader, writer, options, |record, sink| {
            let accepted = engine.triplet_matches(record, sink);
            for candidate in accepted {
                match engine.derive_annotation(record, &candidate) {
                    Some(AnnotationOutcome::Suggest { voucher_id, triplet }) => {
                        let request = CurationRequest::for_triplet(&voucher_id, &triplet);
                        if submit_curations {
                            if let Err(err) = self.clearinghouse.submit(&request) {
                                warn!(
                                    voucher = %voucher_id,
                                    error = %err,
                                    "curation submission failed"
                                );
                            }
                        }
                        info!(voucher = %voucher_id, %triplet, "voucher should be annotated with triplet");
                        let note = serde_json::to_string(&request).unwrap_or_default();
                        sink.annotation(AnnotationRow {
                            voucher_id,
                            suggested_triplet: triplet,
                            note,
                        });
                    }
                    Some(AnnotationOutcome::TooManyCollections {
                        voucher_id,
                        institution,
                        collections,
                    }) => {
                        sink.annotation(AnnotationRow {
                            voucher_id,
                            suggested_triplet: String::new(),
                            note: format!(
                                "unable to construct triplet: institution {institution} has {} collections ({})",
                                collections.len(),
                                collections.join(", ")
                            ),
                        });
                    }
                    None => {}
                }
            }
        })
    }

    /// Bounded worker pool over the dump rows. Rows flow from the main thread
    /// to workers over one sync channel; report events flow from workers to
    /// the single writer thread over another.
    fn run_pool<F>(
        &self,
        mut reader: DumpReader,
        writer: ResultWriter,
        options: &RunOptions,
        work: F,
    ) -> Result<RunSummary, SyncError>
    where
        F: Fn(&SourceRecord, &dyn ReportSink) + Sync,
    {
        let jobs = options.jobs.max(1);
        let (record_tx, record_rx) = mpsc::sync_channel::<SourceRecord>(jobs * 2);
        let record_rx = Arc::new(Mutex::new(record_rx));
        let (report_tx, report_rx) = mpsc::sync_channel::<ReportEvent>(jobs * 4);

        let mut processed = 0usize;
        let mut skipped = 0usize;

        let totals = thread::scope(|scope| -> Result<WriteTotals, SyncError> {
            let writer_handle = scope.spawn(move || writer.drain(report_rx));

            let mut workers = Vec::with_capacity(jobs);
            for _ in 0..jobs {
                let record_rx = Arc::clone(&record_rx);
                let sink = ChannelSink::new(report_tx.clone());
                let work = &work;
                workers.push(scope.spawn(move || {
                    loop {
                        let received = {
                            let Ok(guard) = record_rx.lock() else {
                                break;
                            };
                            guard.recv()
                        };
                        let Ok(record) = received else {
                            break;
                        };
                        work(&record, &sink);
                    }
                }));
            }
            // senders must end with the workers, or the channels never close
            drop(report_tx);
            drop(record_rx);

            for row in reader.records() {
                if options.limit.is_some_and(|limit| processed >= limit) {
                    break;
                }
                match row {
                    Ok(record) => {
                        processed += 1;
                        if record_tx.send(record).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        skipped += 1;
                        warn!(error = %err, "skipping unreadable dump row");
                    }
                }
            }
            drop(record_tx);

            for worker in workers {
                worker.join().map_err(|_| SyncError::WorkerPanic)?;
            }
            writer_handle.join().map_err(|_| SyncError::WorkerPanic)?
        })?;

        let summary = RunSummary {
            processed,
            skipped_rows: skipped,
            matches: totals.matches,
            unmatched_accessions: totals.unmatched_accessions,
            annotations: totals.annotations,
        };
        info!(
            processed = summary.processed,
            matches = summary.matches,
            unmatched = summary.unmatched_accessions,
            "run finished"
        );
        Ok(summary)
    }
}
