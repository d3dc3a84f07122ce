use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use bio_sync_link::app::{App, RunOptions, RunSummary};
use bio_sync_link::clearinghouse::{
    ClearinghouseClient, ClearinghouseHttpClient, CurationRequest,
};
use bio_sync_link::config::{UploadSettings, DEFAULT_JOBS};
use bio_sync_link::dump::{DumpDelimiter, DumpReader, GGBN_DUMP_SCHEMA};
use bio_sync_link::ena::EnaHttpClient;
use bio_sync_link::error::SyncError;
use bio_sync_link::institutions::InstitutionTable;
use bio_sync_link::report::ResultWriter;
use bio_sync_link::sah::SahHttpClient;
use bio_sync_link::upload::upload_results;

#[derive(Parser)]
#[command(name = "bsl")]
#[command(about = "Reconcile GGBN specimen records against the ENA sequence/sample registry")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the accession / unit-id / triplet reconciliation over a dump")]
    Reconcile(ReconcileArgs),
    #[command(about = "Run the triplet-only pass and emit curation suggestions")]
    Triplets(TripletArgs),
}

#[derive(Args)]
struct ReconcileArgs {
    #[arg(long)]
    input: PathBuf,

    #[arg(long, default_value = "institutions.csv")]
    institutions: PathBuf,

    #[arg(long, default_value = "output.csv")]
    matches_out: PathBuf,

    #[arg(long, default_value = "unmatched-accession.csv")]
    unmatched_out: PathBuf,

    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_JOBS)]
    jobs: usize,

    #[arg(long, value_enum, default_value_t = DumpDelimiter::Tab)]
    delimiter: DumpDelimiter,

    #[arg(long)]
    with_triplets: bool,

    #[arg(long)]
    upload: bool,

    #[arg(long)]
    bucket: Option<String>,

    #[arg(long)]
    region: Option<String>,
}

#[derive(Args)]
struct TripletArgs {
    #[arg(long)]
    input: PathBuf,

    #[arg(long, default_value = "institutions.csv")]
    institutions: PathBuf,

    #[arg(long, default_value = "triplet-output.csv")]
    matches_out: PathBuf,

    #[arg(long, default_value = "annotation-output.csv")]
    annotations_out: PathBuf,

    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_JOBS)]
    jobs: usize,

    #[arg(long, value_enum, default_value_t = DumpDelimiter::Tab)]
    delimiter: DumpDelimiter,

    #[arg(long)]
    submit_curations: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(sync) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(sync));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::MissingInstitutionTable(_)
        | SyncError::DumpOpen(_)
        | SyncError::MissingCredential(_) => 2,
        SyncError::EnaHttp(_)
        | SyncError::EnaStatus { .. }
        | SyncError::SahHttp(_)
        | SyncError::SahStatus { .. }
        | SyncError::CurationHttp(_)
        | SyncError::CurationStatus { .. }
        | SyncError::Upload(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Reconcile(args) => run_reconcile(args),
        Commands::Triplets(args) => run_triplets(args),
    }
}

fn run_reconcile(args: ReconcileArgs) -> miette::Result<()> {
    let institutions = InstitutionTable::load(&args.institutions).into_diagnostic()?;
    let ena = EnaHttpClient::new().into_diagnostic()?;
    let sah = SahHttpClient::new().into_diagnostic()?;
    let app = App::new(ena, sah, NopClearinghouse, institutions);

    let reader = DumpReader::open(&args.input, args.delimiter, GGBN_DUMP_SCHEMA).into_diagnostic()?;
    let writer =
        ResultWriter::create(&args.matches_out, Some(&args.unmatched_out), None).into_diagnostic()?;
    let options = RunOptions {
        limit: args.limit,
        jobs: args.jobs,
        with_triplets: args.with_triplets,
    };

    let summary = app.reconcile(reader, writer, &options).into_diagnostic()?;
    print_summary(&summary);

    if args.upload {
        let settings = UploadSettings::from_env(args.bucket, args.region).into_diagnostic()?;
        upload_results(
            &settings,
            &[args.matches_out.as_path(), args.unmatched_out.as_path()],
        )
        .into_diagnostic()?;
    }
    Ok(())
}

fn run_triplets(args: TripletArgs) -> miette::Result<()> {
    let institutions = InstitutionTable::load(&args.institutions).into_diagnostic()?;
    let ena = EnaHttpClient::new().into_diagnostic()?;
    let sah = SahHttpClient::new().into_diagnostic()?;

    let reader = DumpReader::open(&args.input, args.delimiter, GGBN_DUMP_SCHEMA).into_diagnostic()?;
    let writer = ResultWriter::create(&args.matches_out, None, Some(&args.annotations_out))
        .into_diagnostic()?;
    let options = RunOptions {
        limit: args.limit,
        jobs: args.jobs,
        with_triplets: true,
    };

    let summary = if args.submit_curations {
        let clearinghouse = ClearinghouseHttpClient::new().into_diagnostic()?;
        let app = App::new(ena, sah, clearinghouse, institutions);
        app.triplet_pass(reader, writer, &options, true).into_diagnostic()?
    } else {
        let app = App::new(ena, sah, NopClearinghouse, institutions);
        app.triplet_pass(reader, writer, &options, false).into_diagnostic()?
    };
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}bio-sync-link summary{reset}");
    println!("{green}records processed: {}{reset}", summary.processed);
    println!("{green}matches written:   {}{reset}", summary.matches);
    if summary.unmatched_accessions > 0 {
        println!(
            "{yellow}unmatched accessions: {}{reset}",
            summary.unmatched_accessions
        );
    }
    if summary.annotations > 0 {
        println!("{yellow}annotations: {}{reset}", summary.annotations);
    }
    if summary.skipped_rows > 0 {
        println!("{yellow}unreadable rows skipped: {}{reset}", summary.skipped_rows);
    }
}

/// Stands in when a run never submits curations.
struct NopClearinghouse;

impl ClearinghouseClient for NopClearinghouse {
    fn submit(&self, _request: &CurationRequest) -> Result<(), SyncError> {
        Err(SyncError::CurationHttp(
            "clearinghouse client not configured".to_string(),
        ))
    }
}
