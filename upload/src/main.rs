//! HEMS upload CLI - preview and import device spreadsheets
//!
//! # Commands
//!
//! ```bash
//! hems-upload preview devices.csv                      # Show how the backend reads a file
//! hems-upload import devices.csv --set 1.hours=8       # Preview, correct, save
//! hems-upload import devices.csv --dry-run             # Preview and corrections only
//! hems-upload serve --port 8000                        # Local development backend
//! hems-upload parse devices.csv                        # Local parse, no backend
//! ```
//!
//! The backend URL and timeout come from `HEMS_API_URL` and
//! `HEMS_UPLOAD_TIMEOUT_SECS` (a `.env` file is honoured) unless given as flags.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use hems_upload::{
    check_row, parser, server, HttpUploadApi, PreviewRow, RowField, Severity, UploadConfig, UploadController,
    UploadOutcome, WorkflowState,
};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "hems-upload")]
#[command(about = "Preview, correct and import HEMS device spreadsheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file for preview and print the parsed rows
    Preview {
        /// Device file (.csv, .xlsx, .xls)
        input: PathBuf,

        #[command(flatten)]
        remote: Remote,

        /// Write the previewed rows as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Preview a file, apply corrections and save the devices
    Import {
        /// Device file (.csv, .xlsx, .xls)
        input: PathBuf,

        #[command(flatten)]
        remote: Remote,

        /// Correct a cell before saving: ROW.FIELD=VALUE (rows start at 1)
        #[arg(long = "set", value_name = "ROW.FIELD=VALUE")]
        set: Vec<Assignment>,

        /// Stop after preview and corrections
        #[arg(long)]
        dry_run: bool,
    },

    /// Start the development backend
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Parse a CSV/JSON file locally, as the development backend would
    Parse {
        /// Input file
        input: PathBuf,
    },
}

/// Backend connection flags.
#[derive(Args)]
struct Remote {
    /// Backend base URL (default: $HEMS_API_URL or http://localhost:8000)
    #[arg(long)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Also accept .json device lists
    #[arg(long)]
    allow_json: bool,
}

impl Remote {
    fn config(&self) -> UploadConfig {
        let mut config = UploadConfig::from_env();
        if let Some(url) = &self.api_url {
            let timeout = config.request_timeout;
            let max = config.max_file_size;
            config = UploadConfig::new(url.as_str()).with_timeout(timeout).with_max_file_size(max);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if self.allow_json {
            config = config.with_json();
        }
        config
    }
}

/// One `--set ROW.FIELD=VALUE` correction.
#[derive(Debug, Clone, PartialEq)]
struct Assignment {
    /// 1-based row number.
    row: usize,
    field: RowField,
    value: String,
}

impl FromStr for Assignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ROW.FIELD=VALUE, got '{}'", s))?;
        let (row, field) = target
            .split_once('.')
            .ok_or_else(|| format!("expected ROW.FIELD before '=', got '{}'", target))?;
        let row: usize = row
            .trim()
            .parse()
            .ok()
            .filter(|r| *r >= 1)
            .ok_or_else(|| format!("row must be a number starting at 1, got '{}'", row))?;
        Ok(Assignment {
            row,
            field: field.parse()?,
            value: value.to_string(),
        })
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Preview { input, remote, output } => cmd_preview(&input, &remote, output.as_deref()).await,
        Commands::Import {
            input,
            remote,
            set,
            dry_run,
        } => cmd_import(&input, &remote, &set, dry_run).await,
        Commands::Serve { port } => cmd_serve(port).await,
        Commands::Parse { input } => cmd_parse(&input),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// =============================================================================
// Commands
// =============================================================================

async fn cmd_preview(input: &Path, remote: &Remote, output: Option<&Path>) -> CliResult {
    let config = remote.config();
    let mut upload = UploadController::new(HttpUploadApi::new(config.clone())?, config);

    select(&mut upload, input).await?;
    preview(&mut upload).await?;

    let rows = upload.workflow().rows().unwrap_or_default();
    print_rows(rows);

    if let Some(path) = output {
        fs::write(path, serde_json::to_string_pretty(rows)?)?;
        eprintln!("💾 Rows written to: {}", path.display());
    }
    Ok(())
}

async fn cmd_import(input: &Path, remote: &Remote, set: &[Assignment], dry_run: bool) -> CliResult {
    let config = remote.config();
    let refresh = Rc::new(Cell::new(false));
    let flag = refresh.clone();
    let mut upload =
        UploadController::new(HttpUploadApi::new(config.clone())?, config).on_saved(move |_| flag.set(true));

    select(&mut upload, input).await?;
    preview(&mut upload).await?;

    for assignment in set {
        if !upload.edit(assignment.row - 1, assignment.field, &assignment.value) {
            return Err(format!("row {} does not exist", assignment.row).into());
        }
        let rows = upload.workflow().rows().unwrap_or_default();
        eprintln!(
            "✏️  Row {} {} = {}",
            assignment.row,
            assignment.field.label(),
            rows[assignment.row - 1].display_value(assignment.field)
        );
    }

    print_rows(upload.workflow().rows().unwrap_or_default());

    if dry_run {
        eprintln!("\n🔍 Dry run: nothing saved");
        return Ok(());
    }
    if !upload.workflow().can_save() {
        return Err("nothing to save: the preview returned no rows".into());
    }

    eprintln!("\n💾 Saving...");
    if upload.save().await == WorkflowState::Failed {
        return Err(failure(upload.workflow().error()));
    }

    if let Some(outcome) = upload.workflow().outcome() {
        print_outcome(outcome);
    }

    if refresh.get() {
        match upload.api().list_devices().await {
            Ok(devices) => eprintln!("🔄 Device list refreshed: {} devices", devices.len()),
            Err(e) => eprintln!("⚠️  Could not refresh device list: {}", e),
        }
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

async fn cmd_serve(port: u16) -> CliResult {
    server::start_server(port).await?;
    Ok(())
}

fn cmd_parse(input: &Path) -> CliResult {
    eprintln!("📄 Parsing: {}", input.display());

    let bytes = fs::read(input)?;
    let name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let ingested = parser::ingest(&name, &bytes)?;

    eprintln!("   Encoding: {}", ingested.encoding);
    if let Some(delimiter) = ingested.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(delimiter));
    }
    for (header, field) in &ingested.mapped {
        eprintln!("   {} → {}", header, field.key());
    }
    if !ingested.unmapped.is_empty() {
        eprintln!("   Kept as extra: {}", ingested.unmapped.join(", "));
    }
    eprintln!("✅ Parsed {} rows", ingested.rows.len());

    println!("{}", serde_json::to_string_pretty(&ingested.rows)?);
    Ok(())
}

// =============================================================================
// Steps
// =============================================================================

async fn select(upload: &mut UploadController<HttpUploadApi>, input: &Path) -> CliResult {
    eprintln!("📄 File: {}", input.display());
    if !upload.select_path(input).await? {
        return Err(failure(upload.workflow().error()));
    }
    Ok(())
}

async fn preview(upload: &mut UploadController<HttpUploadApi>) -> CliResult {
    eprintln!("📡 Previewing via {}", upload.api().config().preview_url());
    if upload.preview().await == WorkflowState::Failed {
        return Err(failure(upload.workflow().error()));
    }
    let count = upload.workflow().rows().map_or(0, <[PreviewRow]>::len);
    eprintln!("✅ Preview ready: {} rows", count);
    Ok(())
}

fn failure(error: Option<&hems_upload::WorkflowError>) -> Box<dyn std::error::Error> {
    let Some(err) = error else {
        return "upload failed".into();
    };
    for issue in err.issues() {
        eprintln!("   - {}", issue);
    }
    Box::new(err.clone())
}

// =============================================================================
// Output
// =============================================================================

fn print_rows(rows: &[PreviewRow]) {
    if rows.is_empty() {
        eprintln!("📋 No rows found in file");
        return;
    }

    let header: Vec<&str> = RowField::ALL.iter().map(RowField::label).collect();
    println!("#\t{}", header.join("\t"));

    for (i, row) in rows.iter().enumerate() {
        let cells: Vec<String> = RowField::ALL.iter().map(|f| row.display_value(*f)).collect();
        println!("{}\t{}", i + 1, cells.join("\t"));

        for hint in check_row(row) {
            let icon = match hint.severity {
                Severity::Error => "❌",
                Severity::Warning => "⚠️ ",
            };
            eprintln!("   {} Row {} {}: {}", icon, i + 1, hint.field.label(), hint.message);
        }
    }
}

fn print_outcome(outcome: &UploadOutcome) {
    eprintln!("✅ {}", outcome.summary());
    if outcome.skipped_count > 0 {
        eprintln!("   Skipped: {}", outcome.skipped_count);
    }
    for warning in &outcome.warnings {
        eprintln!("   ⚠️  {}", warning);
    }
    for duplicate in &outcome.duplicates {
        eprintln!("   ♻️  {}", duplicate);
    }
    for error in &outcome.errors {
        eprintln!("   ❌ {}", error);
    }
    for (row, fields) in outcome.grouped_issues() {
        eprintln!("   ❌ {}:", row);
        for (field, messages) in fields {
            eprintln!("      {}: {}", field, messages.join("; "));
        }
    }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_parsing() {
        let a: Assignment = "2.hours_used_per_day=8".parse().unwrap();
        assert_eq!(a, Assignment { row: 2, field: RowField::HoursUsedPerDay, value: "8".into() });

        let a: Assignment = "1.brand=".parse().unwrap();
        assert_eq!(a.value, "");

        assert!("0.room=x".parse::<Assignment>().is_err());
        assert!("room=x".parse::<Assignment>().is_err());
        assert!("1.colour=red".parse::<Assignment>().is_err());
    }
}
