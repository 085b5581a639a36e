// toploader CLI - headless inventory reconciliation

mod exit_codes;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use toploader_recon::config::{choose_input, ReconConfig, ValueStrategy};
use toploader_recon::ingest::{ingest, Ingested};
use toploader_recon::model::CANONICAL_HEADERS;
use toploader_recon::ReconError;

#[derive(Parser)]
#[command(name = "toploader")]
#[command(about = "Reconcile trading-card inventory exports into one canonical dataset")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile an authoritative inventory against a reference export
    #[command(after_help = "\
Examples:
  toploader reconcile --old inventory.csv --new ebay-export.csv -o merged.csv
  toploader reconcile --old inventory.csv --old backup.csv --new export.tsv --fill-blanks
  toploader reconcile --old inventory.csv --new export.csv --merge-values newest --report report.json
  toploader reconcile --config weekly.recon.toml --json")]
    Reconcile {
        /// Authoritative dataset; repeat for ordered fallback locations,
        /// first existing wins
        #[arg(long = "old")]
        old: Vec<PathBuf>,

        /// Reference dataset (marketplace or bulk export)
        #[arg(long = "new")]
        new: Option<PathBuf>,

        /// Write the merged dataset here
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the JSON report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Fill blank authoritative fields from the matched reference record
        #[arg(long)]
        fill_blanks: bool,

        /// Strategy for value/purchase_price collisions
        #[arg(long, value_enum)]
        merge_values: Option<MergeValues>,

        /// TOML policy config; flags override file values
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,
    },

    /// Collapse exact duplicate lines in one dataset, summing quantities
    #[command(after_help = "\
Examples:
  toploader dedupe --input inventory.csv -o deduped.csv
  toploader dedupe --input inventory.csv --report dedupe-report.json --json")]
    Dedupe {
        /// Dataset to collapse
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Write the collapsed dataset here
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the JSON report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,
    },

    /// Parse one export and emit it on the canonical column set
    #[command(after_help = "\
Examples:
  toploader normalize --input messy-export.csv -o normalized.csv
  toploader normalize --input export.txt --delimiter ';'
  toploader normalize --input export.tsv")]
    Normalize {
        /// File to normalize
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Write the normalized dataset here (stdout when omitted)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Field delimiter; sniffed from the header line when omitted
        #[arg(long)]
        delimiter: Option<char>,
    },

    /// Validate a policy config without running
    #[command(after_help = "\
Examples:
  toploader validate weekly.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum MergeValues {
    KeepOld,
    Max,
    Min,
    Newest,
}

impl From<MergeValues> for ValueStrategy {
    fn from(value: MergeValues) -> Self {
        match value {
            MergeValues::KeepOld => ValueStrategy::KeepOld,
            MergeValues::Max => ValueStrategy::Max,
            MergeValues::Min => ValueStrategy::Min,
            MergeValues::Newest => ValueStrategy::Newest,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(err.code)
        }
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Reconcile {
            old,
            new,
            output,
            report,
            fill_blanks,
            merge_values,
            config,
            json,
        } => cmd_reconcile(old, new, output, report, fill_blanks, merge_values, config, json),
        Commands::Dedupe { input, output, report, json } => cmd_dedupe(input, output, report, json),
        Commands::Normalize { input, output, delimiter } => cmd_normalize(input, output, delimiter),
        Commands::Validate { config } => cmd_validate(config),
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    fn error(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// reconcile
// ============================================================================

fn cmd_reconcile(
    old_flags: Vec<PathBuf>,
    new_flag: Option<PathBuf>,
    output: Option<PathBuf>,
    report_path: Option<PathBuf>,
    fill_blanks: bool,
    merge_values: Option<MergeValues>,
    config_path: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let mut config = load_config(config_path.as_deref())?;

    // Flags override config file values.
    if !old_flags.is_empty() {
        config.inputs.old = old_flags
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
    }
    if let Some(path) = new_flag {
        config.inputs.new = path.to_string_lossy().into_owned();
    }
    if fill_blanks {
        config.policy.fill_blanks = true;
    }
    if let Some(strategy) = merge_values {
        config.policy.merge_values = strategy.into();
    }

    if config.inputs.old.is_empty() {
        return Err(CliError::usage("no authoritative input given")
            .with_hint("pass --old <path> or set [inputs] old in the config"));
    }
    if config.inputs.new.is_empty() {
        return Err(CliError::usage("no reference input given")
            .with_hint("pass --new <path> or set [inputs] new in the config"));
    }

    // First existing candidate wins; nothing existing is fatal, before any
    // output is written.
    let old_path = choose_input(&config.inputs.old, |p| Path::new(p).is_file())
        .ok_or_else(|| {
            CliError::error(ReconError::MissingInput(config.inputs.old.join(", ")).to_string())
        })?
        .to_string();

    let old = read_ingest(Path::new(&old_path))?;
    let new = read_ingest(Path::new(&config.inputs.new))?;

    let mut outcome = toploader_recon::reconcile(&old, &new, &config);
    outcome.report.inputs.old_path = old_path.clone();
    outcome.report.inputs.new_path = config.inputs.new.clone();

    let merged_path = output.or_else(|| config.output.merged.clone().map(PathBuf::from));
    if let Some(ref path) = merged_path {
        toploader_io::write_table(path, &outcome.headers, &outcome.rows, b',')
            .map_err(CliError::error)?;
        eprintln!("wrote {}", path.display());
    }

    let json_str = serde_json::to_string_pretty(&outcome.report)
        .map_err(|e| CliError::error(format!("JSON serialization error: {e}")))?;
    let report_file = report_path.or_else(|| config.output.report.clone().map(PathBuf::from));
    if let Some(ref path) = report_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::error(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }
    if json {
        println!("{json_str}");
    }

    let r = &outcome.report.results;
    eprintln!(
        "recon: {} rows — {} matched, {} unmatched, {} ambiguous, {} reference-only",
        r.output_rows, r.matched, r.unmatched, r.ambiguous, r.unused_reference,
    );

    // Ambiguous and unmatched rows are reported outcomes, not failures.
    Ok(())
}

// ============================================================================
// dedupe
// ============================================================================

fn cmd_dedupe(
    input: PathBuf,
    output: Option<PathBuf>,
    report_path: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let ingested = read_ingest(&input)?;

    let mut outcome = toploader_recon::dedupe(&ingested, &Default::default());
    outcome.report.inputs.path = input.to_string_lossy().into_owned();

    if let Some(ref path) = output {
        toploader_io::write_table(path, &outcome.headers, &outcome.rows, b',')
            .map_err(CliError::error)?;
        eprintln!("wrote {}", path.display());
    }

    let json_str = serde_json::to_string_pretty(&outcome.report)
        .map_err(|e| CliError::error(format!("JSON serialization error: {e}")))?;
    if let Some(ref path) = report_path {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::error(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }
    if json {
        println!("{json_str}");
    }

    let r = &outcome.report.results;
    eprintln!(
        "dedupe: {} rows in, {} rows out, {} duplicate group(s) collapsed",
        r.input_rows, r.output_rows, r.duplicate_groups,
    );

    Ok(())
}

// ============================================================================
// normalize
// ============================================================================

fn cmd_normalize(
    input: PathBuf,
    output: Option<PathBuf>,
    delimiter: Option<char>,
) -> Result<(), CliError> {
    let table = toploader_io::read_table(&input, delimiter.map(|c| c as u8))
        .map_err(CliError::error)?;
    if table.is_empty() {
        return Err(CliError::error(
            ReconError::EmptyInput(input.display().to_string()).to_string(),
        ));
    }

    let ingested = ingest(&table.headers, &table.rows, &file_stem(&input));
    let rows: Vec<HashMap<String, String>> =
        ingested.records.iter().map(|r| r.to_row()).collect();
    let base: Vec<String> = CANONICAL_HEADERS.iter().map(|h| h.to_string()).collect();
    let headers = toploader_recon::engine::output_headers(&base, &rows);

    match output {
        Some(ref path) => {
            toploader_io::write_table(path, &headers, &rows, b',')
                .map_err(CliError::error)?;
            eprintln!("wrote {} ({} rows)", path.display(), rows.len());
        }
        None => {
            print!("{}", table_to_string(&headers, &rows)?);
        }
    }

    Ok(())
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    eprintln!(
        "valid: recon config '{}' — {} old candidate(s), fill_blanks={}, merge_values={}",
        if config.name.is_empty() { "unnamed" } else { &config.name },
        config.inputs.old.len(),
        config.policy.fill_blanks,
        config.policy.merge_values,
    );
    Ok(())
}

// ============================================================================
// helpers
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::error(format!("cannot read {}: {e}", path.display())))?;
    ReconConfig::from_toml(&text).map_err(|e| CliError::error(e.to_string()))
}

fn read_ingest(path: &Path) -> Result<Ingested, CliError> {
    let table = toploader_io::read_table(path, None).map_err(CliError::error)?;
    if table.is_empty() {
        return Err(CliError::error(
            ReconError::EmptyInput(path.display().to_string()).to_string(),
        ));
    }
    Ok(ingest(&table.headers, &table.rows, &file_stem(path)))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn table_to_string(
    headers: &[String],
    rows: &[HashMap<String, String>],
) -> Result<String, CliError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(headers)
        .map_err(|e| CliError::error(e.to_string()))?;
    for row in rows {
        let record: Vec<&str> = headers
            .iter()
            .map(|h| row.get(h).map(String::as_str).unwrap_or(""))
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| CliError::error(e.to_string()))?;
    }
    let buf = writer
        .into_inner()
        .map_err(|e| CliError::error(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| CliError::error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_input_is_fatal_before_any_write() {
        let dir = tempdir().unwrap();
        let merged = dir.path().join("merged.csv");

        let err = cmd_reconcile(
            vec![dir.path().join("nope.csv"), dir.path().join("also-nope.csv")],
            Some(dir.path().join("new.csv")),
            Some(merged.clone()),
            None,
            false,
            None,
            None,
            false,
        )
        .unwrap_err();

        assert_eq!(err.code, EXIT_ERROR);
        assert!(err.message.contains("nope.csv"));
        assert!(!merged.exists(), "failed run must not touch output files");
    }

    #[test]
    fn reconcile_end_to_end_writes_output_and_report() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("inventory.csv");
        let new = dir.path().join("export.csv");
        let merged = dir.path().join("merged.csv");
        let report = dir.path().join("report.json");

        std::fs::write(
            &old,
            "Player,Set,Card Number,Year,Qty\nLionel Messi,Topps Chrome,7,2024,1\n",
        )
        .unwrap();
        std::fs::write(
            &new,
            "Player,Set,Card Number,Year,Team\nLionel Messi,Topps Chrome,7,2024,Inter Miami\n",
        )
        .unwrap();

        cmd_reconcile(
            vec![dir.path().join("missing.csv"), old],
            Some(new),
            Some(merged.clone()),
            Some(report.clone()),
            true,
            None,
            None,
            false,
        )
        .unwrap();

        let merged_text = std::fs::read_to_string(&merged).unwrap();
        assert!(merged_text.contains("Inter Miami"));

        let report_json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(report_json["results"]["matched"], 1);
        assert!(report_json["inputs"]["old_path"]
            .as_str()
            .unwrap()
            .ends_with("inventory.csv"));
    }

    #[test]
    fn dedupe_end_to_end_sums_quantities() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("inventory.csv");
        let output = dir.path().join("deduped.csv");

        std::fs::write(
            &input,
            "Player,Set,Card Number,Year,Qty\n\
             Lionel Messi,Topps Chrome,7,2024,1\n\
             Lionel Messi,Topps Chrome,7,2024,2\n",
        )
        .unwrap();

        cmd_dedupe(input, Some(output.clone()), None, false).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains('3'), "quantities should sum to 3: {text}");
    }

    #[test]
    fn normalize_writes_canonical_columns() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("export.csv");
        let output = dir.path().join("normalized.csv");

        std::fs::write(&input, "Player Name,Card #,Qty\nMessi,#7,2\n").unwrap();

        cmd_normalize(input, Some(output.clone()), None).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        let header_line = text.lines().next().unwrap();
        assert!(header_line.starts_with("sport,year,set,"));
        assert!(text.contains("Messi"));
    }

    #[test]
    fn validate_rejects_bad_config() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("bad.recon.toml");
        std::fs::write(&config, "[thresholds]\nfloor = -2.0\n").unwrap();

        let err = cmd_validate(config).unwrap_err();
        assert_eq!(err.code, EXIT_ERROR);
        assert!(err.message.contains("floor"));
    }
}
