//! `dmfr sheets|check|run`: referral report commands.

use std::path::{Path, PathBuf};

use clap::Args;
use dmfr_core::SheetSet;
use dmfr_io::{write_report, SheetCache, WorkbookSource};
use dmfr_referral::{validate_inputs, RunConfig, RunSummary, SelectedSheets};

use crate::exit_codes::{
    referral_exit_code, EXIT_ERROR, EXIT_REFERRAL_CONFIG, EXIT_REFERRAL_MISSING_INPUT, EXIT_REFERRAL_READ,
    EXIT_REFERRAL_WRITE, EXIT_USAGE,
};
use crate::CliError;

/// Config file looked up under the platform config dir when `--config` is
/// not given.
const DEFAULT_CONFIG_FILE: &str = "referral.toml";
const CONFIG_DIR: &str = "dmfr";
const SELECTION_HINT: &str = "pass --main, --policy, --doctor and --special, or set them under [sheets] in the config";

/// Sheet selection and config shared by `check` and `run`.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Workbook to read (xlsx, xls, xlsb, ods)
    pub workbook: PathBuf,

    /// Transaction (test-wise) sheet
    #[arg(long, value_name = "SHEET")]
    pub main: Option<String>,

    /// Referral policy sheet
    #[arg(long, value_name = "SHEET")]
    pub policy: Option<String>,

    /// Doctor-wise summary sheet
    #[arg(long, value_name = "SHEET")]
    pub doctor: Option<String>,

    /// Special price sheet
    #[arg(long, value_name = "SHEET")]
    pub special: Option<String>,

    /// Run config (TOML). Defaults to <config dir>/dmfr/referral.toml when present.
    #[arg(long, value_name = "FILE", env = "DMFR_CONFIG")]
    pub config: Option<PathBuf>,
}

fn referral_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn engine_err(err: dmfr_referral::ReferralError) -> CliError {
    let code = referral_exit_code(&err);
    let error = referral_err(code, err.to_string());
    match err {
        dmfr_referral::ReferralError::ConfigValidation(ref msg) if msg.contains("sheet") => {
            error.with_hint(SELECTION_HINT)
        }
        dmfr_referral::ReferralError::MissingSheet { .. } => {
            error.with_hint("run `dmfr sheets <WORKBOOK>` to list the sheet names")
        }
        _ => error,
    }
}

// ============================================================================
// Config + workbook loading
// ============================================================================

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR).join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.is_file())
}

/// Load the run config and apply command-line sheet overrides.
pub fn load_config(args: &SelectionArgs) -> Result<RunConfig, CliError> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                referral_err(EXIT_REFERRAL_CONFIG, format!("cannot read config {}: {e}", path.display()))
            })?;
            tracing::info!(config = %path.display(), "loaded run config");
            RunConfig::from_toml(&text).map_err(engine_err)?
        }
        None => RunConfig::default(),
    };

    let sheets = &mut config.sheets;
    for (slot, flag) in [
        (&mut sheets.main, &args.main),
        (&mut sheets.policy, &args.policy),
        (&mut sheets.doctor, &args.doctor),
        (&mut sheets.special, &args.special),
    ] {
        if flag.is_some() {
            slot.clone_from(flag);
        }
    }
    Ok(config)
}

fn open_workbook(path: &Path) -> Result<WorkbookSource, CliError> {
    if !path.exists() {
        return Err(referral_err(EXIT_USAGE, format!("workbook not found: {}", path.display())));
    }
    let source = WorkbookSource::open(path).map_err(|e| referral_err(EXIT_REFERRAL_READ, e))?;
    tracing::debug!(workbook = %path.display(), identity = source.identity(), "opened workbook");
    Ok(source)
}

/// Read the selected sheets that exist. Absent ones are left for the
/// engine to report by role.
fn load_selected(
    source: &WorkbookSource,
    selected: &SelectedSheets,
    cache: &mut SheetCache,
) -> Result<SheetSet, CliError> {
    let available = source.sheet_names().map_err(|e| referral_err(EXIT_REFERRAL_READ, e))?;
    let present = selected
        .roles()
        .into_iter()
        .map(|(_, name)| name)
        .filter(|name| available.iter().any(|a| a == name));
    cache.load_set(source, present).map_err(|e| referral_err(EXIT_REFERRAL_READ, e))
}

// ============================================================================
// dmfr sheets
// ============================================================================

pub fn cmd_sheets(workbook: PathBuf, json: bool) -> Result<(), CliError> {
    let source = open_workbook(&workbook)?;
    let names = source.sheet_names().map_err(|e| referral_err(EXIT_REFERRAL_READ, e))?;
    if json {
        let out = serde_json::to_string_pretty(&names)
            .map_err(|e| referral_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{out}");
    } else {
        for name in names {
            println!("{name}");
        }
    }
    Ok(())
}

// ============================================================================
// dmfr check
// ============================================================================

pub fn cmd_check(args: SelectionArgs) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let selected = config.sheets.resolve().map_err(engine_err)?;
    let source = open_workbook(&args.workbook)?;
    let mut cache = SheetCache::new();
    let sheets = load_selected(&source, &selected, &mut cache)?;

    let problems = validate_inputs(&config, &selected, &sheets);
    if problems.is_empty() {
        for (role, name) in selected.roles() {
            eprintln!("{role:<8} {name}");
        }
        eprintln!("ok: all required sheets and columns present");
        return Ok(());
    }

    for problem in &problems {
        eprintln!("  {problem}");
    }
    Err(referral_err(
        EXIT_REFERRAL_MISSING_INPUT,
        format!("{} input problem(s) found", problems.len()),
    ))
}

// ============================================================================
// dmfr run
// ============================================================================

pub fn cmd_run(args: SelectionArgs, output: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let selected = config.sheets.resolve().map_err(engine_err)?;
    let source = open_workbook(&args.workbook)?;
    let mut cache = SheetCache::new();
    let sheets = load_selected(&source, &selected, &mut cache)?;

    let result = dmfr_referral::run(&config, &sheets).map_err(engine_err)?;

    // Render fully before touching the output path.
    let artifact = write_report(&result.sheets, &config.output.file_name)
        .map_err(|e| referral_err(EXIT_REFERRAL_WRITE, e))?;
    let path = output.unwrap_or_else(|| PathBuf::from(&artifact.file_name));
    artifact
        .persist(&path)
        .map_err(|e| referral_err(EXIT_REFERRAL_WRITE, e))?;

    if json {
        let out = serde_json::to_string_pretty(&result.summary)
            .map_err(|e| referral_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{out}");
    }

    print_summary(&result.summary, artifact.sheet_names.len());
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn print_summary(summary: &RunSummary, sheet_count: usize) {
    let lines = &summary.lines;
    eprintln!(
        "lines: {} read, {} used ({} excluded department, {} zero rate, {} cancelled)",
        lines.read, lines.used, lines.excluded_department, lines.zero_item_rate, lines.cancelled,
    );
    eprintln!(
        "rates: {} special, {} department default",
        lines.special_rate_hits, lines.default_rate_hits,
    );
    eprintln!(
        "invoices: {} in pivot; doctor rows: {} ({} zero-sale dropped, {} without referral)",
        summary.invoices, summary.doctor_rows, summary.zero_sale_dropped, summary.unmatched_doctor_rows,
    );
    for group in &summary.groups {
        eprintln!(
            "  {:<24} {:>5} rows ({} B2), achievement {}",
            group.label, group.rows, group.b2_rows, group.achievement,
        );
    }
    eprintln!("{} groups, {} sheets", summary.groups.len(), sheet_count);
}
