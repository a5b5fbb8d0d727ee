// dmfr - doctor referral reports from a hospital billing workbook

mod exit_codes;
mod logging;
mod referral;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;
use logging::{init_logging, LogConfig, LogFormat};
use referral::SelectionArgs;

#[derive(Parser)]
#[command(name = "dmfr")]
#[command(about = "Compute doctor referral payouts from a billing workbook")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sheet names of a workbook
    #[command(after_help = "\
Examples:
  dmfr sheets billing.xlsx
  dmfr sheets billing.xlsx --json")]
    Sheets {
        /// Workbook to read
        workbook: PathBuf,

        /// Print names as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Check that the selected sheets and their required columns exist
    #[command(after_help = "\
Examples:
  dmfr check billing.xlsx --main 'Test Wise' --policy 'REFERRAL POLICY' \\
      --doctor 'Doctor Wise' --special 'Special Price'
  dmfr check billing.xlsx --config october.toml

Exit codes:
  0   all inputs present
  60  config error or unselected sheet
  61  missing sheet or column")]
    Check {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Build the referral report workbook
    #[command(after_help = "\
Examples:
  dmfr run billing.xlsx --main 'Test Wise' --policy 'REFERRAL POLICY' \\
      --doctor 'Doctor Wise' --special 'Special Price'
  dmfr run billing.xlsx --config october.toml -o october.xlsx
  dmfr run billing.xlsx --config october.toml --json > summary.json

The report is written only after every sheet rendered; a failed run
leaves any existing output file untouched.")]
    Run {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output path (default: ./<output.file_name from config>)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the run summary as JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose, cli.log_format));

    let result = match cli.command {
        Commands::Sheets { workbook, json } => referral::cmd_sheets(workbook, json),
        Commands::Check { selection } => referral::cmd_check(selection),
        Commands::Run { selection, output, json } => referral::cmd_run(selection, output, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
