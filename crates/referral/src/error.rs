use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReferralError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (blank names, unselected sheet, etc.).
    ConfigValidation(String),
    /// A designated sheet is not present in the workbook.
    MissingSheet { role: String, sheet: String },
    /// Missing required column in an input sheet.
    MissingColumn { sheet: String, column: String },
    /// Policy sheet has no column at a department's fixed offset.
    PolicyTooNarrow { sheet: String, department: String, column: usize },
}

impl fmt::Display for ReferralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingSheet { role, sheet } => {
                write!(f, "{role} sheet '{sheet}' not found in workbook")
            }
            Self::MissingColumn { sheet, column } => {
                write!(f, "sheet '{sheet}': missing column '{column}'")
            }
            Self::PolicyTooNarrow { sheet, department, column } => write!(
                f,
                "sheet '{sheet}': no rate column for department '{department}' (expected at column {})",
                column + 1
            ),
        }
    }
}

impl std::error::Error for ReferralError {}
