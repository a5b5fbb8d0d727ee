//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `dmfr` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | referral         | Referral report codes                    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use dmfr_referral::ReferralError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Referral (60-69)
// =============================================================================

/// Run config could not be read, parsed or validated, or a sheet role
/// was left unselected.
pub const EXIT_REFERRAL_CONFIG: u8 = 60;

/// A designated sheet or one of its required columns is missing.
pub const EXIT_REFERRAL_MISSING_INPUT: u8 = 61;

/// Workbook could not be opened or a sheet could not be read.
pub const EXIT_REFERRAL_READ: u8 = 62;

/// Report could not be rendered or written.
pub const EXIT_REFERRAL_WRITE: u8 = 63;

/// Map an engine error to its exit code.
pub fn referral_exit_code(err: &ReferralError) -> u8 {
    match err {
        ReferralError::ConfigParse(_) | ReferralError::ConfigValidation(_) => EXIT_REFERRAL_CONFIG,
        ReferralError::MissingSheet { .. }
        | ReferralError::MissingColumn { .. }
        | ReferralError::PolicyTooNarrow { .. } => EXIT_REFERRAL_MISSING_INPUT,
    }
}
