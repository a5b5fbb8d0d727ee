//! `dmfr-referral`: referral commission engine.
//!
//! Pure engine crate: receives pre-loaded sheets, returns laid-out report
//! sheets and a run summary. No CLI or IO dependencies.

pub mod aggregate;
pub mod config;
pub mod department;
pub mod engine;
pub mod error;
pub mod input;
pub mod merge;
pub mod model;
pub mod partition;
pub mod rates;
pub mod topsheet;

pub use config::{RunConfig, SelectedSheets, SheetSelection};
pub use department::Department;
pub use engine::run;
pub use error::ReferralError;
pub use input::validate_inputs;
pub use model::{RunOutput, RunSummary};
