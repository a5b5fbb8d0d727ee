//! Rate resolution: special (doctor, item) rates first, then the doctor's
//! department default from the policy sheet.

use std::collections::HashMap;

use dmfr_core::{Table, Value};

use crate::config::{PolicyColumns, SpecialColumns};
use crate::department::Department;
use crate::error::ReferralError;
use crate::input::require_column;
use crate::model::TransactionLine;

/// Which rule produced a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    Special,
    Default,
    None,
}

/// Immutable rate reference data for one run.
#[derive(Debug, Clone, Default)]
pub struct RateTables {
    /// (doctor, item) → raw special rate cell. First occurrence wins.
    special: HashMap<(String, String), Value>,
    /// doctor → department rate cells. First occurrence wins.
    defaults: HashMap<String, HashMap<Department, Value>>,
}

impl RateTables {
    pub fn from_tables(
        policy: &Table,
        policy_cols: &PolicyColumns,
        special: &Table,
        special_cols: &SpecialColumns,
    ) -> Result<Self, ReferralError> {
        let mut tables = Self::default();

        let doctor_idx = require_column(policy, &policy_cols.doctor_name)?;
        if let Some(problem) = crate::input::policy_width_problem(policy) {
            return Err(problem);
        }
        for row in policy.rows() {
            let doctor = row[doctor_idx].to_string();
            if doctor.is_empty() {
                continue;
            }
            for department in Department::all() {
                tables.insert_default(&doctor, department, row[department.policy_column()].clone());
            }
        }

        let s_doctor = require_column(special, &special_cols.doctor_name)?;
        let s_item = require_column(special, &special_cols.item_name)?;
        let s_rate = require_column(special, &special_cols.special_rate)?;
        for row in special.rows() {
            let doctor = row[s_doctor].to_string();
            let item = row[s_item].to_string();
            if doctor.is_empty() {
                continue;
            }
            tables.insert_special(&doctor, &item, row[s_rate].clone());
        }

        Ok(tables)
    }

    /// Add a special rate unless (doctor, item) already has one.
    pub fn insert_special(&mut self, doctor: &str, item: &str, rate: Value) {
        self.special
            .entry((doctor.to_string(), item.to_string()))
            .or_insert(rate);
    }

    /// Add a department default unless the doctor already has one for it.
    pub fn insert_default(&mut self, doctor: &str, department: Department, rate: Value) {
        self.defaults
            .entry(doctor.to_string())
            .or_default()
            .entry(department)
            .or_insert(rate);
    }

    /// Rate for one line; 0 when no rule matches or the matched cell is
    /// not a number. Never fails.
    pub fn resolve(&self, line: &TransactionLine) -> f64 {
        self.resolve_with_source(line).0
    }

    pub fn resolve_with_source(&self, line: &TransactionLine) -> (f64, RateSource) {
        let key = (line.referral_doctor.clone(), line.item_name.clone());
        if let Some(cell) = self.special.get(&key) {
            if !cell.is_missing() {
                return (cell.as_f64().unwrap_or(0.0), RateSource::Special);
            }
        }

        let default = Department::from_name(&line.department)
            .and_then(|dept| self.defaults.get(&line.referral_doctor)?.get(&dept))
            .filter(|cell| !cell.is_missing());
        match default {
            Some(cell) => (cell.as_f64().unwrap_or(0.0), RateSource::Default),
            None => (0.0, RateSource::None),
        }
    }
}
