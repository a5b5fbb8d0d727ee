use serde::Deserialize;

use crate::error::ReferralError;

/// Default output file name of the report artifact.
pub const DEFAULT_REPORT_FILE: &str = "updated_data.xlsx";

/// Departments dropped before any rate is applied.
pub const DEFAULT_EXCLUDED_DEPARTMENTS: [&str; 4] =
    ["CONSUMABLES", "MEDICINE", "SERVICE CHARGE", "HOME COLLECTION"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_excluded")]
    pub excluded_departments: Vec<String>,
    #[serde(default)]
    pub sheets: SheetSelection,
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            excluded_departments: default_excluded(),
            sheets: SheetSelection::default(),
            columns: ColumnConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

fn default_name() -> String {
    "DMFR Referral Sheet".into()
}

fn default_excluded() -> Vec<String> {
    DEFAULT_EXCLUDED_DEPARTMENTS.iter().map(|d| d.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Sheet selection
// ---------------------------------------------------------------------------

/// Which workbook sheet plays which role. Any of these may be filled in
/// later from the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetSelection {
    pub main: Option<String>,
    pub policy: Option<String>,
    pub doctor: Option<String>,
    pub special: Option<String>,
}

/// A complete selection, every role resolved to a sheet name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedSheets {
    pub main: String,
    pub policy: String,
    pub doctor: String,
    pub special: String,
}

impl SelectedSheets {
    /// (role, sheet name) pairs in report order.
    pub fn roles(&self) -> [(&'static str, &str); 4] {
        [
            ("main", self.main.as_str()),
            ("policy", self.policy.as_str()),
            ("special", self.special.as_str()),
            ("doctor", self.doctor.as_str()),
        ]
    }
}

impl SheetSelection {
    pub fn resolve(&self) -> Result<SelectedSheets, ReferralError> {
        let pick = |role: &str, value: &Option<String>| -> Result<String, ReferralError> {
            match value {
                Some(name) if !name.trim().is_empty() => Ok(name.clone()),
                Some(_) => Err(ReferralError::ConfigValidation(format!(
                    "{role} sheet name is blank"
                ))),
                None => Err(ReferralError::ConfigValidation(format!(
                    "no {role} sheet selected"
                ))),
            }
        };
        Ok(SelectedSheets {
            main: pick("main", &self.main)?,
            policy: pick("policy", &self.policy)?,
            doctor: pick("doctor", &self.doctor)?,
            special: pick("special", &self.special)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    #[serde(default)]
    pub main: MainColumns,
    #[serde(default)]
    pub policy: PolicyColumns,
    #[serde(default)]
    pub special: SpecialColumns,
    #[serde(default)]
    pub doctor: DoctorColumns,
}

/// Transaction log (test-wise) sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MainColumns {
    pub referral_doctor: String,
    pub department: String,
    pub item_name: String,
    pub item_rate: String,
    pub cancel_qty: String,
    pub total_sale: String,
    pub invoice_no: String,
}

impl Default for MainColumns {
    fn default() -> Self {
        Self {
            referral_doctor: "ReferralDoctor".into(),
            department: "Department".into(),
            item_name: "ItemName".into(),
            item_rate: "ItemRate".into(),
            cancel_qty: "CencelQty".into(),
            total_sale: "TotalSale".into(),
            invoice_no: "InvoiceNo".into(),
        }
    }
}

impl MainColumns {
    fn named(&self) -> [(&'static str, &str); 7] {
        [
            ("referral_doctor", self.referral_doctor.as_str()),
            ("department", self.department.as_str()),
            ("item_name", self.item_name.as_str()),
            ("item_rate", self.item_rate.as_str()),
            ("cancel_qty", self.cancel_qty.as_str()),
            ("total_sale", self.total_sale.as_str()),
            ("invoice_no", self.invoice_no.as_str()),
        ]
    }
}

/// Referral policy sheet. Rate columns are positional, so only the doctor
/// column is named.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyColumns {
    pub doctor_name: String,
}

impl Default for PolicyColumns {
    fn default() -> Self {
        Self {
            doctor_name: "DoctorName".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecialColumns {
    pub doctor_name: String,
    pub item_name: String,
    pub special_rate: String,
}

impl Default for SpecialColumns {
    fn default() -> Self {
        Self {
            doctor_name: "DoctorName".into(),
            item_name: "ItemName".into(),
            special_rate: "SpecialRate".into(),
        }
    }
}

/// Doctor-wise summary sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DoctorColumns {
    pub invoice_id: String,
    pub actual_total_sale: String,
    pub actual_total_discount: String,
    pub mkt_code: String,
}

impl Default for DoctorColumns {
    fn default() -> Self {
        Self {
            invoice_id: "InvoiceId".into(),
            actual_total_sale: "ActualTotalSale".into(),
            actual_total_discount: "ActualTotalDiscount".into(),
            mkt_code: "MktCode".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub file_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_REPORT_FILE.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReferralError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| ReferralError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything except the sheet selection, which may still be
    /// completed from the command line.
    pub fn validate(&self) -> Result<(), ReferralError> {
        let blank = |section: &str, field: &str, value: &str| -> Result<(), ReferralError> {
            if value.trim().is_empty() {
                return Err(ReferralError::ConfigValidation(format!(
                    "columns.{section}.{field} must not be blank"
                )));
            }
            Ok(())
        };

        for (field, value) in self.columns.main.named() {
            blank("main", field, value)?;
        }
        blank("policy", "doctor_name", &self.columns.policy.doctor_name)?;
        blank("special", "doctor_name", &self.columns.special.doctor_name)?;
        blank("special", "item_name", &self.columns.special.item_name)?;
        blank("special", "special_rate", &self.columns.special.special_rate)?;
        blank("doctor", "invoice_id", &self.columns.doctor.invoice_id)?;
        blank("doctor", "actual_total_sale", &self.columns.doctor.actual_total_sale)?;
        blank("doctor", "actual_total_discount", &self.columns.doctor.actual_total_discount)?;
        blank("doctor", "mkt_code", &self.columns.doctor.mkt_code)?;

        if self.excluded_departments.iter().any(|d| d.trim().is_empty()) {
            return Err(ReferralError::ConfigValidation(
                "excluded_departments must not contain blank entries".into(),
            ));
        }

        if self.output.file_name.trim().is_empty() {
            return Err(ReferralError::ConfigValidation(
                "output.file_name must not be blank".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
