//! Fixed department catalog for the referral policy sheet.
//!
//! Each catalog department owns one rate column in the policy sheet. The
//! column is found through this table, never by list position, so the
//! variant order below does not matter to lookups.

/// Policy columns before the first department rate column.
pub const POLICY_RATE_OFFSET: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Department {
    Biochemistry,
    ClinicalPathology,
    CytoPathology,
    Haematology,
    Immunology,
    Microbiology,
    Serology,
    HistoPathology,
    Immunohistochemistry,
    MolecularBiology,
    Flowcytometry,
    PharmacogeneticsLab,
    PcrLab,
    Ecg,
    CardiacTest,
    XRay,
    Usg3d4d,
}

/// (sheet name, department, catalog index).
static CATALOG: [(&str, Department, usize); 17] = [
    ("BIOCHEMISTRY", Department::Biochemistry, 0),
    ("CLINICAL PATHOLOGY", Department::ClinicalPathology, 1),
    ("CYTO-PATHOLOGY", Department::CytoPathology, 2),
    ("HAEMATOLOGY", Department::Haematology, 3),
    ("IMMUNOLOGY", Department::Immunology, 4),
    ("MICROBIOLOGY", Department::Microbiology, 5),
    ("SEROLOGY", Department::Serology, 6),
    ("HISTO-PATHOLOGY", Department::HistoPathology, 7),
    ("IMMUNOHISTOCHEMISTRY", Department::Immunohistochemistry, 8),
    ("MOLECULAR BIOLOGY", Department::MolecularBiology, 9),
    ("Flowcytometry", Department::Flowcytometry, 10),
    ("PHARMACOGENETICS LAB", Department::PharmacogeneticsLab, 11),
    ("PCR LAB", Department::PcrLab, 12),
    ("ECG", Department::Ecg, 13),
    ("CARDIAC TEST", Department::CardiacTest, 14),
    ("X-RAY", Department::XRay, 15),
    ("USG 3D/4D", Department::Usg3d4d, 16),
];

impl Department {
    pub const COUNT: usize = 17;

    /// Exact, case-sensitive match against the catalog names.
    pub fn from_name(name: &str) -> Option<Self> {
        CATALOG
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, d, _)| *d)
    }

    pub fn name(self) -> &'static str {
        self.entry().0
    }

    /// Catalog index, 0-based.
    pub fn index(self) -> usize {
        self.entry().2
    }

    /// 0-based column of this department's rate in the policy sheet.
    pub fn policy_column(self) -> usize {
        self.index() + POLICY_RATE_OFFSET
    }

    /// Every department, in catalog order.
    pub fn all() -> impl Iterator<Item = Department> {
        CATALOG.iter().map(|(_, d, _)| *d)
    }

    fn entry(self) -> &'static (&'static str, Department, usize) {
        CATALOG
            .iter()
            .find(|(_, d, _)| *d == self)
            .unwrap_or(&CATALOG[0])
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
