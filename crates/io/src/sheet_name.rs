//! Excel-safe worksheet names.

use std::collections::HashSet;

pub const MAX_SHEET_NAME: usize = 31;
const FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Replace forbidden characters, strip edge apostrophes, cap the length.
pub fn sanitize(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'');
    let mut name: String = trimmed.chars().take(MAX_SHEET_NAME).collect();
    if name.trim().is_empty() {
        name = "Sheet".to_string();
    }
    // Excel reserves this name.
    if name.eq_ignore_ascii_case("History") {
        name.push('_');
    }
    name
}

/// Hands out unique sheet names; uniqueness is case-insensitive like Excel.
#[derive(Debug, Default)]
pub struct SheetNamer {
    used: HashSet<String>,
}

impl SheetNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, raw: &str) -> String {
        let base = sanitize(raw);
        let mut name = base.clone();
        let mut n = 2;
        while self.used.contains(&name.to_lowercase()) {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
            let stem: String = base.chars().take(keep).collect();
            name = format!("{}{}", stem.trim_end(), suffix);
            n += 1;
        }
        self.used.insert(name.to_lowercase());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_characters_are_replaced() {
        assert_eq!(sanitize("MK/01:A"), "MK_01_A");
        assert_eq!(sanitize("[x]*?\\"), "_x____");
        assert_eq!(sanitize("'quoted'"), "quoted");
        assert_eq!(sanitize("   "), "Sheet");
        assert_eq!(sanitize("history"), "history_");
    }

    #[test]
    fn long_names_are_cut() {
        let long = "A".repeat(40);
        assert_eq!(sanitize(&long).len(), MAX_SHEET_NAME);
    }

    #[test]
    fn duplicates_get_numbered_case_insensitively() {
        let mut namer = SheetNamer::new();
        assert_eq!(namer.assign("Walking Patient"), "Walking Patient");
        assert_eq!(namer.assign("walking patient"), "walking patient (2)");
        assert_eq!(namer.assign("Walking Patient"), "Walking Patient (3)");

        let long = "B".repeat(31);
        assert_eq!(namer.assign(&long), long);
        let second = namer.assign(&long);
        assert_eq!(second, format!("{} (2)", "B".repeat(27)));
        assert_eq!(second.chars().count(), MAX_SHEET_NAME);
    }
}
