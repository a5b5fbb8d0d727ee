use std::collections::HashMap;

use dmfr_core::{SheetSet, Table};

use crate::workbook::WorkbookSource;

/// Memoized sheet reads keyed by (workbook identity, sheet name).
#[derive(Debug, Default)]
pub struct SheetCache {
    tables: HashMap<(String, String), Table>,
    hits: usize,
    misses: usize,
}

impl SheetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, source: &WorkbookSource, sheet: &str) -> Result<&Table, String> {
        let key = (source.identity().to_string(), sheet.to_string());
        if self.tables.contains_key(&key) {
            self.hits += 1;
            tracing::debug!(sheet, "sheet cache hit");
        } else {
            self.misses += 1;
            let table = source.read_sheet(sheet)?;
            self.tables.insert(key.clone(), table);
        }
        self.tables
            .get(&key)
            .ok_or_else(|| format!("Sheet '{}' vanished from cache", sheet))
    }

    /// Load several sheets into one set. Repeated names are read once.
    pub fn load_set<'a>(
        &mut self,
        source: &WorkbookSource,
        sheets: impl IntoIterator<Item = &'a str>,
    ) -> Result<SheetSet, String> {
        let mut set = SheetSet::new();
        for name in sheets {
            if set.get(name).is_none() {
                set.insert(self.load(source, name)?.clone());
            }
        }
        Ok(set)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
