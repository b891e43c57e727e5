use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::cell::CellValue;
use crate::error::{ExplorerError, Result};

/// An in-memory survey table
///
/// Columns keep their spreadsheet order and every record holds exactly one
/// value per column. A dataset is never mutated once it has been loaded and
/// recoded; pipeline runs only read from it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub records: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Build a dataset from a header and raw rows
    ///
    /// Short rows are padded with `CellValue::Empty` and long rows are cut to
    /// the header width, so every record lines up with `columns`. Empty
    /// strings are stored as `CellValue::Empty`.
    ///
    /// # Arguments
    /// * `columns` - Header row, in sheet order
    /// * `rows` - Data rows, in sheet order
    ///
    /// # Returns
    /// * `Dataset` - The normalised table
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let records = rows
            .into_iter()
            .map(|row| {
                let mut row: Vec<CellValue> = row.into_iter().map(CellValue::normalized).collect();
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();

        Dataset { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a column in the header, first match wins.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Look up a single cell by row number and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.records.get(row).and_then(|r| r.get(idx))
    }

    /// Distinct present values of a column
    ///
    /// Empty cells are skipped and values come back in the order they first
    /// appear, which is what the value pickers show.
    ///
    /// # Arguments
    /// * `column` - Column to scan
    ///
    /// # Returns
    /// * `Result<Vec<CellValue>>` - Unique values, or `UnknownColumn`
    pub fn unique_values(&self, column: &str) -> Result<Vec<CellValue>> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| ExplorerError::UnknownColumn(column.to_string()))?;

        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for record in &self.records {
            let value = &record[idx];
            if value.is_present() && seen.insert(value.clone()) {
                values.push(value.clone());
            }
        }

        Ok(values)
    }
}

/// A loaded workbook: the primary survey sheet plus any auxiliary detail
/// sheets, keyed by sheet name.
#[derive(Clone, Debug, Default)]
pub struct Workbook {
    pub primary: Dataset,
    pub auxiliary: BTreeMap<String, Dataset>,
}

impl Workbook {
    pub fn new(primary: Dataset) -> Self {
        Workbook {
            primary,
            auxiliary: BTreeMap::new(),
        }
    }

    pub fn auxiliary_sheet(&self, name: &str) -> Option<&Dataset> {
        self.auxiliary.get(name)
    }
}
