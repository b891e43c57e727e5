use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cell::CellValue;
use crate::dataset::Dataset;
use crate::error::{ExplorerError, Result};
use crate::pipeline::UnknownColumnPolicy;

/// Value substitution for one column, applied once right after load
///
/// Keys are matched against the displayed text of a cell, so a numeric
/// priority code `1` read from the sheet matches the key `"1"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recoding {
    pub column: String,
    pub mapping: BTreeMap<String, String>,
}

impl Recoding {
    /// The priority-code labels used by the survey sheet.
    pub fn priority_labels() -> Self {
        let mapping = [("1", "High"), ("2", "Medium"), ("3", "Low")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Recoding {
            column: "Priority".to_string(),
            mapping,
        }
    }

    /// Map a single value. Unmapped values pass through unchanged.
    pub fn map_value(&self, value: &CellValue) -> CellValue {
        if !value.is_present() {
            return value.clone();
        }
        match self.mapping.get(&value.to_string()) {
            Some(label) => CellValue::text(label.as_str()).normalized(),
            None => value.clone(),
        }
    }

    /// Recode the configured column of a freshly loaded dataset
    ///
    /// # Arguments
    /// * `dataset` - Dataset to rewrite in place, before it is shared
    /// * `policy` - What to do when the column does not exist
    ///
    /// # Returns
    /// * `Result<()>` - `UnknownColumn` when the column is absent and the policy rejects it
    pub fn apply(&self, dataset: &mut Dataset, policy: UnknownColumnPolicy) -> Result<()> {
        let Some(idx) = dataset.column_index(&self.column) else {
            return match policy {
                UnknownColumnPolicy::Reject => {
                    Err(ExplorerError::UnknownColumn(self.column.clone()))
                }
                UnknownColumnPolicy::Ignore => {
                    warn!("recoding skipped, column '{}' not in dataset", self.column);
                    Ok(())
                }
            };
        };

        for record in &mut dataset.records {
            record[idx] = self.map_value(&record[idx]);
        }

        Ok(())
    }
}
