use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::cell::CellValue;
use crate::dataset::{Dataset, Workbook};
use crate::error::{ExplorerError, Result};

/// What a filter should do when it names a column the dataset lacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownColumnPolicy {
    /// Fail the run with `ExplorerError::UnknownColumn`.
    #[default]
    Reject,
    /// Treat the predicate as matching every record.
    Ignore,
}

/// Static column classification, taken from configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    /// Always exported, in this order.
    pub mandatory: Vec<String>,
    /// Presence indicators, used only to filter rows.
    pub support: Vec<String>,
    /// Secondary geographic column (taluka).
    pub geographic: Option<String>,
}

impl ColumnRoles {
    pub fn is_mandatory(&self, column: &str) -> bool {
        self.mandatory.iter().any(|c| c == column)
    }

    pub fn is_support(&self, column: &str) -> bool {
        self.support.iter().any(|c| c == column)
    }
}

/// The filter parameters of one operator session
///
/// Every field defaults to "inactive", so `FilterParams::default()` keeps all
/// records and only the mandatory columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub primary_column: Option<String>,
    pub primary_values: BTreeSet<CellValue>,
    pub support_filters: Vec<String>,
    pub geographic_values: BTreeSet<CellValue>,
    pub selected_columns: Vec<String>,
    pub search: String,
}

/// Result of one pipeline run: header plus the retained, projected records.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct View {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl View {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An auxiliary sheet surfaced next to the primary view, unmodified.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuxiliaryTable<'a> {
    pub sentinel: String,
    pub sheet: String,
    pub table: &'a Dataset,
}

/// A single row predicate bound to a column position.
enum Predicate<'p> {
    Membership(usize, &'p BTreeSet<CellValue>),
    NonEmpty(usize),
}

impl Predicate<'_> {
    fn matches(&self, record: &[CellValue]) -> bool {
        match self {
            Predicate::Membership(idx, allowed) => allowed.contains(&record[*idx]),
            Predicate::NonEmpty(idx) => record[*idx].is_present(),
        }
    }
}

/// Resolve a filter column, honouring the unknown-column policy.
///
/// `Ok(None)` means the predicate is dropped and matches everything.
fn resolve(dataset: &Dataset, column: &str, policy: UnknownColumnPolicy) -> Result<Option<usize>> {
    match (dataset.column_index(column), policy) {
        (Some(idx), _) => Ok(Some(idx)),
        (None, UnknownColumnPolicy::Ignore) => Ok(None),
        (None, UnknownColumnPolicy::Reject) => Err(ExplorerError::UnknownColumn(column.to_string())),
    }
}

fn active_predicates<'p>(
    dataset: &Dataset,
    roles: &ColumnRoles,
    params: &'p FilterParams,
    sentinels: &BTreeMap<String, String>,
    policy: UnknownColumnPolicy,
) -> Result<Vec<Predicate<'p>>> {
    let mut predicates = Vec::new();

    if !params.primary_values.is_empty() {
        match (params.primary_column.as_deref(), policy) {
            (Some(column), _) => {
                if let Some(idx) = resolve(dataset, column, policy)? {
                    predicates.push(Predicate::Membership(idx, &params.primary_values));
                }
            }
            (None, UnknownColumnPolicy::Reject) => {
                return Err(ExplorerError::NotConfigured("primary column"));
            }
            (None, UnknownColumnPolicy::Ignore) => {}
        }
    }

    for column in &params.support_filters {
        let sentinel = sentinels.contains_key(column);
        // A sentinel that is not a real column only selects its auxiliary sheet.
        if sentinel && !dataset.has_column(column) {
            continue;
        }
        let Some(idx) = resolve(dataset, column, policy)? else {
            continue;
        };
        if !sentinel && !roles.is_support(column) {
            match policy {
                UnknownColumnPolicy::Reject => {
                    return Err(ExplorerError::NotSupportColumn(column.clone()));
                }
                UnknownColumnPolicy::Ignore => continue,
            }
        }
        predicates.push(Predicate::NonEmpty(idx));
    }

    if !params.geographic_values.is_empty() {
        match (roles.geographic.as_deref(), policy) {
            (Some(column), _) => {
                if let Some(idx) = resolve(dataset, column, policy)? {
                    predicates.push(Predicate::Membership(idx, &params.geographic_values));
                }
            }
            (None, UnknownColumnPolicy::Reject) => {
                return Err(ExplorerError::NotConfigured("geographic column"));
            }
            (None, UnknownColumnPolicy::Ignore) => {}
        }
    }

    Ok(predicates)
}

/// Indices of the records that pass every active predicate
///
/// Filtering is conjunctive and stable: the returned indices are ascending,
/// so retained records keep their dataset order.
///
/// # Arguments
/// * `dataset` - Source table, left untouched
/// * `roles` - Column roles from configuration
/// * `params` - Current session parameters
/// * `sentinels` - Support values that map to auxiliary sheets
/// * `policy` - Unknown-column handling
///
/// # Returns
/// * `Result<Vec<usize>>` - Retained row numbers, or `UnknownColumn`
pub fn filtered_indices(
    dataset: &Dataset,
    roles: &ColumnRoles,
    params: &FilterParams,
    sentinels: &BTreeMap<String, String>,
    policy: UnknownColumnPolicy,
) -> Result<Vec<usize>> {
    let predicates = active_predicates(dataset, roles, params, sentinels, policy)?;

    Ok(dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, record)| predicates.iter().all(|p| p.matches(record)))
        .map(|(i, _)| i)
        .collect())
}

/// Columns a view emits: mandatory columns first, then the selection in the
/// order it was made. Names missing from the dataset are dropped and every
/// name appears once.
pub fn emitted_columns(dataset: &Dataset, roles: &ColumnRoles, selected: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for name in roles.mandatory.iter().chain(selected) {
        if dataset.has_column(name) && !columns.contains(name) {
            columns.push(name.clone());
        }
    }
    columns
}

/// Project the given rows onto mandatory plus selected columns.
pub fn project(dataset: &Dataset, roles: &ColumnRoles, selected: &[String], indices: &[usize]) -> View {
    let columns = emitted_columns(dataset, roles, selected);
    let positions: Vec<usize> = columns
        .iter()
        .filter_map(|c| dataset.column_index(c))
        .collect();

    let rows = indices
        .iter()
        .filter_map(|&i| dataset.records.get(i))
        .map(|record| positions.iter().map(|&p| record[p].clone()).collect())
        .collect();

    View { columns, rows }
}

/// Run the whole filter-and-project pipeline
///
/// # Arguments
/// * `dataset` - Source table
/// * `roles` - Column roles from configuration
/// * `params` - Current session parameters
/// * `sentinels` - Support values that map to auxiliary sheets
/// * `policy` - Unknown-column handling
///
/// # Returns
/// * `Result<View>` - The reportable view; zero matches give an empty view with the full header
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use survey_explorer::dataset::Dataset;
/// use survey_explorer::pipeline::{evaluate, ColumnRoles, FilterParams, UnknownColumnPolicy};
///
/// let ds = Dataset::new(
///     vec!["farmer_id".into(), "Health".into()],
///     vec![vec![1i64.into(), "".into()], vec![2i64.into(), "yes".into()]],
/// );
/// let roles = ColumnRoles {
///     mandatory: vec!["farmer_id".into()],
///     support: vec!["Health".into()],
///     geographic: None,
/// };
/// let params = FilterParams {
///     support_filters: vec!["Health".into()],
///     ..Default::default()
/// };
/// let view = evaluate(&ds, &roles, &params, &BTreeMap::new(), UnknownColumnPolicy::Reject).unwrap();
/// assert_eq!(view.columns, vec!["farmer_id"]);
/// assert_eq!(view.len(), 1);
/// ```
pub fn evaluate(
    dataset: &Dataset,
    roles: &ColumnRoles,
    params: &FilterParams,
    sentinels: &BTreeMap<String, String>,
    policy: UnknownColumnPolicy,
) -> Result<View> {
    let indices = filtered_indices(dataset, roles, params, sentinels, policy)?;
    Ok(project(dataset, roles, &params.selected_columns, &indices))
}

/// Dataset columns that are neither mandatory nor support, in sheet order.
pub fn optional_columns(dataset: &Dataset, roles: &ColumnRoles) -> Vec<String> {
    dataset
        .columns
        .iter()
        .filter(|c| !roles.is_mandatory(c) && !roles.is_support(c))
        .cloned()
        .collect()
}

/// Optional columns offered for selection under a search term
///
/// Matching is a case-insensitive substring test; an empty term offers every
/// optional column. Selections already made are not affected.
pub fn offered_columns(dataset: &Dataset, roles: &ColumnRoles, term: &str) -> Vec<String> {
    let needle = term.to_lowercase();
    optional_columns(dataset, roles)
        .into_iter()
        .filter(|c| c.to_lowercase().contains(&needle))
        .collect()
}

/// Auxiliary sheets to show next to the view
///
/// Every active support filter that equals a configured sentinel brings in
/// its sheet unmodified. Sentinels whose sheet is not in the workbook are
/// skipped.
pub fn auxiliary_tables<'a>(
    workbook: &'a Workbook,
    params: &FilterParams,
    sentinels: &BTreeMap<String, String>,
) -> Vec<AuxiliaryTable<'a>> {
    params
        .support_filters
        .iter()
        .filter_map(|filter| {
            let sheet = sentinels.get(filter)?;
            let table = workbook.auxiliary_sheet(sheet)?;
            Some(AuxiliaryTable {
                sentinel: filter.clone(),
                sheet: sheet.clone(),
                table,
            })
        })
        .collect()
}
