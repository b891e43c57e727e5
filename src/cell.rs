use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single scalar cell of the survey table.
///
/// The JSON form is untagged so the browser sees plain strings, numbers,
/// booleans and `null` for empty cells.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl CellValue {
    /// Create a text cell
    ///
    /// # Arguments
    /// * `text` - Anything convertible into a `String`
    ///
    /// # Returns
    /// * `CellValue` - A `Text` cell holding the given string
    pub fn text(text: impl Into<String>) -> Self {
        CellValue::Text(text.into())
    }

    /// Whether the cell carries a value at all.
    ///
    /// Both a missing value and an empty string count as absent, which is what
    /// the support-column filter relies on.
    pub fn is_present(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Text(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Collapse an empty string to `Empty`.
    ///
    /// Every cell stored in a dataset goes through this, so a view never holds
    /// `Text("")` and an exported sheet reads back cell for cell.
    pub fn normalized(self) -> Self {
        match self {
            CellValue::Text(s) if s.is_empty() => CellValue::Empty,
            other => other,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Empty => 0,
            CellValue::Bool(_) => 1,
            CellValue::Number(_) => 2,
            CellValue::Text(_) => 3,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

// Numbers compare with total_cmp so cells can be kept in ordered sets.
impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CellValue::Empty, CellValue::Empty) => Ordering::Equal,
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Number(n) => n.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Empty => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn empty_string_is_not_present() {
        assert!(!CellValue::Empty.is_present());
        assert!(!CellValue::text("").is_present());
        assert!(CellValue::text("yes").is_present());
        assert!(CellValue::Number(0.0).is_present());
        assert!(CellValue::Bool(false).is_present());
    }

    #[test]
    fn normalized_collapses_only_empty_text() {
        assert_eq!(CellValue::text("").normalized(), CellValue::Empty);
        assert_eq!(CellValue::text(" ").normalized(), CellValue::text(" "));
        assert_eq!(CellValue::Number(0.0).normalized(), CellValue::Number(0.0));
    }

    #[test]
    fn whole_numbers_display_without_fraction() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn mixed_values_sort_by_kind_then_value() {
        let set: BTreeSet<CellValue> = [
            CellValue::text("b"),
            CellValue::Number(2.0),
            CellValue::Empty,
            CellValue::text("a"),
            CellValue::Number(1.0),
        ]
        .into_iter()
        .collect();
        let ordered: Vec<CellValue> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![
                CellValue::Empty,
                CellValue::Number(1.0),
                CellValue::Number(2.0),
                CellValue::text("a"),
                CellValue::text("b"),
            ]
        );
    }

    #[test]
    fn json_form_is_untagged() {
        let values = vec![
            CellValue::text("Pune"),
            CellValue::Number(3.0),
            CellValue::Bool(true),
            CellValue::Empty,
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"["Pune",3.0,true,null]"#);

        let back: Vec<CellValue> = serde_json::from_str(r#"["Pune",3,true,null]"#).unwrap();
        assert_eq!(back, values);
    }
}
