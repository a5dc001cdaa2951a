//! Cortex Search filter expressions and the attribute-selection builder

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{Error, Result};

/// Boolean filter tree understood by Cortex Search
///
/// Serializes to the service's wire form: `{"@and": [...]}`, `{"@or": [...]}`,
/// `{"@eq": {col: val}}`, `{"@contains": {col: val}}`. [`FilterExpr::MatchAll`]
/// serializes to `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FilterExpr {
    #[default]
    MatchAll,
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Equals { column: String, value: String },
    Contains { column: String, value: String },
}

impl FilterExpr {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::Equals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn contains(column: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::Contains {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, FilterExpr::MatchAll)
    }
}

impl Serialize for FilterExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FilterExpr::MatchAll => serializer.serialize_map(Some(0))?.end(),
            FilterExpr::And(clauses) => single_entry(serializer, "@and", clauses),
            FilterExpr::Or(clauses) => single_entry(serializer, "@or", clauses),
            FilterExpr::Equals { column, value } => {
                single_entry(serializer, "@eq", &BTreeMap::from([(column, value)]))
            }
            FilterExpr::Contains { column, value } => {
                single_entry(serializer, "@contains", &BTreeMap::from([(column, value)]))
            }
        }
    }
}

fn single_entry<S, V>(serializer: S, key: &str, value: &V) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

/// Per-column attribute values picked by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSelection {
    columns: BTreeMap<String, BTreeSet<String>>,
}

impl AttributeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to a column's selection
    pub fn select(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.columns
            .entry(column.into())
            .or_default()
            .insert(value.into());
    }

    /// Parse and add a `COLUMN=VALUE` pair
    pub fn select_pair(&mut self, pair: &str) -> Result<()> {
        let (column, value) = pair
            .split_once('=')
            .map(|(c, v)| (c.trim(), v.trim()))
            .filter(|(c, v)| !c.is_empty() && !v.is_empty())
            .ok_or_else(|| {
                Error::InvalidInput(format!("expected COLUMN=VALUE, got '{}'", pair))
            })?;
        self.select(column, value);
        Ok(())
    }

    /// Make sure a column is present, possibly with no values
    pub fn touch(&mut self, column: impl Into<String>) {
        self.columns.entry(column.into()).or_default();
    }

    pub fn clear(&mut self) {
        self.columns.clear();
    }

    /// True when no column has any selected value
    pub fn is_empty(&self) -> bool {
        self.columns.values().all(BTreeSet::is_empty)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), v))
    }
}

/// Translate an attribute selection into a filter expression
///
/// Columns listed in `array_attributes` get one `@contains` clause per value;
/// every other column gets a single `@or` of `@eq` clauses. Columns without
/// values are skipped, and an empty conjunction collapses to
/// [`FilterExpr::MatchAll`].
pub fn build_filter(selection: &AttributeSelection, array_attributes: &BTreeSet<String>) -> FilterExpr {
    let mut and_clauses = Vec::new();

    for (column, values) in selection.iter() {
        if values.is_empty() {
            continue;
        }

        if array_attributes.contains(column) {
            and_clauses.extend(values.iter().map(|v| FilterExpr::contains(column, v)));
        } else {
            let or_clauses = values.iter().map(|v| FilterExpr::equals(column, v)).collect();
            and_clauses.push(FilterExpr::Or(or_clauses));
        }
    }

    if and_clauses.is_empty() {
        FilterExpr::MatchAll
    } else {
        FilterExpr::And(and_clauses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn selection(pairs: &[(&str, &str)]) -> AttributeSelection {
        let mut selection = AttributeSelection::new();
        for (column, value) in pairs {
            selection.select(*column, *value);
        }
        selection
    }

    #[test]
    fn empty_selection_builds_match_all() {
        let filter = build_filter(&AttributeSelection::new(), &BTreeSet::new());
        assert!(filter.is_match_all());
        assert_eq!(serde_json::to_value(&filter).unwrap(), json!({}));
    }

    #[test]
    fn columns_without_values_are_skipped() {
        let mut sel = AttributeSelection::new();
        sel.touch("CHAPTER");
        assert!(sel.is_empty());
        assert!(build_filter(&sel, &BTreeSet::new()).is_match_all());
    }

    #[test]
    fn single_valued_column_becomes_one_disjunction() {
        let filter = build_filter(&selection(&[("CHAPTER", "a"), ("CHAPTER", "b")]), &BTreeSet::new());

        assert_eq!(
            filter,
            FilterExpr::And(vec![FilterExpr::Or(vec![
                FilterExpr::equals("CHAPTER", "a"),
                FilterExpr::equals("CHAPTER", "b"),
            ])])
        );
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"@and": [{"@or": [{"@eq": {"CHAPTER": "a"}}, {"@eq": {"CHAPTER": "b"}}]}]})
        );
    }

    #[test]
    fn array_column_becomes_separate_containment_clauses() {
        let arrays = BTreeSet::from(["TAGS".to_string()]);
        let filter = build_filter(&selection(&[("TAGS", "a"), ("TAGS", "b")]), &arrays);

        assert_eq!(
            filter,
            FilterExpr::And(vec![
                FilterExpr::contains("TAGS", "a"),
                FilterExpr::contains("TAGS", "b"),
            ])
        );
    }

    #[test]
    fn mixed_columns_are_conjoined() {
        let arrays = BTreeSet::from(["TAGS".to_string()]);
        let filter = build_filter(
            &selection(&[("TAGS", "zoning"), ("CHAPTER", "4")]),
            &arrays,
        );

        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"@and": [
                {"@or": [{"@eq": {"CHAPTER": "4"}}]},
                {"@contains": {"TAGS": "zoning"}}
            ]})
        );
    }

    #[test]
    fn select_pair_rejects_malformed_input() {
        let mut sel = AttributeSelection::new();
        sel.select_pair("CHAPTER = 4 ").unwrap();
        assert!(sel.select_pair("CHAPTER").is_err());
        assert!(sel.select_pair("=4").is_err());
        assert_eq!(sel.columns().collect::<Vec<_>>(), vec!["CHAPTER"]);
    }
}
