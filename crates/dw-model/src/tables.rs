//! Named collections of tables.
//!
//! Raw extracts, built dimensions, and built facts all travel between stages
//! as a [`TableSet`]. Builders only ever read from the raw side through the
//! [`RawProvider`] seam, so the storage format stays the collaborator's concern.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;

/// Lookup of raw tables by name.
pub trait RawProvider {
    /// Returns the named table, or `None` when the extract does not carry it.
    fn get(&self, name: &str) -> Option<&DataFrame>;
}

/// An ordered map from table name to table.
///
/// Iteration is sorted by name, which keeps output order (and therefore
/// output bytes) stable across runs.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    tables: BTreeMap<String, DataFrame>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table, replacing any previous table of the same name.
    pub fn insert(&mut self, name: impl Into<String>, table: DataFrame) {
        self.tables.insert(name.into(), table);
    }

    /// Builder-style [`TableSet::insert`].
    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, table: DataFrame) -> Self {
        self.insert(name, table);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        self.tables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DataFrame> {
        self.tables.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<DataFrame> {
        self.tables.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataFrame)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut DataFrame)> {
        self.tables
            .iter_mut()
            .map(|(name, table)| (name.as_str(), table))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Move every table of `other` into this set.
    pub fn extend(&mut self, other: TableSet) {
        self.tables.extend(other.tables);
    }
}

impl RawProvider for TableSet {
    fn get(&self, name: &str) -> Option<&DataFrame> {
        self.tables.get(name)
    }
}

impl IntoIterator for TableSet {
    type Item = (String, DataFrame);
    type IntoIter = std::collections::btree_map::IntoIter<String, DataFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

impl FromIterator<(String, DataFrame)> for TableSet {
    fn from_iter<I: IntoIterator<Item = (String, DataFrame)>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}
