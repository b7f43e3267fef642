//! The single join primitive used by every builder.
//!
//! [`safe_join`] degrades instead of failing: an absent or empty right side,
//! or a key missing from either side, returns the left table unchanged. Keys
//! are compared by their rendered value (see [`dw_common::any_to_key`]), so
//! the same identifier inferred as `Int64` in one extract and `String` in
//! another still matches. Null keys never match.

use std::collections::{HashMap, HashSet};

use polars::prelude::*;
use tracing::{debug, warn};

use crate::data_utils::{column_keys, has_column};
use crate::error::{Result, TransformError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinHow {
    #[default]
    Left,
    Inner,
}

#[derive(Debug, Clone)]
pub struct JoinOptions {
    pub how: JoinHow,
    /// Appended to right-side columns whose name already exists on the left.
    pub suffix: String,
    /// Raise [`TransformError::MissingJoinKey`] instead of degrading.
    pub strict: bool,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            how: JoinHow::Left,
            suffix: "_right".to_string(),
            strict: false,
        }
    }
}

impl JoinOptions {
    pub fn inner() -> Self {
        Self {
            how: JoinHow::Inner,
            ..Self::default()
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// Left join `right` onto `left` on `keys`, degrading to a no-op when the join
/// is not possible.
pub fn safe_join(left: &DataFrame, right: Option<&DataFrame>, keys: &[&str]) -> Result<DataFrame> {
    safe_join_with(left, right, keys, &JoinOptions::default())
}

/// [`safe_join`] with explicit options.
///
/// Output rows follow left row order; a left row with several matches is
/// repeated once per match, in right row order. Key columns appear once, taken
/// from the left side.
pub fn safe_join_with(
    left: &DataFrame,
    right: Option<&DataFrame>,
    keys: &[&str],
    options: &JoinOptions,
) -> Result<DataFrame> {
    if let Some(key) = keys
        .iter()
        .find(|key| !has_column(left, key) || right.is_some_and(|r| !has_column(r, key)))
    {
        if options.strict {
            return Err(TransformError::MissingJoinKey {
                key: (*key).to_string(),
            });
        }
        warn!(key = %key, "join key missing, skipping join");
        return Ok(left.clone());
    }
    let Some(right) = right else {
        debug!("right side absent, skipping join");
        return Ok(left.clone());
    };
    if right.height() == 0 || keys.is_empty() {
        debug!(rows = right.height(), "right side empty, skipping join");
        return Ok(left.clone());
    }

    let right_index = index_rows(right, keys);
    let left_keys = composite_keys(left, keys);

    let mut left_take: Vec<IdxSize> = Vec::with_capacity(left.height());
    let mut right_take: Vec<Option<usize>> = Vec::with_capacity(left.height());
    let mut matched = 0usize;
    for (idx, key) in left_keys.iter().enumerate() {
        let matches = key.as_ref().and_then(|key| right_index.get(key));
        match matches {
            Some(rows) => {
                matched += 1;
                for row in rows {
                    left_take.push(idx as IdxSize);
                    right_take.push(Some(*row));
                }
            }
            None if options.how == JoinHow::Left => {
                left_take.push(idx as IdxSize);
                right_take.push(None);
            }
            None => {}
        }
    }

    let indices = IdxCa::from_vec("idx".into(), left_take);
    let mut joined = left.take(&indices)?;

    let mut taken: HashSet<String> = joined
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    for column in right.get_columns() {
        let name = column.name().as_str();
        if keys.contains(&name) {
            continue;
        }
        let mut output = name.to_string();
        while taken.contains(&output) {
            output.push_str(&options.suffix);
        }
        let values: Vec<AnyValue<'_>> = right_take
            .iter()
            .map(|row| match row {
                Some(row) => column.get(*row).unwrap_or(AnyValue::Null),
                None => AnyValue::Null,
            })
            .collect();
        let series =
            Series::from_any_values_and_dtype(output.as_str().into(), &values, column.dtype(), false)?;
        joined.with_column(series)?;
        taken.insert(output);
    }

    debug!(
        keys = ?keys,
        left_rows = left.height(),
        right_rows = right.height(),
        matched,
        rows = joined.height(),
        "joined"
    );
    Ok(joined)
}

fn composite_keys(df: &DataFrame, keys: &[&str]) -> Vec<Option<Vec<String>>> {
    let columns: Vec<Vec<Option<String>>> = keys
        .iter()
        .map(|key| column_keys(df, key).unwrap_or_else(|| vec![None; df.height()]))
        .collect();
    (0..df.height())
        .map(|idx| columns.iter().map(|column| column[idx].clone()).collect())
        .collect()
}

fn index_rows(df: &DataFrame, keys: &[&str]) -> HashMap<Vec<String>, Vec<usize>> {
    let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (idx, key) in composite_keys(df, keys).into_iter().enumerate() {
        if let Some(key) = key {
            index.entry(key).or_default().push(idx);
        }
    }
    index
}
