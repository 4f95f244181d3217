//! Column interning: raw columns in, numeric columns plus decode tables out.
//!
//! The numeric/categorical decision is column-global, so interning is two-pass: scan the whole
//! column first, then encode.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::types::{DecodeTable, RawColumn, RawValue};

/// Result of interning one column.
#[derive(Debug, Clone, PartialEq)]
pub struct InternedColumn {
    /// One value per row: the number itself, or the category code.
    pub values: Vec<f64>,
    /// Empty unless the column was categorical.
    pub decode: DecodeTable,
}

/// Intern a single raw column.
///
/// - If every non-missing cell is a number, values pass through and missing cells become `NaN`.
/// - Otherwise every cell (numbers and missing cells included) is keyed by its
///   [`RawValue::canonical`] string and assigned a code in first-occurrence order from 0.
pub fn intern_column(column: RawColumn) -> InternedColumn {
    let numeric = column
        .iter()
        .all(|v| matches!(v, RawValue::Number(_) | RawValue::Missing));

    if numeric {
        let values = column
            .into_iter()
            .map(|v| match v {
                RawValue::Number(n) => n,
                _ => f64::NAN,
            })
            .collect();
        return InternedColumn {
            values,
            decode: DecodeTable::default(),
        };
    }

    let mut codes: HashMap<String, usize> = HashMap::new();
    let mut table: Vec<String> = Vec::new();
    let values = column
        .into_iter()
        .map(|v| {
            let key = match v {
                RawValue::Text(s) => s,
                other => other.canonical(),
            };
            let code = match codes.get(&key) {
                Some(&c) => c,
                None => {
                    let c = table.len();
                    table.push(key.clone());
                    codes.insert(key, c);
                    c
                }
            };
            code as f64
        })
        .collect();

    InternedColumn {
        values,
        decode: DecodeTable::new(table),
    }
}

/// Intern every column of a column set, preserving column order.
///
/// Columns are independent, so with `parallel` they are interned on the rayon pool.
pub fn intern_columns(columns: Vec<RawColumn>, parallel: bool) -> Vec<InternedColumn> {
    if parallel {
        columns.into_par_iter().map(intern_column).collect()
    } else {
        columns.into_iter().map(intern_column).collect()
    }
}
