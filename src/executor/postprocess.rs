//! Whole-result steps: HAVING, DISTINCT, ORDER BY, OFFSET and LIMIT.

use std::{cmp::Ordering, collections::HashSet};

use crate::{
    ast::{FieldPath, OrderByField, Query, SortDirection, WhereExpr},
    navigator::evaluate_where,
    result::ResultRow,
};

pub(crate) fn finish(query: &Query, rows: Vec<ResultRow>) -> Vec<ResultRow> {
    let mut rows = match &query.having {
        Some(having) => filter_having(query, having, rows),
        None => rows,
    };
    if query.distinct {
        rows = distinct(rows);
    }
    if !query.order_by_fields.is_empty() {
        sort_rows(&mut rows, &query.order_by_fields);
    }
    paginate(rows, query.offset, query.limit)
}

/// Column of an aggregated row that a HAVING field refers to.
fn having_column(query: &Query, field: &FieldPath, row: &ResultRow) -> Option<String> {
    let selected = query.select_fields.iter().find(|s| {
        s.aggregate == field.aggregate
            && s.components == field.components
            && s.attribute == field.attribute
            && s.include_filename == field.include_filename
    });
    let names = selected
        .map(FieldPath::column_name)
        .into_iter()
        .chain([field.column_name(), field.leaf_name(), field.path_string()]);

    for name in names {
        if let Some(value) = row.get(&name) {
            return Some(value.to_string());
        }
    }
    None
}

fn filter_having(query: &Query, having: &WhereExpr, rows: Vec<ResultRow>) -> Vec<ResultRow> {
    rows.into_iter()
        .filter(|row| evaluate_where(having, &mut |c| having_column(query, &c.field, row)))
        .collect()
}

/// Drops rows equal to an earlier row.
pub(crate) fn distinct(rows: Vec<ResultRow>) -> Vec<ResultRow> {
    let mut seen = HashSet::new();
    rows.into_iter().filter(|row| seen.insert(row.clone())).collect()
}

/// The column an ORDER BY name sorts on: the exact column, else the last
/// segment of a dotted name (`e.salary` sorts on `salary`).
fn sort_column(row: &ResultRow, name: &str) -> String {
    if let Some(value) = row.get(name) {
        return value.to_string();
    }
    name.rsplit('.')
        .next()
        .and_then(|last| row.get(last))
        .unwrap_or_default()
        .to_string()
}

/// Numbers compare numerically when both sides parse, otherwise lexically.
pub(crate) fn compare_cells(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// Stable multi-key sort.
pub(crate) fn sort_rows(rows: &mut [ResultRow], order_by: &[OrderByField]) {
    let mut keyed: Vec<(Vec<String>, ResultRow)> = rows
        .iter()
        .map(|row| {
            let keys = order_by.iter().map(|o| sort_column(row, &o.field)).collect();
            (keys, row.clone())
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        order_by
            .iter()
            .zip(a.iter().zip(b))
            .map(|(o, (x, y))| match o.direction {
                SortDirection::Asc => compare_cells(x, y),
                SortDirection::Desc => compare_cells(y, x),
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    for (slot, (_, row)) in rows.iter_mut().zip(keyed) {
        *slot = row;
    }
}

/// OFFSET first, clamped to the result length, then LIMIT.
pub(crate) fn paginate(
    mut rows: Vec<ResultRow>,
    offset: Option<usize>,
    limit: Option<usize>,
) -> Vec<ResultRow> {
    if let Some(offset) = offset {
        rows.drain(..offset.min(rows.len()));
    }
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, salary: &str) -> ResultRow {
        ResultRow::from_iter([("name", name), ("salary", salary)])
    }

    #[test]
    fn test_numeric_before_lexical() {
        assert_eq!(compare_cells("9", "10"), Ordering::Less);
        assert_eq!(compare_cells("b", "a"), Ordering::Greater);
    }

    #[test]
    fn test_sort_is_stable_across_keys() {
        let mut rows = vec![row("b", "10"), row("a", "20"), row("c", "10")];
        sort_rows(
            &mut rows,
            &[OrderByField {
                field: "e.salary".into(),
                direction: SortDirection::Desc,
            }],
        );
        let names: Vec<_> = rows.iter().map(|r| r.get("name").unwrap()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_offset_past_end() {
        let rows = vec![row("a", "1"), row("b", "2")];
        assert!(paginate(rows, Some(5), Some(1)).is_empty());
    }
}
