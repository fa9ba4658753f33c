//! GROUP BY and aggregate functions over the merged rows of every file.

use std::{collections::HashMap, str::FromStr};

use rust_decimal::{Decimal, prelude::FromPrimitive};

use super::extract::Column;
use crate::{
    ast::{Aggregate, FieldPath, Query},
    result::ResultRow,
};

/// The field an aggregate or plain SELECT field reads, without the
/// aggregate and alias.
fn source_of(field: &FieldPath) -> FieldPath {
    FieldPath {
        aggregate: None,
        alias: None,
        ..field.clone()
    }
}

/// Columns extracted per document before aggregation: every SELECT source
/// (`COUNT(*)` needs none) and every GROUP BY field, keyed by path.
pub(crate) fn source_columns(query: &Query) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::new();
    let mut add = |field: FieldPath| {
        let name = field.path_string();
        if !columns.iter().any(|c| c.name == name) {
            columns.push(Column { name, field });
        }
    };

    for field in &query.select_fields {
        if !field.is_count_star() {
            add(source_of(field));
        }
    }
    for name in &query.group_by_fields {
        add(group_field(query, name));
    }
    columns
}

/// The field a GROUP BY name refers to: the source of the SELECT field it
/// aliases, otherwise the name read as a path.
fn group_field(query: &Query, name: &str) -> FieldPath {
    query
        .select_fields
        .iter()
        .find(|f| !f.is_aggregate() && f.alias.as_deref() == Some(name))
        .map(source_of)
        .unwrap_or_else(|| query.field_from_name(name))
}

/// Collapses `rows` (shaped by [`source_columns`]) into one row per group,
/// groups in order of first appearance. Without GROUP BY the whole input
/// is one group, so an empty input still gives one row.
pub(crate) fn aggregate(query: &Query, rows: Vec<ResultRow>) -> Vec<ResultRow> {
    let keys: Vec<String> = query
        .group_by_fields
        .iter()
        .map(|name| group_field(query, name).path_string())
        .collect();

    let mut groups: Vec<Vec<ResultRow>> = Vec::new();
    if keys.is_empty() {
        groups.push(rows);
    } else {
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        for row in rows {
            let key: Vec<String> = keys
                .iter()
                .map(|k| row.get(k).unwrap_or_default().to_string())
                .collect();
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(row);
        }
    }

    groups.iter().map(|group| collapse(query, group)).collect()
}

fn collapse(query: &Query, group: &[ResultRow]) -> ResultRow {
    query
        .select_fields
        .iter()
        .map(|field| {
            let value = match field.aggregate {
                Some(agg) => compute(agg, field, group),
                None => {
                    let column = field.path_string();
                    group
                        .first()
                        .and_then(|row| row.get(&column))
                        .unwrap_or_default()
                        .to_string()
                }
            };
            (field.column_name(), value)
        })
        .collect()
}

/// Parses a numeric value, falling back to float syntax (`1e3`).
fn parse_number(value: &str) -> Option<Decimal> {
    let value = value.trim();
    Decimal::from_str(value)
        .ok()
        .or_else(|| value.parse::<f64>().ok().and_then(Decimal::from_f64))
}

fn format_number(value: Decimal) -> String {
    value.normalize().to_string()
}

fn compute(agg: Aggregate, field: &FieldPath, group: &[ResultRow]) -> String {
    if field.is_count_star() {
        return group.len().to_string();
    }

    let column = field.path_string();
    let values: Vec<&str> = group
        .iter()
        .filter_map(|row| row.get(&column))
        .filter(|v| !v.is_empty())
        .collect();
    let numbers = || -> Vec<Decimal> { values.iter().filter_map(|v| parse_number(v)).collect() };

    match agg {
        Aggregate::Count => values.len().to_string(),
        Aggregate::Sum => format_number(sum(&numbers())),
        Aggregate::Avg => {
            let numbers = numbers();
            if numbers.is_empty() {
                return "0".to_string();
            }
            sum(&numbers)
                .checked_div(Decimal::from(numbers.len()))
                .map(|avg| format_number(avg.round_dp(10)))
                .unwrap_or_else(|| "0".to_string())
        }
        Aggregate::Min => numbers().into_iter().min().map(format_number).unwrap_or_default(),
        Aggregate::Max => numbers().into_iter().max().map(format_number).unwrap_or_default(),
    }
}

/// Values that would overflow the total are skipped.
fn sum(numbers: &[Decimal]) -> Decimal {
    numbers
        .iter()
        .fold(Decimal::ZERO, |acc, n| acc.checked_add(*n).unwrap_or(acc))
}
