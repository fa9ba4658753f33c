//! Per-document row extraction.

use roxmltree::{Document, Node};

use super::bindings::{Bindings, Bound};
use crate::{
    ast::{ComparisonOp, Condition, FieldPath, ForClause, Query, WhereExpr},
    navigator::{
        attribute_value, element_text, evaluate_where, find_elements_with_attribute,
        find_elements_with_child, find_first_by_partial_path, find_nodes,
        find_nodes_by_partial_path, matches_suffix,
    },
    result::ResultRow,
};

/// An output column and the field that fills it.
#[derive(Debug, Clone)]
pub(crate) struct Column {
    pub name: String,
    pub field: FieldPath,
}

/// One column per SELECT field, named as the result shows it.
pub(crate) fn select_columns(query: &Query) -> Vec<Column> {
    query
        .select_fields
        .iter()
        .map(|f| Column {
            name: f.column_name(),
            field: f.clone(),
        })
        .collect()
}

pub(crate) fn extract_rows(
    doc: &Document,
    filename: &str,
    query: &Query,
    columns: &[Column],
) -> Vec<ResultRow> {
    let root = doc.root();
    if !query.for_clauses.is_empty() {
        let mut rows = Vec::new();
        let mut bindings = Bindings::default();
        iterate(root, filename, query, columns, 0, &mut bindings, &mut rows);
        rows
    } else if let Some(expr) = &query.where_clause {
        filtered_rows(root, filename, query, columns, expr)
    } else {
        broadcast_rows(root, filename, columns)
    }
}

/// Every non-empty value of `field` in the subtree of `root`.
fn all_values(root: Node, field: &FieldPath) -> Vec<String> {
    let values: Vec<String> = match (&field.attribute, field.components.is_empty()) {
        (Some(attr), true) => find_elements_with_attribute(root, attr)
            .into_iter()
            .filter_map(|n| attribute_value(n, attr))
            .collect(),
        (Some(attr), false) => find_nodes_by_partial_path(root, &field.components)
            .into_iter()
            .filter_map(|n| attribute_value(n, attr))
            .collect(),
        (None, _) => find_nodes_by_partial_path(root, &field.components)
            .into_iter()
            .map(element_text)
            .collect(),
    };
    values.into_iter().filter(|v| !v.is_empty()).collect()
}

/// Rows without a WHERE clause: each column is extracted on its own and the
/// lists are zipped by position, short lists padded with `""`.
///
/// `FILE_NAME` repeats on every row. A document with nothing to extract
/// (only `COUNT(*)` or only `FILE_NAME`) still yields a single row.
fn broadcast_rows(root: Node, filename: &str, columns: &[Column]) -> Vec<ResultRow> {
    let values: Vec<Option<Vec<String>>> = columns
        .iter()
        .map(|c| (!c.field.include_filename).then(|| all_values(root, &c.field)))
        .collect();
    let count = values.iter().flatten().map(Vec::len).max().unwrap_or(1);

    (0..count)
        .map(|i| {
            columns
                .iter()
                .zip(&values)
                .map(|(c, v)| {
                    let value = match v {
                        None => filename.to_string(),
                        Some(list) => list.get(i).cloned().unwrap_or_default(),
                    };
                    (c.name.clone(), value)
                })
                .collect()
        })
        .collect()
}

/// Rows from elements that satisfy the WHERE clause.
fn filtered_rows(
    root: Node,
    filename: &str,
    query: &Query,
    columns: &[Column],
    expr: &WhereExpr,
) -> Vec<ResultRow> {
    let conditions = expr.conditions();
    let Some(anchor) = conditions.iter().find(|c| !c.field.include_filename) else {
        let matched = evaluate_where(expr, &mut |c| resolve_field(root, &c.field, filename));
        return if matched {
            broadcast_rows(root, filename, columns)
        } else {
            Vec::new()
        };
    };

    candidates(root, anchor, query)
        .into_iter()
        .filter(|node| evaluate_where(expr, &mut |c| resolve_field(*node, &c.field, filename)))
        .map(|node| {
            columns
                .iter()
                .map(|c| {
                    let value = resolve_field(node, &c.field, filename).unwrap_or_default();
                    (c.name.clone(), value)
                })
                .collect()
        })
        .collect()
}

/// Elements the WHERE clause is tested against, chosen from the anchor
/// condition's field.
fn candidates<'a, 'input>(
    root: Node<'a, 'input>,
    anchor: &Condition,
    query: &Query,
) -> Vec<Node<'a, 'input>> {
    let field = &anchor.field;
    let null_check = matches!(anchor.op, ComparisonOp::IsNull | ComparisonOp::IsNotNull);

    match (field.components.as_slice(), &field.attribute) {
        ([], Some(_)) | ([_], None) if null_check => select_fallback(root, query),
        ([], Some(attr)) => find_elements_with_attribute(root, attr),
        ([], None) => Vec::new(),
        ([tag], None) => find_elements_with_child(root, tag),
        (comps, Some(_)) => find_nodes_by_partial_path(root, comps),
        (comps, None) => find_nodes_by_partial_path(root, &comps[..comps.len() - 1]),
    }
}

/// Candidates for a null check on a lone field: elements that hold some
/// SELECT field, so that rows lacking the tested field are still seen.
fn select_fallback<'a, 'input>(root: Node<'a, 'input>, query: &Query) -> Vec<Node<'a, 'input>> {
    let mut nodes = Vec::new();
    for field in &query.select_fields {
        if field.include_filename {
            continue;
        }
        match (field.last_component(), &field.attribute) {
            (Some(tag), _) => nodes.extend(find_elements_with_child(root, tag)),
            (None, Some(attr)) => nodes.extend(find_elements_with_attribute(root, attr)),
            (None, None) => {}
        }
    }
    if nodes.is_empty() {
        return root.first_element_child().into_iter().collect();
    }
    nodes.sort_by_key(|n| n.id().get());
    nodes.dedup();
    nodes
}

/// Element addressed by `components` relative to `context`.
///
/// Tried in order: the nearest ancestor-or-self that ends with a prefix of
/// the path, then exact descent from `context`, then the first descendant
/// matching the partial path.
fn locate<'a, 'input>(
    context: Node<'a, 'input>,
    components: &[String],
) -> Option<Node<'a, 'input>> {
    for k in (1..components.len()).rev() {
        let prefix = &components[..k];
        let anchor = context
            .ancestors()
            .filter(Node::is_element)
            .find(|n| matches_suffix(*n, prefix));
        if let Some(anchor) = anchor
            && let Some(node) = find_nodes(anchor, &components[k..]).into_iter().next()
        {
            return Some(node);
        }
    }

    find_nodes(context, components)
        .into_iter()
        .next()
        .or_else(|| find_first_by_partial_path(context, components))
}

/// Value of `field` seen from `context`; `None` when the element or
/// attribute does not exist.
fn resolve_field(context: Node, field: &FieldPath, filename: &str) -> Option<String> {
    if field.include_filename {
        return Some(filename.to_string());
    }
    let components = field.relative_components();
    let target = if components.is_empty() {
        context
    } else {
        locate(context, components)?
    };
    match &field.attribute {
        Some(attr) => attribute_value(target, attr),
        None => Some(element_text(target)),
    }
}

fn resolve_bound<'a, 'input>(
    root: Node<'a, 'input>,
    field: &FieldPath,
    bindings: &Bindings<'a, 'input>,
    filename: &str,
) -> Option<String> {
    if field.include_filename {
        return Some(filename.to_string());
    }
    if let Some(var) = &field.variable {
        if let Some(pos) = bindings.position(var) {
            return Some(pos.to_string());
        }
        return resolve_field(bindings.node(var)?, field, filename);
    }
    resolve_field(bindings.innermost_node().unwrap_or(root), field, filename)
}

/// Elements a FOR clause iterates over under the current bindings.
fn for_nodes<'a, 'input>(
    root: Node<'a, 'input>,
    fc: &ForClause,
    bindings: &Bindings<'a, 'input>,
) -> Vec<Node<'a, 'input>> {
    if let Some(var) = &fc.path.variable
        && let Some(base) = bindings.node(var)
    {
        let relative = fc.path.relative_components();
        if relative.is_empty() {
            return vec![base];
        }
        let exact = find_nodes(base, relative);
        if !exact.is_empty() {
            return exact;
        }
        return find_nodes_by_partial_path(base, relative)
            .into_iter()
            .filter(|n| *n != base)
            .collect();
    }
    find_nodes_by_partial_path(root, &fc.path.components)
}

/// Nested FOR loops: at full depth, the WHERE clause is tested and a row is
/// produced through the current bindings.
fn iterate<'a, 'input>(
    root: Node<'a, 'input>,
    filename: &str,
    query: &Query,
    columns: &[Column],
    depth: usize,
    bindings: &mut Bindings<'a, 'input>,
    rows: &mut Vec<ResultRow>,
) {
    let Some(fc) = query.for_clauses.get(depth) else {
        let scope: &Bindings = bindings;
        let mut resolve = |c: &Condition| resolve_bound(root, &c.field, scope, filename);
        let matched = query
            .where_clause
            .as_ref()
            .is_none_or(|expr| evaluate_where(expr, &mut resolve));
        if matched {
            rows.push(
                columns
                    .iter()
                    .map(|c| {
                        let value =
                            resolve_bound(root, &c.field, scope, filename).unwrap_or_default();
                        (c.name.clone(), value)
                    })
                    .collect(),
            );
        }
        return;
    };

    for (i, node) in for_nodes(root, fc, bindings).into_iter().enumerate() {
        bindings.push(&fc.variable, Bound::Node(node));
        if let Some(pos) = &fc.position_var {
            bindings.push(pos, Bound::Position(i + 1));
        }

        iterate(root, filename, query, columns, depth + 1, bindings, rows);

        bindings.pop();
        if fc.position_var.is_some() {
            bindings.pop();
        }
    }
}
