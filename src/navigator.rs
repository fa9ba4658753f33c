//! Tree-search primitives over parsed documents.
//!
//! Everything here is a pure function of its inputs. Tag names are compared
//! by local name, so namespace prefixes are ignored.

use std::{cmp::Ordering, collections::HashSet};

use roxmltree::Node;

use crate::ast::{ComparisonOp, Condition, LogicalOp, WhereExpr};

fn is_named(node: &Node, tag: &str) -> bool {
    node.is_element() && node.tag_name().name() == tag
}

/// Elements reached by descending `components` exactly, one child level per
/// component. An empty path yields `node` itself.
pub fn find_nodes<'a, 'input>(
    node: Node<'a, 'input>,
    components: &[String],
) -> Vec<Node<'a, 'input>> {
    let mut current = vec![node];
    for comp in components {
        current = current
            .iter()
            .flat_map(|n| n.children().filter(|c| is_named(c, comp)))
            .collect();
        if current.is_empty() {
            break;
        }
    }
    current
}

/// The ancestor-or-self chain of `node` ends with `components`.
pub fn matches_suffix(node: Node, components: &[String]) -> bool {
    let mut chain = node.ancestors().filter(Node::is_element);
    components
        .iter()
        .rev()
        .all(|comp| chain.next().is_some_and(|n| n.tag_name().name() == comp))
}

/// Every element in the subtree of `node` (self included) whose full tag
/// chain ends with `components`, in document order.
///
/// `employee.name` matches `<name>` under `<employee>` at any depth.
pub fn find_nodes_by_partial_path<'a, 'input>(
    node: Node<'a, 'input>,
    components: &[String],
) -> Vec<Node<'a, 'input>> {
    let Some(last) = components.last() else {
        return Vec::new();
    };
    node.descendants()
        .filter(|n| is_named(n, last) && matches_suffix(*n, components))
        .collect()
}

/// First element, depth first, that [`find_nodes_by_partial_path`] would
/// return.
pub fn find_first_by_partial_path<'a, 'input>(
    node: Node<'a, 'input>,
    components: &[String],
) -> Option<Node<'a, 'input>> {
    let last = components.last()?;
    node.descendants()
        .find(|n| is_named(n, last) && matches_suffix(*n, components))
}

/// Elements in the subtree of `node` having at least one direct child `tag`.
pub fn find_elements_with_child<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
) -> Vec<Node<'a, 'input>> {
    node.descendants()
        .filter(|n| n.is_element() && n.children().any(|c| is_named(&c, tag)))
        .collect()
}

/// Elements in the subtree of `node` carrying attribute `name`.
pub fn find_elements_with_attribute<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Vec<Node<'a, 'input>> {
    node.descendants()
        .filter(|n| n.is_element() && n.has_attribute(name))
        .collect()
}

pub fn attribute_value(node: Node, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_string)
}

/// Concatenated direct text children, trimmed.
pub fn element_text(node: Node) -> String {
    let text: String = node
        .children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect();
    text.trim().to_string()
}

/// Ordering comparison of `actual` against `expected`.
///
/// Numeric comparison parses both sides as `f64`; a side that does not parse
/// makes the comparison false. Null checks and pattern operators are not
/// comparisons and always return false here.
pub fn compare_values(actual: &str, expected: &str, op: ComparisonOp, numeric: bool) -> bool {
    let ordering = if numeric {
        match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
            (Ok(a), Ok(b)) => match a.partial_cmp(&b) {
                Some(o) => o,
                None => return false,
            },
            _ => return false,
        }
    } else {
        actual.cmp(expected)
    };

    match op {
        ComparisonOp::Equals => ordering == Ordering::Equal,
        ComparisonOp::NotEquals => ordering != Ordering::Equal,
        ComparisonOp::LessThan => ordering == Ordering::Less,
        ComparisonOp::GreaterThan => ordering == Ordering::Greater,
        ComparisonOp::LessEqual => ordering != Ordering::Greater,
        ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        _ => false,
    }
}

/// Evaluates one condition against a resolved value.
///
/// `None` and `Some("")` both mean the field is null: `IS NULL` holds and
/// every other operator fails.
pub fn evaluate_condition(value: Option<&str>, condition: &Condition) -> bool {
    let value = value.filter(|v| !v.is_empty());

    match condition.op {
        ComparisonOp::IsNull => value.is_none(),
        ComparisonOp::IsNotNull => value.is_some(),
        ComparisonOp::Like => {
            value.is_some_and(|v| condition.regex().is_some_and(|re| re.is_match(v)))
        }
        ComparisonOp::NotLike => {
            value.is_some_and(|v| condition.regex().is_some_and(|re| !re.is_match(v)))
        }
        op => value.is_some_and(|v| compare_values(v, &condition.value, op, condition.is_numeric)),
    }
}

/// Evaluates an expression tree, resolving each condition's field through
/// `resolve`. `AND` and `OR` short-circuit.
pub fn evaluate_where<F>(expr: &WhereExpr, resolve: &mut F) -> bool
where
    F: FnMut(&Condition) -> Option<String>,
{
    match expr {
        WhereExpr::Condition(c) => {
            let value = resolve(c);
            evaluate_condition(value.as_deref(), c)
        }
        WhereExpr::Logical { op, left, right } => match op {
            LogicalOp::And => evaluate_where(left, resolve) && evaluate_where(right, resolve),
            LogicalOp::Or => evaluate_where(left, resolve) || evaluate_where(right, resolve),
        },
    }
}

/// Full tag path of `node` from the document root, dot separated.
pub fn full_path(node: Node) -> String {
    let mut tags: Vec<&str> = node
        .ancestors()
        .filter(Node::is_element)
        .map(|n| n.tag_name().name())
        .collect();
    tags.reverse();
    tags.join(".")
}

/// Number of distinct full paths matched by a partial path. More than one
/// means the partial path is ambiguous in this document.
pub fn count_matching_paths(root: Node, components: &[String]) -> usize {
    find_nodes_by_partial_path(root, components)
        .into_iter()
        .map(full_path)
        .collect::<HashSet<_>>()
        .len()
}
