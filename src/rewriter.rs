//! Expansion of DSN short codes (`30_001`) into full field names
//! (`S21_G00_30_001`) ahead of execution.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::{
    ast::{FieldPath, ForClause, OrderByField, Query},
    schema::{DsnAttribute, SchemaProvider},
};

static SHORTCUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2,}_\d{3,}$").expect("valid regex"));

/// Whether `component` looks like a short code.
pub fn is_shortcut(component: &str) -> bool {
    SHORTCUT.is_match(component)
}

/// An ambiguous short code that no hint could resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutWarning {
    pub code: String,
    /// Full names of every candidate, in schema order
    pub candidates: Vec<String>,
    /// The candidate that was used
    pub chosen: String,
}

impl fmt::Display for ShortcutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ambiguous shortcut '{}' could refer to {}; using {}",
            self.code,
            self.candidates.join(", "),
            self.chosen
        )
    }
}

/// Output of [`ShortcutRewriter::rewrite`].
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub query: Query,
    pub warnings: Vec<ShortcutWarning>,
}

pub struct ShortcutRewriter<'s, S: SchemaProvider + ?Sized> {
    schema: &'s S,
}

impl<'s, S: SchemaProvider + ?Sized> ShortcutRewriter<'s, S> {
    pub fn new(schema: &'s S) -> Self {
        ShortcutRewriter { schema }
    }

    /// Returns a copy of `query` with every recognized short code expanded.
    /// `query` itself is left untouched.
    pub fn rewrite(&self, query: &Query) -> Rewritten {
        let mut pass = Pass {
            schema: self.schema,
            for_clauses: Vec::with_capacity(query.for_clauses.len()),
            warnings: Vec::new(),
        };

        // FOR paths first: later clauses and fields take their hints from them.
        for fc in &query.for_clauses {
            let path = pass.expand_field(&fc.path);
            pass.for_clauses.push(ForClause {
                path,
                ..fc.clone()
            });
        }

        let select_fields = query.select_fields.iter().map(|f| pass.expand_field(f)).collect();
        let where_clause = query
            .where_clause
            .as_ref()
            .map(|w| w.map_fields(&mut |f| pass.expand_field(f)));
        let having = query
            .having
            .as_ref()
            .map(|h| h.map_fields(&mut |f| pass.expand_field(f)));
        let group_by_fields = query
            .group_by_fields
            .iter()
            .map(|name| pass.expand_name(query, name))
            .collect();
        let order_by_fields = query
            .order_by_fields
            .iter()
            .map(|o| OrderByField {
                field: pass.expand_name(query, &o.field),
                direction: o.direction,
            })
            .collect();

        Rewritten {
            query: Query {
                select_fields,
                for_clauses: pass.for_clauses,
                where_clause,
                group_by_fields,
                having,
                order_by_fields,
                ..query.clone()
            },
            warnings: pass.warnings,
        }
    }
}

struct Pass<'s, S: SchemaProvider + ?Sized> {
    schema: &'s S,
    /// FOR clauses rewritten so far
    for_clauses: Vec<ForClause>,
    warnings: Vec<ShortcutWarning>,
}

impl<S: SchemaProvider + ?Sized> Pass<'_, S> {
    fn expand_field(&mut self, field: &FieldPath) -> FieldPath {
        let components = self.expand_components(&field.components, field.variable.as_deref());
        let attribute = field.attribute.as_ref().map(|attr| {
            let hint = components.last().cloned();
            self.expand(attr, hint.as_deref())
        });
        FieldPath {
            components,
            attribute,
            ..field.clone()
        }
    }

    /// Rewrites a GROUP BY or ORDER BY name such as `e.30_001` or `SUM(30_001)`.
    fn expand_name(&mut self, query: &Query, name: &str) -> String {
        if let Some((head, rest)) = name.split_once('(')
            && let Some(inner) = rest.strip_suffix(')')
        {
            return format!("{}({})", head, self.expand_name(query, inner));
        }

        let parts: Vec<String> = name.split('.').map(String::from).collect();
        let variable = parts
            .first()
            .filter(|p| query.is_for_variable(p) || query.is_position_variable(p))
            .cloned();

        let mut out = Vec::with_capacity(parts.len());
        let mut previous = None;
        for (i, part) in parts.iter().enumerate() {
            if i == 0 && variable.is_some() {
                previous = self.variable_hint(part);
                out.push(part.clone());
                continue;
            }
            let expanded = match part.strip_prefix('@') {
                Some(attr) => format!("@{}", self.expand(attr, previous.as_deref())),
                None => self.expand(part, previous.as_deref()),
            };
            previous = Some(expanded.clone());
            out.push(expanded);
        }
        out.join(".")
    }

    fn expand_components(&mut self, components: &[String], variable: Option<&str>) -> Vec<String> {
        let mut out = Vec::with_capacity(components.len());
        let mut previous: Option<String> = None;
        for (i, comp) in components.iter().enumerate() {
            if i == 0 && variable == Some(comp.as_str()) {
                previous = self.variable_hint(comp);
                out.push(comp.clone());
                continue;
            }
            let expanded = self.expand(comp, previous.as_deref());
            previous = Some(expanded.clone());
            out.push(expanded);
        }
        out
    }

    /// Last component of the FOR path bound to `variable`.
    fn variable_hint(&self, variable: &str) -> Option<String> {
        self.for_clauses
            .iter()
            .find(|fc| fc.variable == variable)
            .and_then(|fc| fc.path.last_component())
            .map(String::from)
    }

    fn expand(&mut self, component: &str, hint: Option<&str>) -> String {
        if !is_shortcut(component) {
            return component.to_string();
        }

        let candidates = self.schema.find_by_short_code(component);
        match candidates {
            [] => component.to_string(),
            [only] => {
                debug!("Expanded shortcut {} to {}", component, only.full_name);
                only.full_name.clone()
            }
            _ => {
                if let Some(hint) = hint.filter(|h| !h.is_empty())
                    && let Some(attr) = candidates.iter().find(|a| matches_hint(a, hint))
                {
                    debug!(
                        "Expanded shortcut {} to {} using hint {}",
                        component, attr.full_name, hint
                    );
                    return attr.full_name.clone();
                }

                let chosen = candidates[0].full_name.clone();
                let names: Vec<String> = candidates.iter().map(|a| a.full_name.clone()).collect();
                warn!(
                    "Ambiguous shortcut '{}' ({} candidates: {}), using {}",
                    component,
                    names.len(),
                    names.join(", "),
                    chosen
                );
                self.warnings.push(ShortcutWarning {
                    code: component.to_string(),
                    candidates: names,
                    chosen: chosen.clone(),
                });
                chosen
            }
        }
    }
}

/// The candidate lives under the hierarchy named by `hint`
/// (`S21_G00_30` or `S21.G00.30`).
fn matches_hint(attr: &DsnAttribute, hint: &str) -> bool {
    attr.full_name.starts_with(hint) || attr.full_name.starts_with(&hint.replace('.', "_"))
}
