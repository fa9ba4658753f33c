//! Predefined DSN queries.
//!
//! A template is query text with `${name}` placeholders. Expanding it
//! substitutes every declared parameter; the result goes through the
//! parser and rewriter like a hand-typed query.

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub query: &'static str,
    pub parameters: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Unknown template '{0}'")]
    Unknown(String),

    #[error("Template '{template}' needs a value for '{parameter}'")]
    MissingParameter { template: String, parameter: String },

    #[error("Template '{template}' has no parameter '{parameter}'")]
    UnknownParameter { template: String, parameter: String },

    #[error("Invalid parameter '{0}', expected key=value")]
    BadAssignment(String),
}

const BUILTIN: &[QueryTemplate] = &[
    QueryTemplate {
        name: "list_employees",
        category: "extraction",
        description: "List all employees with basic information",
        query: "SELECT i.S21_G00_30_002 AS nom, i.S21_G00_30_004 AS prenoms, \
                i.S21_G00_30_006 AS date_naissance \
                FROM '${file}' FOR i IN S21_G00_30",
        parameters: &["file"],
    },
    QueryTemplate {
        name: "list_employees_with_nir",
        category: "extraction",
        description: "List all employees with their NIR",
        query: "SELECT S21_G00_30.S21_G00_30_001 AS nir, S21_G00_30.S21_G00_30_002 AS nom, \
                S21_G00_30.S21_G00_30_004 AS prenoms \
                FROM '${file}' WHERE S21_G00_30.S21_G00_30_001 IS NOT NULL",
        parameters: &["file"],
    },
    QueryTemplate {
        name: "find_contracts",
        category: "extraction",
        description: "Find employment contracts by type",
        query: "SELECT S21_G00_40.S21_G00_40_007 AS type_contrat, \
                S21_G00_40.S21_G00_40_001 AS date_debut, S21_G00_40.S21_G00_40_010 AS date_fin \
                FROM '${file}' WHERE S21_G00_40.S21_G00_40_007 = '${contract_type}'",
        parameters: &["file", "contract_type"],
    },
    QueryTemplate {
        name: "extract_salaries",
        category: "extraction",
        description: "Extract payment dates and amounts",
        query: "SELECT v.S21_G00_50_001 AS date_versement, v.S21_G00_50_002 AS montant \
                FROM '${file}' FOR v IN S21_G00_50",
        parameters: &["file"],
    },
    QueryTemplate {
        name: "list_establishments",
        category: "extraction",
        description: "List the NIC of every establishment",
        query: "SELECT FILE_NAME, e.S21_G00_11_001 AS nic FROM '${file}' FOR e IN S21_G00_11",
        parameters: &["file"],
    },
    QueryTemplate {
        name: "total_remunerations",
        category: "analysis",
        description: "Count and total the remuneration amounts",
        query: "SELECT COUNT(S21_G00_51.S21_G00_51_011) AS nombre_versements, \
                SUM(S21_G00_51.S21_G00_51_011) AS total_remunerations \
                FROM '${file}'",
        parameters: &["file"],
    },
    QueryTemplate {
        name: "contract_type_distribution",
        category: "analysis",
        description: "Number of contracts per contract type",
        query: "SELECT S21_G00_40.S21_G00_40_007 AS type_contrat, COUNT(*) AS nombre \
                FROM '${file}' WHERE S21_G00_40.S21_G00_40_007 IS NOT NULL \
                GROUP BY type_contrat ORDER BY nombre DESC",
        parameters: &["file"],
    },
    QueryTemplate {
        name: "dsn_metadata",
        category: "analysis",
        description: "Software and norm version of each declaration",
        query: "SELECT FILE_NAME, S10_G00_00.S10_G00_00_001 AS logiciel, \
                S10_G00_00.S10_G00_00_002 AS editeur, S10_G00_00.S10_G00_00_006 AS version_norme \
                FROM '${file}'",
        parameters: &["file"],
    },
    QueryTemplate {
        name: "compliance_check_nir",
        category: "validation",
        description: "Employees without a NIR",
        query: "SELECT S21_G00_30.S21_G00_30_002 AS nom, S21_G00_30.S21_G00_30_004 AS prenoms \
                FROM '${file}' WHERE S21_G00_30.S21_G00_30_001 IS NULL",
        parameters: &["file"],
    },
    QueryTemplate {
        name: "find_employee_by_nir",
        category: "search",
        description: "Find employee details by NIR",
        query: "SELECT S21_G00_30.S21_G00_30_001 AS nir, S21_G00_30.S21_G00_30_002 AS nom, \
                S21_G00_30.S21_G00_30_004 AS prenoms, S21_G00_30.S21_G00_30_006 AS date_naissance \
                FROM '${file}' WHERE S21_G00_30.S21_G00_30_001 = '${nir}'",
        parameters: &["file", "nir"],
    },
    QueryTemplate {
        name: "find_employee_by_name",
        category: "search",
        description: "Find employees whose last name matches a pattern",
        query: "SELECT S21_G00_30.S21_G00_30_002 AS nom, S21_G00_30.S21_G00_30_004 AS prenoms, \
                S21_G00_30.S21_G00_30_001 AS nir \
                FROM '${file}' WHERE S21_G00_30.S21_G00_30_002 LIKE /${nom}/",
        parameters: &["file", "nom"],
    },
];

/// Every built-in template, grouped by category.
pub fn builtin() -> &'static [QueryTemplate] {
    BUILTIN
}

pub fn find(name: &str) -> Option<&'static QueryTemplate> {
    BUILTIN.iter().find(|t| t.name == name)
}

/// Category names, sorted.
pub fn categories() -> Vec<&'static str> {
    let mut out: Vec<&str> = BUILTIN.iter().map(|t| t.category).collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Splits a `key=value` assignment.
pub fn parse_assignment(s: &str) -> Result<(String, String), TemplateError> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(TemplateError::BadAssignment(s.to_string())),
    }
}

/// Expands the template called `name`.
pub fn expand(name: &str, params: &[(String, String)]) -> Result<String, TemplateError> {
    find(name)
        .ok_or_else(|| TemplateError::Unknown(name.to_string()))?
        .expand(params)
}

impl QueryTemplate {
    /// Query text with every `${param}` replaced. Each declared parameter
    /// must be given; undeclared ones are rejected.
    pub fn expand(&self, params: &[(String, String)]) -> Result<String, TemplateError> {
        let values: HashMap<&str, &str> =
            params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let unknown = params.iter().find(|(k, _)| !self.parameters.contains(&k.as_str()));
        if let Some((key, _)) = unknown {
            return Err(TemplateError::UnknownParameter {
                template: self.name.to_string(),
                parameter: key.clone(),
            });
        }
        if let Some(missing) = self.parameters.iter().find(|p| !values.contains_key(*p)) {
            return Err(TemplateError::MissingParameter {
                template: self.name.to_string(),
                parameter: missing.to_string(),
            });
        }

        let expanded = PLACEHOLDER.replace_all(self.query, |caps: &regex::Captures| {
            values.get(&caps[1]).copied().unwrap_or_default().to_string()
        });
        Ok(expanded.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_declared() {
        for template in builtin() {
            for caps in PLACEHOLDER.captures_iter(template.query) {
                assert!(
                    template.parameters.contains(&&caps[1]),
                    "{} uses undeclared ${{{}}}",
                    template.name,
                    &caps[1]
                );
            }
        }
    }

    #[test]
    fn test_builtin_names_are_unique() {
        let mut names: Vec<&str> = builtin().iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), builtin().len());
    }
}
