//! Result rows and template listings to printable output

use std::str::FromStr;

use crate::{QueryTemplate, ResultRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Tsv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "tsv" => Ok(OutputFormat::Tsv),
            other => Err(format!("unknown format '{}', expected json or tsv", other)),
        }
    }
}

/// A JSON array of objects, keys in SELECT order.
pub fn rows_to_json(rows: &[ResultRow], pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(rows)
    } else {
        serde_json::to_string(rows)
    }
}

/// Header line from the first row, then one line per row. Tabs and line
/// breaks inside values become spaces.
pub fn rows_to_tsv(rows: &[ResultRow]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let clean = |s: &str| s.replace(['\t', '\n', '\r'], " ");

    let mut out = first.column_names().map(clean).collect::<Vec<_>>().join("\t");
    out.push('\n');
    for row in rows {
        out.push_str(&row.iter().map(|(_, v)| clean(v)).collect::<Vec<_>>().join("\t"));
        out.push('\n');
    }
    out
}

/// One block per category, one line per template with its parameters.
pub fn templates_to_text(templates: &[QueryTemplate]) -> String {
    let mut out = String::new();
    let mut category = "";
    for template in templates {
        if template.category != category {
            category = template.category;
            out.push_str(&format!("[{}]\n", category));
        }
        out.push_str(&format!(
            "  {:<28} {} ({})\n",
            template.name,
            template.description,
            template.parameters.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_keeps_column_order() {
        let rows = vec![ResultRow::from_iter([("zeta", "1"), ("alpha", "2")])];
        assert_eq!(rows_to_json(&rows, false).unwrap(), r#"[{"zeta":"1","alpha":"2"}]"#);
    }

    #[test]
    fn test_tsv() {
        let rows = vec![
            ResultRow::from_iter([("name", "Ann"), ("city", "Paris\tNord")]),
            ResultRow::from_iter([("name", "Bob"), ("city", "")]),
        ];
        assert_eq!(rows_to_tsv(&rows), "name\tcity\nAnn\tParis Nord\nBob\t\n");
    }

    #[test]
    fn test_template_listing() {
        let templates = [
            QueryTemplate {
                name: "one",
                category: "a",
                description: "First",
                query: "SELECT x FROM '${file}'",
                parameters: &["file"],
            },
            QueryTemplate {
                name: "two",
                category: "b",
                description: "Second",
                query: "SELECT y FROM '${file}' WHERE y = '${v}'",
                parameters: &["file", "v"],
            },
        ];
        let text = templates_to_text(&templates);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[a]");
        assert!(lines[1].starts_with("  one "));
        assert!(lines[1].ends_with("First (file)"));
        assert_eq!(lines[2], "[b]");
        assert!(lines[3].ends_with("Second (file, v)"));
    }
}
