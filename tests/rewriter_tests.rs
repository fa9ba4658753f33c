// tests/rewriter_tests.rs

use ariane_xml::parser::parse_query;
use ariane_xml::rewriter::ShortcutRewriter;
use ariane_xml::schema::{DsnAttribute, DsnSchema, SchemaProvider};

/// `30_001` exists in blocs `S10.G00.30` and `S21.G00.30`, in that order;
/// every other code is unique.
fn schema() -> DsnSchema {
    let mut schema = DsnSchema::new("P25");
    for name in [
        "S10_G00_30_001",
        "S21_G00_30_001",
        "S21_G00_30_002",
        "S10_G00_01_001",
        "S20_G00_05_001",
    ] {
        schema.add_attribute(DsnAttribute::new(name));
    }
    schema
}

fn select_paths(query: &ariane_xml::Query) -> Vec<String> {
    query.select_fields.iter().map(|f| f.path_string()).collect()
}

// ============================================================================
// Schema Lookups
// ============================================================================

#[test]
fn test_short_code_candidates_in_schema_order() {
    let schema = schema();
    let names: Vec<&str> = schema
        .find_by_short_code("30_001")
        .iter()
        .map(|a| a.full_name.as_str())
        .collect();
    assert_eq!(names, vec!["S10_G00_30_001", "S21_G00_30_001"]);
    assert!(schema.is_ambiguous("30_001"));
    assert!(!schema.is_ambiguous("30_002"));
    assert_eq!(
        schema.find_by_full_name("S21_G00_30_002").map(|a| a.bloc_name.as_str()),
        Some("S21.G00.30")
    );
}

// ============================================================================
// Expansion
// ============================================================================

#[test]
fn test_unambiguous_shortcut_expands() {
    let schema = schema();
    let query = parse_query("SELECT 30_002 FROM data WHERE 01_001 = 'x'").unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query);

    assert_eq!(select_paths(&rewritten.query), vec!["S21_G00_30_002"]);
    let cond = &rewritten.query.where_clause.as_ref().unwrap().conditions()[0];
    assert_eq!(cond.field.components, vec!["S10_G00_01_001"]);
    assert!(rewritten.warnings.is_empty());
}

#[test]
fn test_unknown_codes_and_plain_names_unchanged() {
    let schema = schema();
    let query = parse_query("SELECT 99_999, name, 3_001, 30_01, S21_G00_30_001 FROM data").unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query);
    assert_eq!(
        select_paths(&rewritten.query),
        vec!["99_999", "name", "3_001", "30_01", "S21_G00_30_001"]
    );
    assert!(rewritten.warnings.is_empty());
}

#[test]
fn test_hint_resolves_ambiguity() {
    let schema = schema();
    let query = parse_query("SELECT S21_G00_30.30_001 FROM data").unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query);

    assert_eq!(rewritten.query.select_fields[0].components, vec!["S21_G00_30", "S21_G00_30_001"]);
    assert!(rewritten.warnings.is_empty());
}

#[test]
fn test_ambiguous_without_hint_warns_and_takes_first() {
    let schema = schema();
    let query = parse_query("SELECT 30_001 FROM data").unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query);

    assert_eq!(select_paths(&rewritten.query), vec!["S10_G00_30_001"]);
    assert_eq!(rewritten.warnings.len(), 1);
    let warning = &rewritten.warnings[0];
    assert_eq!(warning.code, "30_001");
    assert_eq!(warning.candidates, vec!["S10_G00_30_001", "S21_G00_30_001"]);
    assert_eq!(warning.chosen, "S10_G00_30_001");
    assert!(warning.to_string().contains("S21_G00_30_001"));
}

#[test]
fn test_unhelpful_hint_falls_back_with_warning() {
    let schema = schema();
    let query = parse_query("SELECT S99.30_001 FROM data").unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query);
    assert_eq!(rewritten.query.select_fields[0].components[1], "S10_G00_30_001");
    assert_eq!(rewritten.warnings.len(), 1);
}

#[test]
fn test_expansion_is_deterministic() {
    let schema = schema();
    let query = parse_query("SELECT 30_001, 30_002 FROM data").unwrap();
    let rewriter = ShortcutRewriter::new(&schema);
    let first = rewriter.rewrite(&query);
    let second = rewriter.rewrite(&query);
    assert_eq!(first.query, second.query);
    assert_eq!(first.warnings, second.warnings);
}

#[test]
fn test_input_query_is_untouched() {
    let schema = schema();
    let query = parse_query("SELECT 30_002 FROM data").unwrap();
    let before = query.clone();
    let _ = ShortcutRewriter::new(&schema).rewrite(&query);
    assert_eq!(query, before);
}

// ============================================================================
// Clauses
// ============================================================================

#[test]
fn test_rewrites_every_clause() {
    let schema = schema();
    let query = parse_query(
        "SELECT 30_002, COUNT(*) FROM data WHERE 30_002 = 'a' OR (01_001 IS NOT NULL AND 05_001 != 'b') \
         GROUP BY 30_002 HAVING COUNT(*) > 1 ORDER BY 30_002 DESC",
    )
    .unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query).query;

    let where_fields: Vec<String> = rewritten
        .where_clause
        .as_ref()
        .unwrap()
        .conditions()
        .iter()
        .map(|c| c.field.path_string())
        .collect();
    assert_eq!(where_fields, vec!["S21_G00_30_002", "S10_G00_01_001", "S20_G00_05_001"]);
    assert_eq!(rewritten.group_by_fields, vec!["S21_G00_30_002"]);
    assert_eq!(rewritten.order_by_fields[0].field, "S21_G00_30_002");
    assert!(rewritten.having.is_some());
}

#[test]
fn test_rewrites_aggregate_arguments() {
    let schema = schema();
    let query = parse_query("SELECT SUM(30_002) FROM data ORDER BY SUM(30_002)").unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query).query;
    assert_eq!(rewritten.select_fields[0].column_name(), "SUM(S21_G00_30_002)");
    assert_eq!(rewritten.order_by_fields[0].field, "SUM(S21_G00_30_002)");
}

#[test]
fn test_rewrites_attribute_names() {
    let schema = schema();
    let query = parse_query("SELECT item.@30_002 FROM data").unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query).query;
    assert_eq!(rewritten.select_fields[0].attribute.as_deref(), Some("S21_G00_30_002"));
}

#[test]
fn test_for_variable_supplies_hint() {
    let schema = schema();
    let query = parse_query("SELECT b.30_001 FROM data FOR b IN S21_G00_30").unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query);

    let field = &rewritten.query.select_fields[0];
    assert_eq!(field.components, vec!["b", "S21_G00_30_001"]);
    assert_eq!(field.variable.as_deref(), Some("b"));
    assert!(rewritten.warnings.is_empty());
}

#[test]
fn test_for_path_is_rewritten() {
    let schema = schema();
    let query = parse_query("SELECT e FROM data FOR e IN 30_002").unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query).query;
    assert_eq!(rewritten.for_clauses[0].path.components, vec!["S21_G00_30_002"]);
    assert_eq!(rewritten.for_clauses[0].variable, "e");
}

#[test]
fn test_schema_from_json() {
    let schema = DsnSchema::from_json(
        r#"{"version": "P25", "attributes": [
            {"full_name": "S10_G00_30_001"},
            {"full_name": "S21_G00_30_001", "description": "NIR"}
        ]}"#,
    )
    .unwrap();
    let query = parse_query("SELECT S21_G00_30.30_001 FROM data").unwrap();
    let rewritten = ShortcutRewriter::new(&schema).rewrite(&query);
    assert_eq!(rewritten.query.select_fields[0].components[1], "S21_G00_30_001");
}
