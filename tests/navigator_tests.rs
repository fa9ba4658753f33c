// tests/navigator_tests.rs

use ariane_xml::ast::{ComparisonOp, Condition, FieldPath};
use ariane_xml::navigator::{
    attribute_value, compare_values, count_matching_paths, element_text, evaluate_condition,
    evaluate_where, find_elements_with_child, find_first_by_partial_path, find_nodes,
    find_nodes_by_partial_path,
};
use ariane_xml::parser::parse_query;
use roxmltree::Document;

const COMPANY: &str = r#"
<company>
  <department id="d1">
    <name>Engineering</name>
    <employee id="e1"><name>Ann</name><salary>60000</salary></employee>
    <employee id="e2"><name>Bob</name><salary>45000</salary></employee>
  </department>
  <department id="d2">
    <name>Sales</name>
    <employee id="e3"><name>Cid</name><salary>52000</salary><email>cid@example.com</email></employee>
  </department>
</company>
"#;

fn path(s: &str) -> Vec<String> {
    s.split('.').map(String::from).collect()
}

fn texts(nodes: Vec<roxmltree::Node>) -> Vec<String> {
    nodes.into_iter().map(element_text).collect()
}

fn condition(op: ComparisonOp, value: &str, numeric: bool) -> Condition {
    Condition::new(FieldPath::new(["x"]), op, value, numeric)
}

// ============================================================================
// Tree Search
// ============================================================================

#[test]
fn test_find_nodes_exact_descent() {
    let doc = Document::parse(COMPANY).unwrap();
    let root = doc.root_element();
    assert_eq!(texts(find_nodes(root, &path("department.name"))), vec!["Engineering", "Sales"]);
    assert_eq!(find_nodes(root, &path("department.employee.name")).len(), 3);
    // exact descent does not skip levels
    assert!(find_nodes(root, &path("employee")).is_empty());
}

#[test]
fn test_find_nodes_empty_path_is_self() {
    let doc = Document::parse(COMPANY).unwrap();
    let root = doc.root_element();
    assert_eq!(find_nodes(root, &[]), vec![root]);
}

#[test]
fn test_partial_path_matches_suffix_anywhere() {
    let doc = Document::parse(COMPANY).unwrap();
    let names = texts(find_nodes_by_partial_path(doc.root(), &path("employee.name")));
    assert_eq!(names, vec!["Ann", "Bob", "Cid"]);

    let all_names = texts(find_nodes_by_partial_path(doc.root(), &path("name")));
    assert_eq!(all_names, vec!["Engineering", "Ann", "Bob", "Sales", "Cid"]);
}

#[test]
fn test_partial_path_equivalent_to_full_path_when_unique() {
    let doc = Document::parse(COMPANY).unwrap();
    let full = find_nodes_by_partial_path(doc.root(), &path("company.department.employee.salary"));
    let partial = find_nodes_by_partial_path(doc.root(), &path("employee.salary"));
    let leaf = find_nodes_by_partial_path(doc.root(), &path("salary"));
    assert_eq!(full, partial);
    assert_eq!(partial, leaf);
}

#[test]
fn test_partial_path_requires_contiguous_chain() {
    let doc = Document::parse(COMPANY).unwrap();
    assert!(find_nodes_by_partial_path(doc.root(), &path("company.employee")).is_empty());
    assert!(find_nodes_by_partial_path(doc.root(), &path("nothing")).is_empty());
}

#[test]
fn test_find_first_by_partial_path() {
    let doc = Document::parse(COMPANY).unwrap();
    let first = find_first_by_partial_path(doc.root(), &path("employee.name")).unwrap();
    assert_eq!(element_text(first), "Ann");
    assert!(find_first_by_partial_path(doc.root(), &path("bonus")).is_none());
    assert!(find_first_by_partial_path(doc.root(), &[]).is_none());
}

#[test]
fn test_find_elements_with_child() {
    let doc = Document::parse(COMPANY).unwrap();
    let with_email = find_elements_with_child(doc.root(), "email");
    assert_eq!(with_email.len(), 1);
    assert_eq!(attribute_value(with_email[0], "id").as_deref(), Some("e3"));

    // departments and employees both have a <name> child
    assert_eq!(find_elements_with_child(doc.root(), "name").len(), 5);
}

#[test]
fn test_attribute_and_text() {
    let doc = Document::parse(r#"<a x="1">  padded <b/> tail </a>"#).unwrap();
    let a = doc.root_element();
    assert_eq!(attribute_value(a, "x").as_deref(), Some("1"));
    assert_eq!(attribute_value(a, "y"), None);
    assert_eq!(element_text(a), "padded  tail");
}

#[test]
fn test_namespace_prefix_is_ignored() {
    let doc = Document::parse(r#"<r xmlns:n="urn:x"><n:item>v</n:item></r>"#).unwrap();
    assert_eq!(texts(find_nodes_by_partial_path(doc.root(), &path("item"))), vec!["v"]);
}

#[test]
fn test_count_matching_paths() {
    let doc = Document::parse(COMPANY).unwrap();
    // department.name and department.employee.name
    assert_eq!(count_matching_paths(doc.root(), &path("name")), 2);
    assert_eq!(count_matching_paths(doc.root(), &path("employee.name")), 1);
    assert_eq!(count_matching_paths(doc.root(), &path("missing")), 0);
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn test_numeric_comparisons() {
    let test_cases = vec![
        ("5", "5.0", ComparisonOp::Equals, true),
        ("5", "6", ComparisonOp::NotEquals, true),
        ("9", "10", ComparisonOp::LessThan, true),
        ("10", "9", ComparisonOp::GreaterThan, true),
        ("10", "10", ComparisonOp::LessEqual, true),
        ("10", "10", ComparisonOp::GreaterEqual, true),
        ("-1", "0", ComparisonOp::LessThan, true),
        ("abc", "10", ComparisonOp::Equals, false),
        ("abc", "10", ComparisonOp::NotEquals, false),
    ];

    for (actual, expected, op, result) in test_cases {
        assert_eq!(
            compare_values(actual, expected, op, true),
            result,
            "Failed for {} {} {}",
            actual,
            op,
            expected
        );
    }
}

#[test]
fn test_lexical_comparisons() {
    assert!(compare_values("Paris", "Paris", ComparisonOp::Equals, false));
    assert!(compare_values("9", "10", ComparisonOp::GreaterThan, false));
    assert!(compare_values("apple", "banana", ComparisonOp::LessThan, false));
    assert!(!compare_values("Paris", "paris", ComparisonOp::Equals, false));
}

// ============================================================================
// Conditions
// ============================================================================

#[test]
fn test_null_semantics() {
    let is_null = condition(ComparisonOp::IsNull, "", false);
    let is_not_null = condition(ComparisonOp::IsNotNull, "", false);

    for value in [None, Some(""), Some("x"), Some(" ")] {
        assert_eq!(
            evaluate_condition(value, &is_null),
            !evaluate_condition(value, &is_not_null),
            "IS NOT NULL must negate IS NULL for {:?}",
            value
        );
    }
    assert!(evaluate_condition(None, &is_null));
    assert!(evaluate_condition(Some(""), &is_null));
    assert!(!evaluate_condition(Some("x"), &is_null));
}

#[test]
fn test_absent_value_fails_comparisons() {
    let test_cases = vec![
        condition(ComparisonOp::Equals, "", false),
        condition(ComparisonOp::NotEquals, "x", false),
        condition(ComparisonOp::LessThan, "10", true),
        condition(ComparisonOp::Like, ".*", false),
        condition(ComparisonOp::NotLike, "x", false),
    ];

    for cond in test_cases {
        assert!(!evaluate_condition(None, &cond), "Expected false for {:?}", cond.op);
        assert!(!evaluate_condition(Some(""), &cond), "Expected false for {:?}", cond.op);
    }
}

#[test]
fn test_like_is_regex_search() {
    let like = condition(ComparisonOp::Like, "^A.*n$", false);
    assert!(evaluate_condition(Some("Ann"), &like));
    assert!(!evaluate_condition(Some("Bob"), &like));

    let contains = condition(ComparisonOp::Like, "ngin", false);
    assert!(evaluate_condition(Some("Engineering"), &contains));

    let not_like = condition(ComparisonOp::NotLike, "^A", false);
    assert!(evaluate_condition(Some("Bob"), &not_like));
    assert!(!evaluate_condition(Some("Ann"), &not_like));
}

#[test]
fn test_bad_regex_never_matches() {
    let like = condition(ComparisonOp::Like, "([unclosed", false);
    let not_like = condition(ComparisonOp::NotLike, "([unclosed", false);
    assert!(!evaluate_condition(Some("anything"), &like));
    assert!(!evaluate_condition(Some("anything"), &not_like));
}

#[test]
fn test_evaluate_where_with_resolver() {
    let query =
        parse_query("SELECT a FROM d WHERE city = 'Paris' AND (age > 30 OR vip IS NOT NULL)").unwrap();
    let expr = query.where_clause.unwrap();

    let rows = vec![
        (Some("Paris"), Some("40"), None, true),
        (Some("Paris"), Some("20"), Some("yes"), true),
        (Some("Paris"), Some("20"), None, false),
        (Some("Lyon"), Some("40"), Some("yes"), false),
        (None, Some("40"), None, false),
    ];

    for (city, age, vip, expected) in rows {
        let mut resolve = |c: &Condition| {
            let value = match c.field.path_string().as_str() {
                "city" => city,
                "age" => age,
                _ => vip,
            };
            value.map(String::from)
        };
        assert_eq!(
            evaluate_where(&expr, &mut resolve),
            expected,
            "Failed for {:?}",
            (city, age, vip)
        );
    }
}

#[test]
fn test_evaluate_where_short_circuits() {
    let query = parse_query("SELECT a FROM d WHERE a = 1 OR b = 2").unwrap();
    let expr = query.where_clause.unwrap();

    let mut seen = Vec::new();
    let mut resolve = |c: &Condition| {
        seen.push(c.field.path_string());
        Some("1".to_string())
    };
    assert!(evaluate_where(&expr, &mut resolve));
    assert_eq!(seen, vec!["a"]);
}
