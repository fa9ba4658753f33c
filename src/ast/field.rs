use crate::ast::Aggregate;

/// Name of the pseudo-field holding the queried file's name.
pub const FILE_NAME: &str = "FILE_NAME";

/// A field reference in SELECT, WHERE, HAVING or a FOR clause.
///
/// # Examples
/// ```text
/// dept.employee.name      // components ["dept", "employee", "name"]
/// dept/employee/name      // same path, slash separated
/// @id                     // attribute of any element
/// book.@isbn              // attribute of `book` elements
/// FILE_NAME               // name of the file being queried
/// emp.salary              // `emp` bound by a FOR clause
/// SUM(price) AS total     // aggregate over `price`
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    /// Path components; for aggregates these form the argument path.
    /// When `variable` is set, the first component is the variable name.
    pub components: Vec<String>,

    /// The `FILE_NAME` pseudo-field
    pub include_filename: bool,

    /// XML attribute read instead of element text
    pub attribute: Option<String>,

    /// FOR or AT variable named by the first component
    pub variable: Option<String>,

    /// Aggregate applied to this field
    pub aggregate: Option<Aggregate>,

    /// Output column name given with `AS`
    pub alias: Option<String>,
}

impl FieldPath {
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldPath {
            components: components.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn filename() -> Self {
        FieldPath {
            include_filename: true,
            ..Default::default()
        }
    }

    /// Builds a path from a dotted or slashed name such as `dept.name`,
    /// `a/b/@id` or `@id`.
    pub fn from_name(name: &str) -> Self {
        if name == FILE_NAME {
            return FieldPath::filename();
        }
        let mut field = FieldPath::default();
        for part in name.split(['.', '/']).filter(|p| !p.is_empty()) {
            match part.strip_prefix('@') {
                Some(attr) => field.attribute = Some(attr.to_string()),
                None => field.components.push(part.to_string()),
            }
        }
        field
    }

    pub fn is_attribute(&self) -> bool {
        self.attribute.is_some()
    }

    pub fn is_variable_ref(&self) -> bool {
        self.variable.is_some()
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }

    /// `COUNT(*)`: an aggregate without any argument path.
    pub fn is_count_star(&self) -> bool {
        self.aggregate == Some(Aggregate::Count)
            && self.components.is_empty()
            && self.attribute.is_none()
            && !self.include_filename
    }

    pub fn last_component(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Components that remain after the bound variable, if any.
    pub fn relative_components(&self) -> &[String] {
        if self.variable.is_some() && !self.components.is_empty() {
            &self.components[1..]
        } else {
            &self.components
        }
    }

    /// The path as written, without aggregate or alias.
    pub fn path_string(&self) -> String {
        if self.include_filename {
            return FILE_NAME.to_string();
        }
        let mut out = self.components.join(".");
        if let Some(attr) = &self.attribute {
            if !out.is_empty() {
                out.push('.');
            }
            out.push('@');
            out.push_str(attr);
        }
        out
    }

    /// Name of the result column produced by this field.
    pub fn column_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        if let Some(agg) = self.aggregate {
            let arg = if self.is_count_star() {
                "*".to_string()
            } else {
                self.path_string()
            };
            return format!("{}({})", agg.name(), arg);
        }
        self.leaf_name()
    }

    /// Column name ignoring alias and aggregate: the last component, `@attr`
    /// or `FILE_NAME`.
    pub fn leaf_name(&self) -> String {
        if self.include_filename {
            FILE_NAME.to_string()
        } else if let Some(attr) = &self.attribute {
            format!("@{}", attr)
        } else {
            self.last_component().unwrap_or_default().to_string()
        }
    }
}
