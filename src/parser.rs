use thiserror::Error;

use crate::{
    ast::{
        Aggregate, ComparisonOp, Condition, FILE_NAME, FieldPath, ForClause, OrderByField, Query,
        SortDirection, Token, TokenKind, WhereExpr,
    },
    lexer::Lexer,
};

/// A grammar violation, reported with the offending token.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (got {found} at position {position})")]
pub struct ParseError {
    pub message: String,
    /// Text of the offending token, quoted, or `end of input`
    pub found: String,
    pub position: usize,
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Set while parsing HAVING
    aggregates_allowed: bool,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Parser::from_tokens(lexer.tokenize())
    }

    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(|t| t.is(TokenKind::Eof)) {
            let end = tokens.last().map(|t| t.position + t.text.len()).unwrap_or(0);
            tokens.push(Token::eof(end));
        }
        Parser {
            tokens,
            current: 0,
            aggregates_allowed: false,
        }
    }

    fn peek(&self) -> &Token {
        // `from_tokens` guarantees a trailing Eof
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().is(kind)
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        Self::error_at(self.peek(), message)
    }

    fn error_at(token: &Token, message: impl Into<String>) -> ParseError {
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", token.text),
        };
        ParseError {
            message: message.into(),
            found,
            position: token.position,
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    /// Parse a complete query
    pub fn parse_query(&mut self) -> Result<Query, ParseError> {
        let mut query = Query::default();

        self.expect(TokenKind::Select, "Expected SELECT keyword")?;
        query.distinct = self.match_kind(TokenKind::Distinct);

        query.select_fields.push(self.parse_select_field()?);
        while self.match_kind(TokenKind::Comma) {
            query.select_fields.push(self.parse_select_field()?);
        }

        self.expect(TokenKind::From, "Expected FROM keyword")?;
        query.from_path = self.parse_from_path()?;

        while self.check(TokenKind::For) {
            let clause = self.parse_for_clause(&query.for_clauses)?;
            query.for_clauses.push(clause);
        }

        if self.match_kind(TokenKind::Where) {
            query.where_clause = Some(self.parse_where_or()?);
        }

        if self.match_kind(TokenKind::Group) {
            self.expect(TokenKind::By, "Expected BY after GROUP")?;
            query.group_by_fields.push(self.parse_column_name()?);
            while self.match_kind(TokenKind::Comma) {
                query.group_by_fields.push(self.parse_column_name()?);
            }
        }

        if self.match_kind(TokenKind::Having) {
            self.aggregates_allowed = true;
            let having = self.parse_where_or();
            self.aggregates_allowed = false;
            query.having = Some(having?);
        }

        if self.match_kind(TokenKind::Order) {
            self.expect(TokenKind::By, "Expected BY after ORDER")?;
            query.order_by_fields.push(self.parse_order_field()?);
            while self.match_kind(TokenKind::Comma) {
                query.order_by_fields.push(self.parse_order_field()?);
            }
        }

        loop {
            if query.limit.is_none() && self.match_kind(TokenKind::Limit) {
                query.limit = Some(self.parse_count("LIMIT")?);
            } else if query.offset.is_none() && self.match_kind(TokenKind::Offset) {
                query.offset = Some(self.parse_count("OFFSET")?);
            } else {
                break;
            }
        }

        self.expect(TokenKind::Eof, "Unexpected tokens after query")?;

        query.has_aggregates = query.select_fields.iter().any(FieldPath::is_aggregate);
        Self::resolve_variables(&mut query);

        Ok(query)
    }

    /// FOR clauses are parsed after SELECT, so references to their variables
    /// can only be classified once the whole query is known.
    fn resolve_variables(query: &mut Query) {
        let mut select = std::mem::take(&mut query.select_fields);
        let mut where_clause = query.where_clause.take();
        let mut having = query.having.take();

        for field in &mut select {
            query.bind_variables(field);
        }
        for expr in [where_clause.as_mut(), having.as_mut()].into_iter().flatten() {
            expr.fields_mut(&mut |f| query.bind_variables(f));
        }

        query.select_fields = select;
        query.where_clause = where_clause;
        query.having = having;
    }

    fn parse_select_field(&mut self) -> Result<FieldPath, ParseError> {
        let mut field = self.parse_operand()?;

        if self.match_kind(TokenKind::As) {
            let alias = self.expect_name("Expected alias after AS")?;
            field.alias = Some(alias);
        }

        Ok(field)
    }

    /// A field path or an aggregate call such as `COUNT(*)` or `SUM(price)`.
    ///
    /// An aggregate keyword not followed by `(` is an ordinary field name.
    fn parse_operand(&mut self) -> Result<FieldPath, ParseError> {
        if !self.peek().kind.is_aggregate() {
            return self.parse_field_path();
        }

        let token = self.advance();
        if !self.match_kind(TokenKind::LParen) {
            return self.parse_field_path_from(token.text);
        }

        let aggregate = match token.kind {
            TokenKind::Count => Aggregate::Count,
            TokenKind::Sum => Aggregate::Sum,
            TokenKind::Avg => Aggregate::Avg,
            TokenKind::Min => Aggregate::Min,
            _ => Aggregate::Max,
        };

        let mut field = if self.check(TokenKind::Asterisk) {
            if aggregate != Aggregate::Count {
                return Err(self.error(format!(
                    "'*' is only allowed in COUNT(*), not {}",
                    aggregate.name()
                )));
            }
            self.advance();
            FieldPath::default()
        } else {
            self.parse_field_path()?
        };
        field.aggregate = Some(aggregate);

        self.expect(TokenKind::RParen, "Expected ')' after aggregate argument")?;
        Ok(field)
    }

    fn parse_field_path(&mut self) -> Result<FieldPath, ParseError> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Identifier if token.text == FILE_NAME => {
                self.advance();
                Ok(FieldPath::filename())
            }
            TokenKind::AtSign => {
                self.advance();
                let name = self.expect_component("Expected attribute name after '@'")?;
                Ok(FieldPath {
                    attribute: Some(name),
                    ..Default::default()
                })
            }
            TokenKind::Identifier => {
                self.advance();
                self.parse_field_path_from(token.text)
            }
            _ => Err(self.error("Expected field identifier")),
        }
    }

    /// Continues a path whose first component is already consumed.
    fn parse_field_path_from(&mut self, first: String) -> Result<FieldPath, ParseError> {
        let mut field = FieldPath::new([first]);

        while self.check(TokenKind::Dot) || self.check(TokenKind::Slash) {
            self.advance();

            if self.match_kind(TokenKind::AtSign) {
                let name = self.expect_component("Expected attribute name after '@'")?;
                field.attribute = Some(name);
                break;
            }

            let component = self.expect_component("Expected identifier after separator")?;
            field.components.push(component);
        }

        Ok(field)
    }

    /// An identifier, or a keyword used as an element name (`order.count`).
    fn expect_component(&mut self, message: &str) -> Result<String, ParseError> {
        let token = self.peek();
        if token.is(TokenKind::Identifier) || token.kind.is_keyword() {
            Ok(self.advance().text)
        } else {
            Err(self.error(message))
        }
    }

    fn expect_name(&mut self, message: &str) -> Result<String, ParseError> {
        Ok(self.expect(TokenKind::Identifier, message)?.text)
    }

    /// Quoted, or a run of adjacent path-like tokens.
    ///
    /// Whitespace ends an unquoted path; keywords written inside it
    /// (`./data/for/x`) belong to the path.
    fn parse_from_path(&mut self) -> Result<String, ParseError> {
        if self.check(TokenKind::StringLiteral) {
            return Ok(self.advance().text);
        }

        let mut path = String::new();
        let mut end = 0;

        loop {
            let token = self.peek();
            let adjacent = !path.is_empty() && token.position == end;
            let path_like = match token.kind {
                TokenKind::Identifier
                | TokenKind::Number
                | TokenKind::Slash
                | TokenKind::Dot
                | TokenKind::Dash => true,
                TokenKind::Invalid => matches!(token.text.as_str(), "~" | ":" | "\\"),
                kind => adjacent && kind.is_keyword(),
            };

            if !path_like || (!path.is_empty() && !adjacent) {
                break;
            }

            end = token.position + token.text.len();
            path.push_str(&self.advance().text);
        }

        if path.is_empty() {
            return Err(self.error("Expected file or directory path after FROM"));
        }

        Ok(path)
    }

    fn parse_for_clause(&mut self, declared: &[ForClause]) -> Result<ForClause, ParseError> {
        self.expect(TokenKind::For, "Expected FOR")?;

        let variable = self.expect_name("Expected variable name after FOR")?;
        let taken = declared.iter().any(|fc| {
            fc.variable == variable || fc.position_var.as_deref() == Some(variable.as_str())
        });
        if taken {
            return Err(self.error(format!("Variable '{}' is already declared", variable)));
        }

        self.expect(TokenKind::In, "Expected IN after FOR variable")?;

        let mut path = self.parse_field_path()?;
        if let Some(first) = path.components.first()
            && declared.iter().any(|fc| &fc.variable == first)
        {
            path.variable = Some(first.clone());
        }

        let position_var = if self.match_kind(TokenKind::At) {
            Some(self.expect_name("Expected position variable after AT")?)
        } else {
            None
        };

        Ok(ForClause {
            variable,
            path,
            position_var,
        })
    }

    fn parse_where_or(&mut self) -> Result<WhereExpr, ParseError> {
        let mut left = self.parse_where_and()?;

        while self.match_kind(TokenKind::Or) {
            let right = self.parse_where_and()?;
            left = WhereExpr::or(left, right);
        }

        Ok(left)
    }

    fn parse_where_and(&mut self) -> Result<WhereExpr, ParseError> {
        let mut left = self.parse_where_primary()?;

        while self.match_kind(TokenKind::And) {
            let right = self.parse_where_primary()?;
            left = WhereExpr::and(left, right);
        }

        Ok(left)
    }

    fn parse_where_primary(&mut self) -> Result<WhereExpr, ParseError> {
        if self.match_kind(TokenKind::LParen) {
            let expr = self.parse_where_or()?;
            self.expect(TokenKind::RParen, "Expected closing parenthesis")?;
            return Ok(expr);
        }

        Ok(WhereExpr::Condition(self.parse_condition()?))
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let start = self.peek().clone();
        let field = self.parse_operand()?;
        if field.is_aggregate() && !self.aggregates_allowed {
            return Err(Self::error_at(&start, "Aggregates are only allowed in SELECT and HAVING"));
        }

        match self.peek().kind {
            TokenKind::Is => {
                self.advance();
                if self.match_kind(TokenKind::Not) {
                    if self.match_kind(TokenKind::Null) {
                        Ok(Condition::new(field, ComparisonOp::IsNotNull, "", false))
                    } else if self.match_kind(TokenKind::Like) {
                        let pattern = self.parse_regex()?;
                        Ok(Condition::new(field, ComparisonOp::NotLike, pattern, false))
                    } else {
                        Err(self.error("Expected NULL or LIKE after IS NOT"))
                    }
                } else if self.match_kind(TokenKind::Null) {
                    Ok(Condition::new(field, ComparisonOp::IsNull, "", false))
                } else {
                    Err(self.error("Expected NULL or NOT after IS"))
                }
            }
            TokenKind::Not => {
                self.advance();
                self.expect(TokenKind::Like, "Expected LIKE after NOT")?;
                let pattern = self.parse_regex()?;
                Ok(Condition::new(field, ComparisonOp::NotLike, pattern, false))
            }
            TokenKind::Like => {
                self.advance();
                let pattern = self.parse_regex()?;
                Ok(Condition::new(field, ComparisonOp::Like, pattern, false))
            }
            _ => {
                let op = self.parse_comparison_op()?;
                let (value, is_numeric) = self.parse_value()?;
                Ok(Condition::new(field, op, value, is_numeric))
            }
        }
    }

    fn parse_comparison_op(&mut self) -> Result<ComparisonOp, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Equals => ComparisonOp::Equals,
            TokenKind::NotEquals => ComparisonOp::NotEquals,
            TokenKind::LessThan => ComparisonOp::LessThan,
            TokenKind::GreaterThan => ComparisonOp::GreaterThan,
            TokenKind::LessEqual => ComparisonOp::LessEqual,
            TokenKind::GreaterEqual => ComparisonOp::GreaterEqual,
            _ => return Err(self.error("Expected comparison operator")),
        };
        self.advance();
        Ok(op)
    }

    fn parse_regex(&mut self) -> Result<String, ParseError> {
        Ok(self
            .expect(TokenKind::RegexLiteral, "Expected /regex/ pattern after LIKE")?
            .text)
    }

    /// Returns the literal and whether it was written as a number.
    fn parse_value(&mut self) -> Result<(String, bool), ParseError> {
        match self.peek().kind {
            TokenKind::Number => Ok((self.advance().text, true)),
            TokenKind::Dash => {
                self.advance();
                let number = self.expect(TokenKind::Number, "Expected number after '-'")?;
                Ok((format!("-{}", number.text), true))
            }
            TokenKind::StringLiteral | TokenKind::Identifier => Ok((self.advance().text, false)),
            _ => Err(self.error("Expected value in condition")),
        }
    }

    /// A GROUP BY or ORDER BY reference to a result column.
    fn parse_column_name(&mut self) -> Result<String, ParseError> {
        let field = self.parse_operand()?;
        Ok(if field.is_aggregate() {
            field.column_name()
        } else {
            field.path_string()
        })
    }

    fn parse_order_field(&mut self) -> Result<OrderByField, ParseError> {
        let field = self.parse_column_name()?;
        let direction = if self.match_kind(TokenKind::Desc) {
            SortDirection::Desc
        } else {
            self.match_kind(TokenKind::Asc);
            SortDirection::Asc
        };
        Ok(OrderByField { field, direction })
    }

    fn parse_count(&mut self, clause: &str) -> Result<usize, ParseError> {
        let message = format!("Expected non-negative integer after {}", clause);
        if !self.check(TokenKind::Number) {
            return Err(self.error(message));
        }
        let value = self.peek().text.parse::<usize>().map_err(|_| self.error(message.as_str()))?;
        self.advance();
        Ok(value)
    }
}

/// Lexes and parses `input` in one step.
pub fn parse_query(input: &str) -> Result<Query, ParseError> {
    Parser::new(Lexer::new(input)).parse_query()
}
