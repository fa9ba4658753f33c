/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Clause keywords
    Select,
    Distinct,
    From,
    Where,
    For,
    In,
    /// `AT` keyword introducing a position variable
    ///
    /// # Examples
    /// ```text
    /// FOR emp IN employee AT idx
    /// ```
    At,
    Group,
    By,
    Order,
    Having,
    As,
    Limit,
    Offset,
    Asc,
    Desc,

    // Aggregates
    Count,
    Sum,
    Avg,
    Min,
    Max,

    // Logical and predicate keywords
    And,
    Or,
    Is,
    Not,
    Null,
    Like,

    // Literals
    /// Field name, variable or bare value
    ///
    /// Starts with a letter or underscore, or with digits immediately followed
    /// by an underscore or a letter (DSN shortcuts such as `30_001`).
    Identifier,

    /// Run of digits and dots
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// ```
    Number,

    /// Text between single or double quotes, quotes stripped
    StringLiteral,

    /// Pattern between slashes following `LIKE`, slashes stripped
    ///
    /// # Examples
    /// ```text
    /// name LIKE /^J.*n$/
    /// ```
    RegexLiteral,

    // Punctuation
    Dot,
    Slash,
    Comma,
    LParen,
    RParen,
    /// `*`, only meaningful in `COUNT(*)`
    Asterisk,
    /// `@`, prefix of an XML attribute name
    AtSign,
    /// `-`, negative numbers and unquoted paths
    Dash,

    // Comparison
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,

    /// Unrecognised character or unterminated literal
    Invalid,

    /// End of input
    Eof,
}

impl TokenKind {
    /// True for keywords that open a query clause.
    pub fn is_clause_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Select
                | TokenKind::From
                | TokenKind::Where
                | TokenKind::For
                | TokenKind::Group
                | TokenKind::Having
                | TokenKind::Order
                | TokenKind::Limit
                | TokenKind::Offset
        )
    }

    /// True for every keyword, including aggregate names.
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Select
                | Distinct
                | From
                | Where
                | For
                | In
                | At
                | Group
                | By
                | Order
                | Having
                | As
                | Limit
                | Offset
                | Asc
                | Desc
                | Count
                | Sum
                | Avg
                | Min
                | Max
                | And
                | Or
                | Is
                | Not
                | Null
                | Like
        )
    }

    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            TokenKind::Count | TokenKind::Sum | TokenKind::Avg | TokenKind::Min | TokenKind::Max
        )
    }
}

/// A token with its text and the byte offset where it starts.
///
/// For string and regex literals `text` holds the content without delimiters;
/// for every other kind it is the exact source slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn eof(position: usize) -> Self {
        Token::new(TokenKind::Eof, "", position)
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}
