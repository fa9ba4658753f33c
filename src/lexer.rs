use crate::ast::{Token, TokenKind};

/// Splits a query string into tokens.
///
/// The lexer never fails: characters it does not understand and unterminated
/// literals come out as [`TokenKind::Invalid`] tokens for the parser to
/// reject. Every position is a byte offset into the original string.
pub struct Lexer {
    input: Vec<(usize, char)>,
    len: usize,
    position: usize,
    previous: Option<TokenKind>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.char_indices().collect(),
            len: input.len(),
            position: 0,
            previous: None,
        }
    }

    /// Tokenizes the whole input, always ending with an `Eof` token.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is(TokenKind::Eof);
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).map(|&(_, c)| c)
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).map(|&(_, c)| c)
    }

    /// Byte offset of the current character.
    fn offset(&self) -> usize {
        self.input
            .get(self.position)
            .map(|&(i, _)| i)
            .unwrap_or(self.len)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn is_identifier_char(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_' || ch == '-'
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if Self::is_identifier_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Token {
        let start = self.offset();
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == quote {
                return Token::new(TokenKind::StringLiteral, result, start);
            }
            result.push(ch);
        }

        Token::new(TokenKind::Invalid, result, start)
    }

    fn read_regex(&mut self) -> Token {
        let start = self.offset();
        let mut pattern = String::new();
        self.advance(); // opening slash

        while let Some(ch) = self.current_char() {
            match ch {
                '/' => {
                    self.advance();
                    return Token::new(TokenKind::RegexLiteral, pattern, start);
                }
                '\\' if self.peek_char(1) == Some('/') => {
                    pattern.push('/');
                    self.advance();
                    self.advance();
                }
                _ => {
                    pattern.push(ch);
                    self.advance();
                }
            }
        }

        Token::new(TokenKind::Invalid, pattern, start)
    }

    /// Digits and dots; digits directly followed by `_` or a letter continue
    /// as an identifier (`30_001`, `2024abc`).
    fn read_number(&mut self) -> Token {
        let start = self.offset();
        let mut number = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if self
            .current_char()
            .is_some_and(|c| c == '_' || c.is_alphabetic())
        {
            number.push_str(&self.read_identifier());
            return Token::new(TokenKind::Identifier, number, start);
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || ch == '.' {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::new(TokenKind::Number, number, start)
    }

    fn keyword(word: &str) -> TokenKind {
        match word.to_ascii_uppercase().as_str() {
            "SELECT" => TokenKind::Select,
            "DISTINCT" => TokenKind::Distinct,
            "FROM" => TokenKind::From,
            "WHERE" => TokenKind::Where,
            "FOR" => TokenKind::For,
            "IN" => TokenKind::In,
            "AT" => TokenKind::At,
            "GROUP" => TokenKind::Group,
            "BY" => TokenKind::By,
            "ORDER" => TokenKind::Order,
            "HAVING" => TokenKind::Having,
            "AS" => TokenKind::As,
            "LIMIT" => TokenKind::Limit,
            "OFFSET" => TokenKind::Offset,
            "ASC" => TokenKind::Asc,
            "DESC" => TokenKind::Desc,
            "COUNT" => TokenKind::Count,
            "SUM" => TokenKind::Sum,
            "AVG" => TokenKind::Avg,
            "MIN" => TokenKind::Min,
            "MAX" => TokenKind::Max,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "IS" => TokenKind::Is,
            "NOT" => TokenKind::Not,
            "NULL" => TokenKind::Null,
            "LIKE" => TokenKind::Like,
            _ => TokenKind::Identifier,
        }
    }

    fn single(&mut self, kind: TokenKind, text: &str) -> Token {
        let start = self.offset();
        self.advance();
        Token::new(kind, text, start)
    }

    fn double(&mut self, kind: TokenKind, text: &str) -> Token {
        let start = self.offset();
        self.advance();
        self.advance();
        Token::new(kind, text, start)
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let token = match self.current_char() {
            None => Token::eof(self.len),
            Some('/') if self.previous == Some(TokenKind::Like) => self.read_regex(),
            Some('.') => self.single(TokenKind::Dot, "."),
            Some('/') => self.single(TokenKind::Slash, "/"),
            Some(',') => self.single(TokenKind::Comma, ","),
            Some('(') => self.single(TokenKind::LParen, "("),
            Some(')') => self.single(TokenKind::RParen, ")"),
            Some('*') => self.single(TokenKind::Asterisk, "*"),
            Some('@') => self.single(TokenKind::AtSign, "@"),
            Some('-') => self.single(TokenKind::Dash, "-"),
            Some('=') => self.single(TokenKind::Equals, "="),
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.double(TokenKind::LessEqual, "<=")
                } else {
                    self.single(TokenKind::LessThan, "<")
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.double(TokenKind::GreaterEqual, ">=")
                } else {
                    self.single(TokenKind::GreaterThan, ">")
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.double(TokenKind::NotEquals, "!=")
                } else {
                    self.single(TokenKind::Invalid, "!")
                }
            }
            Some(q @ ('"' | '\'')) => self.read_string(q),
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let start = self.offset();
                let ident = self.read_identifier();
                Token::new(Self::keyword(&ident), ident, start)
            }
            Some(ch) => {
                let start = self.offset();
                self.advance();
                Token::new(TokenKind::Invalid, ch.to_string(), start)
            }
        };

        self.previous = Some(token.kind);
        token
    }
}

#[test]
fn test_keywords_case_insensitive() {
    let mut lexer = Lexer::new("select From wHeRe");
    assert_eq!(lexer.next_token().kind, TokenKind::Select);
    assert_eq!(lexer.next_token().kind, TokenKind::From);
    assert_eq!(lexer.next_token().kind, TokenKind::Where);
    assert_eq!(lexer.next_token().kind, TokenKind::Eof);
}

#[test]
fn test_regex_only_after_like() {
    let mut lexer = Lexer::new("a / b LIKE /^x\\/y$/");
    assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
    assert_eq!(lexer.next_token().kind, TokenKind::Slash);
    assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
    assert_eq!(lexer.next_token().kind, TokenKind::Like);
    let regex = lexer.next_token();
    assert_eq!(regex.kind, TokenKind::RegexLiteral);
    assert_eq!(regex.text, "^x/y$");
}
