//! XPath lexer
//!
//! Tokenizes XPath expressions. Follows the lexical disambiguation rules of
//! XPath 1.0 section 3.7: after a token that can end an operand, `*` is the
//! multiplication operator and `and`/`or`/`div`/`mod` are operator names.

use crate::core::error::{PruneError, PruneResult};

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Multiply,    // *
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Punctuation
    Dot,          // .
    DoubleDot,    // ..
    At,           // @
    Comma,        // ,
    DoubleColon,  // ::
    Dollar,       // $
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    /// Name test wildcard `*`
    Star,
    Literal(String),
    Number(f64),
    /// NCName or QName; `prefix:*` has local name `*`
    Name {
        prefix: Option<String>,
        local: String,
    },
}

impl Token {
    fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Multiply
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::And
                | Token::Or
                | Token::Mod
                | Token::Div
        )
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> PruneResult<Vec<Token>> {
        while let Some(c) = self.skip_whitespace() {
            let token = match c {
                '/' => self.one_or_two('/', Token::Slash, Token::DoubleSlash),
                '|' => self.single(Token::Pipe),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '=' => self.single(Token::Eq),
                '<' => self.one_or_two('=', Token::Lt, Token::LtEq),
                '>' => self.one_or_two('=', Token::Gt, Token::GtEq),
                '!' => {
                    if self.peek_at(1) != Some('=') {
                        return Err(self.error("expected '=' after '!'"));
                    }
                    self.pos += 2;
                    Token::NotEq
                }
                '@' => self.single(Token::At),
                ',' => self.single(Token::Comma),
                '$' => self.single(Token::Dollar),
                '(' => self.single(Token::LeftParen),
                ')' => self.single(Token::RightParen),
                '[' => self.single(Token::LeftBracket),
                ']' => self.single(Token::RightBracket),
                ':' => {
                    if self.peek_at(1) != Some(':') {
                        return Err(self.error("unexpected ':'"));
                    }
                    self.pos += 2;
                    Token::DoubleColon
                }
                '*' => {
                    self.pos += 1;
                    if self.operator_expected() {
                        Token::Multiply
                    } else {
                        Token::Star
                    }
                }
                '.' => match self.peek_at(1) {
                    Some('.') => {
                        self.pos += 2;
                        Token::DoubleDot
                    }
                    Some(d) if d.is_ascii_digit() => self.number(),
                    _ => self.single(Token::Dot),
                },
                '"' | '\'' => self.literal(c)?,
                d if d.is_ascii_digit() => self.number(),
                n if is_name_start(n) => self.name()?,
                other => return Err(self.error(&format!("unexpected character '{}'", other))),
            };
            self.tokens.push(token);
        }
        Ok(self.tokens)
    }

    /// Whether the previous token ends an operand
    fn operator_expected(&self) -> bool {
        match self.tokens.last() {
            None => false,
            Some(
                Token::At
                | Token::DoubleColon
                | Token::LeftParen
                | Token::LeftBracket
                | Token::Comma,
            ) => false,
            Some(token) => !token.is_operator(),
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn skip_whitespace(&mut self) -> Option<char> {
        let trimmed = self
            .remaining()
            .trim_start_matches([' ', '\t', '\r', '\n']);
        self.pos = self.input.len() - trimmed.len();
        trimmed.chars().next()
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn one_or_two(&mut self, second: char, one: Token, two: Token) -> Token {
        if self.peek_at(1) == Some(second) {
            self.pos += 2;
            two
        } else {
            self.pos += 1;
            one
        }
    }

    fn literal(&mut self, quote: char) -> PruneResult<Token> {
        let body = &self.remaining()[1..];
        let end = body
            .find(quote)
            .ok_or_else(|| self.error("unterminated string literal"))?;
        let value = body[..end].to_string();
        self.pos += end + 2;
        Ok(Token::Literal(value))
    }

    fn number(&mut self) -> Token {
        let text = self.remaining();
        let mut seen_dot = false;
        let len = text
            .char_indices()
            .find(|&(_, c)| {
                if c == '.' && !seen_dot {
                    seen_dot = true;
                    false
                } else {
                    !c.is_ascii_digit()
                }
            })
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let value = text[..len].parse::<f64>().unwrap_or(f64::NAN);
        self.pos += len;
        Token::Number(value)
    }

    fn ncname(&mut self) -> &'a str {
        let text = self.remaining();
        let len = text
            .char_indices()
            .find(|&(_, c)| !is_name_char(c))
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        self.pos += len;
        &text[..len]
    }

    fn name(&mut self) -> PruneResult<Token> {
        let first = self.ncname();

        if self.operator_expected() {
            match first {
                "and" => return Ok(Token::And),
                "or" => return Ok(Token::Or),
                "mod" => return Ok(Token::Mod),
                "div" => return Ok(Token::Div),
                _ => {}
            }
        }

        // A single ':' joins a prefix to a local name; '::' follows an axis name
        if self.peek_at(0) == Some(':') && self.peek_at(1) != Some(':') {
            match self.peek_at(1) {
                Some('*') => {
                    self.pos += 2;
                    return Ok(Token::Name {
                        prefix: Some(first.to_string()),
                        local: "*".to_string(),
                    });
                }
                Some(c) if is_name_start(c) => {
                    self.pos += 1;
                    let local = self.ncname();
                    return Ok(Token::Name {
                        prefix: Some(first.to_string()),
                        local: local.to_string(),
                    });
                }
                _ => return Err(self.error("expected a local name after ':'")),
            }
        }

        Ok(Token::Name {
            prefix: None,
            local: first.to_string(),
        })
    }

    fn error(&self, message: &str) -> PruneError {
        PruneError::Query(format!(
            "Invalid XPath '{}' at offset {}: {}",
            self.input, self.pos, message
        ))
    }
}

/// Tokenize an XPath expression
pub fn tokenize(input: &str) -> PruneResult<Vec<Token>> {
    Lexer::new(input).tokenize()
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == '\u{b7}'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(prefix: Option<&str>, local: &str) -> Token {
        Token::Name {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        }
    }

    #[test]
    fn test_path_tokens() {
        let tokens = tokenize("//ns:relatedLists/ns:*").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::DoubleSlash,
                name(Some("ns"), "relatedLists"),
                Token::Slash,
                name(Some("ns"), "*"),
            ]
        );
    }

    #[test]
    fn test_function_call_tokens() {
        let tokens = tokenize("re:match(text(), '.*__c')").unwrap();
        assert_eq!(
            tokens,
            vec![
                name(Some("re"), "match"),
                Token::LeftParen,
                name(None, "text"),
                Token::LeftParen,
                Token::RightParen,
                Token::Comma,
                Token::Literal(".*__c".to_string()),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_star_and_operator_names() {
        let tokens = tokenize("* * 2 and div").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Star,
                Token::Multiply,
                Token::Number(2.0),
                Token::And,
                name(None, "div"),
            ]
        );
    }

    #[test]
    fn test_axis_and_numbers() {
        let tokens = tokenize("child::a[.5 != 1.25]").unwrap();
        assert_eq!(
            tokens,
            vec![
                name(None, "child"),
                Token::DoubleColon,
                name(None, "a"),
                Token::LeftBracket,
                Token::Number(0.5),
                Token::NotEq,
                Token::Number(1.25),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_hyphenated_names() {
        let tokens = tokenize("starts-with(a, \"x\")").unwrap();
        assert_eq!(tokens[0], name(None, "starts-with"));
        assert_eq!(tokens[4], Token::Literal("x".to_string()));
    }

    #[test]
    fn test_errors() {
        assert!(tokenize("'open").is_err());
        assert!(tokenize("a ! b").is_err());
        assert!(tokenize("a:").is_err());
        assert!(tokenize("#").is_err());
    }
}
