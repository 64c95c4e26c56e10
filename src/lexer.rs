use crate::error::{Error, Result};

// ============================================================================
// Token Types
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Quote,
    Integer(i64),
    Float(f64),
    Str(String),
    Symbol(String),
    /// `:name` or `:ns/name`; `auto` is set for the `::` form.
    Keyword { text: String, auto: bool },
}

// ============================================================================
// Lexer
// ============================================================================

/// Turns source text into tokens on demand.
#[derive(Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, ',' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | '\'')
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Lex everything up front.
    pub fn tokenize(input: &str) -> Result<Vec<Token>> {
        Lexer::new(input).collect()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn current_char(&self) -> char {
        self.peek_ahead(0)
    }

    fn peek_ahead(&self, n: usize) -> char {
        self.input.get(self.position + n).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Lex {
            position: self.position,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            while !self.is_eof() && (self.current_char().is_whitespace() || self.current_char() == ',')
            {
                self.advance();
            }

            // Comments run from a semicolon to the end of the line.
            if !self.is_eof() && self.current_char() == ';' {
                while !self.is_eof() && self.current_char() != '\n' {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while !self.is_eof() && !is_delimiter(self.current_char()) {
            word.push(self.current_char());
            self.advance();
        }
        word
    }

    fn read_string(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance(); // opening quote
        let mut s = String::new();
        loop {
            if self.is_eof() {
                return Err(Error::Lex {
                    position: start,
                    message: "unterminated string".to_string(),
                });
            }
            match self.current_char() {
                '"' => {
                    self.advance();
                    return Ok(Token::Str(s));
                }
                '\\' => {
                    self.advance();
                    if self.is_eof() {
                        continue;
                    }
                    let escaped = match self.current_char() {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        '"' => '"',
                        '\\' => '\\',
                        other => return Err(self.error(format!("invalid escape \\{other}"))),
                    };
                    s.push(escaped);
                    self.advance();
                }
                ch => {
                    s.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let start = self.position;
        let text = self.read_word();
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Token::Integer(n));
        }
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| Error::Lex {
                position: start,
                message: format!("invalid number: {text}"),
            })
    }

    fn read_keyword(&mut self) -> Result<Token> {
        self.advance(); // ':'
        let auto = self.current_char() == ':';
        if auto {
            self.advance();
        }
        let text = self.read_word();
        if text.is_empty() || text.starts_with(':') {
            return Err(self.error("invalid keyword"));
        }
        Ok(Token::Keyword { text, auto })
    }

    pub fn next_token(&mut self) -> Option<Result<Token>> {
        self.skip_whitespace();
        if self.is_eof() {
            return None;
        }

        let simple = match self.current_char() {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '\'' => Some(Token::Quote),
            _ => None,
        };
        if let Some(token) = simple {
            self.advance();
            return Some(Ok(token));
        }

        Some(match self.current_char() {
            '"' => self.read_string(),
            ':' => self.read_keyword(),
            ch if ch.is_ascii_digit() => self.read_number(),
            '-' | '+' if self.peek_ahead(1).is_ascii_digit() => self.read_number(),
            _ => Ok(Token::Symbol(self.read_word())),
        })
    }
}

impl Iterator for Lexer {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
