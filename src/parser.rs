use im::{HashMap as ImHashMap, Vector as ImVector};

use crate::error::{Error, Result};
use crate::language::{Symbol, Value};
use crate::lexer::{Lexer, Token};
use crate::runtime::Context;

// ============================================================================
// Parser
// ============================================================================

/// Reads top-level forms one at a time.
///
/// Keywords are interned while reading, so `::foo` resolves against the
/// namespace that is current when the form is read, not when the parser was
/// made. A malformed form yields one error; reading then resumes at the
/// next top-level form.
#[derive(Clone)]
pub struct Parser<'a> {
    ctx: &'a Context,
    lexer: Lexer,
    peeked: Option<Token>,
    /// Collections opened but not yet closed.
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(ctx: &'a Context, input: &str) -> Self {
        Parser {
            ctx,
            lexer: Lexer::new(input),
            peeked: None,
            depth: 0,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => self.lexer.next_token().transpose(),
        }
    }

    fn expect_token(&mut self, context: &str) -> Result<Token> {
        self.next_token()?
            .ok_or_else(|| Error::parse(format!("unexpected end of input {context}")))
    }

    fn read_form(&mut self, token: Token) -> Result<Value> {
        match token {
            Token::Integer(n) => Ok(Value::Int(n)),
            Token::Float(x) => Ok(Value::Float(x)),
            Token::Str(s) => Ok(Value::string(&s)),
            Token::Symbol(text) => Ok(read_symbol(&text)),
            Token::Keyword { text, auto } => {
                let kw = self.ctx.intern_keyword_sym(Symbol::parse(&text), !auto)?;
                Ok(Value::Keyword(kw))
            }
            Token::Quote => {
                let next = self.expect_token("after quote")?;
                let quoted = self.read_form(next)?;
                Ok(Value::list(vec![Value::symbol("quote"), quoted]))
            }
            Token::LParen => Ok(Value::list(self.read_until(Token::RParen, "in list")?)),
            Token::LBracket => Ok(Value::Vector(ImVector::from(
                self.read_until(Token::RBracket, "in vector")?,
            ))),
            Token::LBrace => {
                let items = self.read_until(Token::RBrace, "in map")?;
                if items.len() % 2 != 0 {
                    return Err(Error::parse("map literal must contain an even number of forms"));
                }
                let mut map = ImHashMap::new();
                let mut items = items.into_iter();
                while let (Some(k), Some(v)) = (items.next(), items.next()) {
                    map.insert(k, v);
                }
                Ok(Value::Map(map))
            }
            Token::RParen | Token::RBracket | Token::RBrace => {
                Err(Error::parse(format!("unexpected {}", closing_text(&token))))
            }
        }
    }

    fn read_until(&mut self, close: Token, context: &str) -> Result<Vec<Value>> {
        self.depth += 1;
        let mut items = Vec::new();
        loop {
            let token = self.expect_token(context)?;
            if token == close {
                self.depth -= 1;
                return Ok(items);
            }
            items.push(self.read_form(token)?);
        }
    }

    /// Skip the rest of a form that failed partway through, stopping once
    /// every collection it opened has been closed or the input runs out.
    fn recover(&mut self) {
        while self.depth > 0 {
            match self.next_token() {
                Ok(Some(Token::LParen | Token::LBracket | Token::LBrace)) => self.depth += 1,
                Ok(Some(Token::RParen | Token::RBracket | Token::RBrace)) => self.depth -= 1,
                Ok(Some(_)) | Err(_) => {}
                Ok(None) => self.depth = 0,
            }
        }
    }
}

fn read_symbol(text: &str) -> Value {
    match text {
        "nil" => Value::Nil,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::symbol(text),
    }
}

fn closing_text(token: &Token) -> &'static str {
    match token {
        Token::RParen => "')'",
        Token::RBracket => "']'",
        _ => "'}'",
    }
}

impl Iterator for Parser<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let form = match self.next_token() {
            Ok(Some(token)) => self.read_form(token),
            Ok(None) => return None,
            Err(e) => Err(e),
        };
        if form.is_err() {
            self.recover();
        }
        Some(form)
    }
}
