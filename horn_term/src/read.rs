//! The term reader: turns Prolog source text into [`Term`]s, one per
//! period-terminated clause. Variables sharing a name within a clause share
//! a variable; across clauses they do not.

use crate::{
    atom::Atom,
    term::{Term, Var},
};

use ::{
    failure::Fail,
    std::{collections::HashMap, iter::Peekable, str::CharIndices},
};


#[derive(Debug, Clone, Fail)]
#[fail(display = "read error at {}:{}: {}", line, column, message)]
pub struct ReadError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ReadError {
    fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Read exactly one term. The terminating period may be omitted, which is
/// convenient for goals submitted as text.
pub fn term(src: &str) -> Result<Term, ReadError> {
    let mut reader = Reader::new(src);
    let term = match reader.next_term()? {
        Some(term) => term,
        None => return Err(reader.error("expected a term")),
    };

    match reader.next_term()? {
        None => Ok(term),
        Some(_) => Err(reader.error("expected a single term")),
    }
}

/// Read every clause in `src`, in order.
pub fn terms(src: &str) -> Result<Vec<Term>, ReadError> {
    let mut reader = Reader::new(src);
    let mut all = Vec::new();
    while let Some(term) = reader.next_term()? {
        all.push(term);
    }
    Ok(all)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Atom(String),
    Var(String),
    Int(i64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Bar,
    End,
    Eof,
}

const SYMBOL_CHARS: &str = "+-*/\\^<>=~:.?@#&$";

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ReadError {
        ReadError::new(message, self.line, self.column)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ReadError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('%') => {
                    while let Some(c) = self.advance() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') => {
                    // only a comment if followed by '*'
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some(&(_, '*')) => {
                            self.advance();
                            self.advance();
                            let mut star = false;
                            loop {
                                match self.advance() {
                                    Some('/') if star => break,
                                    Some(c) => star = c == '*',
                                    None => return Err(self.error("unterminated block comment")),
                                }
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ReadError> {
        self.skip_whitespace_and_comments()?;

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            '(' => {
                self.advance();
                Ok(Token::LParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RParen)
            }
            '[' => {
                self.advance();
                Ok(Token::LBracket)
            }
            ']' => {
                self.advance();
                Ok(Token::RBracket)
            }
            ',' => {
                self.advance();
                Ok(Token::Comma)
            }
            '|' => {
                self.advance();
                Ok(Token::Bar)
            }
            '!' => {
                self.advance();
                Ok(Token::Atom("!".to_string()))
            }
            ';' => {
                self.advance();
                Ok(Token::Atom(";".to_string()))
            }
            '\'' => self.quoted_atom(),
            c if c.is_ascii_digit() => self.integer(false),
            c if c.is_ascii_lowercase() => Ok(Token::Atom(self.ident())),
            c if c.is_ascii_uppercase() || c == '_' => Ok(Token::Var(self.ident())),
            c if SYMBOL_CHARS.contains(c) => self.symbolic(),
            c => Err(self.error(format!("unexpected character `{}`", c))),
        }
    }

    fn ident(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    fn integer(&mut self, negative: bool) -> Result<Token, ReadError> {
        let mut digits = String::new();
        if negative {
            digits.push('-');
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }

        digits
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|_| self.error(format!("integer `{}` out of range", digits)))
    }

    fn quoted_atom(&mut self) -> Result<Token, ReadError> {
        self.advance(); // opening quote
        let mut name = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated quoted atom")),
                Some('\'') => {
                    // doubled quote is an escaped quote
                    if self.peek() == Some('\'') {
                        self.advance();
                        name.push('\'');
                    } else {
                        return Ok(Token::Atom(name));
                    }
                }
                Some('\\') => match self.advance() {
                    Some('n') => name.push('\n'),
                    Some('t') => name.push('\t'),
                    Some(c) => name.push(c),
                    None => return Err(self.error("unterminated quoted atom")),
                },
                Some(c) => name.push(c),
            }
        }
    }

    fn symbolic(&mut self) -> Result<Token, ReadError> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if SYMBOL_CHARS.contains(c) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // a solo period closes the clause unless it's glued to more input,
        // as in the `'.'(H, T)` functor form
        if name == "." {
            match self.peek() {
                None => return Ok(Token::End),
                Some(c) if c.is_whitespace() || c == '%' => return Ok(Token::End),
                _ => {}
            }
        }

        // `-123` is a negative literal, not the atom `-`
        if name == "-" {
            if let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    return self.integer(true);
                }
            }
        }

        Ok(Token::Atom(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Assoc {
    Xfx,
    Xfy,
}

/// The infix operators the engine dispatches on, with their standard
/// priorities.
fn infix(name: &str) -> Option<(u32, Assoc)> {
    match name {
        ":-" => Some((1200, Assoc::Xfx)),
        ";" => Some((1100, Assoc::Xfy)),
        "->" => Some((1050, Assoc::Xfy)),
        "=" => Some((700, Assoc::Xfx)),
        _ => None,
    }
}

/// A streaming term reader over a source text.
pub struct Reader<'a> {
    lexer: Lexer<'a>,
    current: Token,
    lex_err: Option<ReadError>,
    scope: HashMap<String, Var>,
}

impl<'a> Reader<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut lexer = Lexer::new(src);
        let (current, lex_err) = match lexer.next_token() {
            Ok(token) => (token, None),
            Err(err) => (Token::Eof, Some(err)),
        };

        Self {
            lexer,
            current,
            lex_err,
            scope: HashMap::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ReadError {
        self.lexer.error(message)
    }

    fn advance(&mut self) -> Result<Token, ReadError> {
        if let Some(err) = self.lex_err.take() {
            return Err(err);
        }
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ReadError> {
        if &self.current == token {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {:?}", what, self.current)))
        }
    }

    /// Read the next clause, or `None` at end of input. Variable scope
    /// resets between clauses.
    pub fn next_term(&mut self) -> Result<Option<Term>, ReadError> {
        if let Some(err) = self.lex_err.clone() {
            return Err(err);
        }
        if self.current == Token::Eof {
            return Ok(None);
        }

        self.scope.clear();
        let term = self.term_prec(1200)?;
        match self.current {
            Token::End => {
                self.advance()?;
            }
            Token::Eof => {}
            _ => {
                return Err(self.error(format!(
                    "expected end of clause, found {:?}",
                    self.current
                )))
            }
        }

        Ok(Some(term))
    }

    fn term_prec(&mut self, max_prec: u32) -> Result<Term, ReadError> {
        let mut lhs = self.primary(max_prec)?;
        let mut lhs_prec = 0;

        loop {
            let (name, prec, assoc) = match &self.current {
                Token::Comma if max_prec >= 1000 => (Atom::COMMA, 1000, Assoc::Xfy),
                Token::Atom(name) => match infix(name) {
                    Some((prec, assoc)) if prec <= max_prec => {
                        (Atom::new(name), prec, assoc)
                    }
                    _ => break,
                },
                _ => break,
            };

            if lhs_prec >= prec {
                break;
            }

            self.advance()?;
            let rhs = match assoc {
                Assoc::Xfy => self.term_prec(prec)?,
                Assoc::Xfx => self.term_prec(prec - 1)?,
            };
            lhs = Term::app(name, vec![lhs, rhs]);
            lhs_prec = prec;
        }

        Ok(lhs)
    }

    fn primary(&mut self, max_prec: u32) -> Result<Term, ReadError> {
        match self.advance()? {
            Token::Int(n) => Ok(Term::Int(n)),

            Token::Var(name) => Ok(Term::Var(self.variable(&name))),

            Token::Atom(name) => {
                // `:- goal` and `?- goal` directive prefixes
                if (name == ":-" || name == "?-") && max_prec >= 1200 && self.starts_term() {
                    let arg = self.term_prec(1199)?;
                    return Ok(Term::app(Atom::new(&name), vec![arg]));
                }

                if self.current == Token::LParen {
                    self.advance()?;
                    let args = self.arguments()?;
                    self.expect(&Token::RParen, "`)`")?;
                    Ok(Term::app(Atom::new(&name), args))
                } else {
                    Ok(Term::atom(&*name))
                }
            }

            Token::LParen => {
                let term = self.term_prec(1200)?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(term)
            }

            Token::LBracket => self.list(),

            token => Err(self.error(format!("expected a term, found {:?}", token))),
        }
    }

    fn starts_term(&self) -> bool {
        match self.current {
            Token::Int(_)
            | Token::Var(_)
            | Token::Atom(_)
            | Token::LParen
            | Token::LBracket => true,
            _ => false,
        }
    }

    fn arguments(&mut self) -> Result<Vec<Term>, ReadError> {
        let mut args = vec![self.term_prec(999)?];
        while self.current == Token::Comma {
            self.advance()?;
            args.push(self.term_prec(999)?);
        }
        Ok(args)
    }

    fn list(&mut self) -> Result<Term, ReadError> {
        if self.current == Token::RBracket {
            self.advance()?;
            return Ok(Term::Atom(Atom::NIL));
        }

        let mut elems = vec![self.term_prec(999)?];
        while self.current == Token::Comma {
            self.advance()?;
            elems.push(self.term_prec(999)?);
        }

        let tail = if self.current == Token::Bar {
            self.advance()?;
            self.term_prec(999)?
        } else {
            Term::Atom(Atom::NIL)
        };

        self.expect(&Token::RBracket, "`]`")?;
        Ok(Term::partial_list(elems, tail))
    }

    fn variable(&mut self, name: &str) -> Var {
        if name == "_" {
            return Var::anonymous();
        }

        match self.scope.get(name) {
            Some(var) => *var,
            None => {
                let var = Var::fresh(name);
                self.scope.insert(name.to_string(), var);
                var
            }
        }
    }
}
