//! Scanner and parser for tinylisp source text.
//!
//! Scanning and parsing are both lazy: [`parse`] returns an iterator that
//! yields one tree per top-level expression and only scans as far as it needs
//! to. Malformed input never fails. Unterminated strings and lists are closed
//! at the end of the line or input, and stray closing parentheses are skipped
//! with a warning, so the caller always gets a (possibly partial) program.
//! An expression nested deeper than [`MAX_NESTING_DEPTH`] is dropped whole
//! with an error diagnostic.

use nom::{
    IResult, Parser as _,
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{char, digit1},
    combinator::{all_consuming, opt, recognize, value},
    error::Error as NomError,
    multi::many0_count,
    sequence::pair,
};

use crate::ast::{IntegerType, List, Value};
use crate::diagnostics::Diagnostic;
use crate::stack::ensure_sufficient_stack;
use crate::{Error, MAX_NESTING_DEPTH};

const LINE_COMMENT: char = ';';
const STRING_DELIMITER: char = '"';
const STRING_ESCAPE: char = '\\';

/// Lexical tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open,
    Close,
    /// A string literal with escapes already decoded
    String(String),
    /// An integer literal or a symbol name
    Atom(String),
}

/// A source of tokens for the [`Parser`].
///
/// Streams may produce warnings about the text they scanned; the parser
/// collects them through [`TokenStream::drain_warnings`].
pub trait TokenStream: Iterator<Item = Token> {
    fn drain_warnings(&mut self) -> Vec<String> {
        Vec::new()
    }
}

fn is_special(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | LINE_COMMENT | STRING_DELIMITER)
}

/// Skip whitespace and line comments
fn skip_trivia(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0_count(alt((
            take_while1(|c: char| c.is_whitespace()),
            recognize(pair(char(LINE_COMMENT), take_till(|c: char| c == '\n'))),
        ))),
    )
    .parse(input)
}

fn scan_paren(input: &str) -> IResult<&str, Token> {
    alt((value(Token::Open, char('(')), value(Token::Close, char(')')))).parse(input)
}

fn scan_atom(input: &str) -> IResult<&str, Token> {
    take_while1(|c: char| !is_special(c))
        .map(|text: &str| Token::Atom(text.to_owned()))
        .parse(input)
}

/// A scanned string literal, and whether it ended in a dangling backslash
struct ScannedString {
    text: String,
    dangling_escape: bool,
}

/// Scan a string literal starting at its opening quote.
///
/// The literal ends at the closing quote, or is closed implicitly before an
/// unescaped newline or at the end of input. A newline closing the literal is
/// left in the input.
fn scan_string(input: &str) -> IResult<&str, ScannedString> {
    let (mut remaining, _) = char::<_, NomError<&str>>(STRING_DELIMITER).parse(input)?;
    let mut text = String::new();

    loop {
        let mut chars = remaining.chars();
        match chars.next() {
            None => {
                return Ok((remaining, ScannedString { text, dangling_escape: false }));
            }
            Some(STRING_DELIMITER) => {
                return Ok((chars.as_str(), ScannedString { text, dangling_escape: false }));
            }
            Some('\n') => {
                return Ok((remaining, ScannedString { text, dangling_escape: false }));
            }
            Some(STRING_ESCAPE) => {
                let after_backslash = chars.as_str();
                if after_backslash.is_empty() {
                    return Ok((after_backslash, ScannedString { text, dangling_escape: true }));
                }
                remaining = decode_escape(after_backslash, &mut text);
            }
            Some(c) => {
                text.push(c);
                remaining = chars.as_str();
            }
        }
    }
}

/// Decode one escape sequence (the text following a backslash), appending
/// the result to `out`. Returns the input after the sequence.
fn decode_escape<'a>(input: &'a str, out: &mut String) -> &'a str {
    let mut chars = input.chars();
    let Some(c) = chars.next() else {
        return input;
    };
    let rest = chars.as_str();
    let simple = match c {
        '\\' => Some('\\'),
        '"' => Some('"'),
        '\'' => Some('\''),
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'a' => Some('\u{7}'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'v' => Some('\u{b}'),
        _ => None,
    };
    if let Some(decoded) = simple {
        out.push(decoded);
        return rest;
    }

    match c {
        // Line continuation
        '\n' => rest,
        '0'..='7' => {
            let digits: String = input.chars().take(3).take_while(|d| ('0'..='7').contains(d)).collect();
            match u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32) {
                Some(decoded) => {
                    out.push(decoded);
                    &input[digits.len()..]
                }
                None => keep_backslash(c, rest, out),
            }
        }
        'x' => decode_hex_escape(rest, 2, c, out),
        'u' => decode_hex_escape(rest, 4, c, out),
        'U' => decode_hex_escape(rest, 8, c, out),
        _ => keep_backslash(c, rest, out),
    }
}

fn decode_hex_escape<'a>(input: &'a str, width: usize, marker: char, out: &mut String) -> &'a str {
    let digits = input.get(..width).filter(|d| d.chars().all(|h| h.is_ascii_hexdigit()));
    match digits
        .and_then(|d| u32::from_str_radix(d, 16).ok())
        .and_then(char::from_u32)
    {
        Some(decoded) => {
            out.push(decoded);
            &input[width..]
        }
        None => keep_backslash(marker, input, out),
    }
}

/// Unknown escapes are taken literally, backslash included
fn keep_backslash<'a>(c: char, rest: &'a str, out: &mut String) -> &'a str {
    out.push(STRING_ESCAPE);
    out.push(c);
    rest
}

/// Lazy tokenizer over source text
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    input: &'a str,
    warnings: Vec<String>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Scanner {
            input,
            warnings: Vec::new(),
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Ok((rest, ())) = skip_trivia(self.input) {
            self.input = rest;
        }
        if self.input.is_empty() {
            return None;
        }

        if self.input.starts_with(STRING_DELIMITER) {
            let (rest, scanned) = scan_string(self.input).ok()?;
            self.input = rest;
            if scanned.dangling_escape {
                self.warnings
                    .push("unterminated escape sequence in string".to_owned());
            }
            return Some(Token::String(scanned.text));
        }

        let (rest, token) = alt((scan_paren, scan_atom)).parse(self.input).ok()?;
        self.input = rest;
        Some(token)
    }
}

impl TokenStream for Scanner<'_> {
    fn drain_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

/// Adapter for token sequences produced elsewhere
#[derive(Debug, Clone)]
pub struct Tokens<I>(I);

impl<I: Iterator<Item = Token>> Iterator for Tokens<I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.0.next()
    }
}

impl<I: Iterator<Item = Token>> TokenStream for Tokens<I> {}

/// Parse an atom: an integer literal (`-`? digits) or a symbol
pub fn parse_atom(text: &str) -> Value {
    let integer: IResult<&str, &str> =
        all_consuming(recognize(pair(opt(char('-')), digit1))).parse(text);
    match integer {
        Ok((_, digits)) => match digits.parse::<IntegerType>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Symbol(text.to_owned()),
        },
        Err(_) => Value::Symbol(text.to_owned()),
    }
}

/// Lazy parser yielding one tree per top-level expression.
///
/// Cloning a parser yields an independent parser at the same position.
#[derive(Debug, Clone)]
pub struct Parser<T> {
    tokens: T,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<Scanner<'a>> {
    pub fn new(source: &'a str) -> Self {
        Parser {
            tokens: Scanner::new(source),
            diagnostics: Vec::new(),
        }
    }
}

impl<I: Iterator<Item = Token>> Parser<Tokens<I>> {
    /// Parse an already-tokenized stream
    pub fn from_tokens<T: IntoIterator<IntoIter = I>>(tokens: T) -> Self {
        Parser {
            tokens: Tokens(tokens.into_iter()),
            diagnostics: Vec::new(),
        }
    }
}

impl<T: TokenStream> Parser<T> {
    /// Take the diagnostics produced so far
    pub fn drain_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.collect_token_warnings();
        std::mem::take(&mut self.diagnostics)
    }

    fn collect_token_warnings(&mut self) {
        self.diagnostics
            .extend(self.tokens.drain_warnings().into_iter().map(Diagnostic::warning));
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.next();
        self.collect_token_warnings();
        token
    }

    /// Parse list items after an opening parenthesis, through the matching
    /// closing one (supplied if the input runs out). `None` if the list nests
    /// deeper than the limit; its remaining tokens are consumed.
    fn parse_list(&mut self, depth: usize) -> Option<Value> {
        if depth > MAX_NESTING_DEPTH {
            self.skip_list();
            return None;
        }
        let mut items = Vec::new();
        loop {
            let item = match self.next_token() {
                None | Some(Token::Close) => break,
                Some(Token::Open) => ensure_sufficient_stack(|| self.parse_list(depth + 1)),
                Some(Token::String(text)) => Some(Value::String(text)),
                Some(Token::Atom(text)) => Some(parse_atom(&text)),
            };
            let Some(item) = item else {
                self.skip_list();
                return None;
            };
            items.push(item);
        }
        Some(Value::List(List::new(items)))
    }

    /// Consume tokens through the closing parenthesis of the current list
    fn skip_list(&mut self) {
        let mut open = 1_usize;
        while open > 0 {
            match self.next_token() {
                None => return,
                Some(Token::Open) => open += 1,
                Some(Token::Close) => open -= 1,
                Some(_) => {}
            }
        }
    }
}

impl<T: TokenStream> Iterator for Parser<T> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            match self.next_token()? {
                Token::Open => match self.parse_list(1) {
                    Some(list) => return Some(list),
                    None => self
                        .diagnostics
                        .push(Diagnostic::error(Error::NestingLimitExceeded.to_string())),
                },
                Token::Close => {
                    self.diagnostics
                        .push(Diagnostic::warning("unmatched closing parenthesis"));
                }
                Token::String(text) => return Some(Value::String(text)),
                Token::Atom(text) => return Some(parse_atom(&text)),
            }
        }
    }
}

/// Parse source text into a lazy sequence of expressions
pub fn parse(source: &str) -> Parser<Scanner<'_>> {
    Parser::new(source)
}
