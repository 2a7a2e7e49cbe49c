//! Tokenizer for tether script.
//!
//! Newlines are significant statement separators except inside brackets, where
//! they are dropped. `#` starts a comment; a comment starting with `##` is kept as a
//! [`TokenKind::Doc`] token so the parser can attach it to a following `fn`.

use crate::exception::{CodeLoc, Exception, RunResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Doc(String),
    Let,
    Fn,
    If,
    Then,
    Else,
    True,
    False,
    Nil,
    SelfKw,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    ColonColon,
    Semicolon,
    Newline,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    AndAnd,
    OrOr,
    Bang,
    Eof,
}

impl TokenKind {
    /// Spelling used in "unexpected token" diagnostics.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Str(text) => format!("{text:?}"),
            Self::Ident(name) => name.clone(),
            Self::Doc(_) => "doc comment".to_owned(),
            Self::Newline => "end of line".to_owned(),
            Self::Eof => "end of input".to_owned(),
            other => punct_spelling(other).to_owned(),
        }
    }
}

fn punct_spelling(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Let => "let",
        TokenKind::Fn => "fn",
        TokenKind::If => "if",
        TokenKind::Then => "then",
        TokenKind::Else => "else",
        TokenKind::True => "true",
        TokenKind::False => "false",
        TokenKind::Nil => "nil",
        TokenKind::SelfKw => "self",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::Comma => ",",
        TokenKind::Dot => ".",
        TokenKind::Colon => ":",
        TokenKind::ColonColon => "::",
        TokenKind::Semicolon => ";",
        TokenKind::Assign => "=",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::EqEq => "==",
        TokenKind::NotEq => "!=",
        TokenKind::Lt => "<",
        TokenKind::LtE => "<=",
        TokenKind::Gt => ">",
        TokenKind::GtE => ">=",
        TokenKind::AndAnd => "&&",
        TokenKind::OrOr => "||",
        TokenKind::Bang => "!",
        _ => "?",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Absolute line number.
    pub line: u32,
    /// Byte span in the source.
    pub start: usize,
    pub end: usize,
}

/// Tokenizes `source`, numbering lines from `origin.line`.
pub(crate) fn tokenize(source: &str, origin: &CodeLoc) -> RunResult<Vec<Token>> {
    let mut lexer = Lexer::new(source, origin);
    lexer.scan()?;
    let end = source.len();
    lexer.tokens.push(Token {
        kind: TokenKind::Eof,
        line: lexer.line,
        start: end,
        end,
    });
    Ok(lexer.tokens)
}

/// True when `source` cannot be complete yet: an open bracket, an open string,
/// or a trailing `\` continuation.
pub fn needs_more_input(source: &str) -> bool {
    if source.trim_end_matches([' ', '\t', '\r', '\n']).ends_with('\\') {
        return true;
    }
    let origin = CodeLoc::default();
    let mut lexer = Lexer::new(source, &origin);
    match lexer.scan() {
        Ok(()) => lexer.depth > 0,
        Err(exc) => exc.message().ends_with(UNTERMINATED_STRING),
    }
}

const UNTERMINATED_STRING: &str = "unterminated string literal";

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    file: &'a str,
    /// Bracket nesting; newlines are insignificant while positive.
    depth: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, origin: &'a CodeLoc) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: origin.line,
            file: &origin.file,
            depth: 0,
            tokens: Vec::new(),
        }
    }

    fn scan(&mut self) -> RunResult<()> {
        while let Some(byte) = self.peek() {
            let start = self.pos;
            match byte {
                b'\n' => {
                    self.pos += 1;
                    if self.depth == 0 {
                        self.push(TokenKind::Newline, start);
                    }
                    self.line += 1;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\\' if self.bytes.get(self.pos + 1) == Some(&b'\n') => {
                    // explicit line continuation
                    self.pos += 2;
                    self.line += 1;
                }
                b'#' => self.comment(),
                b'"' | b'\'' => self.string(byte)?,
                b'0'..=b'9' => self.number()?,
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.word(),
                _ => self.punct(byte)?,
            }
        }
        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            line: self.line,
            start,
            end: self.pos,
        });
    }

    fn error(&self, message: impl std::fmt::Display) -> Exception {
        Exception::syntax_error(&CodeLoc::new(self.file, self.line), message)
    }

    fn comment(&mut self) {
        let start = self.pos;
        let rest = &self.source[start..];
        let len = rest.find('\n').unwrap_or(rest.len());
        let text = &rest[..len];
        self.pos += len;
        if let Some(doc) = text.strip_prefix("##") {
            let doc = doc.strip_prefix(' ').unwrap_or(doc);
            self.push(TokenKind::Doc(doc.trim_end().to_owned()), start);
        }
    }

    fn string(&mut self, quote: u8) -> RunResult<()> {
        let start = self.pos;
        let start_line = self.line;
        self.pos += 1;
        let mut text = String::new();
        loop {
            let Some(ch) = self.source[self.pos..].chars().next() else {
                return Err(Exception::syntax_error(
                    &CodeLoc::new(self.file, start_line),
                    UNTERMINATED_STRING,
                ));
            };
            self.pos += ch.len_utf8();
            match ch {
                '\n' => {
                    self.line += 1;
                    text.push('\n');
                }
                '\\' => {
                    let Some(escaped) = self.source[self.pos..].chars().next() else {
                        continue;
                    };
                    self.pos += escaped.len_utf8();
                    if quote == b'\'' {
                        // single quotes only unescape the quote and the backslash
                        if escaped != '\'' && escaped != '\\' {
                            text.push('\\');
                        }
                        text.push(escaped);
                        continue;
                    }
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        '0' => text.push('\0'),
                        'e' => text.push('\u{1b}'),
                        other => text.push(other),
                    }
                }
                c if c as u32 == u32::from(quote) => break,
                other => text.push(other),
            }
        }
        self.push(TokenKind::Str(text), start);
        Ok(())
    }

    fn number(&mut self) -> RunResult<()> {
        let start = self.pos;
        let mut is_float = false;
        self.digits();
        // `1.abs` is a method call, `1.5` is a float
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            self.digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if self.peek_at(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                self.digits();
            }
        }
        let literal: String = self.source[start..self.pos].chars().filter(|c| *c != '_').collect();
        let kind = if is_float {
            TokenKind::Float(
                literal
                    .parse()
                    .map_err(|_| self.error(format!("invalid float literal `{literal}`")))?,
            )
        } else {
            TokenKind::Int(
                literal
                    .parse()
                    .map_err(|_| self.error(format!("integer literal `{literal}` is too large")))?,
            )
        };
        self.push(kind, start);
        Ok(())
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_digit() || b == b'_') {
            self.pos += 1;
        }
    }

    fn word(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        // predicate names like `nil?` and `empty?`
        if self.peek() == Some(b'?') && self.peek_at(1) != Some(b'=') {
            self.pos += 1;
        }
        let kind = match &self.source[start..self.pos] {
            "let" => TokenKind::Let,
            "fn" => TokenKind::Fn,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "nil" => TokenKind::Nil,
            "self" => TokenKind::SelfKw,
            word => TokenKind::Ident(word.to_owned()),
        };
        self.push(kind, start);
    }

    fn punct(&mut self, byte: u8) -> RunResult<()> {
        let start = self.pos;
        let next = self.peek_at(1);
        let (kind, len) = match (byte, next) {
            (b'=', Some(b'=')) => (TokenKind::EqEq, 2),
            (b'!', Some(b'=')) => (TokenKind::NotEq, 2),
            (b'<', Some(b'=')) => (TokenKind::LtE, 2),
            (b'>', Some(b'=')) => (TokenKind::GtE, 2),
            (b'&', Some(b'&')) => (TokenKind::AndAnd, 2),
            (b'|', Some(b'|')) => (TokenKind::OrOr, 2),
            (b':', Some(b':')) => (TokenKind::ColonColon, 2),
            (b'=', _) => (TokenKind::Assign, 1),
            (b'!', _) => (TokenKind::Bang, 1),
            (b'<', _) => (TokenKind::Lt, 1),
            (b'>', _) => (TokenKind::Gt, 1),
            (b':', _) => (TokenKind::Colon, 1),
            (b'+', _) => (TokenKind::Plus, 1),
            (b'-', _) => (TokenKind::Minus, 1),
            (b'*', _) => (TokenKind::Star, 1),
            (b'/', _) => (TokenKind::Slash, 1),
            (b'%', _) => (TokenKind::Percent, 1),
            (b',', _) => (TokenKind::Comma, 1),
            (b'.', _) => (TokenKind::Dot, 1),
            (b';', _) => (TokenKind::Semicolon, 1),
            (b'(', _) => (TokenKind::LParen, 1),
            (b')', _) => (TokenKind::RParen, 1),
            (b'[', _) => (TokenKind::LBracket, 1),
            (b']', _) => (TokenKind::RBracket, 1),
            (b'{', _) => (TokenKind::LBrace, 1),
            (b'}', _) => (TokenKind::RBrace, 1),
            _ => {
                let ch = self.source[self.pos..].chars().next().unwrap_or('?');
                return Err(self.error(format!("unexpected character `{ch}`")));
            }
        };
        match kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => self.depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                self.depth = self.depth.saturating_sub(1);
            }
            _ => {}
        }
        self.pos += len;
        self.push(kind, start);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, &CodeLoc::default())
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn newlines_inside_brackets_are_dropped() {
        assert_eq!(
            kinds("[1,\n2]\nx"),
            vec![
                TokenKind::LBracket,
                TokenKind::Int(1),
                TokenKind::Comma,
                TokenKind::Int(2),
                TokenKind::RBracket,
                TokenKind::Newline,
                TokenKind::Ident("x".to_owned()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn integer_followed_by_method_is_not_a_float() {
        assert_eq!(
            kinds("1.abs"),
            vec![
                TokenKind::Int(1),
                TokenKind::Dot,
                TokenKind::Ident("abs".to_owned()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn doc_comments_survive_and_plain_comments_do_not() {
        assert_eq!(
            kinds("## Adds.\n# internal\nfn"),
            vec![
                TokenKind::Doc("Adds.".to_owned()),
                TokenKind::Newline,
                TokenKind::Newline,
                TokenKind::Fn,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_reports_its_starting_line() {
        let err = tokenize("1\n\"abc", &CodeLoc::new("t", 10)).unwrap_err();
        assert_eq!(err.message(), "t:11: unterminated string literal");
    }

    #[test]
    fn open_brackets_and_strings_need_more_input() {
        assert!(needs_more_input("[1,"));
        assert!(needs_more_input("fn f(a) = \\"));
        assert!(needs_more_input("\"abc"));
        assert!(!needs_more_input("[1, 2]"));
        assert!(!needs_more_input("1 +* 2"));
    }
}
