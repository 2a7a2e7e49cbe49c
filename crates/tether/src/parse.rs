//! Recursive-descent parser from tokens to [`Program`].

use crate::{
    exception::{CodeLoc, Exception, RunResult},
    expressions::{BinOp, Expr, ExprKind, FnDef, Program, Stmt, UnaryOp},
    lexer::{Token, TokenKind, tokenize},
    value::Value,
};

/// Maximum syntactic nesting before parsing is refused.
///
/// Keeps the recursive descent (and later evaluation) well inside the worker
/// thread stack for inputs like `((((...))))`.
pub const MAX_NESTING_DEPTH: usize = 200;

/// Parses a snippet whose first line is `origin.line` of `origin.file`.
pub fn parse(source: &str, origin: &CodeLoc) -> RunResult<Program> {
    let tokens = tokenize(source, origin)?;
    Parser {
        tokens,
        pos: 0,
        source,
        file: &origin.file,
        depth: 0,
    }
    .program()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
    file: &'a str,
    depth: usize,
}

impl Parser<'_> {
    fn program(mut self) -> RunResult<Program> {
        let mut stmts = Vec::new();
        let mut docs: Vec<String> = Vec::new();
        let mut newline_run = 0;
        loop {
            match &self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Doc(text) => {
                    docs.push(text.clone());
                    newline_run = 0;
                    self.advance();
                }
                TokenKind::Newline | TokenKind::Semicolon => {
                    newline_run += 1;
                    // a blank line separates a doc comment from what follows
                    if newline_run >= 2 {
                        docs.clear();
                    }
                    self.advance();
                }
                _ => {
                    let doc = (!docs.is_empty()).then(|| docs.join("\n"));
                    docs.clear();
                    newline_run = 0;
                    stmts.push(self.statement(doc)?);
                    self.end_of_statement()?;
                }
            }
        }
        Ok(Program { stmts })
    }

    fn statement(&mut self, doc: Option<String>) -> RunResult<Stmt> {
        match self.peek().kind.clone() {
            TokenKind::Let => {
                self.advance();
                let name = self.ident("variable name after `let`")?;
                self.expect(&TokenKind::Assign, "`=`")?;
                self.skip_newlines();
                let value = self.expr()?;
                Ok(Stmt::Let { name, value })
            }
            TokenKind::Fn => self.function(doc).map(Stmt::Fn),
            TokenKind::Ident(name) if self.peek_at(1).kind == TokenKind::Assign => {
                self.advance();
                self.advance();
                self.skip_newlines();
                let value = self.expr()?;
                Ok(Stmt::Assign { name, value })
            }
            _ => self.expr().map(Stmt::Expr),
        }
    }

    fn function(&mut self, doc: Option<String>) -> RunResult<FnDef> {
        let first = self.advance();
        let (start, line) = (first.start, first.line);
        let name = self.ident("function name after `fn`")?;
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut params = Vec::new();
        while self.peek().kind != TokenKind::RParen {
            let param = self.ident("parameter name")?;
            if params.contains(&param) {
                return Err(self.error(format!("duplicate parameter `{param}`")));
            }
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "`)`")?;
        self.expect(&TokenKind::Assign, "`=` before the function body")?;
        self.skip_newlines();
        let body = self.expr()?;
        let end = self.tokens[self.pos.saturating_sub(1)].end;
        Ok(FnDef {
            name,
            params,
            body,
            source: self.source[start..end].to_owned(),
            doc,
            line,
        })
    }

    fn end_of_statement(&mut self) -> RunResult<()> {
        match self.peek().kind {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof | TokenKind::Doc(_) => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    fn expr(&mut self) -> RunResult<Expr> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        let result = self.or();
        self.depth -= 1;
        result
    }

    fn or(&mut self) -> RunResult<Expr> {
        let mut left = self.and()?;
        while self.peek().kind == TokenKind::OrOr {
            let line = self.advance().line;
            self.skip_newlines();
            let right = self.and()?;
            left = Expr::new(ExprKind::Or(Box::new(left), Box::new(right)), line);
        }
        Ok(left)
    }

    fn and(&mut self) -> RunResult<Expr> {
        let mut left = self.comparison()?;
        while self.peek().kind == TokenKind::AndAnd {
            let line = self.advance().line;
            self.skip_newlines();
            let right = self.comparison()?;
            left = Expr::new(ExprKind::And(Box::new(left), Box::new(right)), line);
        }
        Ok(left)
    }

    fn comparison(&mut self) -> RunResult<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtE => BinOp::LtE,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtE => BinOp::GtE,
                _ => return Ok(left),
            };
            left = self.binary_rhs(left, op, Self::additive)?;
        }
    }

    fn additive(&mut self) -> RunResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(left),
            };
            left = self.binary_rhs(left, op, Self::multiplicative)?;
        }
    }

    fn multiplicative(&mut self) -> RunResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => return Ok(left),
            };
            left = self.binary_rhs(left, op, Self::unary)?;
        }
    }

    fn binary_rhs(
        &mut self,
        left: Expr,
        op: BinOp,
        operand: fn(&mut Self) -> RunResult<Expr>,
    ) -> RunResult<Expr> {
        let line = self.advance().line;
        self.skip_newlines();
        let right = operand(self)?;
        Ok(Expr::new(ExprKind::Binary(op, Box::new(left), Box::new(right)), line))
    }

    fn unary(&mut self) -> RunResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.postfix(),
        };
        let line = self.advance().line;
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        let operand = self.unary();
        self.depth -= 1;
        let operand = operand?;
        if op == UnaryOp::Neg {
            match operand.kind {
                ExprKind::Literal(Value::Float(value)) => {
                    return Ok(Expr::new(ExprKind::Literal(Value::Float(-value)), line));
                }
                ExprKind::Literal(Value::Int(value)) if value != i64::MIN => {
                    return Ok(Expr::new(ExprKind::Literal(Value::Int(-value)), line));
                }
                _ => {}
            }
        }
        Ok(Expr::new(ExprKind::Unary(op, Box::new(operand)), line))
    }

    fn postfix(&mut self) -> RunResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    let line = self.advance().line;
                    let name = self.ident("method name after `.`")?;
                    let args = if self.peek().kind == TokenKind::LParen {
                        self.advance();
                        self.arguments(&TokenKind::RParen)?
                    } else {
                        Vec::new()
                    };
                    expr = Expr::new(
                        ExprKind::Method {
                            receiver: Box::new(expr),
                            name,
                            args,
                        },
                        line,
                    );
                }
                TokenKind::LParen => {
                    let line = self.advance().line;
                    let args = self.arguments(&TokenKind::RParen)?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        line,
                    );
                }
                TokenKind::LBracket => {
                    let line = self.advance().line;
                    let index = self.expr()?;
                    self.expect(&TokenKind::RBracket, "`]`")?;
                    expr = Expr::new(
                        ExprKind::Index {
                            target: Box::new(expr),
                            index: Box::new(index),
                        },
                        line,
                    );
                }
                TokenKind::ColonColon => {
                    let line = self.advance().line;
                    let name = self.ident("constant name after `::`")?;
                    expr = Expr::new(
                        ExprKind::Const {
                            scope: Box::new(expr),
                            name,
                        },
                        line,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parses comma-separated expressions up to `close`; the opener is already consumed.
    fn arguments(&mut self, close: &TokenKind) -> RunResult<Vec<Expr>> {
        let mut args = Vec::new();
        while &self.peek().kind != close {
            args.push(self.expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close, &format!("`{}`", close.describe()))?;
        Ok(args)
    }

    fn primary(&mut self) -> RunResult<Expr> {
        let before = self.pos;
        let token = self.advance();
        let line = token.line;
        let kind = match token.kind {
            TokenKind::Int(value) => ExprKind::Literal(Value::Int(value)),
            TokenKind::Float(value) => ExprKind::Literal(Value::Float(value)),
            TokenKind::Str(text) => ExprKind::Literal(Value::Str(text)),
            TokenKind::True => ExprKind::Literal(Value::Bool(true)),
            TokenKind::False => ExprKind::Literal(Value::Bool(false)),
            TokenKind::Nil => ExprKind::Literal(Value::Nil),
            TokenKind::SelfKw => ExprKind::SelfRef,
            TokenKind::Ident(name) => ExprKind::Name(name),
            TokenKind::LParen => {
                let inner = self.expr()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                return Ok(inner);
            }
            TokenKind::LBracket => ExprKind::List(self.arguments(&TokenKind::RBracket)?),
            TokenKind::LBrace => ExprKind::Map(self.map_entries()?),
            TokenKind::If => return self.conditional(line),
            _ => {
                self.pos = before;
                return Err(self.unexpected());
            }
        };
        Ok(Expr::new(kind, line))
    }

    fn map_entries(&mut self) -> RunResult<Vec<(Expr, Expr)>> {
        let mut entries = Vec::new();
        while self.peek().kind != TokenKind::RBrace {
            let key = match (&self.peek().kind, &self.peek_at(1).kind) {
                (TokenKind::Ident(name), TokenKind::Colon) => {
                    let key = Expr::new(ExprKind::Literal(Value::Str(name.clone())), self.peek().line);
                    self.advance();
                    key
                }
                _ => self.expr()?,
            };
            self.expect(&TokenKind::Colon, "`:` after map key")?;
            let value = self.expr()?;
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "`}`")?;
        Ok(entries)
    }

    fn conditional(&mut self, line: u32) -> RunResult<Expr> {
        let cond = self.expr()?;
        self.skip_newlines();
        self.expect(&TokenKind::Then, "`then`")?;
        self.skip_newlines();
        let then = self.expr()?;
        let otherwise = if self.next_significant_is(&TokenKind::Else) {
            self.skip_newlines();
            self.advance();
            self.skip_newlines();
            self.expr()?
        } else {
            Expr::new(ExprKind::Literal(Value::Nil), line)
        };
        Ok(Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            line,
        ))
    }

    fn peek(&self) -> &Token {
        // the token stream always ends with Eof, and `advance` never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> RunResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {what}, found {}",
                self.peek().kind.describe()
            )))
        }
    }

    fn ident(&mut self, what: &str) -> RunResult<String> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(format!(
                "expected {what}, found {}",
                self.peek().kind.describe()
            )))
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn next_significant_is(&self, kind: &TokenKind) -> bool {
        self.tokens[self.pos..]
            .iter()
            .find(|token| token.kind != TokenKind::Newline)
            .is_some_and(|token| &token.kind == kind)
    }

    fn unexpected(&self) -> Exception {
        self.error(format!("unexpected {}", self.peek().kind.describe()))
    }

    fn error(&self, message: impl std::fmt::Display) -> Exception {
        Exception::syntax_error(&CodeLoc::new(self.file, self.peek().line), message)
    }
}
