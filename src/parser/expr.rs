//! Lexer and recursive-descent parser for the embedded-code fragments
//! found inside `<% %>` and `<%= %>` tags.
//!
//! The language is deliberately small: literals, member paths, indexing,
//! Ruby-style calls with keyword arguments, comparisons and `each`/`if`
//! block headers. Errors carry only a message; the block filter attaches
//! the template name and line.

use serde_json::Value;

use super::ast::{BinOp, BlockHead, Call, Expr};

/// What a statement tag turned out to be.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Open(BlockHead),
    Elsif(Expr),
    Else,
    End,
    Eval(Expr),
}

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Ident(String),
    Sym(String),
    Str(String),
    Int(i64),
    Float(f64),
    True,
    False,
    Nil,
    Do,
    End,
    If,
    Elsif,
    Else,
    And,
    Or,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Pipe,
    Bang,
    EqEq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lex(code: &str) -> Result<Vec<Tok>, String> {
    let chars: Vec<char> = code.chars().collect();
    let mut toks = vec![];
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            ',' => {
                toks.push(Tok::Comma);
                i += 1;
            }
            '.' => {
                toks.push(Tok::Dot);
                i += 1;
            }
            '(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            '[' => {
                toks.push(Tok::LBracket);
                i += 1;
            }
            ']' => {
                toks.push(Tok::RBracket);
                i += 1;
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    toks.push(Tok::Or);
                    i += 2;
                } else {
                    toks.push(Tok::Pipe);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    toks.push(Tok::And);
                    i += 2;
                } else {
                    return Err("unexpected `&`".to_string());
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    toks.push(Tok::EqEq);
                    i += 2;
                } else {
                    return Err("assignment is not supported in templates".to_string());
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    toks.push(Tok::NotEq);
                    i += 2;
                } else {
                    toks.push(Tok::Bang);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    toks.push(Tok::Gte);
                    i += 2;
                } else {
                    toks.push(Tok::Gt);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    toks.push(Tok::Lte);
                    i += 2;
                } else {
                    toks.push(Tok::Lt);
                    i += 1;
                }
            }
            ':' => {
                if chars.get(i + 1).copied().map_or(false, is_ident_start) {
                    let (name, next) = lex_ident(&chars, i + 1);
                    toks.push(Tok::Sym(name));
                    i = next;
                } else {
                    toks.push(Tok::Colon);
                    i += 1;
                }
            }
            '\'' | '"' => {
                let (s, next) = lex_string(&chars, i)?;
                toks.push(Tok::Str(s));
                i = next;
            }
            c if c.is_ascii_digit() => {
                let (tok, next) = lex_number(&chars, i)?;
                toks.push(tok);
                i = next;
            }
            c if is_ident_start(c) => {
                let (name, next) = lex_ident(&chars, i);
                i = next;
                toks.push(match name.as_str() {
                    "do" => Tok::Do,
                    "end" => Tok::End,
                    "if" => Tok::If,
                    "elsif" => Tok::Elsif,
                    "else" => Tok::Else,
                    "and" => Tok::And,
                    "or" => Tok::Or,
                    "true" => Tok::True,
                    "false" => Tok::False,
                    "nil" => Tok::Nil,
                    _ => Tok::Ident(name),
                });
            }
            c => return Err(format!("unexpected character `{}`", c)),
        }
    }

    Ok(toks)
}

fn lex_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    while i < chars.len() && is_ident_char(chars[i]) {
        i += 1;
    }
    // Ruby predicate names: `admin?`, `empty?`
    if i < chars.len() && chars[i] == '?' {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

fn lex_string(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push(match chars[i + 1] {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    Err("unterminated string literal".to_string())
}

fn lex_number(chars: &[char], start: usize) -> Result<(Tok, usize), String> {
    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }

    let mut is_float = false;
    if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }

    let text: String = chars[start..i].iter().collect();
    if is_float {
        text.parse::<f64>().map(|f| (Tok::Float(f), i)).map_err(|_| format!("invalid number `{}`", text))
    } else {
        text.parse::<i64>().map(|n| (Tok::Int(n), i)).map_err(|_| format!("invalid number `{}`", text))
    }
}

struct ExprParser {
    toks: Vec<Tok>,
    pos: usize,
}

impl ExprParser {
    fn new(toks: Vec<Tok>) -> ExprParser {
        ExprParser { toks, pos: 0 }
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Tok) -> Result<(), String> {
        match self.next() {
            Some(ref tok) if tok == expected => Ok(()),
            Some(tok) => Err(format!("expected {:?}, found {:?}", expected, tok)),
            None => Err(format!("expected {:?}, found end of code", expected)),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    /// Parses a full expression; `command` additionally allows Ruby-style
    /// paren-less arguments on a leading bare call (`render :widget, a: 1`).
    fn expr(&mut self, command: bool) -> Result<Expr, String> {
        if command {
            if let Some(Tok::Ident(name)) = self.peek().cloned() {
                // lookahead: `name arg, ...` with no dot/paren in between
                let after = self.toks.get(self.pos + 1);
                let starts_args = matches!(
                    after,
                    Some(
                        Tok::Sym(_)
                            | Tok::Str(_)
                            | Tok::Int(_)
                            | Tok::Float(_)
                            | Tok::True
                            | Tok::False
                            | Tok::Nil
                            | Tok::Ident(_)
                    )
                );
                if starts_args {
                    self.pos += 1;
                    let (args, kwargs) = self.command_args()?;
                    return Ok(Expr::Var(Call { name, args, kwargs }));
                }
            }
        }

        self.or_expr()
    }

    fn command_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), String> {
        let mut args = vec![];
        let mut kwargs = vec![];

        loop {
            if self.at_kwarg() {
                let name = match self.next() {
                    Some(Tok::Ident(name)) => name,
                    _ => unreachable!(),
                };
                self.eat(&Tok::Colon)?;
                kwargs.push((name, self.or_expr()?));
            } else {
                if !kwargs.is_empty() {
                    return Err("positional arguments cannot follow keyword arguments".to_string());
                }
                args.push(self.or_expr()?);
            }

            match self.peek() {
                Some(Tok::Comma) => {
                    self.pos += 1;
                }
                _ => break,
            }
        }

        Ok((args, kwargs))
    }

    fn at_kwarg(&self) -> bool {
        matches!(self.peek(), Some(Tok::Ident(_))) && self.toks.get(self.pos + 1) == Some(&Tok::Colon)
    }

    fn or_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Tok::Or) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            lhs = Expr::Binary { lhs: Box::new(lhs), op: BinOp::Or, rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.cmp_expr()?;
        while self.peek() == Some(&Tok::And) {
            self.pos += 1;
            let rhs = self.cmp_expr()?;
            lhs = Expr::Binary { lhs: Box::new(lhs), op: BinOp::And, rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn cmp_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(Tok::EqEq) => BinOp::Eq,
                Some(Tok::NotEq) => BinOp::NotEq,
                Some(Tok::Gt) => BinOp::Gt,
                Some(Tok::Gte) => BinOp::Gte,
                Some(Tok::Lt) => BinOp::Lt,
                Some(Tok::Lte) => BinOp::Lte,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary_expr()?;
            lhs = Expr::Binary { lhs: Box::new(lhs), op, rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn unary_expr(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Tok::Bang) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.unary_expr()?)));
        }
        self.postfix_expr()
    }

    fn postfix_expr(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;

        loop {
            match self.peek() {
                Some(Tok::Dot) => {
                    self.pos += 1;
                    let name = match self.next() {
                        Some(Tok::Ident(name)) => name,
                        Some(Tok::Do) | None => {
                            return Err("expected a member name after `.`".to_string())
                        }
                        Some(tok) => return Err(format!("expected a member name, found {:?}", tok)),
                    };
                    let (args, kwargs) = if self.peek() == Some(&Tok::LParen) {
                        self.paren_args()?
                    } else {
                        (vec![], vec![])
                    };
                    expr = Expr::Attr { base: Box::new(expr), member: Call { name, args, kwargs } };
                }
                Some(Tok::LBracket) => {
                    self.pos += 1;
                    let index = self.or_expr()?;
                    self.eat(&Tok::RBracket)?;
                    expr = Expr::Index { base: Box::new(expr), index: Box::new(index) };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Tok::Str(s)) => Ok(Expr::Lit(Value::String(s))),
            Some(Tok::Sym(s)) => Ok(Expr::Lit(Value::String(s))),
            Some(Tok::Int(n)) => Ok(Expr::Lit(Value::from(n))),
            Some(Tok::Float(f)) => Ok(Expr::Lit(Value::from(f))),
            Some(Tok::True) => Ok(Expr::Lit(Value::Bool(true))),
            Some(Tok::False) => Ok(Expr::Lit(Value::Bool(false))),
            Some(Tok::Nil) => Ok(Expr::Lit(Value::Null)),
            Some(Tok::LParen) => {
                let expr = self.or_expr()?;
                self.eat(&Tok::RParen)?;
                Ok(expr)
            }
            Some(Tok::Ident(name)) => {
                if self.peek() == Some(&Tok::LParen) {
                    let (args, kwargs) = self.paren_args()?;
                    Ok(Expr::Var(Call { name, args, kwargs }))
                } else {
                    Ok(Expr::var(name))
                }
            }
            Some(tok) => Err(format!("unexpected {:?}", tok)),
            None => Err("unexpected end of code".to_string()),
        }
    }

    fn paren_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), String> {
        self.eat(&Tok::LParen)?;
        if self.peek() == Some(&Tok::RParen) {
            self.pos += 1;
            return Ok((vec![], vec![]));
        }
        let (args, kwargs) = self.command_args()?;
        self.eat(&Tok::RParen)?;
        Ok((args, kwargs))
    }

    /// An optional trailing block header: `do` or `do |name|`.
    fn block_header(&mut self) -> Result<Option<Option<String>>, String> {
        if self.peek() != Some(&Tok::Do) {
            return Ok(None);
        }
        self.pos += 1;

        if self.peek() != Some(&Tok::Pipe) {
            return Ok(Some(None));
        }
        self.pos += 1;
        let var = match self.next() {
            Some(Tok::Ident(name)) => name,
            _ => return Err("expected a block parameter name after `|`".to_string()),
        };
        self.eat(&Tok::Pipe)?;
        Ok(Some(Some(var)))
    }

    fn expect_end(&self) -> Result<(), String> {
        if self.at_end() {
            Ok(())
        } else {
            Err(format!("unexpected {:?} after expression", self.toks[self.pos]))
        }
    }
}

/// Parses the code of a `<% %>` tag.
pub fn parse_statement(code: &str) -> Result<StmtKind, String> {
    let mut parser = ExprParser::new(lex(code)?);

    match parser.peek() {
        Some(Tok::End) => {
            parser.pos += 1;
            parser.expect_end()?;
            return Ok(StmtKind::End);
        }
        Some(Tok::Else) => {
            parser.pos += 1;
            parser.expect_end()?;
            return Ok(StmtKind::Else);
        }
        Some(Tok::If) => {
            parser.pos += 1;
            let cond = parser.expr(false)?;
            parser.expect_end()?;
            return Ok(StmtKind::Open(BlockHead::If(cond)));
        }
        Some(Tok::Elsif) => {
            parser.pos += 1;
            let cond = parser.expr(false)?;
            parser.expect_end()?;
            return Ok(StmtKind::Elsif(cond));
        }
        None => return Err("empty statement tag".to_string()),
        _ => {}
    }

    let expr = parser.expr(true)?;
    let header = parser.block_header()?;
    parser.expect_end()?;

    match header {
        None => Ok(StmtKind::Eval(expr)),
        Some(var) => {
            // statement-position blocks are iteration only
            match expr {
                Expr::Attr { base, member } if member.name == "each" && member.is_bare() => {
                    let var = var.ok_or_else(|| {
                        "`each` requires a block parameter, e.g. `each do |item|`".to_string()
                    })?;
                    Ok(StmtKind::Open(BlockHead::Each { target: *base, var }))
                }
                _ => Err("only `each do |item|` blocks are supported in statement position".to_string()),
            }
        }
    }
}

/// Parses the code of a `<%= %>` or `<%== %>` tag. Returns the expression
/// and whether it opens a block (`<%= render :layout do %>`).
pub fn parse_output(code: &str) -> Result<(Expr, bool), String> {
    let mut parser = ExprParser::new(lex(code)?);
    let expr = parser.expr(true)?;
    let header = parser.block_header()?;
    parser.expect_end()?;

    match header {
        None => Ok((expr, false)),
        Some(None) => Ok((expr, true)),
        Some(Some(_)) => {
            Err("output blocks take no parameters; the content is passed as the partial's block"
                .to_string())
        }
    }
}
