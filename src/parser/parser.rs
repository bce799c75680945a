//! Recursive descent parser for scripts
//!
//! A script is a method body: optional imports followed by block statements.
//! The parser only builds the tree; every semantic check, including whether
//! an expression may stand as a statement, belongs to analysis.

use super::error::ParseError;
use super::lexer::{Lexer, LexicalToken, Token};
use crate::ast::*;

type PResult<T> = std::result::Result<T, ParseError>;

/// Parser for the script language
pub struct Parser {
    tokens: Vec<LexicalToken>,
    current: usize,
    eof: Location,
    /// Statement-level errors already recovered from
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(source: &str) -> PResult<Self> {
        let tokens = Lexer::new(source)
            .tokenize()
            .map_err(|e| ParseError::LexicalError {
                text: e.text,
                location: e.location,
            })?;
        let mut eof = Location::start();
        eof.advance_str(source);
        Ok(Self {
            tokens,
            current: 0,
            eof,
            errors: Vec::new(),
        })
    }

    /// Parse the whole source as a script
    ///
    /// A malformed statement is skipped and parsing resumes at the next one,
    /// so every syntax error of the unit is reported together.
    pub fn parse_script(mut self) -> PResult<Script> {
        let start = self.current_location();
        let mut imports = Vec::new();
        while self.check(&Token::Import) {
            let before = self.current;
            match self.parse_import() {
                Ok(import) => imports.push(import),
                Err(e) => self.recover(e, before),
            }
        }
        let body_start = self.current_location();
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            let before = self.current;
            match self.parse_block_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => self.recover(e, before),
            }
        }
        match self.errors.len() {
            0 => Ok(Script {
                imports,
                body: Block::new(stmts, Span::new(body_start, self.eof)),
                span: Span::new(start, self.eof),
            }),
            1 => Err(self.errors.remove(0)),
            _ => Err(ParseError::MultipleErrors { errors: self.errors }),
        }
    }

    /// Parse the whole source as a single expression
    pub fn parse_standalone_expression(mut self) -> PResult<Expr> {
        let expr = self.parse_expression()?;
        if !self.is_at_end() {
            return Err(self.error_here("end of expression"));
        }
        Ok(expr)
    }

    // Token helpers

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.current + n).map(|t| t.token)
    }

    fn check(&self, token_type: &Token) -> bool {
        self.peek_token().as_ref() == Some(token_type)
    }

    fn advance(&mut self) -> PResult<LexicalToken> {
        match self.tokens.get(self.current) {
            Some(token) => {
                self.current += 1;
                Ok(token.clone())
            }
            None => Err(ParseError::unexpected_end_of_input("more input", self.eof)),
        }
    }

    fn match_token(&mut self, token_type: &Token) -> bool {
        if self.check(token_type) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token_type: &Token, what: &str) -> PResult<LexicalToken> {
        if self.check(token_type) {
            self.advance()
        } else {
            Err(self.error_here(what))
        }
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.current) {
            Some(token) => ParseError::unexpected_token(expected, &token.lexeme, token.location()),
            None => ParseError::unexpected_end_of_input(expected, self.eof),
        }
    }

    /// Record `err` and skip to the start of the next statement
    fn recover(&mut self, err: ParseError, before: usize) {
        log::trace!("recovering from {}", err);
        self.errors.push(err);
        self.synchronize_in_block();
        if self.current == before && !self.is_at_end() {
            self.current += 1;
        }
    }

    /// Skip past the end of the broken statement: its `;`, or a block it
    /// opened; stops before a `}` closing the enclosing block
    fn synchronize_in_block(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.peek_token() {
            match token {
                Token::Semicolon if depth == 0 => {
                    self.current += 1;
                    return;
                }
                Token::LBrace => depth += 1,
                Token::RBrace if depth == 0 => return,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.current += 1;
                        return;
                    }
                }
                _ => {}
            }
            self.current += 1;
        }
    }

    fn current_location(&self) -> Location {
        self.tokens
            .get(self.current)
            .map(|t| t.span.start)
            .unwrap_or(self.eof)
    }

    fn previous_end(&self) -> Location {
        match self.current.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span.end,
            None => Location::start(),
        }
    }

    fn span_from(&self, start: Location) -> Span {
        Span::new(start, self.previous_end())
    }

    fn parse_identifier(&mut self) -> PResult<String> {
        Ok(self.expect(&Token::Identifier, "identifier")?.lexeme)
    }

    // Declarations

    fn parse_import(&mut self) -> PResult<Import> {
        let start = self.current_location();
        self.expect(&Token::Import, "'import'")?;
        let mut name = self.parse_identifier()?;
        while self.match_token(&Token::Dot) {
            if self.match_token(&Token::Star) {
                name.push_str(".*");
                break;
            }
            name.push('.');
            name.push_str(&self.parse_identifier()?);
        }
        // `as` is contextual and stays usable as an ordinary identifier
        let alias = match self.tokens.get(self.current) {
            Some(token) if token.token == Token::Identifier && token.lexeme == "as" => {
                if name.ends_with(".*") {
                    return Err(self.error_here("';' after on-demand import"));
                }
                self.current += 1;
                Some(self.parse_identifier()?)
            }
            _ => None,
        };
        self.expect(&Token::Semicolon, "';' after import")?;
        Ok(Import {
            name,
            alias,
            span: self.span_from(start),
        })
    }

    /// Does a local variable declaration start here?
    fn is_local_decl_start(&self) -> bool {
        match self.peek_token() {
            Some(Token::Final) => true,
            Some(t) if t.is_primitive_type() => {
                matches!(self.peek_at(1), Some(Token::LBracket) | Some(Token::Identifier))
            }
            Some(Token::Identifier) => {
                let mut i = 1;
                while self.peek_at(i) == Some(Token::Dot) && self.peek_at(i + 1) == Some(Token::Identifier) {
                    i += 2;
                }
                while self.peek_at(i) == Some(Token::LBracket) && self.peek_at(i + 1) == Some(Token::RBracket) {
                    i += 2;
                }
                self.peek_at(i) == Some(Token::Identifier)
            }
            _ => false,
        }
    }

    fn parse_type(&mut self) -> PResult<TypeRef> {
        let start = self.current_location();
        let name = match self.peek_token() {
            Some(t) if t.is_primitive_type() => self.advance()?.lexeme,
            Some(Token::Identifier) => {
                let mut name = self.parse_identifier()?;
                while self.check(&Token::Dot) && self.peek_at(1) == Some(Token::Identifier) {
                    self.current += 1;
                    name.push('.');
                    name.push_str(&self.parse_identifier()?);
                }
                name
            }
            _ => return Err(self.error_here("type")),
        };
        let dims = self.parse_empty_dims();
        Ok(TypeRef {
            name,
            dims,
            span: self.span_from(start),
        })
    }

    fn parse_empty_dims(&mut self) -> usize {
        let mut dims = 0;
        while self.check(&Token::LBracket) && self.peek_at(1) == Some(Token::RBracket) {
            self.current += 2;
            dims += 1;
        }
        dims
    }

    fn parse_local_decl(&mut self) -> PResult<LocalDecl> {
        let is_final = self.match_token(&Token::Final);
        let ty = self.parse_type()?;
        let mut vars = vec![self.parse_declarator()?];
        while self.match_token(&Token::Comma) {
            vars.push(self.parse_declarator()?);
        }
        Ok(LocalDecl { is_final, ty, vars })
    }

    fn parse_declarator(&mut self) -> PResult<Declarator> {
        let start = self.current_location();
        let name = self.parse_identifier()?;
        let dims = self.parse_empty_dims();
        let init = if self.match_token(&Token::Assign) {
            Some(self.parse_variable_init()?)
        } else {
            None
        };
        Ok(Declarator {
            name,
            dims,
            init,
            var: None,
            span: self.span_from(start),
        })
    }

    fn parse_variable_init(&mut self) -> PResult<Expr> {
        if self.check(&Token::LBrace) {
            self.parse_array_init()
        } else {
            self.parse_expression()
        }
    }

    fn parse_array_init(&mut self) -> PResult<Expr> {
        let start = self.current_location();
        self.expect(&Token::LBrace, "'{'")?;
        let mut elems = Vec::new();
        while !self.check(&Token::RBrace) {
            elems.push(self.parse_variable_init()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace, "'}' after array initializer")?;
        Ok(Expr::new(ExprKind::ArrayInit(elems), self.span_from(start)))
    }

    // Statements

    fn parse_block(&mut self) -> PResult<Block> {
        let start = self.current_location();
        self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.is_at_end() {
                return Err(self.error_here("'}'"));
            }
            let before = self.current;
            match self.parse_block_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => self.recover(e, before),
            }
        }
        self.advance()?;
        Ok(Block::new(stmts, self.span_from(start)))
    }

    fn parse_block_statement(&mut self) -> PResult<Stmt> {
        if self.is_local_decl_start() {
            let start = self.current_location();
            let decl = self.parse_local_decl()?;
            self.expect(&Token::Semicolon, "';' after declaration")?;
            Ok(Stmt::new(StmtKind::Decl(decl), self.span_from(start)))
        } else {
            self.parse_statement()
        }
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        let start = self.current_location();
        let kind = match self.peek_token() {
            Some(Token::LBrace) => StmtKind::Block(self.parse_block()?),
            Some(Token::Semicolon) => {
                self.advance()?;
                StmtKind::Empty
            }
            Some(Token::If) => self.parse_if()?,
            Some(Token::While) => {
                self.advance()?;
                let cond = self.parse_paren_expression()?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::While { cond, body }
            }
            Some(Token::Do) => {
                self.advance()?;
                let body = Box::new(self.parse_statement()?);
                self.expect(&Token::While, "'while' after do body")?;
                let cond = self.parse_paren_expression()?;
                self.expect(&Token::Semicolon, "';' after do-while")?;
                StmtKind::Do { body, cond }
            }
            Some(Token::For) => self.parse_for()?,
            Some(Token::Switch) => self.parse_switch()?,
            Some(Token::Break) => {
                self.advance()?;
                let label = self.parse_optional_label()?;
                StmtKind::Break(label)
            }
            Some(Token::Continue) => {
                self.advance()?;
                let label = self.parse_optional_label()?;
                StmtKind::Continue(label)
            }
            Some(Token::Return) => {
                self.advance()?;
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(&Token::Semicolon, "';' after return")?;
                StmtKind::Return(value)
            }
            Some(Token::Throw) => {
                self.advance()?;
                let value = self.parse_expression()?;
                self.expect(&Token::Semicolon, "';' after throw")?;
                StmtKind::Throw(value)
            }
            Some(Token::Try) => self.parse_try()?,
            Some(Token::Synchronized) => {
                self.advance()?;
                let lock = self.parse_paren_expression()?;
                let body = self.parse_block()?;
                StmtKind::Synchronized { lock, body }
            }
            Some(Token::Identifier) if self.peek_at(1) == Some(Token::Colon) => {
                let label = self.parse_identifier()?;
                self.advance()?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::Labeled { label, body }
            }
            Some(Token::Else) | Some(Token::Case) | Some(Token::Default) | Some(Token::Catch) | Some(Token::Finally) => {
                return Err(self.error_here("statement"));
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect(&Token::Semicolon, "';' after expression")?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_optional_label(&mut self) -> PResult<Option<String>> {
        let label = if self.check(&Token::Identifier) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        self.expect(&Token::Semicolon, "';'")?;
        Ok(label)
    }

    fn parse_paren_expression(&mut self) -> PResult<Expr> {
        self.expect(&Token::LParen, "'('")?;
        let expr = self.parse_expression()?;
        self.expect(&Token::RParen, "')'")?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> PResult<StmtKind> {
        self.expect(&Token::If, "'if'")?;
        let cond = self.parse_paren_expression()?;
        let then = Box::new(self.parse_statement()?);
        let otherwise = if self.match_token(&Token::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If { cond, then, otherwise })
    }

    fn parse_for(&mut self) -> PResult<StmtKind> {
        self.expect(&Token::For, "'for'")?;
        self.expect(&Token::LParen, "'(' after for")?;
        let mut init = Vec::new();
        if !self.check(&Token::Semicolon) {
            let start = self.current_location();
            if self.is_local_decl_start() {
                let decl = self.parse_local_decl()?;
                init.push(Stmt::new(StmtKind::Decl(decl), self.span_from(start)));
            } else {
                for expr in self.parse_expression_list()? {
                    let span = expr.span;
                    init.push(Stmt::new(StmtKind::Expr(expr), span));
                }
            }
        }
        self.expect(&Token::Semicolon, "';' in for")?;
        let cond = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::Semicolon, "';' in for")?;
        let update = if self.check(&Token::RParen) {
            Vec::new()
        } else {
            self.parse_expression_list()?
        };
        self.expect(&Token::RParen, "')' after for")?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn parse_expression_list(&mut self) -> PResult<Vec<Expr>> {
        let mut list = vec![self.parse_expression()?];
        while self.match_token(&Token::Comma) {
            list.push(self.parse_expression()?);
        }
        Ok(list)
    }

    fn parse_switch(&mut self) -> PResult<StmtKind> {
        self.expect(&Token::Switch, "'switch'")?;
        let selector = self.parse_paren_expression()?;
        self.expect(&Token::LBrace, "'{' after switch")?;
        let mut items = Vec::new();
        loop {
            match self.peek_token() {
                Some(Token::RBrace) => {
                    self.advance()?;
                    break;
                }
                Some(Token::Case) => {
                    self.advance()?;
                    let value = self.parse_expression()?;
                    self.expect(&Token::Colon, "':' after case")?;
                    items.push(SwitchItem::Case(value));
                }
                Some(Token::Default) => {
                    let start = self.current_location();
                    self.advance()?;
                    self.expect(&Token::Colon, "':' after default")?;
                    items.push(SwitchItem::Default(self.span_from(start)));
                }
                None => return Err(self.error_here("'}' after switch body")),
                _ => {
                    let before = self.current;
                    match self.parse_block_statement() {
                        Ok(stmt) => items.push(SwitchItem::Stmt(stmt)),
                        Err(e) => self.recover(e, before),
                    }
                }
            }
        }
        Ok(StmtKind::Switch { selector, items })
    }

    fn parse_try(&mut self) -> PResult<StmtKind> {
        let try_location = self.current_location();
        self.expect(&Token::Try, "'try'")?;
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.check(&Token::Catch) {
            let start = self.current_location();
            self.advance()?;
            self.expect(&Token::LParen, "'(' after catch")?;
            let is_final = self.match_token(&Token::Final);
            let ty = self.parse_type()?;
            let name = self.parse_identifier()?;
            self.expect(&Token::RParen, "')' after catch parameter")?;
            let body = self.parse_block()?;
            catches.push(CatchClause {
                is_final,
                ty,
                name,
                var: None,
                class: DataType::Unknown,
                body,
                span: self.span_from(start),
            });
        }
        let finally = if self.match_token(&Token::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catches.is_empty() && finally.is_none() {
            return Err(ParseError::invalid_syntax("'try' without 'catch' or 'finally'", try_location));
        }
        Ok(StmtKind::Try { body, catches, finally })
    }

    // Expressions

    pub fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let target = self.parse_conditional()?;
        let compound = match self.peek_token() {
            Some(Token::Assign) => None,
            Some(Token::AddAssign) => Some(BinaryOp::Add),
            Some(Token::SubAssign) => Some(BinaryOp::Sub),
            Some(Token::MulAssign) => Some(BinaryOp::Mul),
            Some(Token::DivAssign) => Some(BinaryOp::Div),
            Some(Token::ModAssign) => Some(BinaryOp::Rem),
            Some(Token::AndAssign) => Some(BinaryOp::And),
            Some(Token::OrAssign) => Some(BinaryOp::Or),
            Some(Token::XorAssign) => Some(BinaryOp::Xor),
            Some(Token::LShiftAssign) => Some(BinaryOp::Shl),
            Some(Token::RShiftAssign) => Some(BinaryOp::Shr),
            Some(Token::URShiftAssign) => Some(BinaryOp::UShr),
            _ => return Ok(target),
        };
        self.advance()?;
        let value = self.parse_assignment()?;
        let span = target.span.merge(value.span);
        let kind = match compound {
            None => ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
                compound: false,
            },
            Some(op) => ExprKind::CompoundAssign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
        };
        Ok(Expr::new(kind, span))
    }

    fn parse_conditional(&mut self) -> PResult<Expr> {
        let cond = self.parse_binary(1)?;
        if !self.match_token(&Token::Question) {
            return Ok(cond);
        }
        let then = self.parse_expression()?;
        self.expect(&Token::Colon, "':' in conditional expression")?;
        let otherwise = self.parse_conditional()?;
        let span = cond.span.merge(otherwise.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        ))
    }

    fn binary_op(token: Token) -> Option<(BinaryOp, u8)> {
        Some(match token {
            Token::PipePipe => (BinaryOp::LogicalOr, 1),
            Token::AndAnd => (BinaryOp::LogicalAnd, 2),
            Token::Pipe => (BinaryOp::Or, 3),
            Token::Caret => (BinaryOp::Xor, 4),
            Token::Amp => (BinaryOp::And, 5),
            Token::Eq => (BinaryOp::Eq, 6),
            Token::Ne => (BinaryOp::Ne, 6),
            Token::Lt => (BinaryOp::Lt, 7),
            Token::Le => (BinaryOp::Le, 7),
            Token::Gt => (BinaryOp::Gt, 7),
            Token::Ge => (BinaryOp::Ge, 7),
            Token::LShift => (BinaryOp::Shl, 8),
            Token::RShift => (BinaryOp::Shr, 8),
            Token::URShift => (BinaryOp::UShr, 8),
            Token::Plus => (BinaryOp::Add, 9),
            Token::Minus => (BinaryOp::Sub, 9),
            Token::Star => (BinaryOp::Mul, 10),
            Token::Slash => (BinaryOp::Div, 10),
            Token::Percent => (BinaryOp::Rem, 10),
            _ => return None,
        })
    }

    // Precedence climbing over the left-associative binary levels
    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            if self.check(&Token::InstanceOf) && min_prec <= 7 {
                self.advance()?;
                let target = self.parse_type()?;
                let span = left.span.merge(target.span);
                left = Expr::new(
                    ExprKind::InstanceOf {
                        operand: Box::new(left),
                        target,
                        class: DataType::Unknown,
                    },
                    span,
                );
                continue;
            }
            let Some((op, prec)) = self.peek_token().and_then(Self::binary_op) else { break };
            if prec < min_prec {
                break;
            }
            self.advance()?;
            let right = self.parse_binary(prec + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.current_location();
        let op = match self.peek_token() {
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Minus) => {
                if self.peek_at(1) == Some(Token::Integer) {
                    self.advance()?;
                    let literal = self.advance()?;
                    let value = parse_integer(&literal.lexeme, true, literal.location())?;
                    return self.parse_postfix_ops(Expr::literal(value, self.span_from(start)));
                }
                UnaryOp::Minus
            }
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Tilde) => UnaryOp::BitNot,
            Some(Token::Inc) | Some(Token::Dec) => {
                let inc = self.advance()?.token == Token::Inc;
                let operand = self.parse_unary()?;
                let op = if inc { IncDecOp::PreInc } else { IncDecOp::PreDec };
                return Ok(Expr::new(
                    ExprKind::IncDec {
                        op,
                        operand: Box::new(operand),
                    },
                    self.span_from(start),
                ));
            }
            Some(Token::LParen) if self.is_cast() => {
                self.advance()?;
                let to = self.parse_type()?;
                self.expect(&Token::RParen, "')' after cast type")?;
                let operand = self.parse_unary()?;
                return Ok(Expr::new(
                    ExprKind::Cast {
                        to: Some(to),
                        operand: Box::new(operand),
                    },
                    self.span_from(start),
                ));
            }
            _ => return self.parse_postfix(),
        };
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            self.span_from(start),
        ))
    }

    /// `(` starts a cast rather than a parenthesized expression
    fn is_cast(&self) -> bool {
        match self.peek_at(1) {
            Some(t) if t.is_primitive_type() => {
                let mut i = 2;
                while self.peek_at(i) == Some(Token::LBracket) && self.peek_at(i + 1) == Some(Token::RBracket) {
                    i += 2;
                }
                self.peek_at(i) == Some(Token::RParen)
            }
            Some(Token::Identifier) => {
                let mut i = 2;
                while self.peek_at(i) == Some(Token::Dot) && self.peek_at(i + 1) == Some(Token::Identifier) {
                    i += 2;
                }
                while self.peek_at(i) == Some(Token::LBracket) && self.peek_at(i + 1) == Some(Token::RBracket) {
                    i += 2;
                }
                if self.peek_at(i) != Some(Token::RParen) {
                    return false;
                }
                // a reference cast may not be followed by a binary +/- operand
                match self.peek_at(i + 1) {
                    Some(t) if t.is_literal() => true,
                    Some(Token::Identifier)
                    | Some(Token::LParen)
                    | Some(Token::Bang)
                    | Some(Token::Tilde)
                    | Some(Token::This)
                    | Some(Token::Super)
                    | Some(Token::New) => true,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.match_token(&Token::Dot) {
                let name = self.parse_identifier()?;
                if self.check(&Token::LParen) {
                    let args = self.parse_arguments()?;
                    let span = self.span_from(expr.span.start);
                    expr = Expr::new(
                        ExprKind::Call {
                            target: Some(Box::new(expr)),
                            name,
                            args,
                            method: None,
                            super_call: false,
                        },
                        span,
                    );
                } else {
                    let span = self.span_from(expr.span.start);
                    expr = Expr::new(
                        ExprKind::Select {
                            target: Box::new(expr),
                            name,
                        },
                        span,
                    );
                }
            } else if self.match_token(&Token::LBracket) {
                let index = self.parse_expression()?;
                self.expect(&Token::RBracket, "']'")?;
                let span = self.span_from(expr.span.start);
                expr = Expr::new(
                    ExprKind::Index {
                        array: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else {
                break;
            }
        }
        self.parse_postfix_ops(expr)
    }

    fn parse_postfix_ops(&mut self, mut expr: Expr) -> PResult<Expr> {
        while let Some(t @ (Token::Inc | Token::Dec)) = self.peek_token() {
            self.advance()?;
            let op = if t == Token::Inc { IncDecOp::PostInc } else { IncDecOp::PostDec };
            let span = self.span_from(expr.span.start);
            expr = Expr::new(
                ExprKind::IncDec {
                    op,
                    operand: Box::new(expr),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> PResult<Vec<Expr>> {
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args = self.parse_expression_list()?;
        }
        self.expect(&Token::RParen, "')' after arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.current_location();
        let Some(token) = self.peek_token() else {
            return Err(self.error_here("expression"));
        };
        match token {
            Token::Integer | Token::HexInteger => {
                let literal = self.advance()?;
                let value = parse_integer(&literal.lexeme, false, literal.location())?;
                Ok(Expr::literal(value, literal.span))
            }
            Token::FloatLiteral => {
                let literal = self.advance()?;
                let value = parse_float(&literal.lexeme, literal.location())?;
                Ok(Expr::literal(value, literal.span))
            }
            Token::CharLiteral => {
                let literal = self.advance()?;
                let value = parse_char(&literal.lexeme, literal.location())?;
                Ok(Expr::literal(value, literal.span))
            }
            Token::StringLiteral => {
                let literal = self.advance()?;
                let text = unescape(&literal.lexeme[1..literal.lexeme.len() - 1], literal.location())?;
                Ok(Expr::literal(Constant::String(text), literal.span))
            }
            Token::True | Token::False => {
                let literal = self.advance()?;
                Ok(Expr::literal(Constant::Boolean(token == Token::True), literal.span))
            }
            Token::Null => {
                let literal = self.advance()?;
                Ok(Expr::literal(Constant::Null, literal.span))
            }
            Token::This => {
                let this = self.advance()?;
                Ok(Expr::new(ExprKind::This, this.span))
            }
            Token::Super => {
                self.advance()?;
                self.expect(&Token::Dot, "'.' after super")?;
                let name = self.parse_identifier()?;
                let args = self.parse_arguments()?;
                Ok(Expr::new(
                    ExprKind::Call {
                        target: None,
                        name,
                        args,
                        method: None,
                        super_call: true,
                    },
                    self.span_from(start),
                ))
            }
            Token::LParen => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::New => self.parse_creator(),
            Token::Identifier => {
                let name = self.parse_identifier()?;
                if self.check(&Token::LParen) {
                    let args = self.parse_arguments()?;
                    Ok(Expr::new(
                        ExprKind::Call {
                            target: None,
                            name,
                            args,
                            method: None,
                            super_call: false,
                        },
                        self.span_from(start),
                    ))
                } else {
                    Ok(Expr::new(ExprKind::Name(name), self.span_from(start)))
                }
            }
            _ => Err(self.error_here("expression")),
        }
    }

    fn parse_creator(&mut self) -> PResult<Expr> {
        let start = self.current_location();
        self.expect(&Token::New, "'new'")?;
        let type_start = self.current_location();
        let primitive = self.peek_token().map_or(false, |t| t.is_primitive_type());
        let name = if primitive {
            self.advance()?.lexeme
        } else {
            let mut name = self.parse_identifier()?;
            while self.match_token(&Token::Dot) {
                name.push('.');
                name.push_str(&self.parse_identifier()?);
            }
            name
        };
        let class = TypeRef {
            name,
            dims: 0,
            span: self.span_from(type_start),
        };

        if !primitive && self.check(&Token::LParen) {
            let args = self.parse_arguments()?;
            return Ok(Expr::new(
                ExprKind::New {
                    class,
                    args,
                    ctor: None,
                },
                self.span_from(start),
            ));
        }

        let mut dims = Vec::new();
        let mut extra_dims = 0;
        while self.check(&Token::LBracket) {
            if self.peek_at(1) == Some(Token::RBracket) {
                self.current += 2;
                extra_dims += 1;
            } else if extra_dims == 0 {
                self.advance()?;
                dims.push(self.parse_expression()?);
                self.expect(&Token::RBracket, "']' after array dimension")?;
            } else {
                return Err(self.error_here("']'"));
            }
        }
        if dims.is_empty() && extra_dims == 0 {
            return Err(self.error_here("'(' or '['"));
        }
        let init = if self.check(&Token::LBrace) {
            match self.parse_array_init()?.kind {
                ExprKind::ArrayInit(elems) => Some(elems),
                _ => None,
            }
        } else if dims.is_empty() {
            return Err(ParseError::invalid_syntax("array dimension missing", self.current_location()));
        } else {
            None
        };
        Ok(Expr::new(
            ExprKind::NewArray {
                elem: class,
                dims,
                extra_dims,
                init,
            },
            self.span_from(start),
        ))
    }
}

/// Integer literal, folding a preceding unary minus into the value
fn parse_integer(lexeme: &str, negative: bool, location: Location) -> PResult<Constant> {
    let (body, is_long) = match lexeme.strip_suffix(['l', 'L']) {
        Some(body) => (body, true),
        None => (lexeme, false),
    };
    let body: String = body.chars().filter(|&c| c != '_').collect();
    let (digits, radix) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (hex.to_string(), 16)
    } else if body.len() > 1 && body.starts_with('0') {
        (body[1..].to_string(), 8)
    } else {
        (body, 10)
    };
    let too_large = || ParseError::invalid_syntax("integer number too large", location);
    let value = u64::from_str_radix(&digits, radix).map_err(|_| too_large())?;

    let constant = if is_long {
        if radix == 10 && value > i64::MAX as u64 + negative as u64 {
            return Err(too_large());
        }
        let v = value as i64;
        Constant::Long(if negative { v.wrapping_neg() } else { v })
    } else {
        let limit = if radix == 10 {
            i32::MAX as u64 + negative as u64
        } else {
            u32::MAX as u64
        };
        if value > limit {
            return Err(too_large());
        }
        let v = value as u32 as i32;
        Constant::Int(if negative { v.wrapping_neg() } else { v })
    };
    Ok(constant)
}

fn parse_float(lexeme: &str, location: Location) -> PResult<Constant> {
    let text: String = lexeme.chars().filter(|&c| c != '_').collect();
    let bad = || ParseError::invalid_syntax(format!("malformed floating-point literal '{}'", lexeme), location);
    if let Some(body) = text.strip_suffix(['f', 'F']) {
        let v: f32 = body.parse().map_err(|_| bad())?;
        if v.is_infinite() {
            return Err(ParseError::invalid_syntax("floating-point number too large", location));
        }
        return Ok(Constant::Float(v));
    }
    let body = text.strip_suffix(['d', 'D']).unwrap_or(&text);
    let v: f64 = body.parse().map_err(|_| bad())?;
    if v.is_infinite() {
        return Err(ParseError::invalid_syntax("floating-point number too large", location));
    }
    Ok(Constant::Double(v))
}

fn parse_char(lexeme: &str, location: Location) -> PResult<Constant> {
    let text = unescape(&lexeme[1..lexeme.len() - 1], location)?;
    let mut units = text.encode_utf16();
    match (units.next(), units.next()) {
        (Some(unit), None) => Ok(Constant::Char(unit)),
        _ => Err(ParseError::invalid_syntax("illegal character literal", location)),
    }
}

fn unescape(text: &str, location: Location) -> PResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            return Err(ParseError::invalid_syntax("illegal escape character", location));
        };
        match esc {
            'b' => out.push('\u{8}'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'f' => out.push('\u{c}'),
            'r' => out.push('\r'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '\\' => out.push('\\'),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| ParseError::invalid_syntax("illegal unicode escape", location))?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            '0'..='7' => {
                let mut code = esc.to_digit(8).unwrap_or(0);
                // up to three digits, value at most \377
                let max_digits = if esc <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            _ => return Err(ParseError::invalid_syntax("illegal escape character", location)),
        }
    }
    Ok(out)
}

/// Parse a script source
pub fn parse(source: &str) -> PResult<Script> {
    Parser::new(source)?.parse_script()
}
