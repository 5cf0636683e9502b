use crate::ast::{BinaryOp, Declarator, NodeId, NodeKind, SyntaxTree, UnaryOp};
use crate::errors::{BuildError, Result};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::resolve;

/// Parses a class source into a [`SyntaxTree`] with attached reference
/// statistics. Malformed source is a fatal [`BuildError::Parse`]
/// carrying the logical class name and line.
pub fn parse(source: &str, class: &str) -> Result<SyntaxTree> {
    let tokens = Lexer::new(source, class).tokenize()?;
    let mut parser = Parser::new(tokens, class);
    let mut tree = parser.parse()?;
    resolve::attach_stats(&mut tree);
    Ok(tree)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    class: String,
    tree: SyntaxTree,
}

impl Parser {
    fn new(tokens: Vec<Token>, class: &str) -> Self {
        Self {
            tokens,
            position: 0,
            class: class.to_string(),
            tree: SyntaxTree::new(),
        }
    }

    fn parse(&mut self) -> Result<SyntaxTree> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        let root = self.tree.add(NodeKind::Script { body });
        self.tree.set_root(root);
        Ok(std::mem::take(&mut self.tree))
    }

    // Token stream management

    fn current(&self) -> &Token {
        self.tokens
            .get(self.position)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with Eof"))
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.is_at_end() {
            self.position += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {}, found {:?}", what, self.current().kind)))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected {}, found {:?}", what, other))),
        }
    }

    fn error(&self, message: impl Into<String>) -> BuildError {
        BuildError::Parse {
            class: self.class.clone(),
            line: self.current().line,
            message: message.into(),
        }
    }

    // Statements

    fn parse_statement(&mut self) -> Result<NodeId> {
        match self.current().kind {
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::Var => self.parse_var_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(self.tree.add(NodeKind::Empty))
            }
            _ => {
                let expression = self.parse_expression()?;
                self.expect(TokenKind::Semicolon, "`;` after expression")?;
                Ok(self.tree.add(NodeKind::ExprStmt { expression }))
            }
        }
    }

    fn parse_function_declaration(&mut self) -> Result<NodeId> {
        self.advance();
        let name = self.expect_ident("function name")?;
        let (params, body) = self.parse_function_rest()?;
        Ok(self.tree.add(NodeKind::Function {
            name: Some(name),
            params,
            body,
            declaration: true,
        }))
    }

    fn parse_function_rest(&mut self) -> Result<(Vec<String>, Vec<NodeId>)> {
        self.expect(TokenKind::LParen, "`(` before parameter list")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_ident("parameter name")?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)` after parameter list")?;
        self.expect(TokenKind::LBrace, "`{` before function body")?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "`}` after function body")?;
        Ok((params, body))
    }

    fn parse_var_statement(&mut self) -> Result<NodeId> {
        self.advance();
        let mut declarators = Vec::new();
        loop {
            let name = self.expect_ident("variable name")?;
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarators.push(Declarator { name, init });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon, "`;` after var declaration")?;
        Ok(self.tree.add(NodeKind::VarDecl { declarators }))
    }

    fn parse_if_statement(&mut self) -> Result<NodeId> {
        self.advance();
        self.expect(TokenKind::LParen, "`(` after `if`")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "`)` after condition")?;
        let consequent = self.parse_statement()?;
        let alternate = if self.eat(&TokenKind::Else) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(self.tree.add(NodeKind::If {
            condition,
            consequent,
            alternate,
        }))
    }

    fn parse_return_statement(&mut self) -> Result<NodeId> {
        self.advance();
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "`;` after return")?;
        Ok(self.tree.add(NodeKind::Return { value }))
    }

    fn parse_block(&mut self) -> Result<NodeId> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "`}` after block")?;
        Ok(self.tree.add(NodeKind::Block { body }))
    }

    // Expressions, by descending precedence

    fn parse_expression(&mut self) -> Result<NodeId> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<NodeId> {
        let target = self.parse_or()?;
        if self.eat(&TokenKind::Assign) {
            match self.tree.kind(target) {
                NodeKind::Ident { .. } | NodeKind::Member { .. } => {}
                _ => return Err(self.error("invalid assignment target")),
            }
            let value = self.parse_assignment()?;
            return Ok(self.tree.add(NodeKind::Assign { target, value }));
        }
        Ok(target)
    }

    fn parse_or(&mut self) -> Result<NodeId> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = self.tree.add(NodeKind::Binary {
                op: BinaryOp::Or,
                left,
                right,
            });
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<NodeId> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = self.tree.add(NodeKind::Binary {
                op: BinaryOp::And,
                left,
                right,
            });
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<NodeId> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::StrictEq => BinaryOp::StrictEq,
                TokenKind::StrictNotEq => BinaryOp::StrictNotEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = self.tree.add(NodeKind::Binary { op, left, right });
        }
    }

    fn parse_relational(&mut self) -> Result<NodeId> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.tree.add(NodeKind::Binary { op, left, right });
        }
    }

    fn parse_additive(&mut self) -> Result<NodeId> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.tree.add(NodeKind::Binary { op, left, right });
        }
    }

    fn parse_multiplicative(&mut self) -> Result<NodeId> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.tree.add(NodeKind::Binary { op, left, right });
        }
    }

    fn parse_unary(&mut self) -> Result<NodeId> {
        let op = match self.current().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(self.tree.add(NodeKind::Unary { op, operand }))
    }

    fn parse_postfix(&mut self) -> Result<NodeId> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let property = self.expect_ident("property name after `.`")?;
                expr = self.tree.add(NodeKind::Member {
                    object: expr,
                    property,
                });
            } else if self.eat(&TokenKind::LParen) {
                let mut arguments = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        arguments.push(self.parse_assignment()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "`)` after arguments")?;
                expr = self.tree.add(NodeKind::Call {
                    callee: expr,
                    arguments,
                });
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<NodeId> {
        let kind = match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                NodeKind::Ident { name }
            }
            TokenKind::Number(value) => {
                self.advance();
                NodeKind::Number(value)
            }
            TokenKind::Str(value) => {
                self.advance();
                NodeKind::Str(value)
            }
            TokenKind::True => {
                self.advance();
                NodeKind::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                NodeKind::Bool(false)
            }
            TokenKind::Null => {
                self.advance();
                NodeKind::Null
            }
            TokenKind::This => {
                self.advance();
                NodeKind::This
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "`)` after expression")?;
                return Ok(expr);
            }
            TokenKind::Function => {
                self.advance();
                let name = match self.current().kind.clone() {
                    TokenKind::Ident(name) => {
                        self.advance();
                        Some(name)
                    }
                    _ => None,
                };
                let (params, body) = self.parse_function_rest()?;
                NodeKind::Function {
                    name,
                    params,
                    body,
                    declaration: false,
                }
            }
            other => return Err(self.error(format!("unexpected token {:?}", other))),
        };
        Ok(self.tree.add(kind))
    }
}
