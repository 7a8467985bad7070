//! Recursive-descent parser for semantic lines.
//!
//! The grammar is a closed, Python-flavoured subset: single-target assignment,
//! augmented assignment, `if`/`elif`/`else`, and expressions built
//! from one comparison, the eight arithmetic/bitwise operators, calls,
//! attribute access and atoms. Anything else is rejected with a parse error.
//!
//! Statements on separate lines share one column. An `if` arm written on the
//! following line must be indented past its `if`, and an `else`/`elif` on a
//! later line belongs to the `if` in the same column.

use super::ast::{ArithOp, CallArgs, CompareOp, Expr, Module, Stmt};
use super::error::SemanticError;
use super::lexer::{Lexer, Token, TokenKind, parse_integer_literal};

/// Parses one semantic line into a [`Module`].
pub fn parse(source: &str) -> Result<Module, SemanticError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn parse_module(&mut self) -> Result<Module, SemanticError> {
        let mut statements = Vec::new();
        let mut base_column = None;
        loop {
            let mut new_line = false;
            while self.check_separator() {
                new_line |= self.check(TokenKind::Newline);
                self.consume();
            }
            if self.check(TokenKind::EOF) {
                break;
            }
            let start = self.peek();
            let (kind, line, column) = (start.kind, start.line, start.column);
            match base_column {
                None => base_column = Some(column),
                Some(base)
                    if new_line
                        && column != base
                        && !matches!(kind, TokenKind::Else | TokenKind::Elif) =>
                {
                    return Err(SemanticError::parse(format!(
                        "unexpected indentation, line {line}, column {column}"
                    )));
                }
                Some(_) => {}
            }
            statements.push(self.parse_statement()?);
            if !self.check(TokenKind::EOF) && !self.check_separator() {
                return Err(self.unexpected("end of statement"));
            }
        }
        Ok(Module::new(statements))
    }

    fn parse_statement(&mut self) -> Result<Stmt, SemanticError> {
        if self.check(TokenKind::If) {
            let column = self.peek().column;
            return self.parse_if(column);
        }
        if self.check(TokenKind::Else) || self.check(TokenKind::Elif) {
            return Err(unmatched_clause(self.peek()));
        }
        if self.check(TokenKind::Reserved) {
            let token = self.peek();
            return Err(SemanticError::parse(format!(
                "unsupported construct '{}', line {}, column {}",
                token.lexeme, token.line, token.column
            )));
        }

        let target = self.parse_expression()?;
        if self.match_token(TokenKind::Equals) {
            assignment_target(&target)?;
            let value = self.parse_expression()?;
            if self.check(TokenKind::Equals) {
                return Err(SemanticError::parse(format!(
                    "multiple assignment targets are not supported (after '{value}')"
                )));
            }
            self.reject_tuple()?;
            return Ok(Stmt::Assign { target, value });
        }
        if self.check(TokenKind::AugAssign) {
            let token = self.consume();
            let symbol = token.lexeme.trim_end_matches('=');
            let op = ArithOp::from_symbol(symbol).ok_or_else(|| {
                SemanticError::parse(format!("unsupported augmented assignment '{}'", token.lexeme))
            })?;
            assignment_target(&target)?;
            let value = self.parse_expression()?;
            self.reject_tuple()?;
            return Ok(Stmt::AugAssign { op, target, value });
        }
        self.reject_tuple()?;
        Ok(Stmt::Expr(target))
    }

    /// Parses an `if` or `elif` clause; `if_column` is where the chain started.
    fn parse_if(&mut self, if_column: usize) -> Result<Stmt, SemanticError> {
        self.consume();
        let test = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':' after if condition")?;
        let body = self.parse_branch(if_column)?;

        let orelse = if self.check_clause(TokenKind::Elif, if_column) {
            Some(Box::new(self.parse_if(if_column)?))
        } else if self.check_clause(TokenKind::Else, if_column) {
            self.expect(TokenKind::Else, "'else'")?;
            self.expect(TokenKind::Colon, "':' after else")?;
            Some(Box::new(self.parse_branch(if_column)?))
        } else {
            None
        };

        Ok(Stmt::If {
            test,
            body: Box::new(body),
            orelse,
        })
    }

    /// Parses one arm, either inline or as a block indented past `if_column`.
    fn parse_branch(&mut self, if_column: usize) -> Result<Stmt, SemanticError> {
        let mut block_column = None;
        if self.check(TokenKind::Newline) {
            while self.match_token(TokenKind::Newline) {}
            let first = self.peek();
            if first.kind == TokenKind::EOF || first.column <= if_column {
                return Err(self.unexpected("an indented block"));
            }
            block_column = Some(first.column);
        }
        let stmt = self.parse_statement()?;
        if self.check(TokenKind::Semicolon) {
            let next = self.peek_at(1);
            if !matches!(next.kind, TokenKind::Newline | TokenKind::EOF) {
                return Err(SemanticError::parse(format!(
                    "if body must contain exactly one statement (found more after '{stmt}')"
                )));
            }
        }
        if let Some(column) = block_column {
            let next = self.skip_newlines_peek();
            if next.kind != TokenKind::EOF && next.column == column {
                if matches!(next.kind, TokenKind::Else | TokenKind::Elif) {
                    return Err(unmatched_clause(next));
                }
                return Err(SemanticError::parse(format!(
                    "if body must contain exactly one statement (line {})",
                    next.line
                )));
            }
        }
        Ok(stmt)
    }

    fn parse_expression(&mut self) -> Result<Expr, SemanticError> {
        let lhs = self.parse_bit_or()?;
        let Some(op) = self.match_compare() else {
            return Ok(lhs);
        };
        let rhs = self.parse_bit_or()?;
        if self.check(TokenKind::DoubleEquals) || self.check(TokenKind::BangEquals) {
            return Err(SemanticError::parse(format!(
                "chained comparisons are not supported (after '{lhs} {} {rhs}')",
                op.symbol()
            )));
        }
        Ok(Expr::compare(op, lhs, rhs))
    }

    fn parse_bit_or(&mut self) -> Result<Expr, SemanticError> {
        let mut expr = self.parse_bit_xor()?;
        while self.match_token(TokenKind::Pipe) {
            let rhs = self.parse_bit_xor()?;
            expr = Expr::binary(ArithOp::Or, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_bit_xor(&mut self) -> Result<Expr, SemanticError> {
        let mut expr = self.parse_bit_and()?;
        while self.match_token(TokenKind::Caret) {
            let rhs = self.parse_bit_and()?;
            expr = Expr::binary(ArithOp::Xor, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_bit_and(&mut self) -> Result<Expr, SemanticError> {
        let mut expr = self.parse_shift()?;
        while self.match_token(TokenKind::Ampersand) {
            let rhs = self.parse_shift()?;
            expr = Expr::binary(ArithOp::And, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_shift(&mut self) -> Result<Expr, SemanticError> {
        let mut expr = self.parse_sum()?;
        loop {
            let op = if self.match_token(TokenKind::ShiftLeft) {
                ArithOp::LeftShift
            } else if self.match_token(TokenKind::ShiftRight) {
                ArithOp::RightShift
            } else {
                break;
            };
            let rhs = self.parse_sum()?;
            expr = Expr::binary(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_sum(&mut self) -> Result<Expr, SemanticError> {
        let mut expr = self.parse_product()?;
        loop {
            let op = if self.match_token(TokenKind::Plus) {
                ArithOp::Add
            } else if self.match_token(TokenKind::Dash) {
                ArithOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_product()?;
            expr = Expr::binary(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_product(&mut self) -> Result<Expr, SemanticError> {
        let mut expr = self.parse_postfix()?;
        while self.match_token(TokenKind::Star) {
            let rhs = self.parse_postfix()?;
            expr = Expr::binary(ArithOp::Multiply, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Expr, SemanticError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.match_token(TokenKind::Dot) {
                let name = self.expect(TokenKind::Identifier, "attribute name after '.'")?;
                expr = Expr::attribute(expr, name.lexeme);
                continue;
            }
            if self.match_token(TokenKind::LParen) {
                let args = self.parse_argument_list()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SemanticError> {
        if self.match_token(TokenKind::LParen) {
            let expr = self.parse_expression()?;
            if self.check(TokenKind::Comma) {
                return Err(SemanticError::parse("tuple expressions are not supported"));
            }
            self.expect(TokenKind::RParen, "')' to close expression")?;
            return Ok(expr);
        }

        if self.check(TokenKind::Number) {
            let token = self.consume();
            return Ok(Expr::Number(parse_integer_literal(&token.lexeme)?));
        }

        if self.check(TokenKind::String) {
            let token = self.consume();
            return Ok(Expr::Str(token.lexeme));
        }

        if self.check(TokenKind::Identifier) {
            let token = self.consume();
            return Ok(Expr::Name(token.lexeme));
        }

        if self.check(TokenKind::Reserved) {
            let token = self.peek();
            return Err(SemanticError::parse(format!(
                "unsupported construct '{}', line {}, column {}",
                token.lexeme, token.line, token.column
            )));
        }

        Err(self.unexpected("expression"))
    }

    fn parse_argument_list(&mut self) -> Result<CallArgs, SemanticError> {
        let mut args = CallArgs::new();
        if self.match_token(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.match_token(TokenKind::Comma) {
                if self.match_token(TokenKind::RParen) {
                    break;
                }
                continue;
            }
            self.expect(TokenKind::RParen, "')' to close argument list")?;
            break;
        }
        Ok(args)
    }

    fn match_compare(&mut self) -> Option<CompareOp> {
        if self.match_token(TokenKind::DoubleEquals) {
            Some(CompareOp::Equal)
        } else if self.match_token(TokenKind::BangEquals) {
            Some(CompareOp::NotEqual)
        } else {
            None
        }
    }

    fn reject_tuple(&self) -> Result<(), SemanticError> {
        if self.check(TokenKind::Comma) {
            return Err(SemanticError::parse(
                "tuple expressions and multiple targets are not supported",
            ));
        }
        Ok(())
    }

    /// `else`/`elif` on the same line binds to the innermost `if`; on a later
    /// line it must sit in the column of the `if` it continues.
    fn check_clause(&mut self, kind: TokenKind, if_column: usize) -> bool {
        if self.check(kind) {
            return true;
        }
        if !self.check(TokenKind::Newline) {
            return false;
        }
        let next = self.skip_newlines_peek();
        if next.kind != kind || next.column != if_column {
            return false;
        }
        while self.match_token(TokenKind::Newline) {}
        true
    }

    fn skip_newlines_peek(&self) -> &Token {
        let mut idx = self.pos;
        while self.tokens[idx].kind == TokenKind::Newline {
            idx += 1;
        }
        &self.tokens[idx]
    }

    fn check_separator(&self) -> bool {
        self.check(TokenKind::Newline) || self.check(TokenKind::Semicolon)
    }

    fn match_separator(&mut self) -> bool {
        self.match_token(TokenKind::Newline) || self.match_token(TokenKind::Semicolon)
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, SemanticError> {
        if self.check(kind) {
            Ok(self.consume())
        } else {
            Err(self.unexpected(context))
        }
    }

    fn unexpected(&self, context: &str) -> SemanticError {
        let token = self.peek();
        let found = match token.kind {
            TokenKind::EOF => "end of input".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            _ => format!("'{}'", token.lexeme),
        };
        SemanticError::parse(format!(
            "expected {context}, found {found}, line {}, column {}",
            token.line, token.column
        ))
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.consume();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, distance: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + distance).min(last)]
    }

    fn consume(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::EOF {
            self.pos += 1;
        }
        token
    }
}

fn unmatched_clause(token: &Token) -> SemanticError {
    SemanticError::parse(format!(
        "'{}' does not belong to any 'if', line {}, column {}",
        token.lexeme, token.line, token.column
    ))
}

fn assignment_target(target: &Expr) -> Result<(), SemanticError> {
    match target {
        Expr::Name(_) | Expr::Attribute { .. } => Ok(()),
        other => Err(SemanticError::parse(format!(
            "cannot assign to '{other}'"
        ))),
    }
}
