//! Statement parsing implementation
//!
//! This module handles parsing of all statement types:
//!
//! - Function definitions: `def name(a, b): ...`
//! - Control flow: `if`/`elif`/`else`, `while`, `for ... in`, each loop with
//!   an optional `else` clause
//! - Exception handling: `try`/`except`/`else`/`finally`, `raise`
//! - Jump statements: `return`, `break`, `continue`, `pass`
//! - Simple statements: assignment, augmented assignment, expression
//!
//! # Grammar
//!
//! ```text
//! statement ::= def_stmt | if_stmt | while_stmt | for_stmt | try_stmt
//!             | simple_stmt NEWLINE
//! block     ::= ':' simple_stmt NEWLINE
//!             | ':' NEWLINE INDENT statement+ DEDENT
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};
use std::rc::Rc;

impl Parser {
    /// Parse a block introduced by ':' (the colon included)
    pub(crate) fn parse_block(&mut self, ctx: &str) -> Result<Vec<Stmt>, ParseError> {
        self.expect_colon(ctx)?;

        if !self.match_token(&Token::Newline(self.current_location())) {
            // Single-line form: `if x: pass`
            let stmt = self.parse_simple_statement()?;
            self.expect_statement_end()?;
            return Ok(vec![stmt]);
        }

        self.expect_token(
            &Token::Indent(self.current_location()),
            "Expected an indented block",
        )?;

        let mut statements = Vec::new();
        while !self.check(&Token::Dedent(self.current_location())) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        self.match_token(&Token::Dedent(self.current_location()));

        Ok(statements)
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();

        if self.match_token(&Token::Def(loc)) {
            return self.parse_function_def(loc);
        }

        if self.match_token(&Token::If(loc)) {
            return self.parse_if_statement(loc);
        }

        if self.match_token(&Token::While(loc)) {
            return self.parse_while_statement(loc);
        }

        if self.match_token(&Token::For(loc)) {
            return self.parse_for_statement(loc);
        }

        if self.match_token(&Token::Try(loc)) {
            return self.parse_try_statement(loc);
        }

        let stmt = self.parse_simple_statement()?;
        self.expect_statement_end()?;
        Ok(stmt)
    }

    fn parse_function_def(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier()?;
        self.expect_token(
            &Token::LParen(self.current_location()),
            "Expected '(' after function name",
        )?;

        let mut params = Vec::new();
        if !self.check(&Token::RParen(self.current_location())) {
            loop {
                let param = self.expect_identifier()?;
                if params.contains(&param) {
                    return self.error(format!(
                        "Duplicate argument '{}' in function definition",
                        param
                    ));
                }
                params.push(param);
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
                if self.check(&Token::RParen(self.current_location())) {
                    break;
                }
            }
        }
        self.expect_rparen("after parameters")?;

        let body = self.parse_block("after function signature")?;

        Ok(Stmt::FunctionDef(Rc::new(FunctionDef {
            name,
            params,
            body,
            location: loc,
        })))
    }

    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let test = self.parse_expression()?;
        let body = self.parse_block("after 'if' condition")?;

        let elif_loc = self.current_location();
        let orelse = if self.match_token(&Token::Elif(elif_loc)) {
            vec![self.parse_if_statement(elif_loc)?]
        } else if self.match_token(&Token::Else(elif_loc)) {
            self.parse_block("after 'else'")?
        } else {
            Vec::new()
        };

        Ok(Stmt::If {
            test,
            body,
            orelse,
            location: loc,
        })
    }

    fn parse_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let test = self.parse_expression()?;
        let body = self.parse_block("after 'while' condition")?;
        let orelse = self.parse_loop_else()?;

        Ok(Stmt::While {
            test,
            body,
            orelse,
            location: loc,
        })
    }

    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let target = self.expect_identifier()?;
        self.expect_token(
            &Token::In(self.current_location()),
            "Expected 'in' after loop variable",
        )?;
        let iter = self.parse_expression()?;
        let body = self.parse_block("after 'for' header")?;
        let orelse = self.parse_loop_else()?;

        Ok(Stmt::For {
            target,
            iter,
            body,
            orelse,
            location: loc,
        })
    }

    fn parse_loop_else(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.match_token(&Token::Else(self.current_location())) {
            self.parse_block("after 'else'")
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_try_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let body = self.parse_block("after 'try'")?;

        let mut handlers = Vec::new();
        loop {
            let handler_loc = self.current_location();
            if !self.match_token(&Token::Except(handler_loc)) {
                break;
            }
            if handlers
                .iter()
                .any(|h: &ExceptHandler| h.pattern == HandlerPattern::Any)
            {
                return Err(ParseError {
                    message: "default 'except:' must be last".to_string(),
                    location: handler_loc,
                });
            }
            handlers.push(self.parse_except_clause(handler_loc)?);
        }

        let orelse = if !handlers.is_empty()
            && self.match_token(&Token::Else(self.current_location()))
        {
            self.parse_block("after 'else'")?
        } else {
            Vec::new()
        };

        let finalbody = if self.match_token(&Token::Finally(self.current_location())) {
            self.parse_block("after 'finally'")?
        } else {
            Vec::new()
        };

        if handlers.is_empty() && finalbody.is_empty() {
            return Err(ParseError {
                message: "Expected 'except' or 'finally' block".to_string(),
                location: loc,
            });
        }

        Ok(Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
            location: loc,
        })
    }

    fn parse_except_clause(&mut self, loc: SourceLocation) -> Result<ExceptHandler, ParseError> {
        let pattern = if self.check(&Token::Colon(self.current_location())) {
            HandlerPattern::Any
        } else if self.match_token(&Token::LParen(self.current_location())) {
            let mut kinds = vec![self.expect_identifier()?];
            while self.match_token(&Token::Comma(self.current_location())) {
                if self.check(&Token::RParen(self.current_location())) {
                    break;
                }
                kinds.push(self.expect_identifier()?);
            }
            self.expect_rparen("after exception kinds")?;
            HandlerPattern::Kinds(kinds)
        } else {
            HandlerPattern::Kinds(vec![self.expect_identifier()?])
        };

        let name = if self.match_token(&Token::As(self.current_location())) {
            Some(self.expect_identifier()?)
        } else {
            None
        };

        let body = self.parse_block("after 'except' clause")?;

        Ok(ExceptHandler {
            pattern,
            name,
            body,
            location: loc,
        })
    }

    /// Parse a simple (single-line) statement without its terminator
    pub(crate) fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();

        if self.match_token(&Token::Pass(loc)) {
            return Ok(Stmt::Pass { location: loc });
        }

        if self.match_token(&Token::Break(loc)) {
            return Ok(Stmt::Break { location: loc });
        }

        if self.match_token(&Token::Continue(loc)) {
            return Ok(Stmt::Continue { location: loc });
        }

        if self.match_token(&Token::Return(loc)) {
            let value = if self.at_statement_end() {
                None
            } else {
                Some(self.parse_expression_or_yield()?)
            };
            return Ok(Stmt::Return {
                value,
                location: loc,
            });
        }

        if self.match_token(&Token::Raise(loc)) {
            let exc = if self.at_statement_end() {
                None
            } else {
                Some(self.parse_expression()?)
            };
            return Ok(Stmt::Raise { exc, location: loc });
        }

        // Assignment forms: NAME '=' value | NAME op= value
        if let Token::Ident(name, _) = self.peek_token() {
            if let Some(next) = self.peek_ahead(1) {
                if matches!(next, Token::Eq(_)) {
                    self.advance();
                    self.advance();
                    let value = self.parse_expression_or_yield()?;
                    return Ok(Stmt::Assign {
                        target: name,
                        value,
                        location: loc,
                    });
                }
                if let Some(op) = augmented_op(next) {
                    self.advance();
                    self.advance();
                    let value = self.parse_expression_or_yield()?;
                    return Ok(Stmt::AugAssign {
                        target: name,
                        op,
                        value,
                        location: loc,
                    });
                }
            }
        }

        let expr = self.parse_expression_or_yield()?;
        if self.check(&Token::Eq(self.current_location())) {
            return self.error("Only simple names can be assigned to");
        }
        Ok(Stmt::Expr {
            expr,
            location: loc,
        })
    }

    pub(crate) fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            Token::Newline(_) | Token::Eof(_) | Token::Dedent(_)
        )
    }
}

fn augmented_op(token: &Token) -> Option<BinOp> {
    match token {
        Token::PlusEq(_) => Some(BinOp::Add),
        Token::MinusEq(_) => Some(BinOp::Sub),
        Token::StarEq(_) => Some(BinOp::Mul),
        Token::StarStarEq(_) => Some(BinOp::Pow),
        Token::SlashEq(_) => Some(BinOp::Div),
        Token::SlashSlashEq(_) => Some(BinOp::FloorDiv),
        Token::PercentEq(_) => Some(BinOp::Mod),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::parse_source;

    fn parse_one(source: &str) -> Stmt {
        let mut program = parse_source(source).unwrap();
        assert_eq!(program.body.len(), 1);
        program.body.remove(0)
    }

    #[test]
    fn test_if_elif_else_chain() {
        let stmt = parse_one("if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n");

        match stmt {
            Stmt::If { orelse, .. } => match &orelse[0] {
                Stmt::If { orelse, .. } => assert_eq!(orelse.len(), 1),
                other => panic!("Expected nested if, got {:?}", other),
            },
            other => panic!("Expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_try_with_handlers_else_finally() {
        let source = "\
try:
    yield
except (TypeError, ValueError) as e:
    pass
except:
    pass
else:
    pass
finally:
    pass
";
        match parse_one(source) {
            Stmt::Try {
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                assert_eq!(handlers.len(), 2);
                assert_eq!(
                    handlers[0].pattern,
                    HandlerPattern::Kinds(vec!["TypeError".into(), "ValueError".into()])
                );
                assert_eq!(handlers[0].name.as_deref(), Some("e"));
                assert_eq!(handlers[1].pattern, HandlerPattern::Any);
                assert_eq!(orelse.len(), 1);
                assert_eq!(finalbody.len(), 1);
            }
            other => panic!("Expected try, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_except_must_be_last() {
        let source = "try:\n    pass\nexcept:\n    pass\nexcept TypeError:\n    pass\n";
        assert!(parse_source(source).is_err());
    }

    #[test]
    fn test_try_requires_handler_or_finally() {
        assert!(parse_source("try:\n    pass\nx = 1\n").is_err());
    }

    #[test]
    fn test_assignment_from_bare_yield() {
        match parse_one("a = yield\n") {
            Stmt::Assign { target, value, .. } => {
                assert_eq!(target, "a");
                assert!(matches!(value, Expr::Yield { value: None, .. }));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_augmented_assignment() {
        match parse_one("y *= second\n") {
            Stmt::AugAssign { target, op, .. } => {
                assert_eq!(target, "y");
                assert_eq!(op, BinOp::Mul);
            }
            other => panic!("Expected augmented assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_for_else() {
        match parse_one("for i in range(3):\n    pass\nelse:\n    pass\n") {
            Stmt::For { target, orelse, .. } => {
                assert_eq!(target, "i");
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("Expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_single_line_block() {
        match parse_one("while x: x -= 1\n") {
            Stmt::While { body, .. } => assert_eq!(body.len(), 1),
            other => panic!("Expected while, got {:?}", other),
        }
    }
}
