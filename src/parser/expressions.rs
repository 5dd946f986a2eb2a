//! Expression parsing with precedence climbing
//!
//! # Operator Precedence (lowest to highest)
//!
//! 1. Conditional: `a if c else b`
//! 2. Logical OR: `or`
//! 3. Logical AND: `and`
//! 4. Logical NOT: `not`
//! 5. Comparison (chained): `<`, `<=`, `>`, `>=`, `==`, `!=`, `in`, `not in`,
//!    `is`, `is not`
//! 6. Additive: `+`, `-`
//! 7. Multiplicative: `*`, `/`, `//`, `%`
//! 8. Unary: `-x`, `+x`
//! 9. Power: `**` (right-associative, binds tighter than a unary on its left)
//! 10. Postfix: calls `f(x)`, attribute access `g.send`
//! 11. Primary: literals, names, `( ... )`, `[ ... ]`
//!
//! `yield` is not an operator: it is only accepted on the right of `=`, as an
//! expression statement, after `return`, or wrapped in parentheses.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse an expression, also accepting an unparenthesised `yield`
    pub(crate) fn parse_expression_or_yield(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        if self.match_token(&Token::Yield(loc)) {
            return self.parse_yield_tail(loc);
        }
        self.parse_expression()
    }

    /// The part of a yield expression after the `yield` keyword
    fn parse_yield_tail(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_token(&Token::From(self.current_location())) {
            let value = self.parse_expression()?;
            return Ok(Expr::YieldFrom {
                value: Box::new(value),
                location: loc,
            });
        }

        let value = if self.at_statement_end()
            || matches!(
                self.peek(),
                Token::RParen(_) | Token::RBracket(_) | Token::Comma(_) | Token::Colon(_)
            ) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        Ok(Expr::Yield {
            value,
            location: loc,
        })
    }

    /// Parse an expression (conditional expression level)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let body = self.parse_or()?;

        if self.match_token(&Token::If(self.current_location())) {
            let test = self.parse_or()?;
            self.expect_token(
                &Token::Else(self.current_location()),
                "Expected 'else' in conditional expression",
            )?;
            let orelse = self.parse_expression()?;
            return Ok(Expr::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
                location: loc,
            });
        }

        Ok(body)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.match_token(&Token::Or(self.current_location())) {
            let loc = left.location();
            let right = self.parse_and()?;
            left = Expr::BoolOp {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;

        while self.match_token(&Token::And(self.current_location())) {
            let loc = left.location();
            let right = self.parse_not()?;
            left = Expr::BoolOp {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        if self.match_token(&Token::Not(loc)) {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnOp::Not,
                operand: Box::new(operand),
                location: loc,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;
        let mut comparisons = Vec::new();

        while let Some(op) = self.match_comparison_op() {
            comparisons.push((op, self.parse_additive()?));
        }

        if comparisons.is_empty() {
            return Ok(left);
        }

        let loc = left.location();
        Ok(Expr::Compare {
            left: Box::new(left),
            comparisons,
            location: loc,
        })
    }

    fn match_comparison_op(&mut self) -> Option<CmpOp> {
        let followed_by_not = matches!(self.peek_ahead(1), Some(Token::Not(_)));
        let followed_by_in = matches!(self.peek_ahead(1), Some(Token::In(_)));

        let (op, width) = match self.peek() {
            Token::EqEq(_) => (CmpOp::Eq, 1),
            Token::NotEq(_) => (CmpOp::Ne, 1),
            Token::Lt(_) => (CmpOp::Lt, 1),
            Token::Le(_) => (CmpOp::Le, 1),
            Token::Gt(_) => (CmpOp::Gt, 1),
            Token::Ge(_) => (CmpOp::Ge, 1),
            Token::In(_) => (CmpOp::In, 1),
            Token::Is(_) if followed_by_not => (CmpOp::IsNot, 2),
            Token::Is(_) => (CmpOp::Is, 1),
            Token::Not(_) if followed_by_in => (CmpOp::NotIn, 2),
            _ => return None,
        };
        for _ in 0..width {
            self.advance();
        }
        Some(op)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek() {
                Token::Plus(_) => BinOp::Add,
                Token::Minus(_) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let loc = left.location();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Token::Star(_) => BinOp::Mul,
                Token::Slash(_) => BinOp::Div,
                Token::SlashSlash(_) => BinOp::FloorDiv,
                Token::Percent(_) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let loc = left.location();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let op = match self.peek() {
            Token::Minus(_) => Some(UnOp::Neg),
            Token::Plus(_) => Some(UnOp::Pos),
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_power();
        };
        self.advance();

        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            location: loc,
        })
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;

        if self.match_token(&Token::StarStar(self.current_location())) {
            let loc = base.location();
            // Right operand may itself be unary: 2 ** -1
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
                location: loc,
            });
        }

        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();
            if self.match_token(&Token::LParen(loc)) {
                let args = self.parse_call_arguments()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    location: loc,
                };
            } else if self.match_token(&Token::Dot(loc)) {
                let attr = self.expect_identifier()?;
                expr = Expr::Attribute {
                    object: Box::new(expr),
                    attr,
                    location: loc,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();

        if self.match_token(&Token::RParen(self.current_location())) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
            if self.check(&Token::RParen(self.current_location())) {
                break;
            }
        }
        self.expect_rparen("after call arguments")?;

        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek_token();
        let loc = token.location();

        let expr = match token {
            Token::IntLiteral(n, _) => Expr::IntLiteral(n, loc),
            Token::FloatLiteral(n, _) => Expr::FloatLiteral(n, loc),
            Token::StringLiteral(s, _) => {
                self.advance();
                // Adjacent literals concatenate: "a" "b"
                let mut text = s;
                while let Token::StringLiteral(more, _) = self.peek_token() {
                    self.advance();
                    text.push_str(&more);
                }
                return Ok(Expr::StringLiteral(text, loc));
            }
            Token::True(_) => Expr::BoolLiteral(true, loc),
            Token::False(_) => Expr::BoolLiteral(false, loc),
            Token::None(_) => Expr::NoneLiteral(loc),
            Token::Ident(name, _) => Expr::Name(name, loc),
            Token::LParen(_) => {
                self.advance();
                let inner = if self.match_token(&Token::Yield(self.current_location())) {
                    self.parse_yield_tail(loc)?
                } else {
                    self.parse_expression()?
                };
                self.expect_rparen("after parenthesized expression")?;
                return Ok(inner);
            }
            Token::LBracket(_) => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(&Token::RBracket(self.current_location())) {
                    elements.push(self.parse_expression()?);
                    if !self.match_token(&Token::Comma(self.current_location())) {
                        break;
                    }
                }
                self.expect_token(
                    &Token::RBracket(self.current_location()),
                    "Expected ']' after list elements",
                )?;
                return Ok(Expr::List {
                    elements,
                    location: loc,
                });
            }
            Token::Yield(_) => {
                return self.error("'yield' inside an expression must be parenthesized");
            }
            other => {
                return self.error(format!("Unexpected {} in expression", other));
            }
        };

        self.advance();
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::parse_source;

    fn parse_expr(source: &str) -> Expr {
        let program = parse_source(&format!("{}\n", source)).unwrap();
        match program.body.into_iter().next() {
            Some(Stmt::Expr { expr, .. }) => expr,
            Some(Stmt::Assign { value, .. }) => value,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_mul_over_add() {
        match parse_expr("1 + 2 * 3") {
            Expr::Binary {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. })),
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_power_binds_tighter_than_unary() {
        match parse_expr("-2 ** 2") {
            Expr::Unary {
                op: UnOp::Neg,
                operand,
                ..
            } => assert!(matches!(*operand, Expr::Binary { op: BinOp::Pow, .. })),
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_chained_comparison_with_yield() {
        match parse_expr("x = 1 <= (yield) < 5") {
            Expr::Compare { comparisons, .. } => {
                assert_eq!(comparisons.len(), 2);
                assert_eq!(comparisons[0].0, CmpOp::Le);
                assert!(matches!(comparisons[0].1, Expr::Yield { value: None, .. }));
                assert_eq!(comparisons[1].0, CmpOp::Lt);
            }
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_in_and_is_not() {
        match parse_expr("a not in b") {
            Expr::Compare { comparisons, .. } => assert_eq!(comparisons[0].0, CmpOp::NotIn),
            other => panic!("Unexpected {:?}", other),
        }
        match parse_expr("a is not None") {
            Expr::Compare { comparisons, .. } => assert_eq!(comparisons[0].0, CmpOp::IsNot),
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_method_call_on_name() {
        match parse_expr("g.send(1)") {
            Expr::Call { func, args, .. } => {
                assert!(matches!(*func, Expr::Attribute { ref attr, .. } if attr == "send"));
                assert_eq!(args.len(), 1);
            }
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_yield_from() {
        assert!(matches!(
            parse_expr("yield from range(5)"),
            Expr::YieldFrom { .. }
        ));
    }

    #[test]
    fn test_conditional_expression() {
        assert!(matches!(parse_expr("a if b else c"), Expr::IfExp { .. }));
    }

    #[test]
    fn test_unparenthesized_yield_in_operand_rejected() {
        assert!(parse_source("x = 1 + yield\n").is_err());
    }
}
