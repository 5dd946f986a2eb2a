//! Expression lowering
//!
//! Expressions without suspension points convert one-to-one into [`ir::Expr`].
//! An expression containing `yield` is taken apart: operands evaluated before
//! the `yield` are spilled into temporaries, the `yield` ends the current
//! segment, and the rest of the expression continues in the resume segment,
//! reading the sent value from the receive temporary.
//!
//! ```text
//! x = 2 + (yield y)       [$t0 = 2 ; yield y ⇢ $t1]  →  [x = $t0 + $t1]
//! ```

use super::decompose::Builder;
use super::descriptor::{CodeKind, Op, Terminator};
use super::errors::DecomposeError;
use super::ir::{self, Constant};
use crate::parser::ast::{self, BoolOp, SourceLocation};
use std::rc::Rc;
use tracing::warn;

impl Builder {
    /// Lower an expression, splitting segments at every suspension point inside it
    pub(super) fn lower_expr(&mut self, expr: &ast::Expr) -> Result<ir::Expr, DecomposeError> {
        if !expr.contains_yield() {
            return self.convert(expr);
        }

        match expr {
            ast::Expr::Yield { value, location } => {
                self.lower_yield(value.as_deref(), *location, true)
            }
            ast::Expr::YieldFrom { value, location } => self.lower_yield_from(value, *location),
            ast::Expr::List { elements, .. } => Ok(ir::Expr::List(self.lower_sequence(elements)?)),
            ast::Expr::Binary {
                op, left, right, ..
            } => {
                let mut operands = self.lower_sequence(&[(**left).clone(), (**right).clone()])?;
                let right = operands.pop();
                let left = operands.pop();
                match (left, right) {
                    (Some(left), Some(right)) => Ok(ir::Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }),
                    _ => Err(DecomposeError::internal("binary operand lost")),
                }
            }
            ast::Expr::Unary { op, operand, .. } => Ok(ir::Expr::Unary {
                op: *op,
                operand: Box::new(self.lower_expr(operand)?),
            }),
            ast::Expr::BoolOp {
                op, left, right, ..
            } => self.lower_bool_op(*op, left, right),
            ast::Expr::IfExp {
                test, body, orelse, ..
            } => self.lower_if_exp(test, body, orelse),
            ast::Expr::Compare {
                left, comparisons, ..
            } => self.lower_compare(left, comparisons),
            ast::Expr::Call { func, args, .. } => {
                let mut parts = Vec::with_capacity(args.len() + 1);
                parts.push((**func).clone());
                parts.extend(args.iter().cloned());
                let mut lowered = self.lower_sequence(&parts)?.into_iter();
                let func = lowered
                    .next()
                    .ok_or_else(|| DecomposeError::internal("call target lost"))?;
                Ok(ir::Expr::Call {
                    func: Box::new(func),
                    args: lowered.collect(),
                })
            }
            ast::Expr::Attribute { object, attr, .. } => Ok(ir::Expr::Attribute {
                object: Box::new(self.lower_expr(object)?),
                attr: Rc::from(attr.as_str()),
            }),
            ast::Expr::IntLiteral(..)
            | ast::Expr::FloatLiteral(..)
            | ast::Expr::StringLiteral(..)
            | ast::Expr::BoolLiteral(..)
            | ast::Expr::NoneLiteral(_)
            | ast::Expr::Name(..) => self.convert(expr),
        }
    }

    /// End the segment with a suspension. With `receive`, the sent value is
    /// stored in a temporary which becomes the value of the expression.
    pub(super) fn lower_yield(
        &mut self,
        value: Option<&ast::Expr>,
        location: SourceLocation,
        receive: bool,
    ) -> Result<ir::Expr, DecomposeError> {
        if self.kind == CodeKind::Module {
            return Err(DecomposeError::OutsideFunction {
                keyword: "yield",
                location,
            });
        }

        let value = match value {
            Some(expr) => Some(self.lower_expr(expr)?),
            None => None,
        };
        let receive = receive.then(|| self.fresh_temp("y"));
        let resume = self.new_segment();

        self.location = location;
        self.terminate(Terminator::Suspend {
            value,
            resume,
            receive: receive.clone(),
        });
        self.switch_to(resume);

        Ok(match receive {
            Some(target) => ir::Expr::load(&target),
            None => ir::Expr::none(),
        })
    }

    fn lower_yield_from(
        &mut self,
        value: &ast::Expr,
        location: SourceLocation,
    ) -> Result<ir::Expr, DecomposeError> {
        if self.kind == CodeKind::Module {
            return Err(DecomposeError::OutsideFunction {
                keyword: "yield from",
                location,
            });
        }
        warn!(
            function = %self.name,
            line = location.line,
            "'yield from' compiles but fails when reached"
        );
        let value = self.lower_expr(value)?;
        self.location = location;
        self.emit(Op::Delegate(value));
        Ok(ir::Expr::none())
    }

    /// Lower operands left to right. Everything evaluated before the last
    /// suspending operand is spilled so it keeps its value across the suspension.
    fn lower_sequence(&mut self, exprs: &[ast::Expr]) -> Result<Vec<ir::Expr>, DecomposeError> {
        let last_yield = exprs.iter().rposition(ast::Expr::contains_yield);
        let mut lowered = Vec::with_capacity(exprs.len());
        for (i, expr) in exprs.iter().enumerate() {
            let value = match last_yield {
                Some(last) if i < last => {
                    let value = self.lower_expr(expr)?;
                    self.spill(value)
                }
                _ => self.lower_expr(expr)?,
            };
            lowered.push(value);
        }
        Ok(lowered)
    }

    fn spill(&mut self, value: ir::Expr) -> ir::Expr {
        if matches!(value, ir::Expr::Const(_)) {
            return value;
        }
        let temp = self.fresh_temp("t");
        self.emit(Op::Store {
            target: temp.clone(),
            value,
        });
        ir::Expr::load(&temp)
    }

    fn lower_bool_op(
        &mut self,
        op: BoolOp,
        left: &ast::Expr,
        right: &ast::Expr,
    ) -> Result<ir::Expr, DecomposeError> {
        let left = self.lower_expr(left)?;
        if !right.contains_yield() {
            return Ok(ir::Expr::BoolOp {
                op,
                left: Box::new(left),
                right: Box::new(self.convert(right)?),
            });
        }

        // the right operand only suspends when it is evaluated
        let result = self.fresh_temp("t");
        self.emit(Op::Store {
            target: result.clone(),
            value: left,
        });
        let rhs = self.new_segment();
        let join = self.new_segment();
        let (then, otherwise) = match op {
            BoolOp::And => (rhs, join),
            BoolOp::Or => (join, rhs),
        };
        self.terminate(Terminator::Branch {
            test: ir::Expr::load(&result),
            then,
            otherwise,
        });

        self.switch_to(rhs);
        let right = self.lower_expr(right)?;
        self.emit(Op::Store {
            target: result.clone(),
            value: right,
        });
        self.switch_to(join);
        Ok(ir::Expr::load(&result))
    }

    fn lower_if_exp(
        &mut self,
        test: &ast::Expr,
        body: &ast::Expr,
        orelse: &ast::Expr,
    ) -> Result<ir::Expr, DecomposeError> {
        let test = self.lower_expr(test)?;
        if !body.contains_yield() && !orelse.contains_yield() {
            return Ok(ir::Expr::IfExp {
                test: Box::new(test),
                body: Box::new(self.convert(body)?),
                orelse: Box::new(self.convert(orelse)?),
            });
        }

        let result = self.fresh_temp("t");
        let then = self.new_segment();
        let otherwise = self.new_segment();
        let join = self.new_segment();
        self.terminate(Terminator::Branch {
            test,
            then,
            otherwise,
        });

        for (start, branch) in [(then, body), (otherwise, orelse)] {
            self.switch_to(start);
            let value = self.lower_expr(branch)?;
            self.emit(Op::Store {
                target: result.clone(),
                value,
            });
            self.terminate(Terminator::Jump(join));
        }

        self.switch_to(join);
        Ok(ir::Expr::load(&result))
    }

    /// `a < b < c` evaluates `b` once and stops at the first false link, so a
    /// suspending operand is only reached when the links before it hold.
    fn lower_compare(
        &mut self,
        left: &ast::Expr,
        comparisons: &[(ast::CmpOp, ast::Expr)],
    ) -> Result<ir::Expr, DecomposeError> {
        if comparisons.len() == 1 || comparisons.iter().all(|(_, e)| !e.contains_yield()) {
            let mut operands = vec![left.clone()];
            operands.extend(comparisons.iter().map(|(_, e)| e.clone()));
            let mut lowered = self.lower_sequence(&operands)?.into_iter();
            let left = lowered
                .next()
                .ok_or_else(|| DecomposeError::internal("comparison operand lost"))?;
            return Ok(ir::Expr::Compare {
                left: Box::new(left),
                comparisons: comparisons.iter().map(|(op, _)| *op).zip(lowered).collect(),
            });
        }

        let result = self.fresh_temp("t");
        let join = self.new_segment();
        let lowered = self.lower_expr(left)?;
        let mut previous = self.spill(lowered);

        for (i, (op, operand)) in comparisons.iter().enumerate() {
            let lowered = self.lower_expr(operand)?;
            let current = self.spill(lowered);
            self.emit(Op::Store {
                target: result.clone(),
                value: ir::Expr::Compare {
                    left: Box::new(previous),
                    comparisons: vec![(*op, current.clone())],
                },
            });
            if i + 1 < comparisons.len() {
                let next = self.new_segment();
                self.terminate(Terminator::Branch {
                    test: ir::Expr::load(&result),
                    then: next,
                    otherwise: join,
                });
                self.switch_to(next);
            }
            previous = current;
        }

        self.switch_to(join);
        Ok(ir::Expr::load(&result))
    }

    /// Straight conversion of an expression with no suspension points
    pub(super) fn convert(&mut self, expr: &ast::Expr) -> Result<ir::Expr, DecomposeError> {
        Ok(match expr {
            ast::Expr::IntLiteral(n, _) => ir::Expr::Const(Constant::Int(*n)),
            ast::Expr::FloatLiteral(n, _) => ir::Expr::Const(Constant::Float(*n)),
            ast::Expr::StringLiteral(s, _) => ir::Expr::Const(Constant::Str(Rc::from(s.as_str()))),
            ast::Expr::BoolLiteral(b, _) => ir::Expr::Const(Constant::Bool(*b)),
            ast::Expr::NoneLiteral(_) => ir::Expr::none(),
            ast::Expr::Name(name, _) => ir::Expr::load(&self.resolve(name)),
            ast::Expr::List { elements, .. } => ir::Expr::List(
                elements
                    .iter()
                    .map(|e| self.convert(e))
                    .collect::<Result<_, _>>()?,
            ),
            ast::Expr::Binary {
                op, left, right, ..
            } => ir::Expr::Binary {
                op: *op,
                left: Box::new(self.convert(left)?),
                right: Box::new(self.convert(right)?),
            },
            ast::Expr::Unary { op, operand, .. } => ir::Expr::Unary {
                op: *op,
                operand: Box::new(self.convert(operand)?),
            },
            ast::Expr::BoolOp {
                op, left, right, ..
            } => ir::Expr::BoolOp {
                op: *op,
                left: Box::new(self.convert(left)?),
                right: Box::new(self.convert(right)?),
            },
            ast::Expr::Compare {
                left, comparisons, ..
            } => ir::Expr::Compare {
                left: Box::new(self.convert(left)?),
                comparisons: comparisons
                    .iter()
                    .map(|(op, e)| Ok((*op, self.convert(e)?)))
                    .collect::<Result<_, DecomposeError>>()?,
            },
            ast::Expr::IfExp {
                test, body, orelse, ..
            } => ir::Expr::IfExp {
                test: Box::new(self.convert(test)?),
                body: Box::new(self.convert(body)?),
                orelse: Box::new(self.convert(orelse)?),
            },
            ast::Expr::Call { func, args, .. } => ir::Expr::Call {
                func: Box::new(self.convert(func)?),
                args: args
                    .iter()
                    .map(|e| self.convert(e))
                    .collect::<Result<_, _>>()?,
            },
            ast::Expr::Attribute { object, attr, .. } => ir::Expr::Attribute {
                object: Box::new(self.convert(object)?),
                attr: Rc::from(attr.as_str()),
            },
            ast::Expr::Yield { .. } | ast::Expr::YieldFrom { .. } => {
                return Err(DecomposeError::internal(
                    "suspension point reached straight conversion",
                ))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::decompose::decompose_function;
    use super::super::descriptor::{GeneratorDescriptor, Terminator};
    use super::*;
    use crate::parser::ast::Stmt;
    use crate::parser::parse_source;

    fn compile(source: &str) -> Rc<GeneratorDescriptor> {
        let program = parse_source(source).unwrap();
        let Stmt::FunctionDef(def) = &program.body[0] else {
            panic!("expected def");
        };
        decompose_function(def).unwrap()
    }

    fn stores(d: &GeneratorDescriptor) -> Vec<String> {
        d.segments
            .iter()
            .flat_map(|s| &s.instrs)
            .map(|i| i.op.to_string())
            .collect()
    }

    #[test]
    fn test_left_operand_spilled_before_yield() {
        let d = compile("def g(a):\n    x = a + (yield)\n");
        let ops = stores(&d);
        assert!(ops.iter().any(|op| op.starts_with("$t") && op.ends_with("= a")));
        assert_eq!(d.suspension_points(), 1);
    }

    #[test]
    fn test_constant_operand_not_spilled() {
        let d = compile("def g():\n    x = 2 + (yield)\n");
        assert!(stores(&d).iter().all(|op| !op.starts_with("$t")));
    }

    #[test]
    fn test_aug_assign_saves_target_first() {
        let d = compile("def g():\n    x = 1\n    x += (yield)\n");
        let ops = stores(&d);
        let saved = ops.iter().position(|op| op.ends_with("= x")).unwrap();
        let stored = ops.iter().rposition(|op| op.starts_with("x = ")).unwrap();
        assert!(saved < stored);
    }

    #[test]
    fn test_short_circuit_yield_is_branched() {
        let d = compile("def g(a):\n    return a or (yield)\n");
        assert!(d
            .segments
            .iter()
            .any(|s| matches!(s.terminator, Terminator::Branch { .. })));
    }

    #[test]
    fn test_chained_comparison_with_yield() {
        let d = compile("def g():\n    return 1 <= (yield) < 5\n");
        assert_eq!(d.suspension_points(), 1);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_yield_inside_yield() {
        let d = compile("def g():\n    yield (yield 1)\n");
        assert_eq!(d.suspension_points(), 2);
    }

    #[test]
    fn test_yield_in_call_arguments() {
        let d = compile("def g():\n    print((yield), (yield))\n");
        assert_eq!(d.suspension_points(), 2);
        let ops = stores(&d);
        assert!(ops.contains(&"$t0 = print".to_string()));
        assert!(ops.contains(&"$t0($t2, $y3)".to_string()));
    }
}
