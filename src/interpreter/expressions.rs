//! Expression evaluation
//!
//! Expressions reaching the interpreter are already free of suspension
//! points, so evaluation is a plain recursive walk.

use crate::generator::ir::{Constant, Expr};
use crate::interpreter::engine::Interpreter;
use crate::parser::ast::BoolOp;
use crate::runtime::exception::{Exception, ExceptionKind};
use crate::runtime::frame::Frame;
use crate::runtime::value::{BoundMethod, Method, Value};
use std::rc::Rc;

impl Interpreter {
    pub(crate) fn evaluate_expr(&mut self, expr: &Expr, frame: &Frame) -> Result<Value, Exception> {
        match expr {
            Expr::Const(constant) => Ok(constant_value(constant)),
            Expr::Local { slot, name } => frame.load(*slot, name),
            Expr::Global(name) => self.lookup_global(name),
            Expr::List(elements) => {
                let items = elements
                    .iter()
                    .map(|e| self.evaluate_expr(e, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(items))
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate_expr(left, frame)?;
                let right = self.evaluate_expr(right, frame)?;
                self.evaluate_binary_op(*op, &left, &right)
            }
            Expr::Unary { op, operand } => {
                let operand = self.evaluate_expr(operand, frame)?;
                self.evaluate_unary_op(*op, &operand)
            }
            Expr::BoolOp { op, left, right } => {
                // Short-circuit: the result is one of the operands
                let left = self.evaluate_expr(left, frame)?;
                let decided = match op {
                    BoolOp::And => !left.is_truthy(),
                    BoolOp::Or => left.is_truthy(),
                };
                if decided {
                    Ok(left)
                } else {
                    self.evaluate_expr(right, frame)
                }
            }
            Expr::Compare { left, comparisons } => {
                let mut current = self.evaluate_expr(left, frame)?;
                for (op, operand) in comparisons {
                    let next = self.evaluate_expr(operand, frame)?;
                    if !self.compare_values(*op, &current, &next)? {
                        return Ok(Value::Bool(false));
                    }
                    current = next;
                }
                Ok(Value::Bool(true))
            }
            Expr::IfExp { test, body, orelse } => {
                if self.evaluate_expr(test, frame)?.is_truthy() {
                    self.evaluate_expr(body, frame)
                } else {
                    self.evaluate_expr(orelse, frame)
                }
            }
            Expr::Call { func, args } => {
                let func = self.evaluate_expr(func, frame)?;
                let args = args
                    .iter()
                    .map(|a| self.evaluate_expr(a, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_value(func, args)
            }
            Expr::Attribute { object, attr } => {
                let object = self.evaluate_expr(object, frame)?;
                get_attribute(object, attr)
            }
        }
    }
}

fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::None => Value::None,
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(n) => Value::Int(*n),
        Constant::Float(n) => Value::Float(*n),
        Constant::Str(s) => Value::Str(Rc::clone(s)),
    }
}

fn get_attribute(object: Value, attr: &str) -> Result<Value, Exception> {
    let method = match (&object, attr) {
        (Value::Generator(_), "send") => Some(Method::Send),
        (Value::Generator(_), "throw") => Some(Method::Throw),
        (Value::Generator(_), "close") => Some(Method::Close),
        (Value::List(_), "append") => Some(Method::Append),
        _ => None,
    };
    match method {
        Some(method) => Ok(Value::BoundMethod(Rc::new(BoundMethod {
            receiver: object,
            method,
        }))),
        None => Err(Exception::new(
            ExceptionKind::AttributeError,
            format!("'{}' object has no attribute '{}'", object.type_name(), attr),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ir::Target;
    use crate::parser::ast::{BinOp, CmpOp};

    fn int(n: i64) -> Expr {
        Expr::Const(Constant::Int(n))
    }

    #[test]
    fn test_unbound_local() {
        let mut interp = Interpreter::new(16);
        let frame = Frame::new(1);
        let err = interp
            .evaluate_expr(
                &Expr::load(&Target::Local {
                    slot: 0,
                    name: Rc::from("x"),
                }),
                &frame,
            )
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::UnboundLocalError);
    }

    #[test]
    fn test_missing_global() {
        let mut interp = Interpreter::new(16);
        let err = interp
            .evaluate_expr(&Expr::Global(Rc::from("nope")), &Frame::default())
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::NameError);
    }

    #[test]
    fn test_chained_comparison() {
        let mut interp = Interpreter::new(16);
        let chain = |middle| Expr::Compare {
            left: Box::new(int(1)),
            comparisons: vec![(CmpOp::Le, int(middle)), (CmpOp::Lt, int(5))],
        };
        let frame = Frame::default();
        assert!(matches!(interp.evaluate_expr(&chain(3), &frame), Ok(Value::Bool(true))));
        assert!(matches!(interp.evaluate_expr(&chain(100), &frame), Ok(Value::Bool(false))));
    }

    #[test]
    fn test_bool_op_returns_operand() {
        let mut interp = Interpreter::new(16);
        let expr = Expr::BoolOp {
            op: BoolOp::Or,
            left: Box::new(int(0)),
            right: Box::new(Expr::Binary {
                op: BinOp::Add,
                left: Box::new(int(1)),
                right: Box::new(int(1)),
            }),
        };
        assert!(matches!(interp.evaluate_expr(&expr, &Frame::default()), Ok(Value::Int(2))));
    }

    #[test]
    fn test_unknown_attribute() {
        let err = get_attribute(Value::Int(1), "send").unwrap_err();
        assert_eq!(err.kind, ExceptionKind::AttributeError);
    }
}
