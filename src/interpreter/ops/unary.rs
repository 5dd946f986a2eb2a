//! Unary operator evaluation

use crate::interpreter::engine::Interpreter;
use crate::parser::ast::UnOp;
use crate::runtime::exception::{Exception, ExceptionKind};
use crate::runtime::value::Value;

impl Interpreter {
    pub(crate) fn evaluate_unary_op(&self, op: UnOp, operand: &Value) -> Result<Value, Exception> {
        match op {
            UnOp::Neg => self.evaluate_neg_op(operand),
            UnOp::Pos => self.evaluate_pos_op(operand),
            UnOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        }
    }

    fn evaluate_neg_op(&self, operand: &Value) -> Result<Value, Exception> {
        match operand {
            Value::Int(_) | Value::Bool(_) => {
                let n = operand.as_int().unwrap_or(0);
                n.checked_neg().map(Value::Int).ok_or_else(|| {
                    Exception::new(
                        ExceptionKind::ArithmeticError,
                        format!("integer overflow in -{}", n),
                    )
                })
            }
            Value::Float(f) => Ok(Value::Float(-f)),
            _ => Err(bad_operand("-", operand)),
        }
    }

    fn evaluate_pos_op(&self, operand: &Value) -> Result<Value, Exception> {
        match operand {
            Value::Int(_) | Value::Bool(_) => Ok(Value::Int(operand.as_int().unwrap_or(0))),
            Value::Float(f) => Ok(Value::Float(*f)),
            _ => Err(bad_operand("+", operand)),
        }
    }
}

fn bad_operand(symbol: &str, operand: &Value) -> Exception {
    Exception::type_error(format!(
        "bad operand type for unary {}: '{}'",
        symbol,
        operand.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation() {
        let i = Interpreter::new(16);
        assert!(matches!(i.evaluate_unary_op(UnOp::Neg, &Value::Int(2)), Ok(Value::Int(-2))));
        assert!(matches!(i.evaluate_unary_op(UnOp::Neg, &Value::Bool(true)), Ok(Value::Int(-1))));
        let err = i.evaluate_unary_op(UnOp::Neg, &Value::str("x")).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::TypeError);
    }

    #[test]
    fn test_not_uses_truthiness() {
        let i = Interpreter::new(16);
        assert!(matches!(i.evaluate_unary_op(UnOp::Not, &Value::None), Ok(Value::Bool(true))));
        assert!(matches!(
            i.evaluate_unary_op(UnOp::Not, &Value::list(vec![Value::None])),
            Ok(Value::Bool(false))
        ));
    }
}
