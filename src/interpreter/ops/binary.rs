use crate::interpreter::constants::MAX_SEQUENCE_LEN;
use crate::interpreter::engine::Interpreter;
use crate::parser::ast::{BinOp, CmpOp};
use crate::runtime::exception::{Exception, ExceptionKind};
use crate::runtime::value::Value;
use std::cmp::Ordering;
use std::rc::Rc;

fn unsupported(op: &str, left: &Value, right: &Value) -> Exception {
    Exception::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    ))
}

fn overflow(a: i64, op: BinOp, b: i64) -> Exception {
    Exception::new(
        ExceptionKind::ArithmeticError,
        format!("integer overflow in {} {} {}", a, op.symbol(), b),
    )
}

fn int_pair(left: &Value, right: &Value) -> Option<(i64, i64)> {
    match (left, right) {
        (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
            Some((left.as_int()?, right.as_int()?))
        }
        _ => None,
    }
}

fn float_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    Some((left.as_float()?, right.as_float()?))
}

/// Length of `len * times` repetitions, refusing results over [`MAX_SEQUENCE_LEN`]
fn repeated_len(len: usize, times: i64) -> Result<usize, Exception> {
    let count = usize::try_from(times).unwrap_or(0);
    len.checked_mul(count)
        .filter(|total| *total <= MAX_SEQUENCE_LEN)
        .ok_or_else(|| {
            Exception::new(
                ExceptionKind::ArithmeticError,
                format!("repeated sequence too long ({} * {})", len, times),
            )
        })
}

fn repeat(items: &[Value], times: i64) -> Result<Vec<Value>, Exception> {
    let mut out = Vec::with_capacity(repeated_len(items.len(), times)?);
    for _ in 0..usize::try_from(times).unwrap_or(0) {
        out.extend(items.iter().cloned());
    }
    Ok(out)
}

impl Interpreter {
    pub(crate) fn evaluate_binary_op(
        &self,
        op: BinOp,
        left: &Value,
        right: &Value,
    ) -> Result<Value, Exception> {
        match op {
            BinOp::Add => self.checked_add_values(left, right),
            BinOp::Sub => self.checked_sub_values(left, right),
            BinOp::Mul => self.checked_mul_values(left, right),
            BinOp::Div => self.checked_div_values(left, right),
            BinOp::FloorDiv => self.checked_floor_div_values(left, right),
            BinOp::Mod => self.checked_mod_values(left, right),
            BinOp::Pow => self.checked_pow_values(left, right),
        }
    }

    #[inline]
    pub(crate) fn checked_add_values(&self, left: &Value, right: &Value) -> Result<Value, Exception> {
        if let Some((a, b)) = int_pair(left, right) {
            return a
                .checked_add(b)
                .map(Value::Int)
                .ok_or_else(|| overflow(a, BinOp::Add, b));
        }
        if let Some((a, b)) = float_pair(left, right) {
            return Ok(Value::Float(a + b));
        }

        match (left, right) {
            (Value::Str(a), Value::Str(b)) => {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                Ok(Value::Str(Rc::from(joined)))
            }
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::list(items))
            }
            (Value::Str(_), _) => Err(Exception::type_error(format!(
                "can only concatenate str (not \"{}\") to str",
                right.type_name()
            ))),
            _ => Err(unsupported("+", left, right)),
        }
    }

    #[inline]
    pub(crate) fn checked_sub_values(&self, left: &Value, right: &Value) -> Result<Value, Exception> {
        if let Some((a, b)) = int_pair(left, right) {
            return a
                .checked_sub(b)
                .map(Value::Int)
                .ok_or_else(|| overflow(a, BinOp::Sub, b));
        }
        if let Some((a, b)) = float_pair(left, right) {
            return Ok(Value::Float(a - b));
        }
        Err(unsupported("-", left, right))
    }

    #[inline]
    pub(crate) fn checked_mul_values(&self, left: &Value, right: &Value) -> Result<Value, Exception> {
        if let Some((a, b)) = int_pair(left, right) {
            return a
                .checked_mul(b)
                .map(Value::Int)
                .ok_or_else(|| overflow(a, BinOp::Mul, b));
        }
        if let Some((a, b)) = float_pair(left, right) {
            return Ok(Value::Float(a * b));
        }

        match (left, right) {
            (Value::Str(s), n) | (n, Value::Str(s)) if n.as_int().is_some() => {
                let times = n.as_int().unwrap_or(0);
                repeated_len(s.len(), times)?;
                Ok(Value::Str(Rc::from(s.repeat(usize::try_from(times).unwrap_or(0)))))
            }
            (Value::List(items), n) | (n, Value::List(items)) if n.as_int().is_some() => {
                Ok(Value::list(repeat(&items.borrow(), n.as_int().unwrap_or(0))?))
            }
            _ => Err(unsupported("*", left, right)),
        }
    }

    #[inline]
    pub(crate) fn checked_div_values(&self, left: &Value, right: &Value) -> Result<Value, Exception> {
        let Some((a, b)) = float_pair(left, right) else {
            return Err(unsupported("/", left, right));
        };
        if b == 0.0 {
            return Err(Exception::zero_division("division by zero"));
        }
        Ok(Value::Float(a / b))
    }

    #[inline]
    pub(crate) fn checked_floor_div_values(
        &self,
        left: &Value,
        right: &Value,
    ) -> Result<Value, Exception> {
        if let Some((a, b)) = int_pair(left, right) {
            if b == 0 {
                return Err(Exception::zero_division("integer division or modulo by zero"));
            }
            let q = a
                .checked_div(b)
                .ok_or_else(|| overflow(a, BinOp::FloorDiv, b))?;
            let floored = if a % b != 0 && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            };
            return Ok(Value::Int(floored));
        }
        if let Some((a, b)) = float_pair(left, right) {
            if b == 0.0 {
                return Err(Exception::zero_division("float floor division by zero"));
            }
            return Ok(Value::Float((a / b).floor()));
        }
        Err(unsupported("//", left, right))
    }

    /// Remainder takes the sign of the divisor
    #[inline]
    pub(crate) fn checked_mod_values(&self, left: &Value, right: &Value) -> Result<Value, Exception> {
        if let Some((a, b)) = int_pair(left, right) {
            if b == 0 {
                return Err(Exception::zero_division("integer modulo by zero"));
            }
            // i64::MIN % -1 overflows but is exactly divisible
            let r = match a.checked_rem(b) {
                Some(r) => r,
                None if b == -1 => 0,
                None => return Err(overflow(a, BinOp::Mod, b)),
            };
            return Ok(Value::Int(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }));
        }
        if let Some((a, b)) = float_pair(left, right) {
            if b == 0.0 {
                return Err(Exception::zero_division("float modulo"));
            }
            let r = a % b;
            return Ok(Value::Float(if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }));
        }
        Err(unsupported("%", left, right))
    }

    #[inline]
    pub(crate) fn checked_pow_values(&self, left: &Value, right: &Value) -> Result<Value, Exception> {
        if let Some((a, b)) = int_pair(left, right) {
            if b >= 0 {
                let exp = u32::try_from(b).map_err(|_| overflow(a, BinOp::Pow, b))?;
                return a
                    .checked_pow(exp)
                    .map(Value::Int)
                    .ok_or_else(|| overflow(a, BinOp::Pow, b));
            }
            if a == 0 {
                return Err(Exception::zero_division(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            return Ok(Value::Float((a as f64).powf(b as f64)));
        }
        if let Some((a, b)) = float_pair(left, right) {
            return Ok(Value::Float(a.powf(b)));
        }
        Err(unsupported("** or pow()", left, right))
    }

    fn order_values(&self, op: CmpOp, left: &Value, right: &Value) -> Result<Ordering, Exception> {
        let ordering = match (left, right) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => match int_pair(left, right) {
                Some((a, b)) => Some(a.cmp(&b)),
                None => float_pair(left, right).and_then(|(a, b)| a.partial_cmp(&b)),
            },
        };
        ordering.ok_or_else(|| {
            Exception::type_error(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ))
        })
    }

    fn contains_value(&self, container: &Value, item: &Value) -> Result<bool, Exception> {
        match container {
            Value::List(items) => Ok(items.borrow().iter().any(|v| v.equals(item))),
            Value::Range(range) => Ok(item.as_int().is_some_and(|n| range.contains(n))),
            Value::Str(haystack) => match item {
                Value::Str(needle) => Ok(haystack.contains(&**needle)),
                _ => Err(Exception::type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    item.type_name()
                ))),
            },
            _ => Err(Exception::type_error(format!(
                "argument of type '{}' is not iterable",
                container.type_name()
            ))),
        }
    }

    /// One link of a comparison chain
    pub(crate) fn compare_values(
        &self,
        op: CmpOp,
        left: &Value,
        right: &Value,
    ) -> Result<bool, Exception> {
        Ok(match op {
            CmpOp::Eq => left.equals(right),
            CmpOp::Ne => !left.equals(right),
            CmpOp::Is => left.is_same(right),
            CmpOp::IsNot => !left.is_same(right),
            CmpOp::In => self.contains_value(right, left)?,
            CmpOp::NotIn => !self.contains_value(right, left)?,
            CmpOp::Lt => self.order_values(op, left, right)? == Ordering::Less,
            CmpOp::Le => self.order_values(op, left, right)? != Ordering::Greater,
            CmpOp::Gt => self.order_values(op, left, right)? == Ordering::Greater,
            CmpOp::Ge => self.order_values(op, left, right)? != Ordering::Less,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp() -> Interpreter {
        Interpreter::new(16)
    }

    #[test]
    fn test_floor_division_and_modulo_follow_divisor_sign() {
        let i = interp();
        let div = i.checked_floor_div_values(&Value::Int(-7), &Value::Int(2)).unwrap();
        let rem = i.checked_mod_values(&Value::Int(-7), &Value::Int(2)).unwrap();
        assert!(matches!(div, Value::Int(-4)));
        assert!(matches!(rem, Value::Int(1)));
    }

    #[test]
    fn test_true_division_is_float() {
        let i = interp();
        let q = i.checked_div_values(&Value::Int(7), &Value::Int(2)).unwrap();
        assert!(matches!(q, Value::Float(f) if f == 3.5));
    }

    #[test]
    fn test_division_by_zero() {
        let i = interp();
        let err = i.checked_div_values(&Value::Int(1), &Value::Int(0)).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ZeroDivisionError);
    }

    #[test]
    fn test_overflow_is_arithmetic_error() {
        let i = interp();
        let err = i
            .checked_mul_values(&Value::Int(i64::MAX), &Value::Int(2))
            .unwrap_err();
        assert!(err.kind.is_subclass_of(ExceptionKind::ArithmeticError));
    }

    #[test]
    fn test_string_concat_and_repeat() {
        let i = interp();
        let s = i.checked_add_values(&Value::str("ab"), &Value::str("c")).unwrap();
        assert_eq!(s.to_string(), "abc");
        let r = i.checked_mul_values(&Value::Int(3), &Value::str("x")).unwrap();
        assert_eq!(r.to_string(), "xxx");
        let err = i.checked_add_values(&Value::str("a"), &Value::Int(1)).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::TypeError);
    }

    #[test]
    fn test_huge_repetition_is_an_exception() {
        let i = interp();
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let err = i.checked_mul_values(&list, &Value::Int(i64::MAX)).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ArithmeticError);
        let err = i
            .checked_mul_values(&Value::str("ab"), &Value::Int(i64::MAX))
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ArithmeticError);
        let empty = i.checked_mul_values(&list, &Value::Int(-5)).unwrap();
        assert_eq!(empty.to_string(), "[]");
    }

    #[test]
    fn test_min_modulo_minus_one() {
        let i = interp();
        let r = i.checked_mod_values(&Value::Int(i64::MIN), &Value::Int(-1)).unwrap();
        assert!(matches!(r, Value::Int(0)));
    }

    #[test]
    fn test_pow() {
        let i = interp();
        assert!(matches!(
            i.checked_pow_values(&Value::Int(-3), &Value::Int(2)).unwrap(),
            Value::Int(9)
        ));
        assert!(matches!(
            i.checked_pow_values(&Value::Int(2), &Value::Int(-1)).unwrap(),
            Value::Float(f) if f == 0.5
        ));
    }

    #[test]
    fn test_comparisons() {
        let i = interp();
        assert!(i.compare_values(CmpOp::Le, &Value::Int(1), &Value::Float(1.0)).unwrap());
        assert!(i.compare_values(CmpOp::Lt, &Value::str("a"), &Value::str("b")).unwrap());
        assert!(i
            .compare_values(CmpOp::In, &Value::Int(2), &Value::list(vec![Value::Int(2)]))
            .unwrap());
        assert!(i.compare_values(CmpOp::Lt, &Value::Int(1), &Value::str("b")).is_err());
    }
}
