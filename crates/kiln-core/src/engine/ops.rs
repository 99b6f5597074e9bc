//! Operator semantics over [`Value`]: arithmetic, comparison, membership,
//! indexing, and iteration. Shared by the evaluator and by builtins that
//! reuse the same rules (`sum`, `divmod`, `pow`).

use super::fault::Fault;
use super::parse::{BinOp, CmpOp, UnaryOp};
use super::value::{dict_get, range_len, Value};

/// Limit on materialized sequence repetition, so `'x' * 10**12` faults
/// instead of exhausting memory.
const MAX_REPEAT_LEN: usize = 10_000_000;

/// Integer view of a value: bools count as 0/1, floats do not coerce.
pub(crate) fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Int(i) => Some(*i),
        _ => None,
    }
}

/// Float view of a value: bools and ints widen.
pub(crate) fn as_float(v: &Value) -> Option<f64> {
    match v {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn unsupported(op: BinOp, a: &Value, b: &Value) -> Fault {
    Fault::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        a.type_name(),
        b.type_name()
    ))
}

pub(crate) fn binary(op: BinOp, a: &Value, b: &Value) -> Result<Value, Fault> {
    match op {
        BinOp::Add => add(a, b),
        BinOp::Sub => arith_int_float(op, a, b, i64::checked_sub, |x, y| x - y),
        BinOp::Mul => mul(a, b),
        BinOp::Div => div(a, b),
        BinOp::FloorDiv => floordiv(a, b),
        BinOp::Mod => modulo(a, b),
        BinOp::Pow => power(a, b),
    }
}

fn arith_int_float(
    op: BinOp,
    a: &Value,
    b: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, Fault> {
    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        return int_op(x, y)
            .map(Value::Int)
            .ok_or_else(|| Fault::overflow("integer overflow"));
    }
    if let (Some(x), Some(y)) = (as_float(a), as_float(b)) {
        return Ok(Value::Float(float_op(x, y)));
    }
    Err(unsupported(op, a, b))
}

fn add(a: &Value, b: &Value) -> Result<Value, Fault> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Value::Str(format!("{x}{y}"))),
        (Value::List(x), Value::List(y)) => {
            let mut out = x.clone();
            out.extend(y.iter().cloned());
            Ok(Value::List(out))
        }
        (Value::Tuple(x), Value::Tuple(y)) => {
            let mut out = x.clone();
            out.extend(y.iter().cloned());
            Ok(Value::Tuple(out))
        }
        _ => arith_int_float(BinOp::Add, a, b, i64::checked_add, |x, y| x + y),
    }
}

fn mul(a: &Value, b: &Value) -> Result<Value, Fault> {
    // Sequence repetition accepts the count on either side.
    let repeat = match (a, b) {
        (Value::Str(_) | Value::List(_) | Value::Tuple(_), _) => as_int(b).map(|n| (a, n)),
        (_, Value::Str(_) | Value::List(_) | Value::Tuple(_)) => as_int(a).map(|n| (b, n)),
        _ => None,
    };
    if let Some((seq, n)) = repeat {
        let n = n.max(0) as usize;
        let unit = seq.py_len().unwrap_or(0);
        if unit.saturating_mul(n) > MAX_REPEAT_LEN {
            return Err(Fault::overflow("repeated sequence is too large"));
        }
        return Ok(match seq {
            Value::Str(s) => Value::Str(s.repeat(n)),
            Value::List(items) => Value::List(repeat_items(items, n)),
            Value::Tuple(items) => Value::Tuple(repeat_items(items, n)),
            _ => unreachable!(),
        });
    }
    arith_int_float(BinOp::Mul, a, b, i64::checked_mul, |x, y| x * y)
}

fn repeat_items(items: &[Value], n: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len() * n);
    for _ in 0..n {
        out.extend(items.iter().cloned());
    }
    out
}

fn div(a: &Value, b: &Value) -> Result<Value, Fault> {
    match (as_float(a), as_float(b)) {
        (Some(x), Some(y)) => {
            if y == 0.0 {
                Err(Fault::zero_division("division by zero"))
            } else {
                Ok(Value::Float(x / y))
            }
        }
        _ => Err(unsupported(BinOp::Div, a, b)),
    }
}

/// Floor division on i64, rounding toward negative infinity.
pub(crate) fn int_floordiv(a: i64, b: i64) -> Result<i64, Fault> {
    if b == 0 {
        return Err(Fault::zero_division("integer division or modulo by zero"));
    }
    let (a, b) = (a as i128, b as i128);
    let mut q = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        q -= 1;
    }
    i64::try_from(q).map_err(|_| Fault::overflow("integer overflow"))
}

/// Modulo on i64, result takes the sign of the divisor.
pub(crate) fn int_mod(a: i64, b: i64) -> Result<i64, Fault> {
    if b == 0 {
        return Err(Fault::zero_division("integer division or modulo by zero"));
    }
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

fn floordiv(a: &Value, b: &Value) -> Result<Value, Fault> {
    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        return int_floordiv(x, y).map(Value::Int);
    }
    match (as_float(a), as_float(b)) {
        (Some(x), Some(y)) => {
            if y == 0.0 {
                Err(Fault::zero_division("float floor division by zero"))
            } else {
                Ok(Value::Float((x / y).floor()))
            }
        }
        _ => Err(unsupported(BinOp::FloorDiv, a, b)),
    }
}

fn modulo(a: &Value, b: &Value) -> Result<Value, Fault> {
    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        return int_mod(x, y).map(Value::Int);
    }
    match (as_float(a), as_float(b)) {
        (Some(x), Some(y)) => {
            if y == 0.0 {
                Err(Fault::zero_division("float modulo"))
            } else {
                Ok(Value::Float(x - y * (x / y).floor()))
            }
        }
        _ => Err(unsupported(BinOp::Mod, a, b)),
    }
}

/// Integer exponentiation by squaring with overflow checking.
pub(crate) fn int_pow(base: i64, exp: i64) -> Result<i64, Fault> {
    debug_assert!(exp >= 0);
    let mut acc: i128 = 1;
    let mut base = base as i128;
    let mut exp = exp as u64;
    let limit = i64::MAX as i128;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.checked_mul(base).ok_or_else(overflow_pow)?;
            if acc.abs() > limit {
                return Err(overflow_pow());
            }
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base).ok_or_else(overflow_pow)?;
            if base.abs() > limit && exp > 0 && acc != 0 {
                return Err(overflow_pow());
            }
        }
    }
    i64::try_from(acc).map_err(|_| overflow_pow())
}

fn overflow_pow() -> Fault {
    Fault::overflow("integer exponentiation overflow")
}

fn power(a: &Value, b: &Value) -> Result<Value, Fault> {
    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        if y >= 0 {
            return int_pow(x, y).map(Value::Int);
        }
        if x == 0 {
            return Err(Fault::zero_division(
                "0.0 cannot be raised to a negative power",
            ));
        }
        return Ok(Value::Float((x as f64).powf(y as f64)));
    }
    match (as_float(a), as_float(b)) {
        (Some(x), Some(y)) => {
            if x == 0.0 && y < 0.0 {
                return Err(Fault::zero_division(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if x < 0.0 && y.fract() != 0.0 {
                return Err(Fault::value_error(
                    "complex results are not supported",
                ));
            }
            Ok(Value::Float(x.powf(y)))
        }
        _ => Err(unsupported(BinOp::Pow, a, b)),
    }
}

pub(crate) fn unary(op: UnaryOp, v: &Value) -> Result<Value, Fault> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!v.py_bool())),
        UnaryOp::Neg => {
            if let Some(i) = as_int(v) {
                i.checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| Fault::overflow("integer overflow"))
            } else if let Value::Float(f) = v {
                Ok(Value::Float(-f))
            } else {
                Err(Fault::type_error(format!(
                    "bad operand type for unary -: '{}'",
                    v.type_name()
                )))
            }
        }
        UnaryOp::Pos => {
            if let Some(i) = as_int(v) {
                Ok(Value::Int(i))
            } else if let Value::Float(f) = v {
                Ok(Value::Float(*f))
            } else {
                Err(Fault::type_error(format!(
                    "bad operand type for unary +: '{}'",
                    v.type_name()
                )))
            }
        }
    }
}

pub(crate) fn compare(op: CmpOp, a: &Value, b: &Value) -> Result<bool, Fault> {
    match op {
        CmpOp::Eq => Ok(a.py_eq(b)),
        CmpOp::NotEq => Ok(!a.py_eq(b)),
        CmpOp::In => contains(a, b),
        CmpOp::NotIn => contains(a, b).map(|found| !found),
        _ => {
            let ordering = a.py_cmp(b).ok_or_else(|| {
                Fault::type_error(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    op.symbol(),
                    a.type_name(),
                    b.type_name()
                ))
            })?;
            Ok(match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::LtEq => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::GtEq => ordering.is_ge(),
                _ => unreachable!(),
            })
        }
    }
}

/// Membership test: `item in container`.
pub(crate) fn contains(item: &Value, container: &Value) -> Result<bool, Fault> {
    match container {
        Value::Str(s) => match item {
            Value::Str(needle) => Ok(s.contains(needle.as_str())),
            _ => Err(Fault::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                item.type_name()
            ))),
        },
        Value::List(items) | Value::Tuple(items) => Ok(items.iter().any(|v| v.py_eq(item))),
        Value::Dict(entries) => Ok(dict_get(entries, item).is_some()),
        Value::Range { start, stop, step } => {
            let candidate = match item {
                Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
                other => as_int(other),
            };
            let Some(x) = candidate else {
                return Ok(false);
            };
            let in_span = if *step > 0 {
                *start <= x && x < *stop
            } else {
                *stop < x && x <= *start
            };
            Ok(in_span && (x - start) % step == 0)
        }
        _ => Err(Fault::type_error(format!(
            "argument of type '{}' is not iterable",
            container.type_name()
        ))),
    }
}

/// Subscript access: `container[index]`.
pub(crate) fn index(container: &Value, idx: &Value) -> Result<Value, Fault> {
    match container {
        Value::List(items) => sequence_index(items, idx, "list").cloned(),
        Value::Tuple(items) => sequence_index(items, idx, "tuple").cloned(),
        Value::Str(s) => {
            let Some(i) = as_int(idx) else {
                return Err(Fault::type_error("string indices must be integers"));
            };
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(i, chars.len())
                .ok_or_else(|| Fault::index_error("string index out of range"))?;
            Ok(Value::Str(chars[i].to_string()))
        }
        Value::Dict(entries) => {
            if !idx.is_hashable() {
                return Err(Fault::type_error(format!(
                    "unhashable type: '{}'",
                    idx.type_name()
                )));
            }
            dict_get(entries, idx)
                .cloned()
                .ok_or_else(|| Fault::key_error(idx.py_repr()))
        }
        Value::Range { start, stop, step } => {
            let Some(i) = as_int(idx) else {
                return Err(Fault::type_error("range indices must be integers"));
            };
            let len = range_len(*start, *stop, *step);
            let i = normalize_index(i, len)
                .ok_or_else(|| Fault::index_error("range object index out of range"))?;
            Ok(Value::Int(start + i as i64 * step))
        }
        _ => Err(Fault::type_error(format!(
            "'{}' object is not subscriptable",
            container.type_name()
        ))),
    }
}

fn sequence_index<'a>(items: &'a [Value], idx: &Value, kind: &str) -> Result<&'a Value, Fault> {
    let Some(i) = as_int(idx) else {
        return Err(Fault::type_error(format!(
            "{kind} indices must be integers, not {}",
            idx.type_name()
        )));
    };
    let i = normalize_index(i, items.len())
        .ok_or_else(|| Fault::index_error(format!("{kind} index out of range")))?;
    Ok(&items[i])
}

/// Map a possibly-negative index onto `0..len`.
pub(crate) fn normalize_index(i: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let i = if i < 0 { i + len } else { i };
    if (0..len).contains(&i) {
        Some(i as usize)
    } else {
        None
    }
}

/// Iterator over the elements a value denotes.
pub enum ValueIter {
    Items(std::vec::IntoIter<Value>),
    Range { next: i128, stop: i128, step: i128 },
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::Items(iter) => iter.next(),
            ValueIter::Range { next, stop, step } => {
                let more = if *step > 0 { *next < *stop } else { *next > *stop };
                if !more {
                    return None;
                }
                let current = *next;
                *next += *step;
                Some(Value::Int(current as i64))
            }
        }
    }
}

/// Iterate a value, or fault when it is not iterable. Strings yield
/// one-character strings, dicts yield their keys, ranges stay lazy.
pub fn iter_value(v: &Value) -> Result<ValueIter, Fault> {
    match v {
        Value::Str(s) => Ok(ValueIter::Items(
            s.chars()
                .map(|c| Value::Str(c.to_string()))
                .collect::<Vec<_>>()
                .into_iter(),
        )),
        Value::List(items) | Value::Tuple(items) => {
            Ok(ValueIter::Items(items.clone().into_iter()))
        }
        Value::Dict(entries) => Ok(ValueIter::Items(
            entries
                .iter()
                .map(|(k, _)| k.clone())
                .collect::<Vec<_>>()
                .into_iter(),
        )),
        Value::Range { start, stop, step } => Ok(ValueIter::Range {
            next: *start as i128,
            stop: *stop as i128,
            step: *step as i128,
        }),
        other => Err(Fault::type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(
            binary(BinOp::Add, &Value::Int(40), &Value::Int(2)).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            binary(BinOp::Mul, &Value::Int(6), &Value::Int(7)).unwrap(),
            Value::Int(42)
        );
    }

    #[test]
    fn test_true_division_always_floats() {
        assert_eq!(
            binary(BinOp::Div, &Value::Int(7), &Value::Int(2)).unwrap(),
            Value::Float(3.5)
        );
    }

    #[test]
    fn test_floor_division_rounds_down() {
        assert_eq!(int_floordiv(-7, 2).unwrap(), -4);
        assert_eq!(int_floordiv(7, -2).unwrap(), -4);
        assert_eq!(int_floordiv(7, 2).unwrap(), 3);
    }

    #[test]
    fn test_modulo_takes_divisor_sign() {
        assert_eq!(int_mod(-7, 3).unwrap(), 2);
        assert_eq!(int_mod(7, -3).unwrap(), -2);
        assert_eq!(int_mod(7, 3).unwrap(), 1);
    }

    #[test]
    fn test_division_by_zero_faults() {
        let fault = binary(BinOp::Div, &Value::Int(1), &Value::Int(0)).unwrap_err();
        assert_eq!(fault.to_string(), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_string_concat_and_repeat() {
        assert_eq!(
            binary(BinOp::Add, &Value::Str("ab".into()), &Value::Str("c".into())).unwrap(),
            Value::Str("abc".into())
        );
        assert_eq!(
            binary(BinOp::Mul, &Value::Str("ab".into()), &Value::Int(3)).unwrap(),
            Value::Str("ababab".into())
        );
        assert_eq!(
            binary(BinOp::Mul, &Value::Int(0), &Value::Str("x".into())).unwrap(),
            Value::Str(String::new())
        );
    }

    #[test]
    fn test_mixed_type_add_faults() {
        let fault = binary(BinOp::Add, &Value::Int(1), &Value::Str("a".into())).unwrap_err();
        assert_eq!(
            fault.to_string(),
            "TypeError: unsupported operand type(s) for +: 'int' and 'str'"
        );
    }

    #[test]
    fn test_int_pow() {
        assert_eq!(int_pow(2, 10).unwrap(), 1024);
        assert_eq!(int_pow(-3, 3).unwrap(), -27);
        assert!(int_pow(10, 40).is_err());
    }

    #[test]
    fn test_negative_exponent_gives_float() {
        assert_eq!(
            binary(BinOp::Pow, &Value::Int(2), &Value::Int(-1)).unwrap(),
            Value::Float(0.5)
        );
    }

    #[test]
    fn test_membership() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert!(contains(&Value::Float(2.0), &list).unwrap());
        assert!(contains(&Value::Str("ell".into()), &Value::Str("hello".into())).unwrap());
        let range = Value::Range { start: 0, stop: 10, step: 2 };
        assert!(contains(&Value::Int(4), &range).unwrap());
        assert!(!contains(&Value::Int(5), &range).unwrap());
    }

    #[test]
    fn test_negative_indexing() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(index(&list, &Value::Int(-1)).unwrap(), Value::Int(3));
        let fault = index(&list, &Value::Int(3)).unwrap_err();
        assert_eq!(fault.to_string(), "IndexError: list index out of range");
    }

    #[test]
    fn test_dict_missing_key_repr() {
        let d = Value::Dict(vec![(Value::Str("a".into()), Value::Int(1))]);
        let fault = index(&d, &Value::Str("b".into())).unwrap_err();
        assert_eq!(fault.to_string(), "KeyError: 'b'");
    }

    #[test]
    fn test_range_iteration() {
        let range = Value::Range { start: 5, stop: 0, step: -2 };
        let items: Vec<Value> = iter_value(&range).unwrap().collect();
        assert_eq!(items, vec![Value::Int(5), Value::Int(3), Value::Int(1)]);
    }

    #[test]
    fn test_huge_repeat_faults() {
        let fault =
            binary(BinOp::Mul, &Value::Str("x".into()), &Value::Int(100_000_000)).unwrap_err();
        assert_eq!(
            fault.to_string(),
            "OverflowError: repeated sequence is too large"
        );
    }
}
