//! The capability set: allow-listed built-in operations available to
//! fragments. Immutable after startup. Note that an allow-list is not a
//! genuine security boundary; the set here is simply everything the
//! fragment language needs for ordinary computation.

use indexmap::IndexMap;

use super::fault::Fault;
use super::ops::{self, iter_value};
use super::parse::BinOp;
use super::value::{dict_set, Value};
use super::EvalSink;

/// One allow-listed built-in operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    Str,
    Repr,
    Type,
    Bool,
    Int,
    Float,
    List,
    Tuple,
    Dict,
    Abs,
    Min,
    Max,
    Sum,
    Round,
    Sorted,
    Reversed,
    Range,
    Any,
    All,
    Divmod,
    Pow,
    Chr,
    Ord,
    Hex,
    Bin,
    Oct,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Repr => "repr",
            Builtin::Type => "type",
            Builtin::Bool => "bool",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Dict => "dict",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Round => "round",
            Builtin::Sorted => "sorted",
            Builtin::Reversed => "reversed",
            Builtin::Range => "range",
            Builtin::Any => "any",
            Builtin::All => "all",
            Builtin::Divmod => "divmod",
            Builtin::Pow => "pow",
            Builtin::Chr => "chr",
            Builtin::Ord => "ord",
            Builtin::Hex => "hex",
            Builtin::Bin => "bin",
            Builtin::Oct => "oct",
        }
    }

    /// Invoke the builtin. Only `print` accepts keyword arguments.
    pub fn call(
        self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        sink: &mut EvalSink,
    ) -> Result<Value, Fault> {
        if self != Builtin::Print && !kwargs.is_empty() {
            return Err(Fault::type_error(format!(
                "{}() takes no keyword arguments",
                self.name()
            )));
        }
        match self {
            Builtin::Print => print(args, kwargs, sink),
            Builtin::Len => len(args),
            Builtin::Str => {
                arity("str", &args, 0, 1)?;
                Ok(Value::Str(args.first().map(Value::py_str).unwrap_or_default()))
            }
            Builtin::Repr => {
                arity("repr", &args, 1, 1)?;
                Ok(Value::Str(args[0].py_repr()))
            }
            Builtin::Type => {
                arity("type", &args, 1, 1)?;
                Ok(Value::Str(args[0].type_name().to_string()))
            }
            Builtin::Bool => {
                arity("bool", &args, 0, 1)?;
                Ok(Value::Bool(args.first().is_some_and(Value::py_bool)))
            }
            Builtin::Int => int_cast(args),
            Builtin::Float => float_cast(args),
            Builtin::List => {
                arity("list", &args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::List(Vec::new())),
                    Some(v) => Ok(Value::List(iter_value(v)?.collect())),
                }
            }
            Builtin::Tuple => {
                arity("tuple", &args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::Tuple(Vec::new())),
                    Some(v) => Ok(Value::Tuple(iter_value(v)?.collect())),
                }
            }
            Builtin::Dict => dict_cast(args),
            Builtin::Abs => abs(args),
            Builtin::Min => min_max(args, false),
            Builtin::Max => min_max(args, true),
            Builtin::Sum => sum(args),
            Builtin::Round => round(args),
            Builtin::Sorted => sorted(args),
            Builtin::Reversed => reversed(args),
            Builtin::Range => range(args),
            Builtin::Any => any_all(args, false),
            Builtin::All => any_all(args, true),
            Builtin::Divmod => divmod(args),
            Builtin::Pow => pow(args),
            Builtin::Chr => chr_fn(args),
            Builtin::Ord => ord_fn(args),
            Builtin::Hex => int_format(args, "hex", "0x", 16),
            Builtin::Bin => int_format(args, "bin", "0b", 2),
            Builtin::Oct => int_format(args, "oct", "0o", 8),
        }
    }
}

/// The fixed, allow-listed capability set. Immutable after construction.
#[derive(Debug, Clone)]
pub struct CapabilitySet {
    entries: IndexMap<String, Builtin>,
}

impl CapabilitySet {
    /// The standard set: every [`Builtin`].
    pub fn standard() -> Self {
        const ALL: &[Builtin] = &[
            Builtin::Print,
            Builtin::Len,
            Builtin::Str,
            Builtin::Repr,
            Builtin::Type,
            Builtin::Bool,
            Builtin::Int,
            Builtin::Float,
            Builtin::List,
            Builtin::Tuple,
            Builtin::Dict,
            Builtin::Abs,
            Builtin::Min,
            Builtin::Max,
            Builtin::Sum,
            Builtin::Round,
            Builtin::Sorted,
            Builtin::Reversed,
            Builtin::Range,
            Builtin::Any,
            Builtin::All,
            Builtin::Divmod,
            Builtin::Pow,
            Builtin::Chr,
            Builtin::Ord,
            Builtin::Hex,
            Builtin::Bin,
            Builtin::Oct,
        ];
        let entries = ALL
            .iter()
            .map(|b| (b.name().to_string(), *b))
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<Builtin> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), Fault> {
    if args.len() >= min && args.len() <= max {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {min} argument{}", if min == 1 { "" } else { "s" })
    } else {
        format!("from {min} to {max} arguments")
    };
    Err(Fault::type_error(format!(
        "{name}() takes {expected} ({} given)",
        args.len()
    )))
}

fn print(
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    sink: &mut EvalSink,
) -> Result<Value, Fault> {
    let mut sep = " ".to_string();
    let mut end = "\n".to_string();
    for (key, value) in kwargs {
        let slot = match key.as_str() {
            "sep" => &mut sep,
            "end" => &mut end,
            other => {
                return Err(Fault::type_error(format!(
                    "'{other}' is an invalid keyword argument for print()"
                )));
            }
        };
        match value {
            Value::None => {} // None means "keep the default"
            Value::Str(s) => *slot = s,
            other => {
                return Err(Fault::type_error(format!(
                    "{key} must be None or a string, not {}",
                    other.type_name()
                )));
            }
        }
    }
    let rendered: Vec<String> = args.iter().map(Value::py_str).collect();
    sink.stdout.push_str(&rendered.join(&sep));
    sink.stdout.push_str(&end);
    Ok(Value::None)
}

fn len(args: Vec<Value>) -> Result<Value, Fault> {
    arity("len", &args, 1, 1)?;
    match args[0].py_len() {
        Some(n) => Ok(Value::Int(n as i64)),
        None => Err(Fault::type_error(format!(
            "object of type '{}' has no len()",
            args[0].type_name()
        ))),
    }
}

fn int_cast(args: Vec<Value>) -> Result<Value, Fault> {
    arity("int", &args, 0, 1)?;
    let Some(v) = args.into_iter().next() else {
        return Ok(Value::Int(0));
    };
    match v {
        Value::Bool(b) => Ok(Value::Int(i64::from(b))),
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Float(f) => {
            if f.is_nan() {
                Err(Fault::value_error("cannot convert float NaN to integer"))
            } else if f.is_infinite() {
                Err(Fault::overflow("cannot convert float infinity to integer"))
            } else if f >= -(2f64.powi(63)) && f < 2f64.powi(63) {
                Ok(Value::Int(f.trunc() as i64))
            } else {
                Err(Fault::overflow("float too large to convert to integer"))
            }
        }
        Value::Str(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
            cleaned.parse::<i64>().map(Value::Int).map_err(|_| {
                Fault::value_error(format!(
                    "invalid literal for int() with base 10: {}",
                    Value::Str(s).py_repr()
                ))
            })
        }
        other => Err(Fault::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn float_cast(args: Vec<Value>) -> Result<Value, Fault> {
    arity("float", &args, 0, 1)?;
    let Some(v) = args.into_iter().next() else {
        return Ok(Value::Float(0.0));
    };
    match v {
        Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::Float(f) => Ok(Value::Float(f)),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            Fault::value_error(format!(
                "could not convert string to float: {}",
                Value::Str(s.clone()).py_repr()
            ))
        }),
        other => Err(Fault::type_error(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn dict_cast(args: Vec<Value>) -> Result<Value, Fault> {
    arity("dict", &args, 0, 1)?;
    let Some(v) = args.into_iter().next() else {
        return Ok(Value::Dict(Vec::new()));
    };
    match v {
        Value::Dict(entries) => Ok(Value::Dict(entries)),
        Value::List(items) | Value::Tuple(items) => {
            let mut entries = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                let pair = match item {
                    Value::List(p) | Value::Tuple(p) if p.len() == 2 => p,
                    other => {
                        return Err(Fault::type_error(format!(
                            "cannot convert dictionary update sequence element #{i} \
                             ('{}' is not a pair)",
                            other.type_name()
                        )));
                    }
                };
                let mut pair = pair.into_iter();
                let (key, value) = (pair.next().unwrap_or(Value::None), pair.next().unwrap_or(Value::None));
                dict_set(&mut entries, key, value)?;
            }
            Ok(Value::Dict(entries))
        }
        other => Err(Fault::type_error(format!(
            "dict() argument must be a dict or a sequence of pairs, not '{}'",
            other.type_name()
        ))),
    }
}

fn abs(args: Vec<Value>) -> Result<Value, Fault> {
    arity("abs", &args, 1, 1)?;
    match &args[0] {
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| Fault::overflow("integer overflow")),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(Fault::type_error(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

fn min_max(args: Vec<Value>, want_max: bool) -> Result<Value, Fault> {
    let name = if want_max { "max" } else { "min" };
    if args.is_empty() {
        return Err(Fault::type_error(format!(
            "{name} expected at least 1 argument, got 0"
        )));
    }
    let items: Vec<Value> = if args.len() == 1 {
        iter_value(&args[0])?.collect()
    } else {
        args
    };
    if items.is_empty() {
        return Err(Fault::value_error(format!(
            "{name}() arg is an empty sequence"
        )));
    }
    let mut best = items[0].clone();
    for item in &items[1..] {
        let ordering = item.py_cmp(&best).ok_or_else(|| {
            Fault::type_error(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                if want_max { ">" } else { "<" },
                item.type_name(),
                best.type_name()
            ))
        })?;
        if (want_max && ordering.is_gt()) || (!want_max && ordering.is_lt()) {
            best = item.clone();
        }
    }
    Ok(best)
}

fn sum(args: Vec<Value>) -> Result<Value, Fault> {
    arity("sum", &args, 1, 2)?;
    let mut iter = args.into_iter();
    let iterable = iter.next().unwrap_or(Value::None);
    let start = iter.next().unwrap_or(Value::Int(0));
    if matches!(start, Value::Str(_)) {
        return Err(Fault::type_error(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }
    let mut acc = start;
    for item in iter_value(&iterable)? {
        acc = ops::binary(BinOp::Add, &acc, &item)?;
    }
    Ok(acc)
}

/// Round half to even, the rounding `round` uses.
fn half_even(x: f64) -> f64 {
    let floor = x.floor();
    let diff = x - floor;
    if diff > 0.5 {
        floor + 1.0
    } else if diff < 0.5 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    }
}

fn round(args: Vec<Value>) -> Result<Value, Fault> {
    arity("round", &args, 1, 2)?;
    let ndigits = match args.get(1) {
        None | Some(Value::None) => None,
        Some(v) => Some(ops::as_int(v).ok_or_else(|| {
            Fault::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                v.type_name()
            ))
        })?),
    };
    let x = match &args[0] {
        Value::Bool(b) => return Ok(Value::Int(i64::from(*b))),
        Value::Int(i) => return Ok(Value::Int(*i)),
        Value::Float(f) => *f,
        other => {
            return Err(Fault::type_error(format!(
                "type {} doesn't define __round__ method",
                other.type_name()
            )));
        }
    };
    match ndigits {
        None => {
            if x.is_nan() {
                return Err(Fault::value_error("cannot convert float NaN to integer"));
            }
            if x.is_infinite() {
                return Err(Fault::overflow("cannot convert float infinity to integer"));
            }
            let rounded = half_even(x);
            if rounded >= -(2f64.powi(63)) && rounded < 2f64.powi(63) {
                Ok(Value::Int(rounded as i64))
            } else {
                Err(Fault::overflow("rounded value too large to represent"))
            }
        }
        Some(nd) => {
            if !x.is_finite() {
                return Ok(Value::Float(x));
            }
            let scale = 10f64.powi(nd.clamp(-320, 320) as i32);
            Ok(Value::Float(half_even(x * scale) / scale))
        }
    }
}

fn sorted(args: Vec<Value>) -> Result<Value, Fault> {
    arity("sorted", &args, 1, 1)?;
    let mut items: Vec<Value> = iter_value(&args[0])?.collect();
    let mut incomparable: Option<(String, String)> = None;
    items.sort_by(|a, b| {
        a.py_cmp(b).unwrap_or_else(|| {
            if incomparable.is_none() {
                incomparable = Some((a.type_name().to_string(), b.type_name().to_string()));
            }
            std::cmp::Ordering::Equal
        })
    });
    if let Some((left, right)) = incomparable {
        return Err(Fault::type_error(format!(
            "'<' not supported between instances of '{left}' and '{right}'"
        )));
    }
    Ok(Value::List(items))
}

fn reversed(args: Vec<Value>) -> Result<Value, Fault> {
    arity("reversed", &args, 1, 1)?;
    if matches!(args[0], Value::Dict(_)) {
        return Err(Fault::type_error("argument to reversed() must be a sequence"));
    }
    let mut items: Vec<Value> = iter_value(&args[0])
        .map_err(|_| Fault::type_error("argument to reversed() must be a sequence"))?
        .collect();
    items.reverse();
    Ok(Value::List(items))
}

fn range(args: Vec<Value>) -> Result<Value, Fault> {
    arity("range", &args, 1, 3)?;
    let mut nums = Vec::with_capacity(args.len());
    for v in &args {
        nums.push(ops::as_int(v).ok_or_else(|| {
            Fault::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                v.type_name()
            ))
        })?);
    }
    let (start, stop, step) = match nums.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => unreachable!(),
    };
    if step == 0 {
        return Err(Fault::value_error("range() arg 3 must not be zero"));
    }
    Ok(Value::Range { start, stop, step })
}

fn any_all(args: Vec<Value>, want_all: bool) -> Result<Value, Fault> {
    arity(if want_all { "all" } else { "any" }, &args, 1, 1)?;
    for item in iter_value(&args[0])? {
        if item.py_bool() != want_all {
            return Ok(Value::Bool(!want_all));
        }
    }
    Ok(Value::Bool(want_all))
}

fn divmod(args: Vec<Value>) -> Result<Value, Fault> {
    arity("divmod", &args, 2, 2)?;
    if let (Some(a), Some(b)) = (ops::as_int(&args[0]), ops::as_int(&args[1])) {
        let q = ops::int_floordiv(a, b)?;
        let r = ops::int_mod(a, b)?;
        return Ok(Value::Tuple(vec![Value::Int(q), Value::Int(r)]));
    }
    match (ops::as_float(&args[0]), ops::as_float(&args[1])) {
        (Some(a), Some(b)) => {
            if b == 0.0 {
                return Err(Fault::zero_division("float divmod()"));
            }
            let q = (a / b).floor();
            Ok(Value::Tuple(vec![Value::Float(q), Value::Float(a - q * b)]))
        }
        _ => Err(Fault::type_error(format!(
            "unsupported operand type(s) for divmod(): '{}' and '{}'",
            args[0].type_name(),
            args[1].type_name()
        ))),
    }
}

fn pow(args: Vec<Value>) -> Result<Value, Fault> {
    arity("pow", &args, 2, 3)?;
    if args.len() == 2 {
        return ops::binary(BinOp::Pow, &args[0], &args[1]);
    }
    let ints: Option<Vec<i64>> = args.iter().map(ops::as_int).collect();
    let Some(ints) = ints else {
        return Err(Fault::type_error(
            "pow() 3rd argument not allowed unless all arguments are integers",
        ));
    };
    let (base, exp, modulus) = (ints[0], ints[1], ints[2]);
    if exp < 0 {
        return Err(Fault::value_error(
            "pow() 2nd argument cannot be negative when 3rd argument specified",
        ));
    }
    if modulus == 0 {
        return Err(Fault::value_error("pow() 3rd argument cannot be 0"));
    }
    Ok(Value::Int(mod_pow(base, exp, modulus)))
}

fn mod_pow(base: i64, exp: i64, modulus: i64) -> i64 {
    let m = modulus as i128;
    let mut acc: i128 = 1i128.rem_euclid(m);
    let mut base = (base as i128).rem_euclid(m);
    let mut exp = exp as u64;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc * base % m;
        }
        base = base * base % m;
        exp >>= 1;
    }
    // Match the sign convention of % (result takes the divisor's sign).
    let mut acc = acc as i64;
    if acc != 0 && (acc < 0) != (modulus < 0) {
        acc += modulus;
    }
    acc
}

fn chr_fn(args: Vec<Value>) -> Result<Value, Fault> {
    arity("chr", &args, 1, 1)?;
    let code = ops::as_int(&args[0]).ok_or_else(|| {
        Fault::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            args[0].type_name()
        ))
    })?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Value::Str(c.to_string()))
        .ok_or_else(|| Fault::value_error("chr() arg not in range(0x110000)"))
}

fn ord_fn(args: Vec<Value>) -> Result<Value, Fault> {
    arity("ord", &args, 1, 1)?;
    let Value::Str(s) = &args[0] else {
        return Err(Fault::type_error(format!(
            "ord() expected string of length 1, but {} found",
            args[0].type_name()
        )));
    };
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Int(c as i64)),
        _ => Err(Fault::type_error(format!(
            "ord() expected a character, but string of length {} found",
            s.chars().count()
        ))),
    }
}

fn int_format(args: Vec<Value>, name: &str, prefix: &str, radix: u32) -> Result<Value, Fault> {
    arity(name, &args, 1, 1)?;
    let Some(i) = ops::as_int(&args[0]) else {
        return Err(Fault::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            args[0].type_name()
        )));
    };
    let magnitude = (i as i128).unsigned_abs();
    let digits = match radix {
        16 => format!("{magnitude:x}"),
        8 => format!("{magnitude:o}"),
        _ => format!("{magnitude:b}"),
    };
    let sign = if i < 0 { "-" } else { "" };
    Ok(Value::Str(format!("{sign}{prefix}{digits}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(builtin: Builtin, args: Vec<Value>) -> Result<Value, Fault> {
        builtin.call(args, Vec::new(), &mut EvalSink::default())
    }

    #[test]
    fn test_standard_set_contents() {
        let caps = CapabilitySet::standard();
        assert!(caps.contains("print"));
        assert!(caps.contains("len"));
        assert!(!caps.contains("open"));
        assert!(!caps.contains("eval"));
        assert_eq!(caps.len(), 28);
    }

    #[test]
    fn test_print_with_sep_and_end() {
        let mut sink = EvalSink::default();
        Builtin::Print
            .call(
                vec![Value::Int(1), Value::Int(2)],
                vec![
                    ("sep".to_string(), Value::Str(", ".into())),
                    ("end".to_string(), Value::Str("!".into())),
                ],
                &mut sink,
            )
            .unwrap();
        assert_eq!(sink.stdout, "1, 2!");
    }

    #[test]
    fn test_print_rejects_unknown_kwarg() {
        let fault = Builtin::Print
            .call(vec![], vec![("file".to_string(), Value::None)], &mut EvalSink::default())
            .unwrap_err();
        assert!(fault.to_string().contains("invalid keyword argument"));
    }

    #[test]
    fn test_len_and_faults() {
        assert_eq!(
            call(Builtin::Len, vec![Value::Str("héllo".into())]).unwrap(),
            Value::Int(5)
        );
        let fault = call(Builtin::Len, vec![Value::Int(3)]).unwrap_err();
        assert_eq!(
            fault.to_string(),
            "TypeError: object of type 'int' has no len()"
        );
    }

    #[test]
    fn test_int_cast() {
        assert_eq!(
            call(Builtin::Int, vec![Value::Str("  42 ".into())]).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            call(Builtin::Int, vec![Value::Float(-2.9)]).unwrap(),
            Value::Int(-2)
        );
        let fault = call(Builtin::Int, vec![Value::Str("4.5".into())]).unwrap_err();
        assert_eq!(
            fault.to_string(),
            "ValueError: invalid literal for int() with base 10: '4.5'"
        );
    }

    #[test]
    fn test_min_max_over_iterable_and_args() {
        let list = Value::List(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert_eq!(call(Builtin::Min, vec![list.clone()]).unwrap(), Value::Int(1));
        assert_eq!(
            call(Builtin::Max, vec![Value::Int(3), Value::Int(7)]).unwrap(),
            Value::Int(7)
        );
        let fault = call(Builtin::Min, vec![Value::List(vec![])]).unwrap_err();
        assert_eq!(
            fault.to_string(),
            "ValueError: min() arg is an empty sequence"
        );
    }

    #[test]
    fn test_sum_with_start() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(call(Builtin::Sum, vec![list.clone()]).unwrap(), Value::Int(6));
        assert_eq!(
            call(Builtin::Sum, vec![list, Value::Int(10)]).unwrap(),
            Value::Int(16)
        );
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(call(Builtin::Round, vec![Value::Float(0.5)]).unwrap(), Value::Int(0));
        assert_eq!(call(Builtin::Round, vec![Value::Float(1.5)]).unwrap(), Value::Int(2));
        assert_eq!(call(Builtin::Round, vec![Value::Float(2.5)]).unwrap(), Value::Int(2));
        assert_eq!(
            call(Builtin::Round, vec![Value::Float(2.675), Value::Int(1)]).unwrap(),
            Value::Float(2.7)
        );
    }

    #[test]
    fn test_sorted_faults_on_mixed_types() {
        let mixed = Value::List(vec![Value::Int(1), Value::Str("a".into())]);
        let fault = call(Builtin::Sorted, vec![mixed]).unwrap_err();
        assert!(fault.to_string().starts_with("TypeError: '<' not supported"));
    }

    #[test]
    fn test_range_validation() {
        assert_eq!(
            call(Builtin::Range, vec![Value::Int(3)]).unwrap(),
            Value::Range { start: 0, stop: 3, step: 1 }
        );
        let fault = call(
            Builtin::Range,
            vec![Value::Int(0), Value::Int(5), Value::Int(0)],
        )
        .unwrap_err();
        assert_eq!(fault.to_string(), "ValueError: range() arg 3 must not be zero");
    }

    #[test]
    fn test_divmod() {
        assert_eq!(
            call(Builtin::Divmod, vec![Value::Int(7), Value::Int(3)]).unwrap(),
            Value::Tuple(vec![Value::Int(2), Value::Int(1)])
        );
    }

    #[test]
    fn test_pow_with_modulus() {
        assert_eq!(
            call(
                Builtin::Pow,
                vec![Value::Int(2), Value::Int(10), Value::Int(1000)]
            )
            .unwrap(),
            Value::Int(24)
        );
    }

    #[test]
    fn test_chr_ord_roundtrip() {
        assert_eq!(call(Builtin::Chr, vec![Value::Int(97)]).unwrap(), Value::Str("a".into()));
        assert_eq!(call(Builtin::Ord, vec![Value::Str("a".into())]).unwrap(), Value::Int(97));
    }

    #[test]
    fn test_hex_bin_oct() {
        assert_eq!(call(Builtin::Hex, vec![Value::Int(255)]).unwrap(), Value::Str("0xff".into()));
        assert_eq!(call(Builtin::Hex, vec![Value::Int(-26)]).unwrap(), Value::Str("-0x1a".into()));
        assert_eq!(call(Builtin::Bin, vec![Value::Int(5)]).unwrap(), Value::Str("0b101".into()));
        assert_eq!(call(Builtin::Oct, vec![Value::Int(8)]).unwrap(), Value::Str("0o10".into()));
    }

    #[test]
    fn test_kwargs_rejected_outside_print() {
        let fault = Builtin::Sorted
            .call(
                vec![Value::List(vec![])],
                vec![("reverse".to_string(), Value::Bool(true))],
                &mut EvalSink::default(),
            )
            .unwrap_err();
        assert_eq!(
            fault.to_string(),
            "TypeError: sorted() takes no keyword arguments"
        );
    }
}
