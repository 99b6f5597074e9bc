//! The engine's dynamic value type.
//!
//! `Value` owns all its data and can be freely cloned and stored in the
//! session namespace. Equality, truthiness, ordering, and repr follow the
//! conventions scripts expect (`1 == 1.0`, `repr('a')` is `'a'`, empty
//! containers are falsy). These differ from Rust's derived semantics,
//! hence the `py_*` methods alongside the derived `PartialEq`.

use std::cmp::Ordering;

use super::builtins::Builtin;
use super::fault::Fault;

/// A dynamic value produced or consumed by fragment evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion-ordered entries; keys compare with [`Value::py_eq`], so a
    /// later insert under an equal key updates in place. Linear lookup is
    /// fine at session scale.
    Dict(Vec<(Value, Value)>),
    /// Lazy integer range; never materialized unless converted.
    Range { start: i64, stop: i64, step: i64 },
    /// An entry from the capability set.
    Builtin(Builtin),
}

impl Value {
    /// The type descriptor reported by `show_vars` and the `type` builtin
    /// (e.g. `"int"`, `"str"`, `"list"`).
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Range { .. } => "range",
            Value::Builtin(_) => "builtin_function_or_method",
        }
    }

    /// Truthiness: zero, empty, and `None` are falsy, everything else truthy.
    pub fn py_bool(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            Value::Range { .. } => self.py_len() != Some(0),
            Value::Builtin(_) => true,
        }
    }

    /// Cross-type numeric view: bools count as 0/1.
    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Value equality with numeric cross-type rules (`1 == 1.0 == True`).
    pub fn py_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| dict_get(b, k).is_some_and(|w| v.py_eq(w)))
            }
            (Value::Range { .. }, Value::Range { .. }) => {
                // Ranges compare as the sequences they denote.
                let (la, lb) = (self.py_len().unwrap_or(0), other.py_len().unwrap_or(0));
                if la != lb {
                    return false;
                }
                if la == 0 {
                    return true;
                }
                let (Value::Range { start: sa, step: pa, .. }, Value::Range { start: sb, step: pb, .. }) =
                    (self, other)
                else {
                    unreachable!()
                };
                sa == sb && (la == 1 || pa == pb)
            }
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Ordering for `< <= > >=` and `sorted`. `None` means the pair does not
    /// support ordering; the caller renders the `TypeError`.
    pub fn py_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                for (x, y) in a.iter().zip(b) {
                    if !x.py_eq(y) {
                        return x.py_cmp(y);
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => match (self.as_number(), other.as_number()) {
                // NaN compares unordered; treat as equal rather than fault.
                (Some(a), Some(b)) => Some(a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
                _ => None,
            },
        }
    }

    /// Element count for sized values; `None` for unsized ones.
    pub fn py_len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::List(items) | Value::Tuple(items) => Some(items.len()),
            Value::Dict(entries) => Some(entries.len()),
            Value::Range { start, stop, step } => Some(range_len(*start, *stop, *step)),
            _ => None,
        }
    }

    /// Whether the value may be used as a dict key.
    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Dict(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// Source-style representation (`repr`).
    pub fn py_repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => string_repr(s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::py_repr).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(Value::py_repr).collect();
                if parts.len() == 1 {
                    format!("({},)", parts[0])
                } else {
                    format!("({})", parts.join(", "))
                }
            }
            Value::Dict(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.py_repr(), v.py_repr()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Range { start, stop, step } => {
                if *step == 1 {
                    format!("range({start}, {stop})")
                } else {
                    format!("range({start}, {stop}, {step})")
                }
            }
            Value::Builtin(b) => format!("<built-in function {}>", b.name()),
        }
    }

    /// Display form (`str`): strings unquoted, everything else as `repr`.
    pub fn py_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.py_repr(),
        }
    }
}

/// Look up `key` in dict entries by value equality.
pub fn dict_get<'a>(entries: &'a [(Value, Value)], key: &Value) -> Option<&'a Value> {
    entries.iter().find(|(k, _)| k.py_eq(key)).map(|(_, v)| v)
}

/// Insert or update `key` in dict entries. The original key object is kept
/// on update, matching reference semantics. Fails on unhashable keys.
pub fn dict_set(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) -> Result<(), Fault> {
    if !key.is_hashable() {
        return Err(Fault::type_error(format!(
            "unhashable type: '{}'",
            key.type_name()
        )));
    }
    if let Some(entry) = entries.iter_mut().find(|(k, _)| k.py_eq(&key)) {
        entry.1 = value;
    } else {
        entries.push((key, value));
    }
    Ok(())
}

/// Number of elements denoted by `range(start, stop, step)`.
pub fn range_len(start: i64, stop: i64, step: i64) -> usize {
    let (start, stop, step) = (start as i128, stop as i128, step as i128);
    let span = if step > 0 { stop - start } else { start - stop };
    let step = step.abs();
    if span <= 0 || step == 0 {
        0
    } else {
        ((span - 1) / step + 1) as usize
    }
}

/// Shortest-roundtrip float formatting, with the conventional spellings for
/// non-finite values.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        ryu::Buffer::new().format(f).to_string()
    }
}

fn string_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_cross_type_equality() {
        assert!(Value::Int(1).py_eq(&Value::Float(1.0)));
        assert!(Value::Bool(true).py_eq(&Value::Int(1)));
        assert!(!Value::Int(1).py_eq(&Value::Str("1".into())));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Str(String::new()).py_bool());
        assert!(!Value::List(vec![]).py_bool());
        assert!(!Value::None.py_bool());
        assert!(Value::Float(0.5).py_bool());
        assert!(!Value::Range { start: 0, stop: 0, step: 1 }.py_bool());
    }

    #[test]
    fn test_repr_shapes() {
        assert_eq!(Value::Float(1.0).py_repr(), "1.0");
        assert_eq!(Value::Str("hi\n".into()).py_repr(), "'hi\\n'");
        assert_eq!(Value::Str("it's".into()).py_repr(), "\"it's\"");
        assert_eq!(
            Value::Tuple(vec![Value::Int(1)]).py_repr(),
            "(1,)"
        );
        assert_eq!(
            Value::Dict(vec![(Value::Str("a".into()), Value::Int(2))]).py_repr(),
            "{'a': 2}"
        );
        assert_eq!(
            Value::Range { start: 0, stop: 5, step: 1 }.py_repr(),
            "range(0, 5)"
        );
    }

    #[test]
    fn test_str_len_counts_chars() {
        assert_eq!(Value::Str("héllo".into()).py_len(), Some(5));
    }

    #[test]
    fn test_range_len() {
        assert_eq!(range_len(0, 5, 1), 5);
        assert_eq!(range_len(0, 5, 2), 3);
        assert_eq!(range_len(5, 0, -1), 5);
        assert_eq!(range_len(5, 0, 1), 0);
    }

    #[test]
    fn test_dict_set_updates_equal_key() {
        let mut entries = vec![(Value::Int(1), Value::Str("a".into()))];
        dict_set(&mut entries, Value::Float(1.0), Value::Str("b".into())).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].1.py_eq(&Value::Str("b".into())));
    }

    #[test]
    fn test_dict_set_rejects_unhashable() {
        let mut entries = vec![];
        let err = dict_set(&mut entries, Value::List(vec![]), Value::None).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: unhashable type: 'list'");
    }

    #[test]
    fn test_ordering_mixed_types_unsupported() {
        assert!(Value::Str("a".into()).py_cmp(&Value::Int(1)).is_none());
        assert_eq!(
            Value::Int(2).py_cmp(&Value::Float(1.5)),
            Some(Ordering::Greater)
        );
    }
}
