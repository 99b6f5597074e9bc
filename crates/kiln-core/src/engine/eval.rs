//! Tree-walking evaluator for parsed fragments.
//!
//! Mutates only the caller's working namespace; the session decides what to
//! merge afterward. Faults abort the fragment at the failing statement, so
//! effects already applied (bindings, printed output) are kept.

use indexmap::IndexMap;

use super::builtins::CapabilitySet;
use super::fault::Fault;
use super::ops::{self, iter_value};
use super::parse::{BoolOpKind, Expr, Stmt, Target};
use super::value::{dict_set, Value};
use super::EvalSink;

/// Execute a parsed fragment against the combined scope.
pub(crate) fn run(
    stmts: &[Stmt],
    caps: &CapabilitySet,
    vars: &mut IndexMap<String, Value>,
    sink: &mut EvalSink,
) -> Result<(), Fault> {
    let mut interp = Interp { caps, vars, sink };
    match interp.exec_block(stmts)? {
        Flow::Normal => Ok(()),
        Flow::Break => Err(Fault::syntax("'break' outside loop")),
        Flow::Continue => Err(Fault::syntax("'continue' not properly in loop")),
    }
}

/// Non-local exits from a block.
enum Flow {
    Normal,
    Break,
    Continue,
}

struct Interp<'a> {
    caps: &'a CapabilitySet,
    vars: &'a mut IndexMap<String, Value>,
    sink: &'a mut EvalSink,
}

impl Interp<'_> {
    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, Fault> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, Fault> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            Stmt::AugAssign { target, op, value } => {
                let rhs = self.eval(value)?;
                match target {
                    Target::Name(name) => {
                        let current = self.lookup(name)?;
                        let updated = ops::binary(*op, &current, &rhs)?;
                        self.vars.insert(name.clone(), updated);
                    }
                    Target::Index { base, index } => {
                        let idx = self.eval(index)?;
                        let container = self.lookup(base)?;
                        let current = ops::index(&container, &idx)?;
                        let updated = ops::binary(*op, &current, &rhs)?;
                        self.assign_index(base, idx, updated)?;
                    }
                    Target::Tuple(_) => unreachable!("rejected by the parser"),
                }
            }
            Stmt::If { branches, orelse } => {
                for (cond, body) in branches {
                    if self.eval(cond)?.py_bool() {
                        return self.exec_block(body);
                    }
                }
                return self.exec_block(orelse);
            }
            Stmt::While { cond, body } => {
                // No timeout or step limit exists anywhere in this design;
                // a fragment that never returns holds the session forever.
                while self.eval(cond)?.py_bool() {
                    match self.exec_block(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                    }
                }
            }
            Stmt::For { target, iter, body } => {
                let iterable = self.eval(iter)?;
                for item in iter_value(&iterable)? {
                    self.assign(target, item)?;
                    match self.exec_block(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                    }
                }
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Pass => {}
        }
        Ok(Flow::Normal)
    }

    /// Resolve a name: user bindings shadow the capability set.
    fn lookup(&self, name: &str) -> Result<Value, Fault> {
        if let Some(value) = self.vars.get(name) {
            return Ok(value.clone());
        }
        if let Some(builtin) = self.caps.get(name) {
            return Ok(Value::Builtin(builtin));
        }
        Err(Fault::name_error(name))
    }

    fn assign(&mut self, target: &Target, value: Value) -> Result<(), Fault> {
        match target {
            Target::Name(name) => {
                self.vars.insert(name.clone(), value);
                Ok(())
            }
            Target::Tuple(names) => {
                let items: Vec<Value> = iter_value(&value)
                    .map_err(|_| {
                        Fault::type_error(format!(
                            "cannot unpack non-iterable {} object",
                            value.type_name()
                        ))
                    })?
                    .collect();
                if items.len() < names.len() {
                    return Err(Fault::value_error(format!(
                        "not enough values to unpack (expected {}, got {})",
                        names.len(),
                        items.len()
                    )));
                }
                if items.len() > names.len() {
                    return Err(Fault::value_error(format!(
                        "too many values to unpack (expected {})",
                        names.len()
                    )));
                }
                for (name, item) in names.iter().zip(items) {
                    self.vars.insert(name.clone(), item);
                }
                Ok(())
            }
            Target::Index { base, index } => {
                let idx = self.eval(index)?;
                self.assign_index(base, idx, value)
            }
        }
    }

    fn assign_index(&mut self, base: &str, idx: Value, value: Value) -> Result<(), Fault> {
        let Some(container) = self.vars.get_mut(base) else {
            if self.caps.contains(base) {
                return Err(Fault::type_error(
                    "'builtin_function_or_method' object does not support item assignment",
                ));
            }
            return Err(Fault::name_error(base));
        };
        match container {
            Value::List(items) => {
                let Some(i) = ops::as_int(&idx) else {
                    return Err(Fault::type_error(format!(
                        "list indices must be integers, not {}",
                        idx.type_name()
                    )));
                };
                let i = ops::normalize_index(i, items.len())
                    .ok_or_else(|| Fault::index_error("list assignment index out of range"))?;
                items[i] = value;
                Ok(())
            }
            Value::Dict(entries) => dict_set(entries, idx, value),
            other => Err(Fault::type_error(format!(
                "'{}' object does not support item assignment",
                other.type_name()
            ))),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, Fault> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => {
                let values: Result<Vec<Value>, Fault> =
                    items.iter().map(|e| self.eval(e)).collect();
                Ok(Value::List(values?))
            }
            Expr::Tuple(items) => {
                let values: Result<Vec<Value>, Fault> =
                    items.iter().map(|e| self.eval(e)).collect();
                Ok(Value::Tuple(values?))
            }
            Expr::Dict(pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key_expr, value_expr) in pairs {
                    let key = self.eval(key_expr)?;
                    let value = self.eval(value_expr)?;
                    dict_set(&mut entries, key, value)?;
                }
                Ok(Value::Dict(entries))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                ops::unary(*op, &value)
            }
            Expr::Binary { op, left, right } => {
                let a = self.eval(left)?;
                let b = self.eval(right)?;
                ops::binary(*op, &a, &b)
            }
            Expr::BoolChain { op, values } => {
                // Short-circuits to the deciding operand's value, not a bool.
                let mut result = Value::None;
                for (i, value) in values.iter().enumerate() {
                    result = self.eval(value)?;
                    if i + 1 < values.len() {
                        let decided = match op {
                            BoolOpKind::And => !result.py_bool(),
                            BoolOpKind::Or => result.py_bool(),
                        };
                        if decided {
                            break;
                        }
                    }
                }
                Ok(result)
            }
            Expr::Compare {
                left,
                ops: cmp_ops,
                comparators,
            } => {
                let mut prev = self.eval(left)?;
                for (op, comparator) in cmp_ops.iter().zip(comparators) {
                    let next = self.eval(comparator)?;
                    if !ops::compare(*op, &prev, &next)? {
                        return Ok(Value::Bool(false));
                    }
                    prev = next;
                }
                Ok(Value::Bool(true))
            }
            Expr::Index { value, index } => {
                let container = self.eval(value)?;
                let idx = self.eval(index)?;
                ops::index(&container, &idx)
            }
            Expr::Call { func, args, kwargs } => {
                let callee = self.eval(func)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval(arg)?);
                }
                let mut kwarg_values = Vec::with_capacity(kwargs.len());
                for (name, value) in kwargs {
                    kwarg_values.push((name.clone(), self.eval(value)?));
                }
                match callee {
                    Value::Builtin(builtin) => builtin.call(arg_values, kwarg_values, self.sink),
                    other => Err(Fault::type_error(format!(
                        "'{}' object is not callable",
                        other.type_name()
                    ))),
                }
            }
            Expr::Ternary { cond, then, orelse } => {
                if self.eval(cond)?.py_bool() {
                    self.eval(then)
                } else {
                    self.eval(orelse)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse::parse;
    use super::super::token::tokenize;
    use super::*;

    fn eval_with(
        source: &str,
        vars: &mut IndexMap<String, Value>,
    ) -> Result<EvalSink, Fault> {
        let caps = CapabilitySet::standard();
        let mut sink = EvalSink::default();
        let stmts = parse(tokenize(source)?)?;
        run(&stmts, &caps, vars, &mut sink)?;
        Ok(sink)
    }

    fn eval_ok(source: &str) -> (IndexMap<String, Value>, EvalSink) {
        let mut vars = IndexMap::new();
        let sink = eval_with(source, &mut vars).unwrap();
        (vars, sink)
    }

    #[test]
    fn test_assignment_binds() {
        let (vars, sink) = eval_ok("x = 42");
        assert_eq!(vars.get("x"), Some(&Value::Int(42)));
        assert_eq!(sink.stdout, "");
    }

    #[test]
    fn test_print_arithmetic() {
        let mut vars = IndexMap::new();
        vars.insert("x".to_string(), Value::Int(42));
        let sink = eval_with("print(x + 1)", &mut vars).unwrap();
        assert_eq!(sink.stdout, "43\n");
    }

    #[test]
    fn test_while_loop_accumulates() {
        let (vars, _) = eval_ok("total = 0\ni = 1\nwhile i <= 5:\n    total += i\n    i += 1");
        assert_eq!(vars.get("total"), Some(&Value::Int(15)));
    }

    #[test]
    fn test_for_with_break_and_continue() {
        let (vars, _) = eval_ok(
            "hits = 0\nfor i in range(10):\n    if i == 7:\n        break\n    if i % 2 == 0:\n        continue\n    hits += 1",
        );
        assert_eq!(vars.get("hits"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_tuple_unpacking() {
        let (vars, _) = eval_ok("a, b = 1, 2\na, b = b, a");
        assert_eq!(vars.get("a"), Some(&Value::Int(2)));
        assert_eq!(vars.get("b"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_unpack_length_mismatch() {
        let mut vars = IndexMap::new();
        let fault = eval_with("a, b, c = 1, 2", &mut vars).unwrap_err();
        assert_eq!(
            fault.to_string(),
            "ValueError: not enough values to unpack (expected 3, got 2)"
        );
    }

    #[test]
    fn test_index_assignment() {
        let (vars, _) = eval_ok("d = {}\nd['k'] = 1\nxs = [0, 0]\nxs[-1] = 9");
        assert_eq!(
            vars.get("d"),
            Some(&Value::Dict(vec![(Value::Str("k".into()), Value::Int(1))]))
        );
        assert_eq!(
            vars.get("xs"),
            Some(&Value::List(vec![Value::Int(0), Value::Int(9)]))
        );
    }

    #[test]
    fn test_augmented_index_assignment() {
        let (vars, _) = eval_ok("d = {'n': 1}\nd['n'] += 2");
        assert_eq!(
            vars.get("d"),
            Some(&Value::Dict(vec![(Value::Str("n".into()), Value::Int(3))]))
        );
    }

    #[test]
    fn test_name_error() {
        let mut vars = IndexMap::new();
        let fault = eval_with("print(missing)", &mut vars).unwrap_err();
        assert_eq!(fault.to_string(), "NameError: name 'missing' is not defined");
    }

    #[test]
    fn test_fault_keeps_prior_effects() {
        let mut vars = IndexMap::new();
        let fault = eval_with("x = 1\nprint('before')\ny = 1 / 0", &mut vars).unwrap_err();
        assert_eq!(fault.to_string(), "ZeroDivisionError: division by zero");
        assert_eq!(vars.get("x"), Some(&Value::Int(1)));
        assert!(!vars.contains_key("y"));
    }

    #[test]
    fn test_user_binding_shadows_builtin() {
        let (vars, _) = eval_ok("len = 5\nx = len + 1");
        assert_eq!(vars.get("len"), Some(&Value::Int(5)));
        assert_eq!(vars.get("x"), Some(&Value::Int(6)));
    }

    #[test]
    fn test_calling_shadowed_builtin_faults() {
        let mut vars = IndexMap::new();
        let fault = eval_with("len = 5\nlen('abc')", &mut vars).unwrap_err();
        assert_eq!(fault.to_string(), "TypeError: 'int' object is not callable");
    }

    #[test]
    fn test_boolean_short_circuit_returns_operand() {
        let (vars, _) = eval_ok("a = 0 or 'fallback'\nb = 1 and 2");
        assert_eq!(vars.get("a"), Some(&Value::Str("fallback".into())));
        assert_eq!(vars.get("b"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_short_circuit_skips_evaluation() {
        let (vars, _) = eval_ok("x = False and missing_name");
        assert_eq!(vars.get("x"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_chained_comparison() {
        let (vars, _) = eval_ok("x = 5\nok = 1 < x <= 5\nbad = 1 < x <= 4");
        assert_eq!(vars.get("ok"), Some(&Value::Bool(true)));
        assert_eq!(vars.get("bad"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_ternary() {
        let (vars, _) = eval_ok("x = 'big' if 10 > 5 else 'small'");
        assert_eq!(vars.get("x"), Some(&Value::Str("big".into())));
    }

    #[test]
    fn test_for_over_dict_yields_keys() {
        let (vars, _) = eval_ok("d = {'a': 1, 'b': 2}\nks = ''\nfor k in d:\n    ks += k");
        assert_eq!(vars.get("ks"), Some(&Value::Str("ab".into())));
    }

    #[test]
    fn test_for_tuple_target() {
        let (vars, _) = eval_ok(
            "total = 0\nfor pair in [(1, 2), (3, 4)]:\n    a, b = pair\n    total += a * b",
        );
        assert_eq!(vars.get("total"), Some(&Value::Int(14)));
    }

    #[test]
    fn test_break_outside_loop_faults() {
        let mut vars = IndexMap::new();
        let fault = eval_with("break", &mut vars).unwrap_err();
        assert_eq!(fault.to_string(), "SyntaxError: 'break' outside loop");
    }

    #[test]
    fn test_nested_loops_break_inner_only() {
        let (vars, _) = eval_ok(
            "count = 0\nfor i in range(3):\n    for j in range(3):\n        if j == 1:\n            break\n        count += 1",
        );
        assert_eq!(vars.get("count"), Some(&Value::Int(3)));
    }
}
