//! The execution engine: an embedded, sandboxed expression/statement
//! evaluator for fragment source text.
//!
//! The session depends on the [`Evaluator`] trait, not on the concrete
//! engine, so the evaluation capability stays pluggable. The shipped
//! implementation is [`ScriptEngine`]: lexer → parser → tree-walking
//! evaluator over an allow-listed [`CapabilitySet`].
//!
//! Output capture is structural: `print` and fault rendering write into the
//! per-call [`EvalSink`] owned by the caller, so there is no process-global
//! stream state to save and restore.

pub mod builtins;
mod eval;
pub mod fault;
mod ops;
mod parse;
mod token;
pub mod value;

use indexmap::IndexMap;

pub use builtins::{Builtin, CapabilitySet};
pub use fault::{Fault, FaultKind};
pub use ops::{iter_value, ValueIter};
pub use value::Value;

/// Per-call output buffers. One pair per `Execute`, never shared.
#[derive(Debug, Default)]
pub struct EvalSink {
    pub stdout: String,
    pub stderr: String,
}

/// Pluggable evaluation capability:
/// `evaluate(sourceText, environment) -> effects`.
///
/// Implementations read and write `vars` (the working copy of user
/// bindings), resolve everything else through `caps`, and report output
/// through `sink`. A returned [`Fault`] means the fragment stopped early;
/// effects applied before the fault remain in `vars` and `sink`.
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        source: &str,
        caps: &CapabilitySet,
        vars: &mut IndexMap<String, Value>,
        sink: &mut EvalSink,
    ) -> Result<(), Fault>;
}

/// The in-house fragment-language engine.
#[derive(Debug, Default)]
pub struct ScriptEngine;

impl Evaluator for ScriptEngine {
    fn evaluate(
        &self,
        source: &str,
        caps: &CapabilitySet,
        vars: &mut IndexMap<String, Value>,
        sink: &mut EvalSink,
    ) -> Result<(), Fault> {
        let toks = token::tokenize(source)?;
        let stmts = parse::parse(toks)?;
        eval::run(&stmts, caps, vars, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(source: &str, vars: &mut IndexMap<String, Value>) -> Result<EvalSink, Fault> {
        let engine = ScriptEngine;
        let caps = CapabilitySet::standard();
        let mut sink = EvalSink::default();
        engine.evaluate(source, &caps, vars, &mut sink)?;
        Ok(sink)
    }

    #[test]
    fn test_engine_end_to_end() {
        let mut vars = IndexMap::new();
        evaluate("x = 42", &mut vars).unwrap();
        let sink = evaluate("print(x + 1)", &mut vars).unwrap();
        assert_eq!(sink.stdout, "43\n");
    }

    #[test]
    fn test_syntax_fault_is_contained() {
        let mut vars = IndexMap::new();
        let fault = evaluate("x = = 1", &mut vars).unwrap_err();
        assert_eq!(fault.kind, FaultKind::SyntaxError);
        assert!(vars.is_empty());
    }

    #[test]
    fn test_multi_line_program() {
        let mut vars = IndexMap::new();
        let sink = evaluate(
            "squares = []\nfor n in range(5):\n    squares += [n ** 2]\nprint(squares)",
            &mut vars,
        )
        .unwrap();
        assert_eq!(sink.stdout, "[0, 1, 4, 9, 16]\n");
    }

    #[test]
    fn test_unsupported_statement_reports_syntax_fault() {
        let mut vars = IndexMap::new();
        let fault = evaluate("import os", &mut vars).unwrap_err();
        assert_eq!(fault.kind, FaultKind::SyntaxError);
        assert_eq!(
            fault.message,
            "'import' is not supported in fragments"
        );
    }
}
