//! Session environment: the single persistent evaluation state shared by
//! every connection to one server process.
//!
//! The session is an explicit object passed by reference into the execution
//! path; there is no global singleton. Hidden/internal state is a typed
//! separation: every merged name is classified once into a [`Visibility`],
//! and listing code consults the stored classification rather than
//! re-checking prefixes everywhere. The hidden-name prefix survives only as
//! the single classification rule at the merge boundary, since fragments
//! can only introduce names textually.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::NamespaceConfig;
use crate::engine::{CapabilitySet, EvalSink, Evaluator, ScriptEngine, Value};

/// Classification of a stored binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Ordinary user binding; always listed.
    Visible,
    /// Hidden-prefix name explicitly declared retained; persists and is
    /// listed despite the prefix.
    Retained,
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    visibility: Visibility,
}

/// Construction-time session options.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Hidden-prefix names to retain across requests. Each is initialized
    /// to an empty dict. The default set is empty.
    pub retained: Vec<String>,
}

/// Result of one `Execute` call.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    /// Currently visible binding names, computed after the merge.
    pub locals: Vec<String>,
}

/// The persistent evaluation state: capability set, user bindings, and the
/// exclusive lock that serializes execution.
pub struct Session {
    caps: CapabilitySet,
    engine: Box<dyn Evaluator>,
    retained: BTreeSet<String>,
    /// Exclusive lock held across evaluation and merge; no two fragments
    /// ever evaluate concurrently against this state.
    bindings: Mutex<IndexMap<String, Binding>>,
    /// Shadow of name → type descriptor, refreshed after every merge.
    /// `show_vars` reads this without queuing behind the session lock;
    /// the contract is last-writer-wins with no snapshot isolation.
    catalog: RwLock<BTreeMap<String, String>>,
}

impl Session {
    pub fn new(engine: Box<dyn Evaluator>, config: SessionConfig) -> Self {
        let mut bindings = IndexMap::new();
        for name in &config.retained {
            bindings.insert(
                name.clone(),
                Binding {
                    value: Value::Dict(Vec::new()),
                    visibility: Visibility::Retained,
                },
            );
        }
        let catalog = catalog_of(&bindings);
        Self {
            caps: CapabilitySet::standard(),
            engine,
            retained: config.retained.into_iter().collect(),
            bindings: Mutex::new(bindings),
            catalog: RwLock::new(catalog),
        }
    }

    /// A session running the in-house [`ScriptEngine`].
    pub fn standard(config: SessionConfig) -> Self {
        Self::new(Box::new(ScriptEngine), config)
    }

    /// Evaluate one fragment against the session.
    ///
    /// Acquires the exclusive lock, evaluates against a combined view of
    /// capabilities and user bindings, renders any fault into the stderr
    /// buffer, then merges every surviving name back. The merge is
    /// overwrite-only: deletions never propagate. Faults never escape
    /// this call.
    pub async fn execute(&self, fragment: &str) -> ExecOutcome {
        let mut guard = self.bindings.lock().await;
        let mut sink = EvalSink::default();
        let mut working: IndexMap<String, Value> = guard
            .iter()
            .map(|(name, binding)| (name.clone(), binding.value.clone()))
            .collect();

        if let Err(fault) = self
            .engine
            .evaluate(fragment, &self.caps, &mut working, &mut sink)
        {
            debug!(%fault, "fragment evaluation faulted");
            let _ = write!(sink.stderr, "\n{fault}");
        }

        for (name, value) in working {
            match self.classify(&name, &guard) {
                Some(visibility) => {
                    guard.insert(name, Binding { value, visibility });
                }
                // Hidden and not retained: discarded, never persisted.
                None => {}
            }
        }

        let locals = listed_names(&guard);
        self.refresh_catalog(&guard);
        ExecOutcome {
            stdout: sink.stdout,
            stderr: sink.stderr,
            locals,
        }
    }

    /// Name → type descriptor for every listed binding, from the catalog.
    /// Does not touch the session lock, so it may race an in-flight
    /// `execute`: an accepted relaxation, not a bug.
    pub fn bindings_catalog(&self) -> BTreeMap<String, String> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn classify(&self, name: &str, current: &IndexMap<String, Binding>) -> Option<Visibility> {
        if let Some(existing) = current.get(name) {
            return Some(existing.visibility);
        }
        if name.starts_with(NamespaceConfig::HIDDEN_PREFIX) {
            if self.retained.contains(name) {
                Some(Visibility::Retained)
            } else {
                None
            }
        } else {
            Some(Visibility::Visible)
        }
    }

    fn refresh_catalog(&self, bindings: &IndexMap<String, Binding>) {
        let fresh = catalog_of(bindings);
        *self
            .catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner) = fresh;
    }
}

fn listed_names(bindings: &IndexMap<String, Binding>) -> Vec<String> {
    bindings.keys().cloned().collect()
}

fn catalog_of(bindings: &IndexMap<String, Binding>) -> BTreeMap<String, String> {
    bindings
        .iter()
        .map(|(name, binding)| (name.clone(), binding.value.type_name().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn session() -> Session {
        Session::standard(SessionConfig::default())
    }

    #[tokio::test]
    async fn test_binding_persists_across_requests() {
        let session = session();
        let first = session.execute("x = 42").await;
        assert_eq!(first.stdout, "");
        assert_eq!(first.stderr, "");
        assert_eq!(first.locals, vec!["x".to_string()]);

        let second = session.execute("print(x + 1)").await;
        assert_eq!(second.stdout, "43\n");
        assert_eq!(second.stderr, "");
        assert_eq!(second.locals, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_last_assignment_wins() {
        let session = session();
        session.execute("x = 1").await;
        session.execute("x = 'two'").await;
        let outcome = session.execute("print(x)").await;
        assert_eq!(outcome.stdout, "two\n");
    }

    #[tokio::test]
    async fn test_hidden_names_are_discarded() {
        let session = session();
        let outcome = session.execute("_tmp = 5\nx = 1").await;
        assert_eq!(outcome.locals, vec!["x".to_string()]);

        // The hidden binding did not persist either.
        let next = session.execute("print(_tmp)").await;
        assert!(next.stderr.contains("NameError: name '_tmp' is not defined"));
    }

    #[tokio::test]
    async fn test_retained_names_persist_and_are_listed() {
        let session = Session::standard(SessionConfig {
            retained: vec!["_results".to_string()],
        });
        let outcome = session.execute("x = 1").await;
        assert_eq!(
            outcome.locals,
            vec!["_results".to_string(), "x".to_string()]
        );

        session.execute("_results['k'] = 99").await;
        let read_back = session.execute("print(_results['k'])").await;
        assert_eq!(read_back.stdout, "99\n");
    }

    #[tokio::test]
    async fn test_fault_is_contained_and_rendered() {
        let session = session();
        let outcome = session.execute("y = 1 / 0").await;
        assert_eq!(outcome.stdout, "");
        assert_eq!(outcome.stderr, "\nZeroDivisionError: division by zero");
        assert!(outcome.locals.is_empty());

        // An unrelated follow-up request still succeeds.
        let next = session.execute("z = 3").await;
        assert_eq!(next.stderr, "");
        assert_eq!(next.locals, vec!["z".to_string()]);
    }

    #[tokio::test]
    async fn test_partial_effects_survive_fault() {
        let session = session();
        let outcome = session.execute("a = 1\nprint('got here')\nb = missing").await;
        assert_eq!(outcome.stdout, "got here\n");
        assert!(outcome.stderr.contains("NameError"));
        assert_eq!(outcome.locals, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_catalog_reports_type_descriptors() {
        let session = session();
        session.execute("x = 42\nname = 'kiln'\nxs = [1]").await;
        let catalog = session.bindings_catalog();
        assert_eq!(catalog.get("x").map(String::as_str), Some("int"));
        assert_eq!(catalog.get("name").map(String::as_str), Some("str"));
        assert_eq!(catalog.get("xs").map(String::as_str), Some("list"));
    }

    #[tokio::test]
    async fn test_rebinding_keeps_one_entry() {
        let session = session();
        session.execute("x = 1").await;
        let outcome = session.execute("x = 2\ny = 3").await;
        assert_eq!(outcome.locals, vec!["x".to_string(), "y".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_executes_never_interleave_output() {
        let session = Arc::new(session());
        let mut handles = Vec::new();
        for task in 0..4 {
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                let fragment = format!(
                    "out{task} = ''\nfor i in range(200):\n    out{task} += 'w{task}'\nprint(out{task})"
                );
                session.execute(&fragment).await
            }));
        }
        for (task, handle) in handles.into_iter().enumerate() {
            let outcome = handle.await.expect("task panicked");
            let expected = format!("w{task}").repeat(200) + "\n";
            assert_eq!(outcome.stdout, expected);
            assert_eq!(outcome.stderr, "");
        }
    }
}
