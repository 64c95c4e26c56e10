//! The registry: namespaces, keywords and per-thread state.
//!
//! All three tables are behind their own reader-writer lock. Interning follows
//! one pattern everywhere: look up under the shared lock, and only on a miss
//! take the exclusive lock, check again, then insert.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use log::{debug, warn};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{Error, InternError, Result};
use crate::interner::InternedStr;
use crate::language::{Keyword, Symbol, Value};
use crate::options::Options;
use crate::runtime::{Namespace, Var};
use crate::stdlib;

pub const CORE_NS: &str = "clojure.core";
pub const CURRENT_NS_VAR: &str = "*ns*";
pub const IN_NS_VAR: &str = "in-ns";

/// Shared by every `Context` in the process, so generated names stay unique
/// across clones.
static UNIQUE_INDEX: AtomicUsize = AtomicUsize::new(1);

// ============================================================================
// Thread state
// ============================================================================

/// Per-thread execution state.
///
/// The current namespace is held through a var rather than directly, so that
/// dynamic rebinding can later interpose on it without changing this shape.
#[derive(Clone)]
pub struct ThreadState {
    pub current_ns: Arc<Var>,
    pub in_ns: Arc<Var>,
}

impl ThreadState {
    /// The namespace this thread resolves unqualified symbols against.
    pub fn current_ns(&self) -> Result<Arc<Namespace>> {
        match self.current_ns.get_root() {
            Some(Value::Namespace(ns)) => Ok(ns),
            Some(other) => Err(Error::runtime(format!(
                "{} is bound to {other}, not a namespace",
                self.current_ns
            ))),
            None => Err(Error::runtime(format!("{} is unbound", self.current_ns))),
        }
    }
}

// ============================================================================
// Context
// ============================================================================

pub struct Context {
    namespaces: RwLock<FxHashMap<Symbol, Arc<Namespace>>>,
    keywords: RwLock<FxHashMap<Symbol, Arc<Keyword>>>,
    thread_states: RwLock<FxHashMap<ThreadId, Arc<ThreadState>>>,
    options: Options,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Build a registry holding `clojure.core` with `*ns*`, `in-ns` and the
    /// other construction-time natives, and make `clojure.core` the current
    /// namespace of the constructing thread.
    pub fn with_options(options: Options) -> Self {
        let ctx = Context {
            namespaces: RwLock::new(FxHashMap::default()),
            keywords: RwLock::new(FxHashMap::default()),
            thread_states: RwLock::new(FxHashMap::default()),
            options,
        };

        let core = ctx.intern_ns(Symbol::unqualified(CORE_NS));
        let current_ns = core.intern_var(Symbol::new(CORE_NS, CURRENT_NS_VAR));
        current_ns.set_root(Value::Namespace(Arc::clone(&core)));
        let in_ns = core.intern_var(Symbol::new(CORE_NS, IN_NS_VAR));
        ctx.get_thread_state_with(Some(ThreadState { current_ns, in_ns }));

        stdlib::install_core(&ctx);
        ctx
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    // ------------------------------------------------------------------------
    // Namespaces and vars
    // ------------------------------------------------------------------------

    /// Get or create the namespace named by `sym`'s name.
    pub fn intern_ns(&self, sym: Symbol) -> Arc<Namespace> {
        let key = sym.without_ns();
        if let Some(ns) = self.namespaces.read().get(&key) {
            return Arc::clone(ns);
        }

        let mut namespaces = self.namespaces.write();
        Arc::clone(namespaces.entry(key).or_insert_with(|| {
            debug!("interned namespace {key}");
            Namespace::new(key)
        }))
    }

    pub fn find_ns(&self, name: &Symbol) -> Option<Arc<Namespace>> {
        self.namespaces.read().get(&name.without_ns()).cloned()
    }

    /// All namespaces, sorted by name.
    pub fn namespaces(&self) -> Vec<Arc<Namespace>> {
        let mut all: Vec<_> = self.namespaces.read().values().cloned().collect();
        all.sort_by_cached_key(|ns| ns.name().to_string());
        all
    }

    /// Get or create the var named by a fully qualified symbol. The
    /// namespace must already exist.
    pub fn intern_var(&self, qualified: Symbol) -> Result<Arc<Var>, InternError> {
        if !qualified.is_qualified() {
            return Err(InternError::UnqualifiedSymbol(qualified));
        }

        let ns = self
            .find_ns(&Symbol::from_parts(InternedStr::empty(), qualified.ns()))
            .ok_or(InternError::MissingNamespace(qualified))?;
        Ok(ns.intern_var(qualified))
    }

    pub fn intern_var_in(&self, ns: &str, name: &str) -> Result<Arc<Var>, InternError> {
        self.intern_var(Symbol::new(ns, name))
    }

    // ------------------------------------------------------------------------
    // Keywords
    // ------------------------------------------------------------------------

    /// Get or create the canonical keyword for `(ns, name)`.
    ///
    /// An unresolved keyword with an empty namespace (`::foo`) resolves
    /// against the calling thread's current namespace. An unresolved keyword
    /// with a namespace is an alias reference, which isn't supported.
    pub fn intern_keyword(&self, ns: &str, name: &str, resolved: bool) -> Result<Arc<Keyword>> {
        self.intern_keyword_sym(Symbol::new(ns, name), resolved)
    }

    pub fn intern_keyword_sym(&self, sym: Symbol, resolved: bool) -> Result<Arc<Keyword>> {
        let mut sym = sym;
        if !resolved {
            if sym.is_qualified() {
                return Err(Error::Unimplemented("auto-resolved ns aliases"));
            }
            let current = self.get_thread_state().current_ns()?;
            sym = sym.with_ns(current.name().name());
        }

        if let Some(kw) = self.keywords.read().get(&sym) {
            return Ok(Arc::clone(kw));
        }

        let mut keywords = self.keywords.write();
        Ok(Arc::clone(keywords.entry(sym).or_insert_with(|| {
            debug!("interned keyword :{sym}");
            Arc::new(Keyword::new(sym, true))
        })))
    }

    // ------------------------------------------------------------------------
    // Thread state
    // ------------------------------------------------------------------------

    pub fn get_thread_state(&self) -> Arc<ThreadState> {
        self.get_thread_state_with(None)
    }

    /// The calling thread's state, created from `init` (or a default) on the
    /// thread's first call.
    ///
    /// The shared lock guards only the table's shape. An entry's contents are
    /// only ever changed by the thread it belongs to, through its vars.
    pub fn get_thread_state_with(&self, init: Option<ThreadState>) -> Arc<ThreadState> {
        let id = thread::current().id();
        if let Some(state) = self.thread_states.read().get(&id) {
            return Arc::clone(state);
        }

        let mut states = self.thread_states.write();
        if let Some(state) = states.get(&id) {
            return Arc::clone(state);
        }
        let state = Arc::new(init.unwrap_or_else(|| self.default_thread_state()));
        debug!("created thread state for {id:?} in {}", state.current_ns);
        states.insert(id, Arc::clone(&state));
        state
    }

    /// A fresh `*ns*` cell bound to `clojure.core`. The cell is not entered in
    /// the var table, so each thread gets its own.
    fn default_thread_state(&self) -> ThreadState {
        let core = self.core_ns();
        let current_ns = Arc::new(Var::with_root(
            Arc::downgrade(&core),
            Symbol::new(CORE_NS, CURRENT_NS_VAR),
            Value::Namespace(Arc::clone(&core)),
        ));
        let in_ns = core.intern_var(Symbol::new(CORE_NS, IN_NS_VAR));
        ThreadState { current_ns, in_ns }
    }

    pub fn core_ns(&self) -> Arc<Namespace> {
        self.intern_ns(Symbol::unqualified(CORE_NS))
    }

    /// The calling thread's current namespace.
    pub fn current_ns(&self) -> Result<Arc<Namespace>> {
        self.get_thread_state().current_ns()
    }

    /// Make the namespace named `sym` current for the calling thread,
    /// creating it if needed.
    pub fn in_ns(&self, sym: Symbol) -> Arc<Namespace> {
        let ns = self.intern_ns(sym);
        self.get_thread_state()
            .current_ns
            .set_root(Value::Namespace(Arc::clone(&ns)));
        ns
    }

    // ------------------------------------------------------------------------
    // Unique names
    // ------------------------------------------------------------------------

    pub fn unique_string(&self) -> String {
        self.unique_string_with("gen")
    }

    pub fn unique_string_with(&self, prefix: &str) -> String {
        let index = UNIQUE_INDEX.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}{index}")
    }

    pub fn unique_symbol(&self) -> Symbol {
        self.unique_symbol_with("gen")
    }

    pub fn unique_symbol_with(&self, prefix: &str) -> Symbol {
        Symbol::unqualified(&self.unique_string_with(prefix))
    }
}

// ============================================================================
// Cloning
// ============================================================================

impl Clone for Context {
    /// Fork the registry. Namespaces (and through them, vars) are cloned;
    /// keywords are shared since they never change; thread states are copied
    /// and pointed at the clone's own namespaces and vars.
    fn clone(&self) -> Self {
        let namespaces: FxHashMap<Symbol, Arc<Namespace>> = self
            .namespaces
            .read()
            .iter()
            .map(|(name, ns)| (*name, ns.clone_ns()))
            .collect();
        let keywords = self.keywords.read().clone();
        let thread_states = self
            .thread_states
            .read()
            .iter()
            .map(|(id, state)| (*id, Arc::new(rebind_thread_state(state, &namespaces))))
            .collect();

        Context {
            namespaces: RwLock::new(namespaces),
            keywords: RwLock::new(keywords),
            thread_states: RwLock::new(thread_states),
            options: self.options.clone(),
        }
    }
}

/// Copy `state` into a cloned registry. Interned vars are swapped for their
/// clones; a thread's private `*ns*` cell gets a fresh private cell.
fn rebind_thread_state(
    state: &ThreadState,
    namespaces: &FxHashMap<Symbol, Arc<Namespace>>,
) -> ThreadState {
    let find_clone = |var: &Arc<Var>| -> Option<Arc<Var>> {
        let owner = var.namespace()?;
        let interned = owner.find_var(&var.name())?;
        if !Arc::ptr_eq(&interned, var) {
            return None;
        }
        namespaces.get(&owner.name())?.find_var(&var.name())
    };

    let target = match state.current_ns() {
        Ok(ns) => namespaces.get(&ns.name()).cloned(),
        Err(_) => None,
    };
    let core = namespaces.get(&Symbol::unqualified(CORE_NS));

    let current_ns = find_clone(&state.current_ns).unwrap_or_else(|| {
        let owner = core.map(Arc::downgrade).unwrap_or_default();
        Arc::new(Var::new(owner, state.current_ns.name()))
    });
    match target.or_else(|| core.cloned()) {
        Some(ns) => current_ns.set_root(Value::Namespace(ns)),
        None => warn!("no namespace to bind {current_ns} to in cloned context"),
    }

    let in_ns = find_clone(&state.in_ns).unwrap_or_else(|| Arc::clone(&state.in_ns));
    ThreadState { current_ns, in_ns }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_seeds_core() {
        let ctx = Context::new();
        let core = ctx.find_ns(&Symbol::unqualified(CORE_NS)).unwrap();
        assert!(core.find_var(&Symbol::new(CORE_NS, CURRENT_NS_VAR)).is_some());
        let in_ns = core.find_var(&Symbol::new(CORE_NS, IN_NS_VAR)).unwrap();
        assert!(matches!(in_ns.get_root(), Some(Value::NativeFn(_))));
        assert!(Arc::ptr_eq(&ctx.current_ns().unwrap(), &core));
    }

    #[test]
    fn test_constructing_thread_uses_interned_ns_var() {
        let ctx = Context::new();
        let state = ctx.get_thread_state();
        let interned = ctx.intern_var_in(CORE_NS, CURRENT_NS_VAR).unwrap();
        assert!(Arc::ptr_eq(&state.current_ns, &interned));
    }

    #[test]
    fn test_thread_state_created_once() {
        let ctx = Context::new();
        let a = ctx.get_thread_state();
        let b = ctx.get_thread_state();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_init_ignored_when_state_exists() {
        let ctx = Context::new();
        let existing = ctx.get_thread_state();
        let other = ThreadState {
            current_ns: Arc::new(Var::new(Default::default(), Symbol::new("x", "y"))),
            in_ns: Arc::clone(&existing.in_ns),
        };
        let got = ctx.get_thread_state_with(Some(other));
        assert!(Arc::ptr_eq(&got, &existing));
    }

    #[test]
    fn test_unique_string_format() {
        let ctx = Context::new();
        let s = ctx.unique_string();
        assert!(s.starts_with("gen"));
        assert!(s["gen".len()..].parse::<usize>().is_ok());
        assert!(ctx.unique_string_with("tmp").starts_with("tmp"));
        assert!(!ctx.unique_symbol().is_qualified());
    }
}
