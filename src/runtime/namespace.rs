use std::fmt;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::language::Symbol;
use crate::runtime::Var;

/// A named container of vars. Every var it owns is keyed on a symbol whose
/// namespace part equals this namespace's name.
pub struct Namespace {
    name: Symbol,
    vars: RwLock<FxHashMap<Symbol, Arc<Var>>>,
}

impl Namespace {
    pub fn new(name: Symbol) -> Arc<Self> {
        Arc::new(Namespace {
            name: name.without_ns(),
            vars: RwLock::new(FxHashMap::default()),
        })
    }

    /// The namespace name as an unqualified symbol.
    pub fn name(&self) -> Symbol {
        self.name
    }

    /// Get or create the var named `qualified`.
    ///
    /// Callers are responsible for `qualified` naming this namespace;
    /// `Context::intern_var` checks that before getting here.
    pub fn intern_var(self: &Arc<Self>, qualified: Symbol) -> Arc<Var> {
        if let Some(var) = self.vars.read().get(&qualified) {
            return Arc::clone(var);
        }

        let mut vars = self.vars.write();
        // Another thread may have won the race between the two locks.
        Arc::clone(vars.entry(qualified).or_insert_with(|| {
            debug!("interned var {qualified}");
            Arc::new(Var::new(Arc::downgrade(self), qualified))
        }))
    }

    /// Exact lookup, no qualification.
    pub fn find_var(&self, qualified: &Symbol) -> Option<Arc<Var>> {
        self.vars.read().get(qualified).cloned()
    }

    /// Snapshot of the vars, sorted by name.
    pub fn vars(&self) -> Vec<Arc<Var>> {
        let mut vars: Vec<_> = self.vars.read().values().cloned().collect();
        vars.sort_by_cached_key(|var| var.name().to_string());
        vars
    }

    /// An independent namespace whose vars are copies of this one's.
    pub fn clone_ns(&self) -> Arc<Namespace> {
        let vars = self.vars.read();
        Arc::new_cyclic(|weak| Namespace {
            name: self.name,
            vars: RwLock::new(
                vars.iter()
                    .map(|(sym, var)| (*sym, Arc::new(var.fork_into(weak.clone()))))
                    .collect(),
            ),
        })
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({})", self.name)
    }
}
