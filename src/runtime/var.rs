use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::language::{Symbol, Value};
use crate::runtime::Namespace;

/// A named, mutable binding cell owned by exactly one namespace.
///
/// Root and metadata are locked independently of the namespace's var table;
/// holding that table's lock only says the var exists.
pub struct Var {
    ns: Weak<Namespace>,
    name: Symbol,
    root: RwLock<Option<Value>>,
    meta: RwLock<Option<Value>>,
}

impl Var {
    pub fn new(ns: Weak<Namespace>, name: Symbol) -> Self {
        Var {
            ns,
            name,
            root: RwLock::new(None),
            meta: RwLock::new(None),
        }
    }

    pub fn with_root(ns: Weak<Namespace>, name: Symbol, root: Value) -> Self {
        Var {
            ns,
            name,
            root: RwLock::new(Some(root)),
            meta: RwLock::new(None),
        }
    }

    /// The owning namespace, if the registry holding it is still alive.
    pub fn namespace(&self) -> Option<Arc<Namespace>> {
        self.ns.upgrade()
    }

    /// Fully qualified name.
    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn get_root(&self) -> Option<Value> {
        self.root.read().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.root.read().is_some()
    }

    pub fn set_root(&self, value: Value) {
        *self.root.write() = Some(value);
    }

    pub fn meta(&self) -> Option<Value> {
        self.meta.read().clone()
    }

    pub fn set_meta(&self, meta: Value) {
        *self.meta.write() = Some(meta);
    }

    /// True when the metadata map carries a truthy entry under `key`.
    pub fn meta_flag(&self, key: &Value) -> bool {
        match &*self.meta.read() {
            Some(Value::Map(entries)) => entries.get(key).is_some_and(Value::is_truthy),
            _ => false,
        }
    }

    /// Copy this var for a cloned namespace. Root and metadata are copied
    /// by value, so later `set_root` calls on either side stay independent.
    pub(crate) fn fork_into(&self, ns: Weak<Namespace>) -> Var {
        Var {
            ns,
            name: self.name,
            root: RwLock::new(self.get_root()),
            meta: RwLock::new(self.meta()),
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#'{}", self.name)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var({})", self.name)
    }
}
