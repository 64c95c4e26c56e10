use std::sync::Arc;

use log::trace;

use crate::error::Result;
use crate::interner::InternedStr;
use crate::language::{Symbol, Value};
use crate::runtime::{Context, Var};

impl Context {
    /// Attach the calling thread's current namespace to a bare symbol.
    /// Qualified symbols come back unchanged. No existence checks happen.
    pub fn qualify_symbol(&self, sym: &Symbol) -> Result<Symbol> {
        if sym.is_qualified() {
            return Ok(*sym);
        }
        let current = self.current_ns()?;
        Ok(sym.with_ns(current.name().name()))
    }

    /// Find the var a symbol names.
    ///
    /// A qualified symbol is looked up exactly as given in the namespace it
    /// names. A bare symbol is looked up in the calling thread's current
    /// namespace only.
    pub fn find_var(&self, sym: &Symbol) -> Result<Option<Arc<Var>>> {
        let found = if sym.is_qualified() {
            self.find_ns(&Symbol::from_parts(InternedStr::empty(), sym.ns()))
                .and_then(|ns| ns.find_var(sym))
        } else {
            let current = self.current_ns()?;
            current.find_var(&sym.with_ns(current.name().name()))
        };
        trace!("find_var {sym} -> {}", found.is_some());
        Ok(found)
    }

    /// Lexical locals are tracked by the analyzer; the registry never has any.
    pub fn find_local(&self, _sym: &Symbol) -> Option<Value> {
        None
    }
}
