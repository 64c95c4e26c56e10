//! The live environment: the registry of namespaces, vars and keywords,
//! symbol resolution, macroexpansion and the read/analyze/evaluate driver.

mod context;
mod eval;
mod macroexpand;
mod namespace;
mod print;
mod resolve;
mod var;

pub use context::{CORE_NS, CURRENT_NS_VAR, Context, IN_NS_VAR, ThreadState};
pub use namespace::Namespace;
pub use var::Var;
