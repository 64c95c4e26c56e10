pub mod analyze;
pub mod error;
pub mod evaluate;
pub mod interner;
pub mod language;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod runtime;
pub mod stdlib;

// Re-export commonly used items for convenience
pub use analyze::{Analyzer, Expr, ExpressionType};
pub use error::{Error, InternError, Result};
pub use evaluate::{apply, eval};
pub use language::{Keyword, Locals, NativeFn, Symbol, Value};
pub use options::Options;
pub use parser::Parser;
pub use runtime::{CORE_NS, Context, Namespace, ThreadState, Var};
pub use stdlib::register_stdlib;
