use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use im::{HashMap as ImHashMap, Vector as ImVector};

use crate::analyze::Expr;
use crate::error::Result;
use crate::interner::InternedStr;
use crate::runtime::{Context, Namespace, Var};

// ============================================================================
// Symbol
// ============================================================================

/// An immutable `(namespace, name)` pair. An empty namespace means unqualified.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    ns: InternedStr,
    name: InternedStr,
}

impl Symbol {
    pub fn new(ns: &str, name: &str) -> Self {
        Symbol {
            ns: InternedStr::new(ns),
            name: InternedStr::new(name),
        }
    }

    pub fn unqualified(name: &str) -> Self {
        Symbol {
            ns: InternedStr::empty(),
            name: InternedStr::new(name),
        }
    }

    pub fn from_parts(ns: InternedStr, name: InternedStr) -> Self {
        Symbol { ns, name }
    }

    /// Split reader text such as `clojure.core/map` into its two parts.
    /// A lone `/` and anything ending in `/` keep the whole text as the name.
    pub fn parse(text: &str) -> Self {
        match text.find('/') {
            Some(idx) if idx > 0 && idx + 1 < text.len() => {
                Symbol::new(&text[..idx], &text[idx + 1..])
            }
            _ => Symbol::unqualified(text),
        }
    }

    pub fn ns(&self) -> InternedStr {
        self.ns
    }

    pub fn name(&self) -> InternedStr {
        self.name
    }

    pub fn is_qualified(&self) -> bool {
        !self.ns.is_empty()
    }

    /// The same name under a different namespace.
    pub fn with_ns(&self, ns: InternedStr) -> Self {
        Symbol { ns, name: self.name }
    }

    /// Drop the namespace part, keeping only the name.
    pub fn without_ns(&self) -> Self {
        Symbol {
            ns: InternedStr::empty(),
            name: self.name,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ns.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.ns, self.name)
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({self})")
    }
}

// ============================================================================
// Keyword
// ============================================================================

/// Canonical keyword. Only ever created by `Context::intern_keyword`.
pub struct Keyword {
    sym: Symbol,
    resolved: bool,
}

impl Keyword {
    pub(crate) fn new(sym: Symbol, resolved: bool) -> Self {
        Keyword { sym, resolved }
    }

    pub fn sym(&self) -> Symbol {
        self.sym
    }

    pub fn resolved(&self) -> bool {
        self.resolved
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.sym)
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keyword({self})")
    }
}

// ============================================================================
// Callables
// ============================================================================

/// Lexical bindings visible to a closure body.
pub type Locals = ImHashMap<Symbol, Value>;

/// Native function signature. Natives receive the context the same way
/// interpreted code does, so they can intern and resolve.
pub type NativeFnPtr = fn(&Context, &[Value]) -> Result<Value>;

#[derive(Clone, Copy)]
pub struct NativeFn {
    pub name: &'static str,
    pub func: NativeFnPtr,
}

impl PartialEq for NativeFn {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.func as usize == other.func as usize
    }
}

/// A function value produced by evaluating `fn`.
pub struct Closure {
    pub name: Option<Symbol>,
    pub params: Vec<Symbol>,
    pub rest: Option<Symbol>,
    pub body: Arc<Expr>,
    pub env: Locals,
}

// ============================================================================
// Value
// ============================================================================

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Symbol(Symbol),
    Keyword(Arc<Keyword>),
    List(Arc<Vec<Value>>),
    Vector(ImVector<Value>),
    Map(ImHashMap<Value, Value>),
    NativeFn(NativeFn),
    Fn(Arc<Closure>),
    Namespace(Arc<Namespace>),
    Var(Arc<Var>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }

    pub fn string(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    pub fn symbol(text: &str) -> Self {
        Value::Symbol(Symbol::parse(text))
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Reference identity for heap values, value equality for immediates.
    pub fn identical(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
            (Value::Symbol(x), Value::Symbol(y)) => x == y,
            (Value::Str(x), Value::Str(y)) => Arc::ptr_eq(x, y),
            (Value::Keyword(x), Value::Keyword(y)) => Arc::ptr_eq(x, y),
            (Value::List(x), Value::List(y)) => Arc::ptr_eq(x, y),
            (Value::Vector(x), Value::Vector(y)) => x.ptr_eq(y),
            (Value::Map(x), Value::Map(y)) => x.ptr_eq(y),
            (Value::NativeFn(x), Value::NativeFn(y)) => x == y,
            (Value::Fn(x), Value::Fn(y)) => Arc::ptr_eq(x, y),
            (Value::Namespace(x), Value::Namespace(y)) => Arc::ptr_eq(x, y),
            (Value::Var(x), Value::Var(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// The elements of a sequenceable value, or `None` if it isn't one.
    pub fn seq_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::Nil => Some(Vec::new()),
            Value::List(items) => Some(items.as_ref().clone()),
            Value::Vector(items) => Some(items.iter().cloned().collect()),
            Value::Map(entries) => Some(
                entries
                    .iter()
                    .map(|(k, v)| Value::Vector(ImVector::from(vec![k.clone(), v.clone()])))
                    .collect(),
            ),
            Value::Str(s) => Some(s.chars().map(|c| Value::string(&c.to_string())).collect()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::NativeFn(_) | Value::Fn(_) => "function",
            Value::Namespace(_) => "namespace",
            Value::Var(_) => "var",
        }
    }

    /// Like `Display`, but strings come out without quotes. This is what
    /// `print` and `println` write.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            _ => format!("{self}"),
        }
    }
}

// Keywords compare by name; interning makes that the same as identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => {
                a.sym == b.sym && a.resolved == b.resolved
            }
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::List(a), Value::Vector(b)) | (Value::Vector(b), Value::List(a)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::NativeFn(a), Value::NativeFn(b)) => a == b,
            (Value::Fn(a), Value::Fn(b)) => Arc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => Arc::ptr_eq(a, b),
            (Value::Var(a), Value::Var(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Nil => 0u8.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Symbol(s) => s.hash(state),
            Value::Keyword(k) => {
                k.sym.hash(state);
                k.resolved.hash(state);
            }
            // Lists and vectors are equal element-wise, so they share a hash.
            Value::List(items) => hash_sequential(items.iter(), items.len(), state),
            Value::Vector(items) => hash_sequential(items.iter(), items.len(), state),
            Value::Map(entries) => {
                // Order-independent: combine per-entry hashes.
                let mut combined: u64 = 0;
                for (k, v) in entries.iter() {
                    let mut h = DefaultHasher::new();
                    k.hash(&mut h);
                    v.hash(&mut h);
                    combined = combined.wrapping_add(h.finish());
                }
                state.write_usize(entries.len());
                state.write_u64(combined);
            }
            Value::NativeFn(f) => f.name.hash(state),
            Value::Fn(c) => (Arc::as_ptr(c) as usize).hash(state),
            Value::Namespace(ns) => (Arc::as_ptr(ns) as usize).hash(state),
            Value::Var(v) => (Arc::as_ptr(v) as usize).hash(state),
        }
    }
}

fn hash_sequential<'a, H: Hasher>(
    items: impl Iterator<Item = &'a Value>,
    len: usize,
    state: &mut H,
) {
    state.write_usize(len);
    for item in items {
        item.hash(state);
    }
}

// ============================================================================
// Display Implementation
// ============================================================================

fn write_seq<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    close: &str,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => write!(f, "{:?}", s.as_ref()),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Keyword(k) => write!(f, "{k}"),
            Value::List(items) => write_seq(f, "(", ")", items.iter()),
            Value::Vector(items) => write_seq(f, "[", "]", items.iter()),
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} {v}")?;
                }
                f.write_str("}")
            }
            Value::NativeFn(native) => write!(f, "#<native-fn {}>", native.name),
            Value::Fn(closure) => match closure.name {
                Some(name) => write!(f, "#<fn {name}>"),
                None => f.write_str("#<fn>"),
            },
            Value::Namespace(ns) => write!(f, "#<namespace {}>", ns.name()),
            Value::Var(var) => write!(f, "{var}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
