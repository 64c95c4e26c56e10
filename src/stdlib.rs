//! Native functions interned into `clojure.core`.
//!
//! `install_core` runs during `Context` construction and binds the handful of
//! natives the registry itself relies on. `register_stdlib` adds the rest.

use std::cmp::Ordering;
use std::sync::Arc;

use im::{HashMap as ImHashMap, Vector as ImVector};

use crate::error::{Error, Result};
use crate::evaluate;
use crate::language::{NativeFn, NativeFnPtr, Symbol, Value};
use crate::runtime::{CORE_NS, Context, IN_NS_VAR};

fn define(ctx: &Context, name: &'static str, func: NativeFnPtr) {
    ctx.core_ns()
        .intern_var(Symbol::new(CORE_NS, name))
        .set_root(Value::NativeFn(NativeFn { name, func }));
}

fn expect_arity(name: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(Error::runtime(format!(
            "{name}: expected {n} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

fn expect_seq(name: &str, value: &Value) -> Result<Vec<Value>> {
    value.seq_items().ok_or_else(|| {
        Error::runtime(format!("{name}: don't know how to create a sequence from {value}"))
    })
}

// ============================================================================
// Construction-time natives
// ============================================================================

pub fn install_core(ctx: &Context) {
    define(ctx, IN_NS_VAR, in_ns);
    define(ctx, "assert", assert);
    define(ctx, "seq", seq);
    define(ctx, "fresh-seq", fresh_seq);
}

/// Switch the calling thread to the namespace named by a symbol.
fn in_ns(ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("in-ns", args, 1)?;
    match &args[0] {
        Value::Symbol(sym) => {
            ctx.in_ns(*sym);
            Ok(Value::Nil)
        }
        other => Err(Error::runtime(format!(
            "in-ns: expected a symbol, got {other}"
        ))),
    }
}

fn assert(_ctx: &Context, args: &[Value]) -> Result<Value> {
    match args.first() {
        Some(value) if value.is_truthy() => Ok(Value::Nil),
        _ => Err(Error::AssertionFailed),
    }
}

/// `nil` for an empty collection, otherwise its elements as a list. A
/// non-empty list is returned as is.
fn seq(_ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("seq", args, 1)?;
    if let Value::List(items) = &args[0]
        && !items.is_empty()
    {
        return Ok(args[0].clone());
    }
    let items = expect_seq("seq", &args[0])?;
    if items.is_empty() {
        return Ok(Value::Nil);
    }
    Ok(Value::list(items))
}

/// Like `seq`, but always a new list, never the argument itself.
fn fresh_seq(_ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("fresh-seq", args, 1)?;
    let items = expect_seq("fresh-seq", &args[0])?;
    if items.is_empty() {
        return Ok(Value::Nil);
    }
    Ok(Value::list(items))
}

// ============================================================================
// Arithmetic
// ============================================================================

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn from_value(op: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Int(n) => Ok(Number::Int(*n)),
            Value::Float(x) => Ok(Number::Float(*x)),
            other => Err(Error::runtime(format!(
                "{op}: expected number, got {other}"
            ))),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Int(n) => Value::Int(n),
            Number::Float(x) => Value::Float(x),
        }
    }

    fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

fn arith(
    op: &str,
    a: Number,
    b: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Number> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_op(x, y)
            .map(Number::Int)
            .ok_or_else(|| Error::runtime(format!("{op}: integer overflow"))),
        (x, y) => Ok(Number::Float(float_op(x.as_f64(), y.as_f64()))),
    }
}

fn fold_numbers(
    op: &str,
    args: &[Value],
    identity: i64,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let mut acc = Number::Int(identity);
    for arg in args {
        acc = arith(op, acc, Number::from_value(op, arg)?, int_op, float_op)?;
    }
    Ok(acc.into_value())
}

fn add(_ctx: &Context, args: &[Value]) -> Result<Value> {
    fold_numbers("+", args, 0, i64::checked_add, |a, b| a + b)
}

fn mul(_ctx: &Context, args: &[Value]) -> Result<Value> {
    fold_numbers("*", args, 1, i64::checked_mul, |a, b| a * b)
}

fn sub(_ctx: &Context, args: &[Value]) -> Result<Value> {
    match args {
        [] => Err(Error::runtime("-: expected at least 1 argument")),
        [only] => fold_numbers("-", std::slice::from_ref(only), 0, i64::checked_sub, |a, b| {
            a - b
        }),
        [first, rest @ ..] => {
            let mut acc = Number::from_value("-", first)?;
            for arg in rest {
                acc = arith("-", acc, Number::from_value("-", arg)?, i64::checked_sub, |a, b| {
                    a - b
                })?;
            }
            Ok(acc.into_value())
        }
    }
}

fn divide(a: Number, b: Number) -> Result<Number> {
    match (a, b) {
        (_, Number::Int(0)) => Err(Error::runtime("/: divide by zero")),
        (Number::Int(x), Number::Int(y)) if x.checked_rem(y) == Some(0) => x
            .checked_div(y)
            .map(Number::Int)
            .ok_or_else(|| Error::runtime("/: integer overflow")),
        (x, y) => Ok(Number::Float(x.as_f64() / y.as_f64())),
    }
}

fn div(_ctx: &Context, args: &[Value]) -> Result<Value> {
    match args {
        [] => Err(Error::runtime("/: expected at least 1 argument")),
        [only] => Ok(divide(Number::Int(1), Number::from_value("/", only)?)?.into_value()),
        [first, rest @ ..] => {
            let mut acc = Number::from_value("/", first)?;
            for arg in rest {
                acc = divide(acc, Number::from_value("/", arg)?)?;
            }
            Ok(acc.into_value())
        }
    }
}

// ============================================================================
// Comparison
// ============================================================================

fn compare_chain(op: &str, args: &[Value], ok: fn(Ordering) -> bool) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::runtime(format!("{op}: expected at least 1 argument")));
    }
    let numbers = args
        .iter()
        .map(|arg| Number::from_value(op, arg))
        .collect::<Result<Vec<_>>>()?;
    let holds = numbers
        .windows(2)
        .all(|pair| pair[0].compare(pair[1]).is_some_and(ok));
    Ok(Value::Bool(holds))
}

fn lt(_ctx: &Context, args: &[Value]) -> Result<Value> {
    compare_chain("<", args, |o| o == Ordering::Less)
}

fn gt(_ctx: &Context, args: &[Value]) -> Result<Value> {
    compare_chain(">", args, |o| o == Ordering::Greater)
}

fn lte(_ctx: &Context, args: &[Value]) -> Result<Value> {
    compare_chain("<=", args, |o| o != Ordering::Greater)
}

fn gte(_ctx: &Context, args: &[Value]) -> Result<Value> {
    compare_chain(">=", args, |o| o != Ordering::Less)
}

fn equals(_ctx: &Context, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::runtime("=: expected at least 1 argument"));
    }
    Ok(Value::Bool(args.windows(2).all(|pair| pair[0] == pair[1])))
}

fn identical(_ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("identical?", args, 2)?;
    Ok(Value::Bool(Value::identical(&args[0], &args[1])))
}

fn not(_ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("not", args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

fn is_nil(_ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("nil?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Nil)))
}

// ============================================================================
// Collections
// ============================================================================

fn list(_ctx: &Context, args: &[Value]) -> Result<Value> {
    Ok(Value::list(args.to_vec()))
}

fn cons(_ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("cons", args, 2)?;
    let mut items = vec![args[0].clone()];
    items.extend(expect_seq("cons", &args[1])?);
    Ok(Value::list(items))
}

fn first(_ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("first", args, 1)?;
    let items = expect_seq("first", &args[0])?;
    Ok(items.into_iter().next().unwrap_or(Value::Nil))
}

fn rest(_ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("rest", args, 1)?;
    let items = expect_seq("rest", &args[0])?;
    Ok(Value::list(items.into_iter().skip(1).collect()))
}

fn count(_ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("count", args, 1)?;
    let n = match &args[0] {
        Value::Map(entries) => entries.len(),
        Value::Vector(items) => items.len(),
        Value::List(items) => items.len(),
        Value::Str(s) => s.chars().count(),
        other => expect_seq("count", other)?.len(),
    };
    i64::try_from(n)
        .map(Value::Int)
        .map_err(|_| Error::runtime("count: collection too large"))
}

fn vector(_ctx: &Context, args: &[Value]) -> Result<Value> {
    Ok(Value::Vector(ImVector::from(args.to_vec())))
}

fn hash_map(_ctx: &Context, args: &[Value]) -> Result<Value> {
    if args.len() % 2 != 0 {
        return Err(Error::runtime(
            "hash-map: expected an even number of arguments",
        ));
    }
    let map: ImHashMap<Value, Value> = args
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    Ok(Value::Map(map))
}

fn get(_ctx: &Context, args: &[Value]) -> Result<Value> {
    match args {
        [coll, key] => Ok(evaluate::lookup(coll, key).unwrap_or(Value::Nil)),
        [coll, key, default] => {
            Ok(evaluate::lookup(coll, key).unwrap_or_else(|| default.clone()))
        }
        _ => Err(Error::runtime(format!(
            "get: expected 2 or 3 arguments, got {}",
            args.len()
        ))),
    }
}

// ============================================================================
// Strings, symbols and keywords
// ============================================================================

fn str_fn(_ctx: &Context, args: &[Value]) -> Result<Value> {
    let s: String = args
        .iter()
        .map(|arg| match arg {
            Value::Nil => String::new(),
            other => other.to_display_string(),
        })
        .collect();
    Ok(Value::Str(Arc::from(s)))
}

fn name_text(op: &str, value: &Value) -> Result<String> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        Value::Symbol(sym) => Ok(sym.to_string()),
        Value::Keyword(kw) => Ok(kw.sym().to_string()),
        other => Err(Error::runtime(format!(
            "{op}: expected a string, symbol or keyword, got {other}"
        ))),
    }
}

fn keyword(ctx: &Context, args: &[Value]) -> Result<Value> {
    let sym = match args {
        [name] => Symbol::parse(&name_text("keyword", name)?),
        [ns, name] => Symbol::new(&name_text("keyword", ns)?, &name_text("keyword", name)?),
        _ => return Err(Error::runtime("keyword: expected 1 or 2 arguments")),
    };
    Ok(Value::Keyword(ctx.intern_keyword_sym(sym, true)?))
}

fn symbol(_ctx: &Context, args: &[Value]) -> Result<Value> {
    match args {
        [name] => Ok(Value::Symbol(Symbol::parse(&name_text("symbol", name)?))),
        [ns, name] => Ok(Value::Symbol(Symbol::new(
            &name_text("symbol", ns)?,
            &name_text("symbol", name)?,
        ))),
        _ => Err(Error::runtime("symbol: expected 1 or 2 arguments")),
    }
}

// ============================================================================
// Printing
// ============================================================================

fn print(ctx: &Context, args: &[Value]) -> Result<Value> {
    match args {
        [] => Ok(Value::Nil),
        [o] => ctx.print(o),
        [o, more @ ..] => ctx.print_more(o, &Value::list(more.to_vec())),
    }
}

fn println(ctx: &Context, args: &[Value]) -> Result<Value> {
    ctx.println(&Value::list(args.to_vec()))
}

// ============================================================================
// Macro support
// ============================================================================

/// `(gensym)` or `(gensym prefix)`.
fn gensym(ctx: &Context, args: &[Value]) -> Result<Value> {
    match args {
        [] => Ok(Value::Symbol(ctx.unique_symbol_with("G__"))),
        [prefix] => {
            let prefix = name_text("gensym", prefix)?;
            Ok(Value::Symbol(ctx.unique_symbol_with(&prefix)))
        }
        _ => Err(Error::runtime("gensym: expected 0 or 1 arguments")),
    }
}

fn macroexpand_1(ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("macroexpand-1", args, 1)?;
    ctx.macroexpand1(&args[0])
}

fn macroexpand(ctx: &Context, args: &[Value]) -> Result<Value> {
    expect_arity("macroexpand", args, 1)?;
    ctx.macroexpand(&args[0])
}

// ============================================================================
// Registration
// ============================================================================

pub fn register_stdlib(ctx: &Context) {
    // Arithmetic
    define(ctx, "+", add);
    define(ctx, "-", sub);
    define(ctx, "*", mul);
    define(ctx, "/", div);

    // Comparison
    define(ctx, "=", equals);
    define(ctx, "<", lt);
    define(ctx, ">", gt);
    define(ctx, "<=", lte);
    define(ctx, ">=", gte);
    define(ctx, "not", not);
    define(ctx, "nil?", is_nil);
    define(ctx, "identical?", identical);

    // Collections
    define(ctx, "list", list);
    define(ctx, "cons", cons);
    define(ctx, "first", first);
    define(ctx, "rest", rest);
    define(ctx, "count", count);
    define(ctx, "vector", vector);
    define(ctx, "hash-map", hash_map);
    define(ctx, "get", get);

    // Strings, symbols and keywords
    define(ctx, "str", str_fn);
    define(ctx, "keyword", keyword);
    define(ctx, "symbol", symbol);

    // Standard I/O
    define(ctx, "print", print);
    define(ctx, "println", println);

    // Macro support
    define(ctx, "gensym", gensym);
    define(ctx, "macroexpand-1", macroexpand_1);
    define(ctx, "macroexpand", macroexpand);
}
