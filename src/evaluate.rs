//! Tree-walking evaluation of analyzed expressions.

use std::sync::Arc;

use im::{HashMap as ImHashMap, Vector as ImVector};

use crate::analyze::Expr;
use crate::error::{Error, Result};
use crate::language::{Closure, Locals, Value};
use crate::runtime::Context;

// ============================================================================
// Evaluator
// ============================================================================

pub fn eval(ctx: &Context, expr: &Expr, locals: &Locals) -> Result<Value> {
    match expr {
        Expr::Const(value) => Ok(value.clone()),

        Expr::VarRef(var) => var
            .get_root()
            .ok_or_else(|| Error::runtime(format!("unbound var: {var}"))),

        Expr::Local(sym) => locals
            .get(sym)
            .cloned()
            .ok_or_else(|| Error::runtime(format!("unbound local: {sym}"))),

        Expr::Def { var, value, meta } => {
            if let Some(value) = value {
                let value = eval(ctx, value, locals)?;
                var.set_root(value);
            }
            if let Some(meta) = meta {
                var.set_meta(meta.clone());
            }
            Ok(Value::Var(Arc::clone(var)))
        }

        Expr::If {
            test,
            then,
            otherwise,
        } => {
            if eval(ctx, test, locals)?.is_truthy() {
                eval(ctx, then, locals)
            } else {
                match otherwise {
                    Some(otherwise) => eval(ctx, otherwise, locals),
                    None => Ok(Value::Nil),
                }
            }
        }

        Expr::Do(exprs) => {
            let mut result = Value::Nil;
            for expr in exprs {
                result = eval(ctx, expr, locals)?;
            }
            Ok(result)
        }

        Expr::Let { bindings, body } => {
            let mut scope = locals.clone();
            for (name, init) in bindings {
                let value = eval(ctx, init, &scope)?;
                scope.insert(*name, value);
            }
            eval(ctx, body, &scope)
        }

        Expr::Fn(func) => Ok(Value::Fn(Arc::new(Closure {
            name: func.name,
            params: func.params.clone(),
            rest: func.rest,
            body: Arc::clone(&func.body),
            env: locals.clone(),
        }))),

        Expr::Call { callee, args } => {
            let f = eval(ctx, callee, locals)?;
            let args = args
                .iter()
                .map(|arg| eval(ctx, arg, locals))
                .collect::<Result<Vec<_>>>()?;
            apply(ctx, &f, &args)
        }

        Expr::Vector(items) => Ok(Value::Vector(
            items
                .iter()
                .map(|item| eval(ctx, item, locals))
                .collect::<Result<ImVector<_>>>()?,
        )),

        Expr::Map(entries) => {
            let mut map = ImHashMap::new();
            for (k, v) in entries {
                map.insert(eval(ctx, k, locals)?, eval(ctx, v, locals)?);
            }
            Ok(Value::Map(map))
        }

        Expr::TheVar(var) => Ok(Value::Var(Arc::clone(var))),
    }
}

// ============================================================================
// Application
// ============================================================================

/// Call `f` with already-evaluated arguments.
pub fn apply(ctx: &Context, f: &Value, args: &[Value]) -> Result<Value> {
    match f {
        Value::NativeFn(native) => (native.func)(ctx, args),
        Value::Fn(closure) => apply_closure(ctx, closure, args),
        Value::Var(var) => match var.get_root() {
            Some(root) => apply(ctx, &root, args),
            None => Err(Error::runtime(format!("attempting to call unbound var: {var}"))),
        },
        Value::Keyword(_) => match args {
            [coll] => Ok(lookup(coll, f).unwrap_or(Value::Nil)),
            [coll, default] => Ok(lookup(coll, f).unwrap_or_else(|| default.clone())),
            _ => Err(arity_mismatch(f, args.len())),
        },
        Value::Map(map) => match args {
            [key] => Ok(map.get(key).cloned().unwrap_or(Value::Nil)),
            [key, default] => Ok(map.get(key).cloned().unwrap_or_else(|| default.clone())),
            _ => Err(arity_mismatch(f, args.len())),
        },
        _ => Err(Error::runtime(format!(
            "{f} ({}) is not callable",
            f.type_name()
        ))),
    }
}

fn apply_closure(ctx: &Context, closure: &Arc<Closure>, args: &[Value]) -> Result<Value> {
    let required = closure.params.len();
    let arity_ok = match closure.rest {
        Some(_) => args.len() >= required,
        None => args.len() == required,
    };
    if !arity_ok {
        return Err(arity_mismatch(&Value::Fn(Arc::clone(closure)), args.len()));
    }

    let mut env = closure.env.clone();
    if let Some(name) = closure.name {
        env.insert(name, Value::Fn(Arc::clone(closure)));
    }
    for (param, arg) in closure.params.iter().zip(args) {
        env.insert(*param, arg.clone());
    }
    if let Some(rest) = closure.rest {
        let extra = &args[required..];
        let value = if extra.is_empty() {
            Value::Nil
        } else {
            Value::list(extra.to_vec())
        };
        env.insert(rest, value);
    }

    eval(ctx, &closure.body, &env)
}

/// Associative lookup used by keywords in call position and `get`.
pub fn lookup(coll: &Value, key: &Value) -> Option<Value> {
    match (coll, key) {
        (Value::Map(map), _) => map.get(key).cloned(),
        (Value::Vector(items), Value::Int(idx)) => {
            usize::try_from(*idx).ok().and_then(|i| items.get(i).cloned())
        }
        _ => None,
    }
}

fn arity_mismatch(f: &Value, got: usize) -> Error {
    Error::runtime(format!("wrong number of args ({got}) passed to {f}"))
}
