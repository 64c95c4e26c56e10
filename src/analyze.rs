//! Turns read forms into `Expr` trees.
//!
//! The analyzer owns the lexical scope stack. Globals are resolved through the
//! context: locals first, then `Context::find_var`, then `clojure.core` for
//! unqualified symbols. Macro calls are expanded before analysis.

use std::sync::Arc;

use im::HashMap as ImHashMap;
use log::trace;

use crate::error::{Error, Result};
use crate::interner::InternedStr;
use crate::language::{Symbol, Value};
use crate::runtime::{CORE_NS, Context, Var};

/// Where an expression's value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionType {
    /// Top level or a non-final `do` form; the value is kept only as the
    /// "last value" of a unit.
    Statement,
    Expression,
    /// Tail of a function body.
    Return,
}

#[derive(Debug)]
pub struct FnExpr {
    pub name: Option<Symbol>,
    pub params: Vec<Symbol>,
    pub rest: Option<Symbol>,
    pub body: Arc<Expr>,
}

#[derive(Debug)]
pub enum Expr {
    Const(Value),
    VarRef(Arc<Var>),
    Local(Symbol),
    Def {
        var: Arc<Var>,
        value: Option<Box<Expr>>,
        meta: Option<Value>,
    },
    If {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },
    Do(Vec<Expr>),
    Let {
        bindings: Vec<(Symbol, Expr)>,
        body: Box<Expr>,
    },
    Fn(Arc<FnExpr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Vector(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    TheVar(Arc<Var>),
}

const SPECIAL_FORMS: &[&str] = &["quote", "def", "defmacro", "if", "do", "let", "fn", "var"];

pub struct Analyzer<'a> {
    ctx: &'a Context,
    scopes: Vec<Vec<Symbol>>,
}

impl<'a> Analyzer<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Analyzer {
            ctx,
            scopes: Vec::new(),
        }
    }

    pub fn analyze(&mut self, form: &Value, ty: ExpressionType) -> Result<Expr> {
        match form {
            Value::Symbol(sym) => self.analyze_symbol(sym),
            Value::List(items) if !items.is_empty() => self.analyze_list(form, items, ty),
            Value::Vector(items) => Ok(Expr::Vector(
                items
                    .iter()
                    .map(|item| self.analyze(item, ExpressionType::Expression))
                    .collect::<Result<_>>()?,
            )),
            Value::Map(entries) => Ok(Expr::Map(
                entries
                    .iter()
                    .map(|(k, v)| {
                        Ok((
                            self.analyze(k, ExpressionType::Expression)?,
                            self.analyze(v, ExpressionType::Expression)?,
                        ))
                    })
                    .collect::<Result<_>>()?,
            )),
            _ => Ok(Expr::Const(form.clone())),
        }
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    fn is_local(&self, sym: &Symbol) -> bool {
        !sym.is_qualified() && self.scopes.iter().rev().any(|scope| scope.contains(sym))
    }

    /// Find the global var `sym` names, falling back to `clojure.core` for
    /// unqualified symbols.
    fn resolve_var(&self, sym: &Symbol) -> Result<Option<Arc<Var>>> {
        if let Some(var) = self.ctx.find_var(sym)? {
            return Ok(Some(var));
        }
        if sym.is_qualified() {
            return Ok(None);
        }
        let core = self.ctx.core_ns();
        Ok(core.find_var(&sym.with_ns(InternedStr::new(CORE_NS))))
    }

    fn analyze_symbol(&self, sym: &Symbol) -> Result<Expr> {
        if self.is_local(sym) {
            return Ok(Expr::Local(*sym));
        }
        match self.resolve_var(sym)? {
            Some(var) => Ok(Expr::VarRef(var)),
            None => Err(Error::analyze(format!(
                "unable to resolve symbol: {sym} in this context"
            ))),
        }
    }

    fn is_macro(&self, var: &Var) -> Result<bool> {
        let key = Value::Keyword(self.ctx.intern_keyword("", "macro", true)?);
        Ok(var.meta_flag(&key))
    }

    // ------------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------------

    fn analyze_list(&mut self, form: &Value, items: &[Value], ty: ExpressionType) -> Result<Expr> {
        if let Value::Symbol(head) = &items[0]
            && !self.is_local(head)
        {
            if !head.is_qualified() {
                let name = head.name().resolve();
                if SPECIAL_FORMS.contains(&name.as_str()) {
                    return self.analyze_special(&name, items, ty);
                }
            }

            if let Some(var) = self.resolve_var(head)?
                && self.is_macro(&var)?
            {
                // Name the macro exactly so expansion finds it even when it
                // was only visible through the core fallback.
                let call = if var.name() == *head {
                    form.clone()
                } else {
                    let mut call = items.to_vec();
                    call[0] = Value::Symbol(var.name());
                    Value::list(call)
                };
                let expanded = self.ctx.macroexpand(&call)?;
                trace!("expanded {form} -> {expanded}");
                return self.analyze(&expanded, ty);
            }
        }

        let callee = self.analyze(&items[0], ExpressionType::Expression)?;
        let args = items[1..]
            .iter()
            .map(|arg| self.analyze(arg, ExpressionType::Expression))
            .collect::<Result<_>>()?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
        })
    }

    fn analyze_special(&mut self, name: &str, items: &[Value], ty: ExpressionType) -> Result<Expr> {
        let args = &items[1..];
        match name {
            "quote" => match args {
                [quoted] => Ok(Expr::Const(quoted.clone())),
                _ => Err(arity_error("quote", "1", args.len())),
            },
            "def" => self.analyze_def(args),
            "defmacro" => self.analyze_defmacro(args),
            "if" => self.analyze_if(args, ty),
            "do" => self.analyze_body(args, ty),
            "let" => self.analyze_let(args, ty),
            "fn" => Ok(Expr::Fn(Arc::new(self.analyze_fn(args)?))),
            "var" => match args {
                [Value::Symbol(sym)] => self
                    .resolve_var(sym)?
                    .map(Expr::TheVar)
                    .ok_or_else(|| Error::analyze(format!("unable to resolve var: {sym}"))),
                [other] => Err(Error::analyze(format!("var expects a symbol, got {other}"))),
                _ => Err(arity_error("var", "1", args.len())),
            },
            _ => Err(Error::analyze(format!("unknown special form: {name}"))),
        }
    }

    /// Intern the var a `def` target names in the current namespace.
    fn def_target(&self, form: &str, target: &Value) -> Result<Arc<Var>> {
        let Value::Symbol(sym) = target else {
            return Err(Error::analyze(format!(
                "first argument to {form} must be a symbol, got {target}"
            )));
        };
        let current = self.ctx.current_ns()?;
        if sym.is_qualified() && sym.ns() != current.name().name() {
            return Err(Error::analyze(format!(
                "can't create a var for {sym} outside the current namespace"
            )));
        }
        let qualified = self.ctx.qualify_symbol(sym)?;
        Ok(self.ctx.intern_var(qualified)?)
    }

    fn analyze_def(&mut self, args: &[Value]) -> Result<Expr> {
        let (target, init) = match args {
            [target] => (target, None),
            [target, init] => (target, Some(init)),
            // A docstring between the name and the value is accepted and dropped.
            [target, Value::Str(_), init] => (target, Some(init)),
            _ => return Err(arity_error("def", "1 or 2", args.len())),
        };
        let var = self.def_target("def", target)?;
        let value = match init {
            Some(init) => Some(Box::new(self.analyze(init, ExpressionType::Expression)?)),
            None => None,
        };
        Ok(Expr::Def {
            var,
            value,
            meta: None,
        })
    }

    /// `(defmacro name [params] body...)` defines a function taking the whole
    /// form and an environment ahead of its own parameters.
    fn analyze_defmacro(&mut self, args: &[Value]) -> Result<Expr> {
        let [target, params, body @ ..] = args else {
            return Err(arity_error("defmacro", "at least 2", args.len()));
        };
        let Value::Vector(params) = params else {
            return Err(Error::analyze(format!(
                "defmacro parameters must be a vector, got {params}"
            )));
        };
        let var = self.def_target("defmacro", target)?;

        let mut fn_form = vec![Value::Vector(
            [Value::symbol("&form"), Value::symbol("&env")]
                .into_iter()
                .chain(params.iter().cloned())
                .collect(),
        )];
        fn_form.extend(body.iter().cloned());
        let func = self.analyze_fn(&fn_form)?;

        let mut meta = ImHashMap::new();
        meta.insert(
            Value::Keyword(self.ctx.intern_keyword("", "macro", true)?),
            Value::Bool(true),
        );
        Ok(Expr::Def {
            var,
            value: Some(Box::new(Expr::Fn(Arc::new(func)))),
            meta: Some(Value::Map(meta)),
        })
    }

    fn analyze_if(&mut self, args: &[Value], ty: ExpressionType) -> Result<Expr> {
        let (test, then, otherwise) = match args {
            [test, then] => (test, then, None),
            [test, then, otherwise] => (test, then, Some(otherwise)),
            _ => return Err(arity_error("if", "2 or 3", args.len())),
        };
        let test = self.analyze(test, ExpressionType::Expression)?;
        let then = self.analyze(then, ty)?;
        let otherwise = match otherwise {
            Some(form) => Some(Box::new(self.analyze(form, ty)?)),
            None => None,
        };
        Ok(Expr::If {
            test: Box::new(test),
            then: Box::new(then),
            otherwise,
        })
    }

    /// Analyze a sequence of body forms; the last one gets `ty`.
    fn analyze_body(&mut self, forms: &[Value], ty: ExpressionType) -> Result<Expr> {
        let mut exprs = Vec::with_capacity(forms.len());
        for (i, form) in forms.iter().enumerate() {
            let form_ty = if i + 1 == forms.len() {
                ty
            } else {
                ExpressionType::Statement
            };
            exprs.push(self.analyze(form, form_ty)?);
        }
        if exprs.len() == 1 {
            return Ok(exprs.remove(0));
        }
        Ok(Expr::Do(exprs))
    }

    fn analyze_let(&mut self, args: &[Value], ty: ExpressionType) -> Result<Expr> {
        let [Value::Vector(pairs), body @ ..] = args else {
            return Err(Error::analyze("let requires a vector of bindings"));
        };
        if pairs.len() % 2 != 0 {
            return Err(Error::analyze(
                "let requires an even number of forms in its binding vector",
            ));
        }

        self.scopes.push(Vec::new());
        let result = self.analyze_let_scope(pairs, body, ty);
        self.scopes.pop();
        result
    }

    fn analyze_let_scope(
        &mut self,
        pairs: &im::Vector<Value>,
        body: &[Value],
        ty: ExpressionType,
    ) -> Result<Expr> {
        let mut bindings = Vec::with_capacity(pairs.len() / 2);
        let mut iter = pairs.iter();
        while let (Some(name), Some(init)) = (iter.next(), iter.next()) {
            let name = local_name(name)?;
            // Each init sees the names bound before it.
            let init = self.analyze(init, ExpressionType::Expression)?;
            if let Some(scope) = self.scopes.last_mut() {
                scope.push(name);
            }
            bindings.push((name, init));
        }
        Ok(Expr::Let {
            bindings,
            body: Box::new(self.analyze_body(body, ty)?),
        })
    }

    /// `(fn name? [params] body...)`.
    fn analyze_fn(&mut self, args: &[Value]) -> Result<FnExpr> {
        let (name, args) = match args {
            [name @ Value::Symbol(_), rest @ ..] => (Some(local_name(name)?), rest),
            _ => (None, args),
        };
        let [Value::Vector(param_forms), body @ ..] = args else {
            return Err(Error::analyze("fn requires a parameter vector"));
        };

        let mut params = Vec::with_capacity(param_forms.len());
        let mut rest = None;
        let mut iter = param_forms.iter();
        while let Some(param) = iter.next() {
            let sym = local_name(param)?;
            if sym.name().resolve() == "&" {
                let rest_form = iter
                    .next()
                    .ok_or_else(|| Error::analyze("expected a parameter after &"))?;
                rest = Some(local_name(rest_form)?);
                if iter.next().is_some() {
                    return Err(Error::analyze("only one parameter may follow &"));
                }
                break;
            }
            params.push(sym);
        }

        let mut scope: Vec<Symbol> = name.into_iter().collect();
        scope.extend(params.iter().copied());
        scope.extend(rest);
        self.scopes.push(scope);
        let body = self.analyze_body(body, ExpressionType::Return);
        self.scopes.pop();

        Ok(FnExpr {
            name,
            params,
            rest,
            body: Arc::new(body?),
        })
    }
}

fn local_name(form: &Value) -> Result<Symbol> {
    match form {
        Value::Symbol(sym) if !sym.is_qualified() => Ok(*sym),
        Value::Symbol(sym) => Err(Error::analyze(format!("can't bind qualified name: {sym}"))),
        other => Err(Error::analyze(format!("expected a symbol to bind, got {other}"))),
    }
}

fn arity_error(form: &str, expected: &str, got: usize) -> Error {
    Error::analyze(format!(
        "{form} expects {expected} argument(s), got {got}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyze_str(ctx: &Context, code: &str) -> Result<Expr> {
        let form = Parser::new(ctx, code).next().unwrap()?;
        Analyzer::new(ctx).analyze(&form, ExpressionType::Statement)
    }

    #[test]
    fn test_constants() {
        let ctx = Context::new();
        assert!(matches!(analyze_str(&ctx, "42").unwrap(), Expr::Const(Value::Int(42))));
        assert!(matches!(analyze_str(&ctx, "()").unwrap(), Expr::Const(_)));
        assert!(matches!(analyze_str(&ctx, "'(a b)").unwrap(), Expr::Const(Value::List(_))));
    }

    #[test]
    fn test_unresolved_symbol() {
        let ctx = Context::new();
        let err = analyze_str(&ctx, "nope").unwrap_err();
        assert!(err.to_string().contains("unable to resolve symbol: nope"));
    }

    #[test]
    fn test_core_fallback_from_other_namespace() {
        let ctx = Context::new();
        ctx.in_ns(Symbol::unqualified("user"));
        match analyze_str(&ctx, "in-ns").unwrap() {
            Expr::VarRef(var) => assert_eq!(var.name(), Symbol::new(CORE_NS, "in-ns")),
            other => panic!("expected var ref, got {other:?}"),
        }
    }

    #[test]
    fn test_def_interns_in_current_ns() {
        let ctx = Context::new();
        ctx.in_ns(Symbol::unqualified("user"));
        match analyze_str(&ctx, "(def x 1)").unwrap() {
            Expr::Def { var, value, meta } => {
                assert_eq!(var.name(), Symbol::new("user", "x"));
                assert!(value.is_some());
                assert!(meta.is_none());
            }
            other => panic!("expected def, got {other:?}"),
        }
        assert!(analyze_str(&ctx, "(def other/x 1)").is_err());
    }

    #[test]
    fn test_fn_params_are_locals() {
        let ctx = Context::new();
        match analyze_str(&ctx, "(fn self [a & more] (self a more))").unwrap() {
            Expr::Fn(func) => {
                assert_eq!(func.params, vec![Symbol::unqualified("a")]);
                assert_eq!(func.rest, Some(Symbol::unqualified("more")));
                assert!(matches!(*func.body, Expr::Call { .. }));
            }
            other => panic!("expected fn, got {other:?}"),
        }
        // Locals don't leak out of their scope.
        assert!(analyze_str(&ctx, "(do (fn [a] a) a)").is_err());
    }

    #[test]
    fn test_let_is_sequential() {
        let ctx = Context::new();
        assert!(analyze_str(&ctx, "(let [a 1 b a] b)").is_ok());
        assert!(analyze_str(&ctx, "(let [a b b 1] a)").is_err());
        assert!(analyze_str(&ctx, "(let [a] a)").is_err());
    }

    #[test]
    fn test_defmacro_sets_macro_meta() {
        let ctx = Context::new();
        match analyze_str(&ctx, "(defmacro m [x] x)").unwrap() {
            Expr::Def {
                value: Some(value),
                meta: Some(meta),
                ..
            } => {
                assert_eq!(meta.to_string(), "{:macro true}");
                match *value {
                    Expr::Fn(func) => assert_eq!(func.params.len(), 3),
                    other => panic!("expected fn, got {other:?}"),
                }
            }
            other => panic!("expected def, got {other:?}"),
        }
    }

    #[test]
    fn test_special_form_arity() {
        let ctx = Context::new();
        assert!(analyze_str(&ctx, "(if)").is_err());
        assert!(analyze_str(&ctx, "(quote a b)").is_err());
        assert!(analyze_str(&ctx, "(var nope)").is_err());
    }
}
