use log::trace;

use crate::error::{Error, Result};
use crate::evaluate;
use crate::language::Value;
use crate::runtime::Context;

impl Context {
    /// Expand `form` once if it is a call to a macro; otherwise return it
    /// unchanged (the same object).
    ///
    /// The macro function is called with the whole form, `nil` in place of
    /// an environment, and then the call's own arguments.
    pub fn macroexpand1(&self, form: &Value) -> Result<Value> {
        let Value::List(items) = form else {
            return Ok(form.clone());
        };
        let Some(Value::Symbol(head)) = items.first() else {
            return Ok(form.clone());
        };

        // No var means not a macro. No meta means no :macro flag.
        let Some(var) = self.find_var(head)? else {
            return Ok(form.clone());
        };
        if var.meta().is_none() {
            return Ok(form.clone());
        }
        let macro_key = Value::Keyword(self.intern_keyword("", "macro", true)?);
        if !var.meta_flag(&macro_key) {
            return Ok(form.clone());
        }

        let Some(expander) = var.get_root() else {
            return Err(Error::runtime(format!("macro {var} is unbound")));
        };
        let mut args = Vec::with_capacity(items.len() + 1);
        args.push(form.clone());
        args.push(Value::Nil);
        args.extend(items[1..].iter().cloned());

        let expanded = evaluate::apply(self, &expander, &args)?;
        trace!("macroexpand1 {form} -> {expanded}");
        Ok(expanded)
    }

    /// Expand until a step hands back the very object it was given.
    ///
    /// A macro that keeps returning fresh but equal forms would never settle,
    /// so at most `Options::macroexpand_limit` expansions are applied.
    pub fn macroexpand(&self, form: &Value) -> Result<Value> {
        let limit = self.options().macroexpand_limit;
        let mut current = form.clone();
        let mut steps = 0;
        loop {
            let expanded = self.macroexpand1(&current)?;
            if Value::identical(&expanded, &current) {
                return Ok(current);
            }
            if steps == limit {
                return Err(Error::MacroexpansionLimit {
                    form: form.to_string(),
                    limit,
                });
            }
            steps += 1;
            current = expanded;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::parser::Parser;
    use crate::stdlib::register_stdlib;

    fn context(limit: usize) -> Context {
        let ctx = Context::with_options(Options::default().with_macroexpand_limit(limit));
        register_stdlib(&ctx);
        ctx
    }

    fn read(ctx: &Context, code: &str) -> Value {
        Parser::new(ctx, code).next().unwrap().unwrap()
    }

    #[test]
    fn test_zero_limit_still_settles_plain_forms() {
        let ctx = context(0);
        let form = read(&ctx, "(+ 1 2)");
        let expanded = ctx.macroexpand(&form).unwrap();
        assert!(Value::identical(&form, &expanded));
    }

    #[test]
    fn test_zero_limit_rejects_a_real_expansion() {
        let ctx = context(0);
        ctx.eval_string("(defmacro m [] '(+ 1 2))").unwrap();
        let form = read(&ctx, "(m)");
        assert!(matches!(
            ctx.macroexpand(&form),
            Err(Error::MacroexpansionLimit { limit: 0, .. })
        ));
    }

    #[test]
    fn test_limit_counts_applied_expansions() {
        let ctx = context(2);
        ctx.eval_string("(defmacro a [] '(b)) (defmacro b [] '(+ 1 2))")
            .unwrap();
        let form = read(&ctx, "(a)");
        assert_eq!(ctx.macroexpand(&form).unwrap().to_string(), "(+ 1 2)");

        let ctx = context(1);
        ctx.eval_string("(defmacro a [] '(b)) (defmacro b [] '(+ 1 2))")
            .unwrap();
        let form = read(&ctx, "(a)");
        assert!(ctx.macroexpand(&form).is_err());
    }

    #[test]
    fn test_macroexpand1_ignores_var_without_macro_meta() {
        let ctx = context(10);
        ctx.eval_string("(def plain (fn [& args] 1))").unwrap();
        let form = read(&ctx, "(plain 2)");
        assert!(Value::identical(&ctx.macroexpand1(&form).unwrap(), &form));
    }
}
