use std::sync::Arc;

use loam::{Context, Parser, Symbol, Value};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Names that read back as a single symbol.
fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9*!?<>=-]{0,10}".prop_filter("reader literals", |s| {
        !matches!(s.as_str(), "nil" | "true" | "false")
    })
}

fn ns_name() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9-]{0,6}", 1..4).prop_map(|parts| parts.join("."))
}

proptest! {
    #[test]
    fn prop_symbol_display_parses_back(ns in ns_name(), n in name()) {
        let sym = Symbol::new(&ns, &n);
        prop_assert_eq!(Symbol::parse(&sym.to_string()), sym);
    }

    #[test]
    fn prop_intern_ns_is_canonical(ns in ns_name()) {
        let ctx = Context::new();
        let a = ctx.intern_ns(Symbol::unqualified(&ns));
        let b = ctx.intern_ns(Symbol::parse(&ns));
        prop_assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn prop_intern_var_is_canonical(ns in ns_name(), n in name()) {
        let ctx = Context::new();
        ctx.intern_ns(Symbol::unqualified(&ns));
        let a = ctx.intern_var_in(&ns, &n).unwrap();
        let b = ctx.intern_var(Symbol::new(&ns, &n)).unwrap();
        prop_assert!(Arc::ptr_eq(&a, &b));
        let found = ctx.find_var(&Symbol::new(&ns, &n)).unwrap();
        prop_assert!(found.is_some_and(|var| Arc::ptr_eq(&var, &a)));
    }

    #[test]
    fn prop_keyword_literals_are_identical(ns in ns_name(), n in name()) {
        let ctx = Context::new();
        let code = format!(":{ns}/{n} :{ns}/{n}");
        let forms: Vec<Value> = Parser::new(&ctx, &code)
            .collect::<loam::Result<_>>()
            .unwrap();
        prop_assert_eq!(forms.len(), 2);
        prop_assert!(Value::identical(&forms[0], &forms[1]));
    }

    #[test]
    fn prop_qualify_uses_current_ns(ns in ns_name(), n in name()) {
        let ctx = Context::new();
        ctx.in_ns(Symbol::unqualified(&ns));
        let qualified = ctx.qualify_symbol(&Symbol::unqualified(&n)).unwrap();
        prop_assert_eq!(qualified, Symbol::new(&ns, &n));
    }

    #[test]
    fn prop_unique_strings_are_distinct(prefix in "[a-z_]{0,5}", count in 1usize..200) {
        let ctx = Context::new();
        let generated: std::collections::HashSet<String> =
            (0..count).map(|_| ctx.unique_string_with(&prefix)).collect();
        prop_assert_eq!(generated.len(), count);
        for s in &generated {
            prop_assert!(s.starts_with(prefix.as_str()));
            prop_assert!(s[prefix.len()..].parse::<usize>().is_ok());
        }
    }
}
