use std::sync::Arc;
use std::thread;

use loam::{CORE_NS, Context, Symbol, Value, register_stdlib};

#[test]
fn test_clone_has_independent_namespaces() {
    let ctx = Context::new();
    let user = ctx.intern_ns(Symbol::unqualified("user"));
    let clone = ctx.clone();

    let cloned_user = clone.find_ns(&Symbol::unqualified("user")).unwrap();
    assert!(!Arc::ptr_eq(&user, &cloned_user));

    clone.intern_ns(Symbol::unqualified("only-in-clone"));
    assert!(ctx.find_ns(&Symbol::unqualified("only-in-clone")).is_none());
}

#[test]
fn test_clone_vars_are_independent() {
    let ctx = Context::new();
    ctx.intern_ns(Symbol::unqualified("user"));
    ctx.intern_var_in("user", "x").unwrap().set_root(Value::Int(1));

    let clone = ctx.clone();
    let cloned = clone.intern_var_in("user", "x").unwrap();
    assert_eq!(cloned.get_root(), Some(Value::Int(1)));

    cloned.set_root(Value::Int(2));
    assert_eq!(
        ctx.intern_var_in("user", "x").unwrap().get_root(),
        Some(Value::Int(1))
    );
}

#[test]
fn test_clone_shares_keywords() {
    let ctx = Context::new();
    let kw = ctx.intern_keyword("", "shared", true).unwrap();
    let clone = ctx.clone();
    let again = clone.intern_keyword("", "shared", true).unwrap();
    assert!(Arc::ptr_eq(&kw, &again));
}

#[test]
fn test_clone_copies_current_namespace() {
    let ctx = Context::new();
    ctx.in_ns(Symbol::unqualified("user"));
    let clone = ctx.clone();

    let current = clone.current_ns().unwrap();
    assert_eq!(current.name(), Symbol::unqualified("user"));
    // It's the clone's own namespace, not the original's.
    assert!(Arc::ptr_eq(
        &current,
        &clone.find_ns(&Symbol::unqualified("user")).unwrap()
    ));
}

#[test]
fn test_in_ns_in_clone_leaves_original_alone() {
    let ctx = Context::new();
    ctx.in_ns(Symbol::unqualified("user"));
    let clone = ctx.clone();

    clone.in_ns(Symbol::unqualified("elsewhere"));
    assert_eq!(ctx.current_ns().unwrap().name(), Symbol::unqualified("user"));
    assert_eq!(
        clone.current_ns().unwrap().name(),
        Symbol::unqualified("elsewhere")
    );
}

#[test]
fn test_clone_thread_state_points_at_clone_vars() {
    let ctx = Context::new();
    let clone = ctx.clone();
    let state = clone.get_thread_state();
    let ns_var = clone.intern_var_in(CORE_NS, "*ns*").unwrap();
    let in_ns = clone.intern_var_in(CORE_NS, "in-ns").unwrap();
    assert!(Arc::ptr_eq(&state.current_ns, &ns_var));
    assert!(Arc::ptr_eq(&state.in_ns, &in_ns));
}

#[test]
fn test_clone_of_other_thread_state() {
    let ctx = Arc::new(Context::new());
    {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            ctx.in_ns(Symbol::unqualified("worker"));
        })
        .join()
        .unwrap();
    }
    let clone = ctx.clone();
    // Cloning from the main thread keeps the main thread in clojure.core.
    assert_eq!(
        clone.current_ns().unwrap().name(),
        Symbol::unqualified(CORE_NS)
    );
    assert!(clone.find_ns(&Symbol::unqualified("worker")).is_some());
}

#[test]
fn test_clone_evaluates_independently() {
    let ctx = Context::new();
    register_stdlib(&ctx);
    ctx.eval_string("(def x 1)").unwrap();

    let clone = ctx.clone();
    clone.eval_string("(def x 100)").unwrap();
    assert_eq!(ctx.eval_string("x").unwrap(), Some(Value::Int(1)));
    assert_eq!(clone.eval_string("(+ x 1)").unwrap(), Some(Value::Int(101)));
}
