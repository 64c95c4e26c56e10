use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use loam::{Context, Symbol, Value};

const THREADS: usize = 8;

/// Run `f` on `THREADS` threads released at the same moment.
fn race<T, F>(ctx: &Arc<Context>, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(&Context, usize) -> T + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(THREADS));
    let f = Arc::new(f);
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let ctx = Arc::clone(ctx);
            let barrier = Arc::clone(&barrier);
            let f = Arc::clone(&f);
            thread::spawn(move || {
                barrier.wait();
                f(&ctx, i)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn test_context_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Context>();
    assert_send_sync::<Value>();
}

#[test]
fn test_concurrent_intern_ns_yields_one_namespace() {
    let ctx = Arc::new(Context::new());
    let all = race(&ctx, |ctx, _| ctx.intern_ns(Symbol::unqualified("shared")));
    assert!(all.iter().all(|ns| Arc::ptr_eq(ns, &all[0])));
}

#[test]
fn test_concurrent_intern_var_yields_one_var() {
    let ctx = Arc::new(Context::new());
    ctx.intern_ns(Symbol::unqualified("user"));
    let all = race(&ctx, |ctx, _| ctx.intern_var_in("user", "x").unwrap());
    assert!(all.iter().all(|var| Arc::ptr_eq(var, &all[0])));
}

#[test]
fn test_concurrent_intern_keyword_yields_one_keyword() {
    let ctx = Arc::new(Context::new());
    let all = race(&ctx, |ctx, _| {
        (0..100)
            .map(|i| ctx.intern_keyword("", &format!("k{i}"), true).unwrap())
            .collect::<Vec<_>>()
    });
    for keywords in &all {
        for (a, b) in keywords.iter().zip(&all[0]) {
            assert!(Arc::ptr_eq(a, b));
        }
    }
}

#[test]
fn test_concurrent_unique_strings_never_collide() {
    let ctx = Arc::new(Context::new());
    let all = race(&ctx, |ctx, _| {
        (0..500).map(|_| ctx.unique_string()).collect::<Vec<_>>()
    });
    let total: usize = all.iter().map(Vec::len).sum();
    let distinct: HashSet<_> = all.into_iter().flatten().collect();
    assert_eq!(distinct.len(), total);
}

#[test]
fn test_unique_strings_unique_across_clones() {
    let ctx = Context::new();
    let clone = ctx.clone();
    let a: HashSet<_> = (0..100).map(|_| ctx.unique_string()).collect();
    let b: HashSet<_> = (0..100).map(|_| clone.unique_string()).collect();
    assert!(a.is_disjoint(&b));
}

#[test]
fn test_var_roots_updated_from_many_threads() {
    let ctx = Arc::new(Context::new());
    ctx.intern_ns(Symbol::unqualified("user"));
    let var = ctx.intern_var_in("user", "counter").unwrap();
    var.set_root(Value::Int(0));

    race(&ctx, |ctx, i| {
        let var = ctx.intern_var_in("user", "counter").unwrap();
        for _ in 0..100 {
            var.set_root(Value::Int(i as i64));
            assert!(var.get_root().is_some());
        }
    });
    assert!(matches!(var.get_root(), Some(Value::Int(n)) if (0..THREADS as i64).contains(&n)));
}

#[test]
fn test_each_thread_switches_namespace_independently() {
    let ctx = Arc::new(Context::new());
    let names = race(&ctx, |ctx, i| {
        let name = format!("thread-{i}");
        ctx.in_ns(Symbol::unqualified(&name));
        thread::yield_now();
        (name, ctx.current_ns().unwrap().name().to_string())
    });
    for (expected, actual) in names {
        assert_eq!(expected, actual);
    }
}
