//! Demo showing one registry shared by several threads, each with its own
//! current namespace.
//!
//! Run with: cargo run --example thread_safety_demo

use std::sync::Arc;
use std::thread;

use loam::{Context, Symbol, register_stdlib};

fn main() {
    println!("=== Thread Safety Demo ===\n");

    let ctx = Arc::new(Context::new());
    register_stdlib(&ctx);

    println!("Spawning 5 threads...");
    let handles: Vec<_> = (0..5)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                let code = format!("(in-ns 'worker-{i}) (def n {i}) (* n n)");
                match ctx.eval_string(&code) {
                    Ok(Some(value)) => {
                        let ns = ctx
                            .current_ns()
                            .map(|ns| ns.name().to_string())
                            .unwrap_or_default();
                        println!("  Thread {i} in {ns}: {value}");
                    }
                    Ok(None) => println!("  Thread {i}: no value"),
                    Err(e) => println!("  Thread {i}: error: {e}"),
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            eprintln!("a worker thread panicked");
        }
    }

    // Keywords interned on any thread are the same object everywhere.
    let kw = ctx.intern_keyword("", "shared", true);
    let from_thread = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || ctx.intern_keyword("", "shared", true))
            .join()
            .ok()
    };
    if let (Ok(a), Some(Ok(b))) = (kw, from_thread) {
        println!("\n:shared is one object across threads: {}", Arc::ptr_eq(&a, &b));
    }

    println!("\nNamespaces created:");
    for ns in ctx.namespaces() {
        println!("  {}", ns.name());
    }
    println!(
        "Main thread is still in {}",
        ctx.current_ns()
            .map(|ns| ns.name().to_string())
            .unwrap_or_default()
    );
}
