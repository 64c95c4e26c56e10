use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use loam::{Context, Symbol};

fn bench_intern_var(n: usize) -> Duration {
    let ctx = Context::new();
    ctx.intern_ns(Symbol::unqualified("bench"));
    let start = Instant::now();

    for i in 0..n {
        ctx.intern_var_in("bench", &format!("var{i}")).ok();
    }

    start.elapsed()
}

/// Every lookup after the first hits the shared-lock fast path.
fn bench_intern_keyword_hits(n: usize) -> Duration {
    let ctx = Context::new();
    ctx.intern_keyword("", "hot", true).ok();
    let start = Instant::now();

    for _ in 0..n {
        ctx.intern_keyword("", "hot", true).ok();
    }

    start.elapsed()
}

fn bench_contended_keywords(threads: usize, n: usize) -> Duration {
    let ctx = Arc::new(Context::new());
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for i in 0..n {
                    ctx.intern_keyword("", &format!("k{}", i % 64), true).ok();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().ok();
    }

    start.elapsed()
}

fn main() {
    println!("Registry Interning Benchmark");
    println!("============================\n");

    for size in [10, 100, 1000, 10000] {
        let duration = bench_intern_var(size);
        let per_op = duration.as_nanos() / size as u128;
        println!("{size:5} intern_var:          {duration:?} ({per_op} ns/op)");
    }
    println!();

    for size in [1000, 100000] {
        let duration = bench_intern_keyword_hits(size);
        let per_op = duration.as_nanos() / size as u128;
        println!("{size:6} keyword hits:       {duration:?} ({per_op} ns/op)");
    }
    println!();

    for threads in [1, 4, 8] {
        let n = 10000;
        let duration = bench_contended_keywords(threads, n);
        let per_op = duration.as_nanos() / (threads * n) as u128;
        println!("{threads} threads x {n} keywords: {duration:?} ({per_op} ns/op)");
    }
}
