//! One grammar and one catalog shared by many threads.

use opgram::testing::{calculator, CalcContext};
use opgram::{Catalog, Grammar, Parser};
use std::sync::{Arc, Barrier};
use std::thread;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_shared_types_are_send_and_sync() {
    assert_send_sync::<Parser<CalcContext>>();
    assert_send_sync::<Catalog<CalcContext>>();
    assert_send_sync::<Grammar>();
}

#[test]
fn test_threads_share_one_catalog() {
    const THREADS: i64 = 8;

    let grammar = Arc::new(calculator::grammar().unwrap());
    let catalog = Arc::new(calculator::catalog().unwrap());
    let barrier = Barrier::new(THREADS as usize);

    let results: Vec<(i64, Vec<i64>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|x| {
                let parser = Parser::new(Arc::clone(&grammar), Arc::clone(&catalog));
                let barrier = &barrier;
                scope.spawn(move || {
                    let ctx = CalcContext::new().with("x", x);
                    barrier.wait();
                    let values: Vec<i64> = [
                        "x * 2 + sum(1, 2, 3) - max(x, 4)",
                        "(x + 1) ^ 2",
                        "-x - -abs(x - 10)",
                    ]
                    .iter()
                    .map(|text| parser.parse::<i64>(&ctx, text).unwrap())
                    .collect();
                    (x, values)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.len(), THREADS as usize);
    for (x, values) in results {
        assert_eq!(
            values,
            vec![x * 2 + 6 - x.max(4), (x + 1).pow(2), -x + (x - 10).abs()]
        );
    }
}

#[test]
fn test_one_parser_serves_many_threads() {
    let parser = calculator::parser().unwrap();
    let ctx = CalcContext::new().with("y", 3);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for n in 0..50_i64 {
                    let text = format!("{} * y + 1", n);
                    assert_eq!(parser.parse::<i64>(&ctx, &text).unwrap(), n * 3 + 1);
                }
            });
        }
    });
}
