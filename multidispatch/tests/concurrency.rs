//! Concurrent dispatch and registration.

use std::sync::Arc;
use std::thread;

use multidispatch::{GenericFunction, Signature, Ty, TypeUniverse, Value};

#[test]
fn test_parallel_calls_share_one_resolution() {
    let f = Arc::new(GenericFunction::new("f", TypeUniverse::shared()));
    f.register([Ty::INT, Ty::INT], |args: &[Value]| {
        Ok(Value::int(args[0].as_int().unwrap_or(0) * args[1].as_int().unwrap_or(0)))
    })
    .unwrap();

    let handles: Vec<_> = (0..8_i64)
        .map(|i| {
            let f = Arc::clone(&f);
            thread::spawn(move || {
                (0..100_i64)
                    .map(|j| f.call(&[Value::int(i), Value::int(j)]).unwrap().as_int().unwrap())
                    .sum::<i64>()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), i as i64 * 4950);
    }
    assert_eq!(f.cached_signatures(), vec![vec![Ty::INT, Ty::INT]]);
}

#[test]
fn test_registration_during_dispatch_is_observed() {
    let f = Arc::new(GenericFunction::new("f", TypeUniverse::shared()));
    f.register([Ty::OBJECT], |_: &[Value]| Ok(Value::str("object"))).unwrap();

    let reader = {
        let f = Arc::clone(&f);
        thread::spawn(move || {
            for _ in 0..1_000 {
                let out = f.call(&[Value::bool(true)]).unwrap();
                let label = out.as_str().unwrap_or_default().to_string();
                assert!(label == "object" || label == "int", "unexpected {label}");
            }
        })
    };

    f.register([Ty::INT], |_: &[Value]| Ok(Value::str("int"))).unwrap();
    reader.join().unwrap();

    // whatever the interleaving, the stale resolution is gone afterwards
    assert_eq!(f.call(&[Value::bool(true)]).unwrap().as_str(), Some("int"));
    assert_eq!(f.resolve_signature(&[Ty::BOOL]).unwrap(), Signature::of([Ty::INT]));
}
