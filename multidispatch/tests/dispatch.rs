//! Dispatch behaviour through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use multidispatch::{
    Context, Config, DispatchError, Error, GenericFunction, Method, Signature, Ty, TypeUniverse, Value,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn number(v: &Value) -> f64 {
    v.as_int()
        .map(|n| n as f64)
        .or_else(|| v.as_float())
        .unwrap_or(f64::NAN)
}

fn scenario_add() -> GenericFunction {
    let add = GenericFunction::new("add", TypeUniverse::shared());
    add.register([Ty::INT, Ty::INT], |args: &[Value]| {
        Ok(Value::int(args[0].as_int().unwrap_or(0) + args[1].as_int().unwrap_or(0) + 1))
    })
    .unwrap();
    add.register([Ty::FLOAT, Ty::FLOAT], |args: &[Value]| {
        Ok(Value::float(number(&args[0]) + number(&args[1]) + 1.5))
    })
    .unwrap();
    add.register_fallback(|args: &[Value]| Ok(Value::float(number(&args[0]) + number(&args[1]) + 3.14)))
        .unwrap();
    add
}

#[test]
fn test_add_scenario() {
    let add = scenario_add();
    assert_eq!(add.call(&[Value::int(1), Value::int(1)]).unwrap().as_int(), Some(3));
    assert_eq!(add.call(&[Value::float(1.0), Value::float(1.0)]).unwrap().as_float(), Some(3.5));

    let mixed = add.call(&[Value::int(1), Value::float(1.0)]).unwrap().as_float().unwrap();
    assert!((mixed - 4.14).abs() < 1e-12);
}

#[test]
fn test_list_registered_after_scenario() {
    let add = scenario_add();
    assert_eq!(
        add.list_registered(),
        vec![
            Signature::Any,
            Signature::of([Ty::INT, Ty::INT]),
            Signature::of([Ty::FLOAT, Ty::FLOAT]),
        ]
    );
    assert_eq!(format!("{:?}", add), "<generic function add() with 3 methods>");
}

#[test]
fn test_most_specific_method_wins() {
    let universe = TypeUniverse::shared();
    let a = universe.declare("A", &[Ty::INT]).unwrap();
    let b = universe.declare("B", &[a]).unwrap();

    let f = GenericFunction::new("f", universe);
    for (i, sig) in [[Ty::OBJECT, Ty::OBJECT], [Ty::INT, Ty::INT], [a, Ty::INT], [a, a]]
        .into_iter()
        .enumerate()
    {
        f.register(sig, move |_: &[Value]| Ok(Value::int(i as i64))).unwrap();
    }

    let call = |x: Ty, y: Ty| {
        f.call(&[Value::new(x, ()), Value::new(y, ())])
            .unwrap()
            .as_int()
            .unwrap()
    };
    assert_eq!(call(b, b), 3);
    assert_eq!(call(b, Ty::INT), 2);
    assert_eq!(call(Ty::BOOL, b), 1);
    assert_eq!(call(Ty::STR, b), 0);
}

#[test]
fn test_ambiguity_between_incomparable_signatures() {
    let universe = TypeUniverse::shared();
    let a = universe.declare("A", &[Ty::INT]).unwrap();
    let f = GenericFunction::new("f", universe);
    f.register([Ty::INT, Ty::INT], |_: &[Value]| Ok(Value::str("int,int"))).unwrap();
    f.register([a, Ty::INT], |_: &[Value]| Ok(Value::str("A,int"))).unwrap();
    f.register([Ty::INT, a], |_: &[Value]| Ok(Value::str("int,A"))).unwrap();

    // (A, int) and (int, A) are both unambiguous on their own
    let ok = f.call(&[Value::new(a, 0_i64), Value::int(0)]).unwrap();
    assert_eq!(ok.as_str(), Some("A,int"));

    let err = f.call(&[Value::new(a, 0_i64), Value::new(a, 0_i64)]).unwrap_err();
    match err {
        Error::Dispatch(DispatchError::AmbiguousDispatch { name, call, signatures, .. }) => {
            assert_eq!(name, "f");
            assert_eq!(call, "f(A, A)");
            assert_eq!(signatures, vec![Signature::of([a, Ty::INT]), Signature::of([Ty::INT, a])]);
        }
        other => panic!("expected an ambiguity, got {other:?}"),
    }
}

#[test]
fn test_call_is_idempotent() {
    let add = scenario_add();
    let args = [Value::int(2), Value::int(3)];
    let first = add.preview(&args).unwrap();
    add.call(&args).unwrap();
    let second = add.preview(&args).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_registration_invalidates_coarser_resolutions() {
    let f = GenericFunction::new("f", TypeUniverse::shared());
    f.register([Ty::OBJECT, Ty::OBJECT], |_: &[Value]| Ok(Value::str("object"))).unwrap();

    let args = [Value::bool(true), Value::int(1)];
    let stale = f.preview(&args).unwrap();
    assert_eq!(f.call(&args).unwrap().as_str(), Some("object"));

    f.register([Ty::INT, Ty::INT], |_: &[Value]| Ok(Value::str("int"))).unwrap();
    let fresh = f.preview(&args).unwrap();
    assert!(!Arc::ptr_eq(&stale, &fresh));
    assert_eq!(f.call(&args).unwrap().as_str(), Some("int"));
}

#[test]
fn test_unrelated_cache_entries_survive_registration() {
    let f = GenericFunction::new("f", TypeUniverse::shared());
    f.register_fallback(|_: &[Value]| Ok(Value::str("fallback"))).unwrap();
    let s = f.preview(&[Value::str("x")]).unwrap();

    f.register([Ty::INT], |_: &[Value]| Ok(Value::str("int"))).unwrap();
    assert!(Arc::ptr_eq(&s, &f.preview(&[Value::str("y")]).unwrap()));
}

#[test]
fn test_factory_receives_concrete_types() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let universe = TypeUniverse::shared();
    let describe = GenericFunction::new("describe", universe.clone());
    describe
        .register_factory([Ty::OBJECT], Some(Ty::STR), move |sig: &Signature, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            let text = sig.display("describe", &universe).to_string();
            let method: Method =
                Arc::new(move |_: &[Value]| -> multidispatch::Result<Value> { Ok(Value::str(text.clone())) });
            Ok(method)
        })
        .unwrap();

    let out = describe.call(&[Value::float(1.0)]).unwrap();
    assert_eq!(out.as_str(), Some("describe(float)"));
    let out = describe.call(&[Value::bool(false)]).unwrap();
    assert_eq!(out.as_str(), Some("describe(bool)"));
    describe.call(&[Value::float(2.0)]).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn test_factory_errors_propagate() {
    let f = GenericFunction::new("f", TypeUniverse::shared());
    f.register_factory([Ty::INT], None, |_: &Signature, _| Err(Error::Arithmetic("no".to_string())))
        .unwrap();
    assert!(matches!(f.call(&[Value::int(1)]), Err(Error::Arithmetic(_))));
    assert!(f.cached_signatures().is_empty());
}

#[test]
fn test_context_operators_are_generic() {
    let cx = Context::new(Config::default()).unwrap();
    let add = cx.arithmetic().function(multidispatch::BinaryOp::Add);
    assert!(add.contains(&Signature::of([Ty::INT, Ty::INT])));
    assert!(add.contains(&Signature::Any));
    assert_eq!(add.arity(), Some(2));
}

fn tower() -> (Arc<TypeUniverse>, Vec<Ty>) {
    let universe = TypeUniverse::shared();
    let a = universe.declare("A", &[]).unwrap();
    let b = universe.declare("B", &[a]).unwrap();
    let c = universe.declare("C", &[a]).unwrap();
    let d = universe.declare("D", &[b, c]).unwrap();
    (universe, vec![Ty::OBJECT, a, b, c, d])
}

proptest! {
    #[test]
    fn prop_resolution_ignores_registration_order(
        order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let (universe, types) = tower();
        let signatures: Vec<Signature> = vec![
            Signature::of([types[0], types[0]]),
            Signature::of([types[1], types[1]]),
            Signature::of([types[2], types[1]]),
            Signature::of([types[1], types[3]]),
            Signature::of([types[4], types[4]]),
            Signature::of([types[2], types[3]]),
        ];

        let reference = GenericFunction::new("f", universe.clone());
        let shuffled = GenericFunction::new("f", universe.clone());
        for (i, sig) in signatures.iter().enumerate() {
            reference.register(sig.clone(), move |_: &[Value]| Ok(Value::int(i as i64))).unwrap();
        }
        for &i in &order {
            shuffled.register(signatures[i].clone(), move |_: &[Value]| Ok(Value::int(i as i64))).unwrap();
        }

        for &x in &types {
            for &y in &types {
                let expected = reference.resolve_signature(&[x, y]).map_err(|e| e.to_string());
                let actual = shuffled.resolve_signature(&[x, y]).map_err(|e| e.to_string());
                match (&expected, &actual) {
                    (Ok(e), Ok(a)) => prop_assert_eq!(e, a),
                    (Err(_), Err(_)) => {}
                    _ => prop_assert!(false, "{:?} vs {:?}", expected, actual),
                }
            }
        }
    }
}
