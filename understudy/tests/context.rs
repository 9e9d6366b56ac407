// vim: tw=80
//! Context bookkeeping
#![deny(warnings)]

use understudy::*;

fn thing(ctx: &Context) -> Mock {
    let class = Class::new("ThingToMock", module_path!())
        .method("bar", &["x"])
        .method("baz", &["x"]);
    Mock::builder(class).context(ctx).build()
}

#[test]
fn contexts_are_independent() {
    let ctx1 = Context::new();
    let ctx2 = Context::new();
    let m1 = thing(&ctx1);
    let _m2 = thing(&ctx2);
    m1["bar"].expect(args![1]);

    assert!(ctx1.assert_satisfied().is_err());
    ctx2.assert_satisfied().unwrap();
    assert_ne!(ctx1, ctx2);
    assert_eq!(ctx1, ctx1.clone());
    assert_eq!(&ctx1, m1.context());
}

#[test]
fn retire_all() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let seq = Sequence::new();
    let a = mock["bar"].expect(args![1]);
    mock["bar"].expect(args![2]).in_sequence(&seq).unwrap();

    ctx.retire_all();
    assert!(ctx.expectations().is_empty());
    assert!(ctx.sequences().is_empty());
    assert!(ctx.active_expectations().is_empty());
    assert!(seq.is_empty());
    assert!(a.is_retired());
    ctx.assert_satisfied().unwrap();
    assert!(mock.call("bar", args![1]).is_err());

    // The context is still usable afterwards
    mock["bar"].expect(args![3]);
    mock.call("bar", args![3]).unwrap();
}

#[test]
fn required_and_pending() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let seq = Sequence::new();
    let required = mock["bar"].expect(args![1]);
    mock["bar"].expect(args![2]).optional();
    mock["bar"].expect(args![3]).infinite_times();
    let sequenced = mock["baz"].expect(args![1]).in_sequence(&seq).unwrap();

    assert_eq!(vec![required.clone()], ctx.required_expectations());
    assert_eq!(vec![required, sequenced], ctx.pending_expectations());
}

#[test]
fn unmet_carries_required() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let a = mock["bar"].expect(args![1]);
    mock["bar"].expect(args![2]).optional();
    match ctx.assert_satisfied() {
        Err(Error::Unmet(u)) => {
            assert_eq!(1, u.required.len());
            assert_eq!(a.id(), u.required[0].id);
        },
        r => panic!("Unexpected result {r:?}")
    }
}

#[test]
fn remove() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let a = mock["bar"].expect(args![1]);
    ctx.remove(&a).unwrap();
    assert!(a.is_retired());
    assert!(matches!(ctx.remove(&a), Err(Error::Retired(_))));
    assert!(mock.call("bar", args![1]).is_err());
}

#[test]
fn unexpected_call_snapshots_active_set() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let seq = Sequence::new();
    let a = mock["bar"].expect(args![1]).in_sequence(&seq).unwrap();
    mock["bar"].expect(args![2]).in_sequence(&seq).unwrap();
    let c = mock["baz"].expect(args![1]);

    match mock.call("bar", args![2]) {
        Err(Error::UnexpectedCall(u)) => {
            assert_eq!("bar", u.call.method.name());
            assert_eq!(args![2], u.call.args);
            let ids = u.active.iter().map(|i| i.id).collect::<Vec<_>>();
            assert_eq!(vec![a.id(), c.id()], ids);
        },
        r => panic!("Unexpected result {r:?}")
    }
}

#[test]
fn reentrant_returning() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let inner = mock.clone();
    mock["baz"].expect(args![2]).returns("inner").unwrap();
    mock["bar"].expect(args![1])
        .returning(move |_| inner.call("baz", args![2]).unwrap())
        .unwrap();
    assert_eq!(Value::from("inner"), mock.call("bar", args![1]).unwrap());
    ctx.assert_satisfied().unwrap();
}

/// Argument predicates may themselves call mocks of the same context
#[test]
fn reentrant_predicate() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let oracle = thing(&ctx);
    oracle["baz"].expect(args![1]).returns(true).unwrap().infinite_times();
    let inner = oracle.clone();
    let approved = predicate::function(move |x: &i64| {
        inner.call("baz", args![*x]).ok().and_then(|v| v.as_bool())
            == Some(true)
    });
    mock["bar"].expect(pattern![matches(approved)])
        .returns("approved")
        .unwrap()
        .times(2);

    assert_eq!(Value::from("approved"), mock.call("bar", args![1]).unwrap());
    assert!(matches!(mock.call("bar", args![2]),
        Err(Error::UnexpectedCall(_))));
    assert_eq!(Value::from("approved"), mock.call("bar", args![1]).unwrap());
    ctx.assert_satisfied().unwrap();
}

#[test]
fn default_context_is_per_thread() {
    default_context().retire_all();
    let class = Class::new("ThingToMock", module_path!()).method("bar", &[]);
    let mock = Mock::new(class.clone());
    assert_eq!(&default_context(), mock.context());
    mock["bar"].expect(());

    std::thread::spawn(move || {
        default_context().assert_satisfied().unwrap();
        let other = Mock::new(class);
        assert!(other.call("bar", ()).is_err());
    }).join().unwrap();

    assert!(default_context().assert_satisfied().is_err());
    mock.call("bar", ()).unwrap();
    default_context().assert_satisfied().unwrap();
}
