// vim: tw=80
//! Expectation configuration and retirement
#![deny(warnings)]

use understudy::*;

#[derive(Debug, thiserror::Error)]
#[error("go go gadget")]
struct GoGoGadget;

fn thing(ctx: &Context) -> Mock {
    let class = Class::new("ThingToMock", module_path!())
        .method("bar", &[])
        .method("baz", &[]);
    Mock::builder(class).context(ctx).build()
}

fn is_unexpected(r: Result<Value, Error>) -> bool {
    matches!(r, Err(Error::UnexpectedCall(_)))
}

#[test]
fn expect_no_call() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    mock["baz"].expect(());
    assert!(matches!(ctx.assert_satisfied(), Err(Error::Unmet(_))));
}

#[test]
fn expectation_list() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let exp = mock["baz"].expect(());
    let exp2 = mock["baz"].expect(args![1; two = "two"]);

    assert_eq!(vec![exp.clone(), exp2.clone()], ctx.expectations());
    assert_eq!(Some(mock["baz"].id().clone()), exp.method());

    mock.call("baz", ()).unwrap();
    assert_eq!(vec![exp2.clone()], ctx.expectations());
    assert!(exp.is_retired());
    mock.call("baz", args![1; two = "two"]).unwrap();
    assert!(ctx.expectations().is_empty());
    assert!(exp2.is_retired());
}

#[test]
fn chained_handle_knows_its_mock() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let exp = mock["bar"].expect(()).returns(3).unwrap();
    assert_eq!(Some(mock.id()), exp.method().map(|m| m.mock()));
    mock.call("bar", ()).unwrap();
    ctx.assert_satisfied().unwrap();
}

#[test]
fn one_call_too_many() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    mock["baz"].expect(());
    mock["baz"].expect(());

    mock.call("baz", ()).unwrap();
    mock.call("baz", ()).unwrap();
    assert!(is_unexpected(mock.call("baz", ())));
    ctx.assert_satisfied().unwrap();
}

#[test]
fn wrong_arguments() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    mock["baz"].expect(args![3, "foo"]);

    assert!(is_unexpected(mock.call("baz", args![3, "fooo"])));
    assert!(is_unexpected(mock.call("baz", args!["foo", 3])));
    mock.call("baz", args![3, "foo"]).unwrap();
    ctx.assert_satisfied().unwrap();
}

#[test]
fn wrong_keyword_arguments() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    mock["baz"].expect(args![; one = 3, two = "foo"]);

    assert!(is_unexpected(mock.call("baz", args![; one = 3, two = "fooo"])));
    assert!(is_unexpected(mock.call("baz", args![; one = "foo", two = 3])));
    assert!(is_unexpected(mock.call("baz", args![3, "foo"])));
    mock.call("baz", args![; two = "foo", one = 3]).unwrap();
    ctx.assert_satisfied().unwrap();
}

#[test]
fn force_return_values() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    mock["baz"].expect(()).returns(Value::None).unwrap();
    mock["baz"].expect(()).returns(432).unwrap();
    mock["baz"].expect(()).returns("foobarbaz").unwrap();
    mock["baz"].expect(());

    assert_eq!(Value::None, mock.call("baz", ()).unwrap());
    assert_eq!(Value::from(432), mock.call("baz", ()).unwrap());
    assert_eq!(Value::from("foobarbaz"), mock.call("baz", ()).unwrap());
    assert_eq!(Value::None, mock.call("baz", ()).unwrap());
    ctx.assert_satisfied().unwrap();
}

#[test]
fn raises() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    mock["bar"].expect(()).returns("w00t").unwrap();
    mock["bar"].expect(()).raises(GoGoGadget).unwrap();

    assert_eq!(Value::from("w00t"), mock.call("bar", ()).unwrap());
    let e = mock.call("bar", ()).unwrap_err();
    assert!(e.raised().unwrap().downcast_ref::<GoGoGadget>().is_some());
    assert_eq!("go go gadget", e.to_string());
    // Raising still counts as satisfying the expectation
    ctx.assert_satisfied().unwrap();
}

#[test]
fn raise_and_return_conflict() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let e = mock["bar"].expect(()).returns(1).unwrap()
        .raises(GoGoGadget)
        .unwrap_err();
    assert!(matches!(e, Error::ReturnConflict(_)), "{e:?}");

    let e = mock["bar"].expect(()).raises(GoGoGadget).unwrap()
        .returning(|_| Value::from(1))
        .unwrap_err();
    assert!(matches!(e, Error::ReturnConflict(_)), "{e:?}");
}

#[test]
fn returns_twice_replaces() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    mock["bar"].expect(()).returns(1).unwrap().returns(2).unwrap();
    assert_eq!(Value::from(2), mock.call("bar", ()).unwrap());
}

#[test]
fn returning() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let mut calls = 0;
    mock["bar"].expect(pattern![anything()])
        .times(3)
        .returning(move |args| {
            calls += 1;
            let x = args.get(0).and_then(Value::as_int).unwrap_or(0);
            Value::from(x * 10 + calls)
        }).unwrap();

    assert_eq!(Value::from(11), mock.call("bar", args![1]).unwrap());
    assert_eq!(Value::from(52), mock.call("bar", args![5]).unwrap());
    assert_eq!(Value::from(3), mock.call("bar", args![0]).unwrap());
}

#[test]
fn times() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let exp = mock["bar"].expect(()).times(27);
    assert_eq!(Times::Finite(27), exp.remaining());

    for _ in 0..27 {
        mock.call("bar", ()).unwrap();
    }
    assert!(is_unexpected(mock.call("bar", ())));
    assert_eq!(Times::Finite(0), exp.remaining());
    ctx.assert_satisfied().unwrap();
}

#[test]
fn times_zero_retires_immediately() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let exp = mock["bar"].expect(()).times(0);
    assert!(exp.is_retired());
    assert!(is_unexpected(mock.call("bar", ())));
    ctx.assert_satisfied().unwrap();
}

#[test]
fn infinite_times() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let exp = mock["bar"].expect(()).infinite_times();
    assert!(exp.is_optional());
    assert!(ctx.required_expectations().is_empty());
    ctx.assert_satisfied().unwrap();

    for _ in 0..500 {
        mock.call("bar", ()).unwrap();
    }
    assert!(!exp.is_retired());
    assert_eq!(Times::Infinite, exp.remaining());
}

#[test]
fn optional() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let exp = mock["bar"].expect(()).optional();
    ctx.assert_satisfied().unwrap();
    mock.call("bar", ()).unwrap();
    assert!(exp.is_retired());
}

#[test]
fn retired_handle() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let exp = mock["bar"].expect(());
    mock.call("bar", ()).unwrap();

    let e = exp.clone().returns(1).unwrap_err();
    assert!(matches!(e, Error::Retired(id) if id == exp.id()), "{e:?}");
    assert!(matches!(exp.satisfy(&Args::new()), Err(Error::Retired(_))));
    assert!(exp.info().is_none());
    // Infallible configuration is ignored
    let exp = exp.times(5)
        .optional()
        .infinite_times()
        .until_sums_to(args![3])
        .times(0);
    assert!(exp.is_retired());
    assert_eq!(Times::Finite(0), exp.remaining());
    assert!(ctx.expectations().is_empty());
}

#[test]
fn satisfy_directly() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let exp = mock["bar"].expect(args![1]).returns("x").unwrap().times(2);
    assert_eq!(Value::from("x"), exp.satisfy(&args![1]).unwrap());
    assert_eq!(Times::Finite(1), exp.remaining());
    assert_eq!(Value::from("x"), exp.satisfy(&args![1]).unwrap());
    assert!(exp.is_retired());
}

#[test]
fn first_match_wins() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    mock["bar"].expect(pattern![anything()]).returns("any").unwrap();
    mock["bar"].expect(args![1]).returns("one").unwrap();

    assert_eq!(Value::from("any"), mock.call("bar", args![1]).unwrap());
    assert_eq!(Value::from("one"), mock.call("bar", args![1]).unwrap());
}

#[test]
fn info_snapshot() {
    let ctx = Context::new();
    let mock = thing(&ctx);
    let exp = mock["bar"].expect(args![1; k = "v"]).times(2);
    let info = exp.info().unwrap();
    assert_eq!(exp.id(), info.id);
    assert_eq!("bar", info.method.name());
    assert_eq!(r#"1, k="v""#, info.pattern.to_string());
    assert_eq!(Times::Finite(2), info.remaining);
    assert!(!info.optional);
    assert!(!info.sequenced);
    assert_eq!(r#"bar(1, k="v") [2 times]"#, info.to_string());
}
