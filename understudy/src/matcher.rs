// vim: tw=80
//! Argument matching
//!
//! Every slot of an expected call is an [`Arg`]: either a literal [`Value`],
//! compared by equality, or a [`Matcher`] wrapping any predicate from the
//! [`predicates`] crate.  Whole-argument-list matchers can replace the
//! per-slot patterns entirely.

use std::{
    collections::BTreeMap,
    fmt,
    marker::PhantomData,
    rc::Rc,
};

use predicates::{
    prelude::*,
    reflection::{Case, PredicateReflection, Product},
};
use predicates_tree::CaseTreeExt;

use crate::value::{Args, FromValue, Kwargs, Value};

/// A shared predicate over `T`.
pub struct Matcher<T: ?Sized = Value>(Rc<dyn Predicate<T>>);

impl<T: ?Sized> Matcher<T> {
    pub fn new<P: Predicate<T> + 'static>(p: P) -> Self {
        Matcher(Rc::new(p))
    }

    pub fn eval(&self, variable: &T) -> bool {
        self.0.eval(variable)
    }

    /// Render why `variable` fails this matcher, or `None` if it passes.
    pub fn explain(&self, variable: &T) -> Option<String> {
        self.0.find_case(false, variable)
            .map(|case| case.tree().to_string())
    }
}

impl<T: ?Sized> Clone for Matcher<T> {
    fn clone(&self) -> Self {
        Matcher(self.0.clone())
    }
}

impl<T: ?Sized> fmt::Display for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl<T: ?Sized> fmt::Debug for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matcher({})", self.0)
    }
}

/// Evaluates a typed predicate against a [`Value`] by converting it first.
struct Extract<P, T> {
    pred: P,
    _t: PhantomData<fn(T)>,
}

impl<P, T> fmt::Display for Extract<P, T>
    where P: Predicate<T>, T: FromValue
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.pred, f)
    }
}

impl<P, T> PredicateReflection for Extract<P, T>
    where P: Predicate<T>, T: FromValue
{}

impl<P, T> Predicate<Value> for Extract<P, T>
    where P: Predicate<T>, T: FromValue
{
    fn eval(&self, variable: &Value) -> bool {
        T::from_value(variable.clone())
            .map_or(false, |t| self.pred.eval(&t))
    }

    fn find_case<'a>(&'a self, expected: bool, variable: &Value)
        -> Option<Case<'a>>
    {
        match T::from_value(variable.clone()) {
            Ok(t) => self.pred.find_case(expected, &t),
            Err(e) if !expected => Some(Case::new(Some(self), false)
                .add_product(Product::new("var", e.to_string()))),
            Err(_) => None
        }
    }
}

/// Evaluates a string predicate against [`Value::Str`] values.
struct ExtractStr<P>(P);

impl<P: Predicate<str>> fmt::Display for ExtractStr<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<P: Predicate<str>> PredicateReflection for ExtractStr<P> {}

impl<P: Predicate<str>> Predicate<Value> for ExtractStr<P> {
    fn eval(&self, variable: &Value) -> bool {
        variable.as_str().map_or(false, |s| self.0.eval(s))
    }

    fn find_case<'a>(&'a self, expected: bool, variable: &Value)
        -> Option<Case<'a>>
    {
        match variable.as_str() {
            Some(s) => self.0.find_case(expected, s),
            None if !expected => Some(Case::new(Some(self), false)
                .add_product(Product::new("var", variable.to_string()))),
            None => None
        }
    }
}

/// Match a single argument with a typed predicate.
///
/// Arguments that cannot be converted to `T` do not match.
///
/// # Examples
/// ```
/// # use understudy::*;
/// let m = matches(predicate::lt(3i64));
/// assert!(m.eval(&Value::from(2)));
/// assert!(!m.eval(&Value::from(3)));
/// assert!(!m.eval(&Value::from("two")));
/// ```
pub fn matches<T, P>(predicate: P) -> Matcher
    where T: FromValue + 'static, P: Predicate<T> + 'static
{
    Matcher::new(Extract { pred: predicate, _t: PhantomData })
}

/// Match a single string argument with a `str` predicate, like those in
/// [`predicate::str`].
pub fn matches_str<P>(predicate: P) -> Matcher
    where P: Predicate<str> + 'static
{
    Matcher::new(ExtractStr(predicate))
}

/// Match any single argument.
pub fn anything() -> Matcher {
    Matcher::new(PredicateNameExt::<Value>::name(predicate::always(),
        "anything"))
}

/// Match the whole positional argument list at once.
pub fn args_matching<P>(predicate: P) -> Matcher<[Value]>
    where P: Predicate<[Value]> + 'static
{
    Matcher::new(predicate)
}

/// Match the whole keyword argument map at once.
pub fn kwargs_matching<P>(predicate: P) -> Matcher<Kwargs>
    where P: Predicate<Kwargs> + 'static
{
    Matcher::new(predicate)
}

/// One slot of an expected call.
#[derive(Clone, Debug)]
pub enum Arg {
    Value(Value),
    Matches(Matcher),
}

impl Arg {
    /// Compare against an actual argument.  The pattern side decides.
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            Arg::Value(expected) => expected == actual,
            Arg::Matches(m) => m.eval(actual),
        }
    }

    fn explain(&self, actual: &Value) -> Option<String> {
        match self {
            Arg::Value(expected) if expected == actual => None,
            Arg::Value(expected) =>
                Some(format!("expected {expected}, got {actual}")),
            Arg::Matches(m) => m.explain(actual),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Arg::Value(v) => fmt::Display::fmt(v, f),
            Arg::Matches(m) => fmt::Display::fmt(m, f),
        }
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(v)
    }
}

impl From<Matcher> for Arg {
    fn from(m: Matcher) -> Self {
        Arg::Matches(m)
    }
}

macro_rules! arg_from_value {
    ($($t:ty),*) => {$(
        impl From<$t> for Arg {
            fn from(x: $t) -> Self {
                Arg::Value(Value::from(x))
            }
        }
    )*}
}
arg_from_value!(i8, i16, i32, i64, i128, u8, u16, u32, u64, usize, isize, f32,
    f64, bool, char, &str, String, (), crate::value::Object);

impl<T: Into<Value>> From<Vec<T>> for Arg {
    fn from(v: Vec<T>) -> Self {
        Arg::Value(Value::from(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(o: Option<T>) -> Self {
        Arg::Value(Value::from(o))
    }
}

/// The argument pattern of an expectation.
///
/// Per-slot patterns are checked unless a whole-list matcher was set, in
/// which case the matcher alone decides.
#[derive(Clone, Debug, Default)]
pub struct Pattern {
    args: Vec<Arg>,
    args_matcher: Option<Matcher<[Value]>>,
    kwargs: BTreeMap<String, Arg>,
    kwargs_matcher: Option<Matcher<Kwargs>>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<A: Into<Arg>>(mut self, arg: A) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn kwarg<K, A>(mut self, name: K, arg: A) -> Self
        where K: Into<String>, A: Into<Arg>
    {
        self.kwargs.insert(name.into(), arg.into());
        self
    }

    /// Match the positional arguments with `m` instead of per-slot patterns.
    pub fn with_args_matcher(mut self, m: Matcher<[Value]>) -> Self {
        self.args_matcher = Some(m);
        self
    }

    /// Match the keyword arguments with `m` instead of per-name patterns.
    pub fn with_kwargs_matcher(mut self, m: Matcher<Kwargs>) -> Self {
        self.kwargs_matcher = Some(m);
        self
    }

    pub fn matches(&self, args: &Args) -> bool {
        self.matches_positional(args.positional())
            && self.matches_keywords(args.keywords())
    }

    fn matches_positional(&self, actual: &[Value]) -> bool {
        match &self.args_matcher {
            Some(m) => m.eval(actual),
            None => self.args.len() == actual.len()
                && self.args.iter().zip(actual).all(|(p, a)| p.matches(a))
        }
    }

    fn matches_keywords(&self, actual: &Kwargs) -> bool {
        match &self.kwargs_matcher {
            Some(m) => m.eval(actual),
            None => self.kwargs.len() == actual.len()
                && self.kwargs.iter().all(|(k, p)| {
                    actual.get(k).map_or(false, |a| p.matches(a))
                })
        }
    }

    /// List the reasons `args` does not match, one per offending slot.
    pub fn explain(&self, args: &Args) -> Vec<String> {
        let mut reasons = Vec::new();
        let actual = args.positional();
        match &self.args_matcher {
            Some(m) => if let Some(why) = m.explain(actual) {
                reasons.push(format!("positional arguments: {why}"));
            },
            None if self.args.len() != actual.len() => {
                reasons.push(format!(
                    "expected {} positional argument(s), got {}",
                    self.args.len(), actual.len()));
            },
            None => {
                for (i, (p, a)) in self.args.iter().zip(actual).enumerate() {
                    if let Some(why) = p.explain(a) {
                        reasons.push(format!("argument {i}: {why}"));
                    }
                }
            }
        }
        let actual = args.keywords();
        match &self.kwargs_matcher {
            Some(m) => if let Some(why) = m.explain(actual) {
                reasons.push(format!("keyword arguments: {why}"));
            },
            None => {
                for (k, p) in self.kwargs.iter() {
                    match actual.get(k) {
                        Some(a) => if let Some(why) = p.explain(a) {
                            reasons.push(format!("keyword {k}: {why}"));
                        },
                        None => reasons.push(format!("missing keyword {k}")),
                    }
                }
                for k in actual.keys().filter(|k| !self.kwargs.contains_key(*k))
                {
                    reasons.push(format!("unexpected keyword {k}"));
                }
            }
        }
        reasons
    }
}

impl From<()> for Pattern {
    fn from(_: ()) -> Self {
        Pattern::new()
    }
}

impl From<Args> for Pattern {
    fn from(args: Args) -> Self {
        Pattern {
            args: args.positional().iter().cloned().map(Arg::Value).collect(),
            kwargs: args.keywords().iter()
                .map(|(k, v)| (k.clone(), Arg::Value(v.clone())))
                .collect(),
            ..Pattern::default()
        }
    }
}

impl From<Matcher<[Value]>> for Pattern {
    fn from(m: Matcher<[Value]>) -> Self {
        Pattern::new().with_args_matcher(m)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts = match &self.args_matcher {
            Some(m) => vec![format!("*{m}")],
            None => self.args.iter().map(ToString::to_string).collect(),
        };
        match &self.kwargs_matcher {
            Some(m) => parts.push(format!("**{m}")),
            None => parts.extend(
                self.kwargs.iter().map(|(k, a)| format!("{k}={a}"))),
        }
        f.write_str(&parts.join(", "))
    }
}
