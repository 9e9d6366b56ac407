// vim: tw=80
//! Strict mock objects with ordered and cumulative expectations.
//!
//! Understudy builds stand-ins for objects whose every call must be
//! authorized in advance.  A call nobody expected fails immediately, and an
//! expected call that never arrives fails the test when the [`Context`] is
//! checked.
//!
//! # Usage
//!
//! The basic idea is the same whichever way a mock is built.
//! * Describe the interface being mocked, either with [`Class`] by hand or
//!   by annotating a trait with [`#[interface]`](interface).
//! * Build a [`Mock`] of it, usually inside a fresh [`Context`].
//! * Set expectations on its methods.  Each has an argument [`Pattern`], a
//!   return value or error, a number of times it may be called, and
//!   optionally a place in one or more [`Sequence`]s or a running sum.
//! * Hand the mock to the code under test, then check
//!   [`Context::assert_satisfied`].
//!
//! # User Guide
//!
//! * [`Getting started`](#getting-started)
//! * [`Matching arguments`](#matching-arguments)
//! * [`Call counts`](#call-counts)
//! * [`Sequences`](#sequences)
//! * [`Running sums`](#running-sums)
//! * [`Typed interfaces`](#typed-interfaces)
//! * [`Logging`](#logging)
//!
//! ## Getting started
//!
//! ```
//! use understudy::*;
//!
//! let ctx = Context::new();
//! let class = Class::new("Thing", "demo")
//!     .method("foo", &["a", "b", "c"])
//!     .method("bar", &[]);
//! let mock = Mock::builder(class).context(&ctx).build();
//!
//! mock["foo"].expect(args![1, 2, 3]);
//! mock["bar"].expect(()).returns(3).unwrap();
//!
//! assert_eq!(Value::None, mock.call("foo", args![1, 2, 3]).unwrap());
//! assert_eq!(Value::from(3), mock.call("bar", ()).unwrap());
//! // Each expectation allows one call by default
//! assert!(mock.call("foo", args![1, 2, 3]).is_err());
//! ctx.assert_satisfied().unwrap();
//! ```
//!
//! ## Matching arguments
//!
//! Literal arguments match by equality.  Anything from the [`predicate`]
//! module can stand in for a literal with [`matches`], and [`anything`]
//! accepts every value.  Keyword arguments follow a `;` in [`args!`] and
//! [`pattern!`].
//!
//! ```
//! # use understudy::*;
//! # let ctx = Context::new();
//! # let class = Class::new("Thing", "demo").method("baz", &["n", "name"]);
//! # let mock = Mock::builder(class).context(&ctx).build();
//! mock["baz"].expect(pattern![matches(predicate::lt(10i64)); name = anything()])
//!     .times(2);
//! mock.call("baz", args![3; name = "x"]).unwrap();
//! mock.call("baz", args![-7; name = 2.5]).unwrap();
//! ```
//!
//! [`args_matching`] and [`kwargs_matching`] match the whole positional list
//! or keyword map at once, replacing the per-argument patterns.
//!
//! ## Call counts
//!
//! [`Expectation::times`] sets how many calls an expectation accepts.
//! [`Expectation::infinite_times`] never retires and is implicitly
//! [optional](Expectation::optional): it does not have to be called at all.
//!
//! ## Sequences
//!
//! Expectations in a [`Sequence`] can only be satisfied in the order they
//! were added, even across different mocks.
//!
//! ```
//! # use understudy::*;
//! # let ctx = Context::new();
//! # let class = Class::new("Thing", "demo").method("bar", &["x"]);
//! # let a = Mock::builder(class.clone()).context(&ctx).build();
//! # let b = Mock::builder(class).context(&ctx).build();
//! let seq = Sequence::new();
//! a["bar"].expect(args![1]).in_sequence(&seq).unwrap();
//! b["bar"].expect(args![1]).in_sequence(&seq).unwrap();
//! assert!(b.call("bar", args![1]).is_err());
//! a.call("bar", args![1]).unwrap();
//! b.call("bar", args![1]).unwrap();
//! ```
//!
//! ## Running sums
//!
//! An expectation with [`Expectation::until_sums_to`] accepts calls until
//! their arguments add up to the target.  Numbers add, strings and lists
//! concatenate.
//!
//! ```
//! # use understudy::*;
//! # let ctx = Context::new();
//! # let class = Class::new("Socket", "demo").method("send", &["data"]);
//! # let sock = Mock::builder(class).context(&ctx).build();
//! sock["send"].expect(pattern![matches_str(predicate::str::starts_with(""))])
//!     .until_sums_to(args!["hello world"]);
//! sock.call("send", args!["hello"]).unwrap();
//! sock.call("send", args![" world"]).unwrap();
//! ctx.assert_satisfied().unwrap();
//! ```
//!
//! ## Typed interfaces
//!
//! [`#[interface]`](interface) on a trait generates a `Mock`-prefixed struct
//! that implements the trait by forwarding every call into the engine.
//! Typed calls that the engine rejects panic with its diagnostic.
//!
//! ```
//! # use understudy::*;
//! #[interface]
//! trait Store {
//!     fn get(&self, key: &str) -> Option<i64>;
//! }
//!
//! let ctx = Context::new();
//! let store = MockStore::with_context(&ctx);
//! store["get"].expect(args!["k"]).returns(Some(5)).unwrap();
//! assert_eq!(Some(5), store.get("k"));
//! ```
//!
//! ## Logging
//!
//! With the default `tracing` feature, the engine emits `tracing` events:
//! `debug` for registrations, retirements and unexpected calls, `trace` for
//! every satisfied call.

cfg_if::cfg_if! {
    if #[cfg(feature = "tracing")] {
        macro_rules! debug {
            ($($t:tt)*) => { ::tracing::debug!($($t)*) }
        }
        macro_rules! trace {
            ($($t:tt)*) => { ::tracing::trace!($($t)*) }
        }
    } else {
        macro_rules! debug {
            ($($t:tt)*) => {}
        }
        macro_rules! trace {
            ($($t:tt)*) => {}
        }
    }
}

/// Build [`Args`]: positional arguments, then keyword arguments after a `;`.
///
/// ```
/// # use understudy::*;
/// let a = args![1, "two"; three = 3.0];
/// assert_eq!(2, a.positional().len());
/// assert_eq!(Some(&Value::from(3.0)), a.get_kwarg("three"));
/// assert!(args![].is_empty());
/// ```
#[macro_export]
macro_rules! args {
    ($($a:expr),* $(,)? $(; $($k:ident = $v:expr),* $(,)?)?) => {
        $crate::Args::new()
            $(.arg($a))*
            $($(.kwarg(stringify!($k), $v))*)?
    };
}

/// Build a [`Pattern`], with the same syntax as [`args!`].  Each slot may
/// be a literal or a [`Matcher`].
///
/// ```
/// # use understudy::*;
/// let p = pattern![1, anything(); key = matches(predicate::ge(0i64))];
/// assert!(p.matches(&args![1, "x"; key = 4]));
/// assert!(!p.matches(&args![1, "x"; key = -4]));
/// ```
#[macro_export]
macro_rules! pattern {
    ($($a:expr),* $(,)? $(; $($k:ident = $v:expr),* $(,)?)?) => {
        $crate::Pattern::new()
            $(.arg($a))*
            $($(.kwarg(stringify!($k), $v))*)?
    };
}

mod context;
mod error;
mod expectation;
mod matcher;
mod mock;
mod sequence;
mod sum;
mod value;

pub use context::{default_context, Context};
pub use error::{Error, Raised, ShapeMismatch, UnexpectedCall, UnmetExpectations};
pub use expectation::{Expectation, ExpectationId, ExpectationInfo, Times};
pub use matcher::{
    anything,
    args_matching,
    kwargs_matching,
    matches,
    matches_str,
    Arg,
    Matcher,
    Pattern,
};
pub use mock::{
    default_method_selector,
    Call,
    Class,
    MethodId,
    MethodSig,
    Mock,
    MockBuilder,
    MockId,
    MockMethod,
};
pub use sequence::{Sequence, SequenceId};
pub use sum::RunningSum;
pub use value::{AnyValue, Args, FromValue, Kwargs, Object, Shape, ToValue, Value};

pub use understudy_derive::interface;
pub use predicates::prelude::{Predicate, predicate};

/// Glue for code generated by [`#[interface]`](interface).
#[doc(hidden)]
pub mod __private {
    use super::*;

    /// Dispatch a typed call and convert its result, panicking on failure.
    pub fn forward<T: FromValue>(mock: &Mock, method: &str, args: Args) -> T {
        match mock.call(method, args).and_then(T::from_value) {
            Ok(t) => t,
            Err(e) => panic!("{}::{}: {}", mock.class().name(), method, e)
        }
    }
}
