// vim: tw=80
//! Proc macros for use with understudy
//!
//! You probably don't want to use this crate directly.  Instead, use its
//! reexports via the `understudy` crate.

#![cfg_attr(test, deny(warnings))]
extern crate proc_macro;

mod interface;
use crate::interface::do_interface;

/// Describe a trait to understudy and generate a typed mock for it.
///
/// For a trait `Foo`, this emits the trait unchanged plus a `MockFoo`
/// struct.  `MockFoo` wraps an `understudy::Mock` of the class
/// `MockFoo::interface()` and implements `Foo` by converting every argument
/// to a `Value`, dispatching the call through its context, and converting the
/// result back.  Any failure inside a typed call panics with the engine's
/// diagnostic.
///
/// ```ignore
/// #[interface]
/// pub trait Clock {
///     fn now(&self) -> u64;
///     fn sleep(&self, secs: u64);
/// }
///
/// let ctx = Context::new();
/// let clock = MockClock::with_context(&ctx);
/// clock["now"].expect(()).returns(42u64)?;
/// assert_eq!(42, clock.now());
/// ```
///
/// Unsupported: generic traits, supertraits, associated types and consts,
/// static, `async` or generic methods, unnamed or `impl Trait` arguments,
/// and reference or `impl Trait` return types.
#[proc_macro_attribute]
pub fn interface(attrs: proc_macro::TokenStream,
    input: proc_macro::TokenStream) -> proc_macro::TokenStream
{
    do_interface(attrs.into(), input.into()).into()
}
