// vim: tw=80
//! Expectations: authorized calls and their retirement gates

use std::{
    cell::RefCell,
    error::Error as StdError,
    fmt,
    rc::Rc,
};

use crate::{
    context::Context,
    error::Raised,
    matcher::Pattern,
    mock::MethodId,
    sequence::Sequence,
    sum::RunningSum,
    value::{Args, Value},
    Error,
};

/// Identifies an expectation within its [`Context`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExpectationId(pub(crate) u64);

impl fmt::Display for ExpectationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expectation #{}", self.0)
    }
}

/// How many more times an expectation may be satisfied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Times {
    Finite(usize),
    Infinite,
}

impl Times {
    /// Count one satisfaction.  Returns true once nothing remains.
    fn call(&mut self) -> bool {
        match self {
            Times::Finite(n) => {
                *n = n.saturating_sub(1);
                *n == 0
            },
            Times::Infinite => false
        }
    }
}

impl Default for Times {
    fn default() -> Self {
        Times::Finite(1)
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Times::Finite(1) => f.write_str("once"),
            Times::Finite(n) => write!(f, "{n} times"),
            Times::Infinite => f.write_str("any number of times"),
        }
    }
}

/// What a satisfied expectation hands back to its caller.
#[derive(Clone, Default)]
pub(crate) enum Rfunc {
    #[default]
    Default,
    Const(Value),
    Mut(Rc<RefCell<dyn FnMut(&Args) -> Value>>),
    Raise(Raised),
}

impl Rfunc {
    fn is_return(&self) -> bool {
        matches!(self, Rfunc::Const(_) | Rfunc::Mut(_))
    }

    /// Produce the call's result.  Must not be called while the owning
    /// context is borrowed, since the closure may call back into it.
    pub(crate) fn call(&self, args: &Args) -> Result<Value, Error> {
        match self {
            Rfunc::Default => Ok(Value::None),
            Rfunc::Const(v) => Ok(v.clone()),
            Rfunc::Mut(f) => Ok((&mut *f.borrow_mut())(args)),
            Rfunc::Raise(e) => Err(e.clone().into()),
        }
    }
}

impl fmt::Debug for Rfunc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rfunc::Default => f.write_str("Default"),
            Rfunc::Const(v) => f.debug_tuple("Const").field(v).finish(),
            Rfunc::Mut(_) => f.write_str("Mut(..)"),
            Rfunc::Raise(e) => f.debug_tuple("Raise").field(e).finish(),
        }
    }
}

/// The engine's record of one expectation.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) method: MethodId,
    pub(crate) pattern: Pattern,
    pub(crate) rfunc: Rfunc,
    pub(crate) times: Times,
    pub(crate) optional: bool,
    pub(crate) sequenced: bool,
    pub(crate) sum: Option<RunningSum>,
}

impl Entry {
    pub(crate) fn new(method: MethodId, pattern: Pattern) -> Self {
        Entry {
            method,
            pattern,
            rfunc: Rfunc::default(),
            times: Times::default(),
            optional: false,
            sequenced: false,
            sum: None,
        }
    }

    pub(crate) fn info(&self, id: ExpectationId) -> ExpectationInfo {
        ExpectationInfo {
            id,
            method: self.method.clone(),
            pattern: self.pattern.clone(),
            remaining: self.times,
            optional: self.optional,
            sequenced: self.sequenced,
        }
    }

    /// Account for one matching call.  Returns true when the expectation is
    /// exhausted and must be retired.
    ///
    /// A running sum gates the counter: the counter only moves when the sum
    /// reaches its target, and then the sum starts over.
    pub(crate) fn charge(&mut self, args: &Args) -> Result<bool, Error> {
        if let Some(sum) = &mut self.sum {
            sum.record(args)?;
            if !sum.is_satisfied() {
                return Ok(false);
            }
            sum.reset();
        }
        Ok(self.times.call())
    }
}

/// A snapshot of an expectation, as carried by failure reports.
#[derive(Clone, Debug)]
pub struct ExpectationInfo {
    pub id: ExpectationId,
    pub method: MethodId,
    pub pattern: Pattern,
    pub remaining: Times,
    pub optional: bool,
    pub sequenced: bool,
}

impl fmt::Display for ExpectationInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", self.method.name(), self.pattern)?;
        if self.remaining != Times::default() {
            write!(f, " [{}]", self.remaining)?;
        }
        Ok(())
    }
}

/// A handle to an expectation registered with a [`Context`].
///
/// Configuration methods consume and return the handle so they chain:
/// ```
/// # use understudy::*;
/// let ctx = Context::new();
/// let mock = Mock::builder(Class::new("Thing", "demo").method("bar", &[]))
///     .context(&ctx)
///     .build();
/// mock["bar"].expect(()).returns(3).unwrap().times(2);
/// assert_eq!(Value::from(3), mock.call("bar", ()).unwrap());
/// assert_eq!(Value::from(3), mock.call("bar", ()).unwrap());
/// assert!(mock.call("bar", ()).is_err());
/// ```
///
/// Configuring an expectation that has already been retired has no effect,
/// except for the fallible methods, which report [`Error::Retired`].
#[derive(Clone, Debug, PartialEq)]
pub struct Expectation {
    context: Context,
    id: ExpectationId,
}

impl Expectation {
    pub(crate) fn new(context: Context, id: ExpectationId) -> Self {
        Expectation { context, id }
    }

    pub fn id(&self) -> ExpectationId {
        self.id
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    fn set_rfunc(&self, rfunc: Rfunc) -> Result<(), Error> {
        let id = self.id;
        self.context.with_entry(id, |entry| {
            let conflict = if rfunc.is_return() {
                matches!(entry.rfunc, Rfunc::Raise(_))
            } else {
                entry.rfunc.is_return()
            };
            if conflict {
                return Err(Error::ReturnConflict(id));
            }
            entry.rfunc = rfunc;
            Ok(())
        })?
    }

    /// Return `value` from every satisfying call.
    pub fn returns<V: Into<Value>>(self, value: V) -> Result<Self, Error> {
        self.set_rfunc(Rfunc::Const(value.into()))?;
        Ok(self)
    }

    /// Compute the return value from each satisfying call's arguments.
    pub fn returning<F>(self, f: F) -> Result<Self, Error>
        where F: FnMut(&Args) -> Value + 'static
    {
        self.set_rfunc(Rfunc::Mut(Rc::new(RefCell::new(f))))?;
        Ok(self)
    }

    /// Fail every satisfying call with `error`, surfaced as
    /// [`Error::Raised`].
    pub fn raises<E: StdError + 'static>(self, error: E) -> Result<Self, Error>
    {
        self.set_rfunc(Rfunc::Raise(Raised::new(error)))?;
        Ok(self)
    }

    /// Expect exactly `n` satisfying calls.  Zero retires the expectation
    /// immediately.
    pub fn times(self, n: usize) -> Self {
        // Retired handles ignore configuration
        if n == 0 {
            let _ = self.context.remove(&self);
        } else {
            let _ = self.context.with_entry(self.id,
                |entry| entry.times = Times::Finite(n));
        }
        self
    }

    /// Never retire.  Implies [`optional`](Self::optional).
    pub fn infinite_times(self) -> Self {
        let _ = self.context.with_entry(self.id, |entry| {
            entry.times = Times::Infinite;
            entry.optional = true;
        });
        self
    }

    /// Exempt this expectation from
    /// [`Context::assert_satisfied`].
    pub fn optional(self) -> Self {
        let _ = self.context.with_entry(self.id,
            |entry| entry.optional = true);
        self
    }

    /// Satisfy this expectation only once the arguments of its calls add up
    /// to `target`.
    ///
    /// Every call must have the same arity and keyword names as `target`.
    /// Combined with [`times`](Self::times), the whole sum must be reached
    /// that many times.
    pub fn until_sums_to<A: Into<Args>>(self, target: A) -> Self {
        let sum = RunningSum::new(target.into());
        let _ = self.context.with_entry(self.id,
            |entry| entry.sum = Some(sum));
        self
    }

    /// Append this expectation to `seq`.
    pub fn in_sequence(self, seq: &Sequence) -> Result<Self, Error> {
        seq.append(&self)?;
        Ok(self)
    }

    /// Account for one call and produce its result.
    ///
    /// The arguments are not checked against the pattern; callers normally
    /// reach this through [`MockMethod::call`](crate::MockMethod::call),
    /// which already did.
    pub fn satisfy(&self, args: &Args) -> Result<Value, Error> {
        self.context.charge(self.id, args)?.call(args)
    }

    pub fn info(&self) -> Option<ExpectationInfo> {
        self.context.with_entry(self.id, |entry| entry.info(self.id)).ok()
    }

    pub fn method(&self) -> Option<MethodId> {
        self.info().map(|info| info.method)
    }

    pub fn pattern(&self) -> Option<Pattern> {
        self.info().map(|info| info.pattern)
    }

    /// Remaining satisfactions; zero once retired.
    pub fn remaining(&self) -> Times {
        self.info().map_or(Times::Finite(0), |info| info.remaining)
    }

    pub fn is_optional(&self) -> bool {
        self.info().map_or(false, |info| info.optional)
    }

    pub fn is_sequenced(&self) -> bool {
        self.info().map_or(false, |info| info.sequenced)
    }

    pub fn is_retired(&self) -> bool {
        self.info().is_none()
    }
}
