// vim: tw=80
//! Ordered chains of expectations

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    context::{Context, State},
    expectation::{Expectation, ExpectationId},
    Error,
};

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Orders sequences by creation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SequenceId(u64);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "sequence #{}", self.0)
    }
}

struct Inner {
    id: SequenceId,
    context: RefCell<Option<Weak<RefCell<State>>>>,
    members: RefCell<Vec<ExpectationId>>,
}

/// Used to enforce that expectations are satisfied in a certain order.
///
/// Only the first member of a sequence can match calls.  Members may belong
/// to different methods and different mocks, but all must live in the same
/// [`Context`].
///
/// ```
/// # use understudy::*;
/// let ctx = Context::new();
/// let class = Class::new("Thing", "demo").method("bar", &["x"]);
/// let mock = Mock::builder(class).context(&ctx).build();
/// let seq = Sequence::new();
/// mock["bar"].expect(args![1]).in_sequence(&seq).unwrap();
/// mock["bar"].expect(args![2]).in_sequence(&seq).unwrap();
/// assert!(mock.call("bar", args![2]).is_err());
/// mock.call("bar", args![1]).unwrap();
/// mock.call("bar", args![2]).unwrap();
/// ```
#[derive(Clone)]
pub struct Sequence(Rc<Inner>);

impl Sequence {
    pub fn new() -> Self {
        let id = SequenceId(NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed));
        Sequence(Rc::new(Inner {
            id,
            context: RefCell::new(None),
            members: RefCell::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> SequenceId {
        self.0.id
    }

    /// Add `expectation` to the end of this sequence.
    ///
    /// The first append binds the sequence to the expectation's context.
    /// Appending an expectation from any other context fails with
    /// [`Error::CrossContext`].  Appending a current member again does
    /// nothing.
    pub fn append(&self, expectation: &Expectation) -> Result<(), Error> {
        let context = expectation.context();
        let rebind = match &*self.0.context.borrow() {
            Some(bound) if bound.strong_count() > 0 => {
                if !context.is_bound_to(bound) {
                    return Err(Error::CrossContext);
                }
                false
            },
            _ => true
        };
        if rebind {
            // Whatever was bound is gone, and its members with it.
            self.clear();
            *self.0.context.borrow_mut() = Some(context.downgrade());
        }
        if self.contains(expectation.id()) {
            return Ok(());
        }
        context.adopt(expectation.id(), self)?;
        self.0.members.borrow_mut().push(expectation.id());
        Ok(())
    }

    /// Number of unretired members.
    pub fn len(&self) -> usize {
        self.0.members.borrow().len()
    }

    /// An empty sequence is dormant: it contributes nothing to the active
    /// set until something is appended again.
    pub fn is_empty(&self) -> bool {
        self.0.members.borrow().is_empty()
    }

    fn context(&self) -> Option<Context> {
        self.0.context.borrow().as_ref()
            .and_then(Weak::upgrade)
            .map(Context::from_state)
    }

    /// The only member currently able to match a call.
    pub fn head(&self) -> Option<Expectation> {
        let id = self.head_id()?;
        self.context().map(|ctx| Expectation::new(ctx, id))
    }

    /// Every unretired member, in order.
    pub fn expectations(&self) -> Vec<Expectation> {
        match self.context() {
            Some(ctx) => self.0.members.borrow().iter()
                .map(|id| Expectation::new(ctx.clone(), *id))
                .collect(),
            None => Vec::new()
        }
    }

    pub(crate) fn head_id(&self) -> Option<ExpectationId> {
        self.0.members.borrow().first().copied()
    }

    pub(crate) fn contains(&self, id: ExpectationId) -> bool {
        self.0.members.borrow().contains(&id)
    }

    /// Drop a retired member, promoting its successor if it was the head.
    pub(crate) fn forget(&self, id: ExpectationId) {
        self.0.members.borrow_mut().retain(|m| *m != id);
    }

    pub(crate) fn clear(&self) {
        self.0.members.borrow_mut().clear();
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("id", &self.0.id)
            .field("members", &*self.0.members.borrow())
            .finish()
    }
}
